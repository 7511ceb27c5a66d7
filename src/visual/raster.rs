//! Drawing surface for mock-browser screenshots and image fixtures.
//!
//! A thin layer over [`image::RgbImage`] that adds clipped rectangles and
//! font8x8 text, so a fake page can be turned into a PNG the comparator
//! treats exactly like a real capture.

use std::io::Cursor;

use font8x8::{BASIC_FONTS, UnicodeFonts};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage, RgbaImage};

use super::{VisualError, VisualResult};

/// Width and height of one font8x8 glyph in pixels
pub const GLYPH_SIZE: u32 = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Raster {
    image: RgbImage,
}

impl Raster {
    /// Black raster
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: RgbImage::new(width, height),
        }
    }

    pub fn with_color(width: u32, height: u32, color: [u8; 3]) -> Self {
        Self {
            image: RgbImage::from_pixel(width, height, Rgb(color)),
        }
    }

    /// Decode PNG (or any format `image` recognises)
    pub fn from_png_bytes(data: &[u8]) -> VisualResult<Self> {
        let image = image::load_from_memory(data)?.to_rgb8();
        Ok(Self { image })
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn fill(&mut self, color: [u8; 3]) {
        self.image.pixels_mut().for_each(|px| *px = Rgb(color));
    }

    /// Filled rectangle, clipped to the raster
    pub fn draw_rect(&mut self, x: u32, y: u32, w: u32, h: u32, color: [u8; 3]) {
        let right = x.saturating_add(w).min(self.width());
        let bottom = y.saturating_add(h).min(self.height());
        for py in y..bottom {
            for px in x..right {
                self.image.put_pixel(px, py, Rgb(color));
            }
        }
    }

    /// One line of font8x8 text starting at (x, y); no wrapping
    pub fn draw_text(&mut self, x: u32, y: u32, text: &str, fg: [u8; 3], bg: [u8; 3]) {
        let origins = (0u32..).map_while(|i| i.checked_mul(GLYPH_SIZE)?.checked_add(x));
        for (ch, left) in text.chars().zip(origins) {
            if left >= self.width() {
                break;
            }
            self.draw_glyph(left, y, ch, fg, bg);
        }
    }

    fn draw_glyph(&mut self, left: u32, top: u32, ch: char, fg: [u8; 3], bg: [u8; 3]) {
        let glyph = BASIC_FONTS.get(ch).unwrap_or([0u8; 8]);
        for (dy, row) in (0u32..).zip(glyph) {
            for dx in 0..GLYPH_SIZE {
                // LSB is the leftmost pixel
                let color = if (row >> dx) & 1 == 1 { fg } else { bg };
                self.set_pixel(left.saturating_add(dx), top.saturating_add(dy), color);
            }
        }
    }

    /// Color at (x, y); black outside the raster
    pub fn get_pixel(&self, x: u32, y: u32) -> [u8; 3] {
        self.image.get_pixel_checked(x, y).map_or([0, 0, 0], |px| px.0)
    }

    /// Writes outside the raster are ignored
    pub fn set_pixel(&mut self, x: u32, y: u32, color: [u8; 3]) {
        if let Some(px) = self.image.get_pixel_mut_checked(x, y) {
            *px = Rgb(color);
        }
    }

    /// RGBA copy in the layout the pixel diff works on
    pub fn to_rgba(&self) -> RgbaImage {
        DynamicImage::ImageRgb8(self.image.clone()).into_rgba8()
    }

    pub fn to_png(&self) -> VisualResult<Vec<u8>> {
        let mut bytes = Vec::new();
        self.image
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .map_err(VisualError::Image)?;
        Ok(bytes)
    }
}
