use criterion::{Criterion, black_box, criterion_group, criterion_main};
use image::RgbaImage;
use page_harness::visual::{Raster, compare::compare_images, pixel_diff};

fn fixtures() -> (RgbaImage, RgbaImage) {
    let mut reference = Raster::with_color(1280, 800, [250, 250, 250]);
    reference.draw_rect(0, 0, 1280, 64, [30, 60, 120]);
    reference.draw_text(16, 24, "Dashboard", [255, 255, 255], [30, 60, 120]);
    for row in 0..20 {
        reference.draw_text(32, 100 + row * 24, "Order #1042 shipped", [20, 20, 20], [250, 250, 250]);
    }
    let mut actual = reference.clone();
    actual.draw_rect(900, 300, 200, 120, [200, 40, 40]);
    (reference.to_rgba(), actual.to_rgba())
}

fn benchmark_pixel_diff(c: &mut Criterion) {
    let (reference, actual) = fixtures();

    c.bench_function("pixel_diff_1280x800", |b| {
        b.iter(|| {
            let diff = pixel_diff(black_box(&reference), black_box(&actual), 0.1);
            assert!(diff.is_some());
        })
    });
}

fn benchmark_compare_images(c: &mut Criterion) {
    let (reference, actual) = fixtures();
    let dir = tempfile::tempdir().unwrap();
    let reference_path = dir.path().join("reference.png");
    let diff_path = dir.path().join("diff.png");

    c.bench_function("compare_images_within_tolerance", |b| {
        b.iter(|| {
            let report = compare_images(
                "dashboard",
                black_box(&reference),
                black_box(&actual),
                0.1,
                0.05,
                &reference_path,
                &diff_path,
            );
            assert!(report.is_ok());
        })
    });
}

criterion_group!(benches, benchmark_pixel_diff, benchmark_compare_images);
criterion_main!(benches);
