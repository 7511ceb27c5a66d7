//! The page object: explicit-wait lookups and the interaction/assertion
//! operations built on them.
//!
//! Every operation resolves its locator through [`PageObject::wait_for`], so
//! nothing here touches an element that was not just confirmed present,
//! visible or clickable. Timeouts default to the configured explicit wait.

use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, SystemTime};

use tracing::{debug, info, warn};

use super::locator::Locator;
use super::wait::{self, Condition, Wait, WaitError, probe};
use super::{PageError, PageResult};
use crate::artifacts::Attachments;
use crate::config::{self, WaitSettings};
use crate::session::{BrowserSession, ElementHandle};
use crate::visual::{ComparisonReport, VisualComparator, VisualResult};

/// Extensions of files a browser is still writing
const PARTIAL_DOWNLOAD_EXTENSIONS: &[&str] = &["crdownload", "part", "tmp"];

/// Page object over one browser session
pub struct PageObject {
    pub(super) session: Box<dyn BrowserSession>,
    pub(super) waits: WaitSettings,
    pub(super) attachments: Attachments,
    visual: VisualComparator,
}

impl std::fmt::Debug for PageObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageObject")
            .field("session", &self.session.source_type())
            .field("waits", &self.waits)
            .finish()
    }
}

impl PageObject {
    /// Page object using the global configuration
    pub fn new(session: Box<dyn BrowserSession>) -> Self {
        let config = config::get();
        Self {
            session,
            waits: config.waits.clone(),
            attachments: Attachments::discard(),
            visual: VisualComparator::from_settings(&config.visual),
        }
    }

    pub fn with_waits(mut self, waits: WaitSettings) -> Self {
        self.waits = waits;
        self
    }

    pub fn with_attachments(mut self, attachments: Attachments) -> Self {
        self.attachments = attachments;
        self
    }

    pub fn with_comparator(mut self, comparator: VisualComparator) -> Self {
        self.visual = comparator;
        self
    }

    pub fn session_mut(&mut self) -> &mut dyn BrowserSession {
        self.session.as_mut()
    }

    pub fn attachments(&self) -> &Attachments {
        &self.attachments
    }

    pub fn waits(&self) -> &WaitSettings {
        &self.waits
    }

    pub(super) fn wait(&self, timeout: Option<Duration>) -> Wait {
        Wait::new(
            timeout.unwrap_or_else(|| self.waits.explicit_timeout()),
            self.waits.poll_interval(),
        )
    }

    // =========================================================================
    // Wait / lookup primitives
    // =========================================================================

    /// Poll until `condition` holds for `locator`
    pub fn wait_for(
        &mut self,
        locator: &Locator,
        condition: Condition,
        timeout: Option<Duration>,
    ) -> PageResult<Vec<ElementHandle>> {
        let wait = self.wait(timeout);
        let session = self.session.as_mut();
        debug!("waiting up to {:?} for {} to be {}", wait.timeout, locator, condition);

        wait.until(|| probe(&mut *session, locator, condition))
            .map_err(|err| match err {
                WaitError::TimedOut(elapsed) => PageError::Timeout {
                    locator: locator.clone(),
                    condition,
                    elapsed,
                },
                WaitError::Session(err) => PageError::Session(err),
            })
    }

    /// First visible element matching `locator`
    pub fn wait_and_find_element(
        &mut self,
        locator: &Locator,
        timeout: Option<Duration>,
    ) -> PageResult<ElementHandle> {
        self.first(locator, Condition::Visible, timeout)
    }

    /// All elements matching `locator`, once at least one is present
    pub fn wait_and_find_elements(
        &mut self,
        locator: &Locator,
        timeout: Option<Duration>,
    ) -> PageResult<Vec<ElementHandle>> {
        self.wait_for(locator, Condition::Present, timeout)
    }

    /// First element matching `locator` that is displayed and enabled
    pub fn wait_for_clickable(
        &mut self,
        locator: &Locator,
        timeout: Option<Duration>,
    ) -> PageResult<ElementHandle> {
        self.first(locator, Condition::Clickable, timeout)
    }

    fn first(
        &mut self,
        locator: &Locator,
        condition: Condition,
        timeout: Option<Duration>,
    ) -> PageResult<ElementHandle> {
        self.wait_for(locator, condition, timeout)?
            .into_iter()
            .next()
            .ok_or_else(|| PageError::Assertion(format!("no element for {}", locator)))
    }

    // =========================================================================
    // Click / type
    // =========================================================================

    /// Click once the element is clickable; a stale handle is re-resolved
    /// exactly once.
    pub fn click_element(&mut self, locator: &Locator, timeout: Option<Duration>) -> PageResult<()> {
        let element = self.wait_for_clickable(locator, timeout)?;
        match self.session.click(&element) {
            Err(err) if err.is_stale() => {
                warn!("stale element clicking {}, retrying once", locator);
                let element = self.wait_for_clickable(locator, timeout)?;
                self.session.click(&element)?;
                Ok(())
            }
            other => Ok(other?),
        }
    }

    /// Type `text` as key events into the visible element, optionally
    /// clearing it first
    pub fn enter_text(
        &mut self,
        locator: &Locator,
        text: &str,
        clear: bool,
        timeout: Option<Duration>,
    ) -> PageResult<()> {
        let element = self.wait_and_find_element(locator, timeout)?;
        if clear {
            self.session.clear(&element)?;
        }
        self.session.send_keys(&element, text)?;
        Ok(())
    }

    pub fn click_by_attribute(&mut self, attr: &str, value: &str, tag: Option<&str>) -> PageResult<()> {
        self.click_element(&Locator::by_attribute(attr, value, tag), None)
    }

    /// Type into the element carrying `attr="value"`; `tag` defaults to `input`
    pub fn enter_text_by_attribute(
        &mut self,
        attr: &str,
        value: &str,
        text: &str,
        tag: Option<&str>,
    ) -> PageResult<()> {
        let locator = Locator::by_attribute(attr, value, Some(tag.unwrap_or("input")));
        self.enter_text(&locator, text, true, None)
    }

    pub fn click_by_text(&mut self, text: &str, tag: Option<&str>) -> PageResult<()> {
        self.click_element(&Locator::by_text(text, tag), None)
    }

    pub fn click_by_exact_text(&mut self, text: &str, tag: Option<&str>) -> PageResult<()> {
        self.click_element(&Locator::by_exact_text(text, tag), None)
    }

    pub fn click_by_data_component(&mut self, name: &str) -> PageResult<()> {
        self.click_element(&Locator::by_data_component(name), None)
    }

    pub fn enter_text_to_data_component(&mut self, name: &str, text: &str) -> PageResult<()> {
        self.enter_text(&Locator::by_data_component(name), text, true, None)
    }

    pub fn enter_text_to_placeholder(&mut self, placeholder: &str, text: &str) -> PageResult<()> {
        self.enter_text(&Locator::by_placeholder(placeholder), text, true, None)
    }

    pub fn click_by_id(&mut self, id: &str) -> PageResult<()> {
        self.click_element(&Locator::id(id), None)
    }

    /// Click the `index`-th (zero-based) visible element with `class` once it
    /// is enabled; a stale handle is re-resolved exactly once.
    pub fn click_by_class(&mut self, class: &str, index: usize) -> PageResult<()> {
        let locator = Locator::class_name(class);
        let element = self.nth_visible_enabled(&locator, index)?;
        match self.session.click(&element) {
            Err(err) if err.is_stale() => {
                warn!("stale element clicking {} #{}, retrying once", locator, index);
                let element = self.nth_visible_enabled(&locator, index)?;
                self.session.click(&element)?;
                Ok(())
            }
            other => Ok(other?),
        }
    }

    fn nth_visible_enabled(&mut self, locator: &Locator, index: usize) -> PageResult<ElementHandle> {
        let wait = self.wait(None);
        let session = self.session.as_mut();

        wait.until(|| {
            let mut visible = Vec::new();
            for element in session.find_elements(locator)? {
                if wait::displayed(&mut *session, &element)? {
                    visible.push(element);
                }
            }
            match visible.into_iter().nth(index) {
                Some(element) if wait::enabled(&mut *session, &element)? => Ok(Some(element)),
                _ => Ok(None),
            }
        })
        .map_err(|err| match err {
            WaitError::TimedOut(elapsed) => PageError::Timeout {
                locator: locator.clone(),
                condition: Condition::Clickable,
                elapsed,
            },
            WaitError::Session(err) => PageError::Session(err),
        })
    }

    // =========================================================================
    // Presence / absence
    // =========================================================================

    /// Whether a visible element with matching text appears within the
    /// timeout. A miss attaches a `text_not_found_<text>` screenshot.
    pub fn is_text_present(&mut self, text: &str, exact: bool, timeout: Option<Duration>) -> bool {
        let locator = Locator::text_match(text, exact);
        match self.wait_for(&locator, Condition::Visible, timeout) {
            Ok(_) => true,
            Err(err) => {
                if !err.is_timeout() {
                    warn!("checking for text '{}' failed: {}", text, err);
                }
                self.attach_screenshot(&format!("text_not_found_{}", text));
                false
            }
        }
    }

    /// Negation of [`is_text_present`](Self::is_text_present) with the same
    /// arguments
    pub fn is_text_not_present(&mut self, text: &str, exact: bool, timeout: Option<Duration>) -> bool {
        !self.is_text_present(text, exact, timeout)
    }

    pub fn is_element_visible(&mut self, locator: &Locator, timeout: Option<Duration>) -> bool {
        self.wait_for(locator, Condition::Visible, timeout).is_ok()
    }

    /// Whether every match disappears (or none exists) within the timeout
    pub fn is_element_not_visible(&mut self, locator: &Locator, timeout: Option<Duration>) -> bool {
        self.wait_for(locator, Condition::Invisible, timeout).is_ok()
    }

    // =========================================================================
    // Navigation
    // =========================================================================

    /// Navigate, wait for the document to finish loading and, if `verify`,
    /// require the browser to report exactly `url`
    pub fn open_page(&mut self, url: &str, verify: bool, timeout: Option<Duration>) -> PageResult<()> {
        info!("opening {}", url);
        self.session.navigate(url)?;
        self.wait_for_ready_state(timeout)?;

        if verify {
            let actual = self.session.current_url()?;
            if actual != url {
                return Err(PageError::Assertion(format!(
                    "expected URL {}, browser is at {}",
                    url, actual
                )));
            }
        }
        Ok(())
    }

    pub fn current_url(&mut self) -> PageResult<String> {
        Ok(self.session.current_url()?)
    }

    pub fn title(&mut self) -> PageResult<String> {
        Ok(self.session.title()?)
    }

    /// Wait for the title to contain `text`
    pub fn check_title_contains(&mut self, text: &str) -> PageResult<()> {
        let wait = self.wait(None);
        let session = self.session.as_mut();
        let mut last_title = String::new();

        let result = wait.until(|| {
            last_title = session.title()?;
            Ok(last_title.contains(text).then_some(()))
        });
        match result {
            Ok(()) => Ok(()),
            Err(WaitError::TimedOut(_)) => Err(PageError::Assertion(format!(
                "title '{}' does not contain '{}'",
                last_title, text
            ))),
            Err(WaitError::Session(err)) => Err(err.into()),
        }
    }

    // =========================================================================
    // Files and pointer actions
    // =========================================================================

    /// Send the absolute path of `file` to a file input
    pub fn upload_file(&mut self, locator: &Locator, file: &Path) -> PageResult<()> {
        let path = fs::canonicalize(file)?;
        let input = self
            .wait_for(locator, Condition::Present, None)?
            .into_iter()
            .next()
            .ok_or_else(|| PageError::Assertion(format!("no file input for {}", locator)))?;
        debug!("uploading {}", path.display());
        self.session.send_keys(&input, &path.to_string_lossy())?;
        Ok(())
    }

    /// Click a download link, give the browser `settle` to write the file and
    /// return the newest completed file in `download_dir`
    pub fn download_file(
        &mut self,
        locator: &Locator,
        download_dir: &Path,
        settle: Duration,
    ) -> PageResult<PathBuf> {
        let started = SystemTime::now();
        self.click_element(locator, None)?;
        thread::sleep(settle);

        let mut newest: Option<(SystemTime, PathBuf)> = None;
        for entry in fs::read_dir(download_dir)? {
            let entry = entry?;
            let path = entry.path();
            let partial = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| PARTIAL_DOWNLOAD_EXTENSIONS.contains(&e));
            if partial || !entry.file_type()?.is_file() {
                continue;
            }
            let modified = entry.metadata()?.modified()?;
            if newest.as_ref().is_none_or(|(time, _)| modified > *time) {
                newest = Some((modified, path));
            }
        }

        match newest {
            Some((modified, path)) => {
                if modified < started {
                    warn!("newest file {} predates the download click", path.display());
                }
                Ok(path)
            }
            None => Err(PageError::Assertion(format!(
                "no file downloaded into {}",
                download_dir.display()
            ))),
        }
    }

    /// Drag `source` onto `target`, both resolved as visible first
    pub fn drag_and_drop(&mut self, source: &Locator, target: &Locator) -> PageResult<()> {
        let from = self.wait_and_find_element(source, None)?;
        let to = self.wait_and_find_element(target, None)?;
        self.session.drag_and_drop(&from, &to)?;
        Ok(())
    }

    // =========================================================================
    // Screenshots
    // =========================================================================

    /// Best-effort diagnostic screenshot
    pub fn attach_screenshot(&mut self, name: &str) -> Option<PathBuf> {
        match self.session.screenshot() {
            Ok(png) => self.attachments.attach_png_best_effort(name, &png),
            Err(err) => {
                warn!("could not capture screenshot '{}': {}", name, err);
                None
            }
        }
    }

    /// Capture the page and compare it against the reference named `name`
    pub fn compare_screenshot(&mut self, name: &str, tolerance: f64) -> VisualResult<ComparisonReport> {
        let png = self.session.screenshot()?;
        self.visual.compare_capture(name, &png, tolerance)
    }

    /// End the browser session
    pub fn quit(&mut self) -> PageResult<()> {
        info!("quitting {} session", self.session.source_type());
        self.session.quit()?;
        Ok(())
    }
}
