//! Full-page-load heuristic.
//!
//! Checks, in order:
//! 1. `document.readyState` reaches `complete`
//! 2. known async trackers (`jQuery.active`, `window.__pendingRequests`)
//!    drop to zero
//! 3. landmark elements (`body`, `main`, `header`, `footer`) are visible
//! 4. the page height is unchanged across a fixed interval
//!
//! The first three only set flags in the [`PageLoadReport`]; a failed
//! stability check is the only hard failure.

use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::base::PageObject;
use super::locator::Locator;
use super::wait::WaitError;
use super::{PageError, PageResult};
use crate::session::{SessionError, SessionResult};

pub const READY_STATE_SCRIPT: &str = "return document.readyState;";

/// Sum of the known in-flight request counters, `null` without any tracker
pub const PENDING_REQUESTS_SCRIPT: &str = "\
var pending = null;
if (window.jQuery && typeof window.jQuery.active === 'number') { pending = (pending || 0) + window.jQuery.active; }
if (typeof window.__pendingRequests === 'number') { pending = (pending || 0) + window.__pendingRequests; }
return pending;";

pub const PAGE_HEIGHT_SCRIPT: &str =
    "return Math.max(document.body ? document.body.scrollHeight : 0, document.documentElement.scrollHeight);";

/// Attachment name used when the stability check fails
pub const PAGE_LOAD_FAILURE_ATTACHMENT: &str = "page_load_failure";

/// Visibility of one landmark element
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LandmarkCheck {
    pub name: String,
    pub visible: bool,
}

/// What each stage of the load check observed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageLoadReport {
    pub ready_state_complete: bool,
    /// `None` when the page exposes no request tracker
    pub async_idle: Option<bool>,
    pub landmarks: Vec<LandmarkCheck>,
    /// Heights sampled before and after the stability interval
    pub heights: (i64, i64),
}

impl PageLoadReport {
    pub fn layout_stable(&self) -> bool {
        self.heights.0 == self.heights.1
    }

    /// Every soft check passed as well
    pub fn is_clean(&self) -> bool {
        self.ready_state_complete
            && self.async_idle != Some(false)
            && self.landmarks.iter().all(|l| l.visible)
            && self.layout_stable()
    }
}

fn landmarks() -> Vec<(&'static str, Locator)> {
    vec![
        ("body", Locator::tag_name("body")),
        ("main", Locator::css("main, [role=\"main\"]")),
        ("header", Locator::tag_name("header")),
        ("footer", Locator::tag_name("footer")),
    ]
}

impl PageObject {
    /// Wait for `document.readyState == "complete"`
    pub fn wait_for_ready_state(&mut self, timeout: Option<Duration>) -> PageResult<()> {
        let wait = self.wait(timeout);
        let session = self.session.as_mut();
        let result = wait.until(|| {
            let state = session.execute_script(READY_STATE_SCRIPT)?;
            Ok((state.as_str() == Some("complete")).then_some(()))
        });
        match result {
            Ok(()) => Ok(()),
            Err(WaitError::TimedOut(elapsed)) => Err(PageError::Load(format!(
                "document not complete after {:?}",
                elapsed
            ))),
            Err(WaitError::Session(err)) => Err(err.into()),
        }
    }

    /// Run the load heuristic; only an unstable layout is an error
    pub fn wait_for_full_page_load(&mut self) -> PageResult<PageLoadReport> {
        let ready_state_complete = match self.wait_for_ready_state(None) {
            Ok(()) => true,
            Err(err) => {
                warn!("ready state not reached: {}", err);
                false
            }
        };

        let async_idle = self.wait_for_async_idle();

        let landmark_timeout = Some(self.waits.landmark_timeout());
        let mut checks = Vec::new();
        for (name, locator) in landmarks() {
            let visible = self.is_element_visible(&locator, landmark_timeout);
            if !visible {
                debug!("landmark '{}' not visible", name);
            }
            checks.push(LandmarkCheck {
                name: name.to_string(),
                visible,
            });
        }

        let heights = match self.sample_heights() {
            Ok((before, after)) if before == after => (before, after),
            Ok((before, after)) => {
                self.attach_screenshot(PAGE_LOAD_FAILURE_ATTACHMENT);
                return Err(PageError::Load(format!(
                    "page height changed from {} to {}",
                    before, after
                )));
            }
            Err(err) => {
                self.attach_screenshot(PAGE_LOAD_FAILURE_ATTACHMENT);
                return Err(PageError::Load(format!("could not sample page height: {}", err)));
            }
        };

        let report = PageLoadReport {
            ready_state_complete,
            async_idle,
            landmarks: checks,
            heights,
        };
        info!(clean = report.is_clean(), "page load check finished");
        Ok(report)
    }

    /// `None` without a tracker, otherwise whether the count reached zero
    fn wait_for_async_idle(&mut self) -> Option<bool> {
        let wait = self.wait(None);
        let session = self.session.as_mut();
        let result = wait.until(|| match session.execute_script(PENDING_REQUESTS_SCRIPT)? {
            Value::Null => Ok(Some(None)),
            value => Ok((value.as_i64() == Some(0)).then_some(Some(true))),
        });
        match result {
            Ok(idle) => idle,
            Err(WaitError::TimedOut(_)) => {
                warn!("async requests still pending");
                Some(false)
            }
            Err(WaitError::Session(err)) => {
                warn!("could not read pending requests: {}", err);
                Some(false)
            }
        }
    }

    fn sample_heights(&mut self) -> SessionResult<(i64, i64)> {
        let before = self.page_height()?;
        thread::sleep(self.waits.stability_interval());
        let after = self.page_height()?;
        Ok((before, after))
    }

    fn page_height(&mut self) -> SessionResult<i64> {
        let value = self.session.execute_script(PAGE_HEIGHT_SCRIPT)?;
        value
            .as_i64()
            .or_else(|| value.as_f64().map(|h| h as i64))
            .ok_or_else(|| SessionError::Script(format!("unexpected page height {}", value)))
    }
}
