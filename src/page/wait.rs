//! Explicit waits.
//!
//! [`Wait::until`] polls a probe at a fixed interval until it yields a value
//! or the deadline passes. A probe is always run once more when the deadline
//! is reached, so a condition that turns true on the last poll still passes.

use std::thread;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::page::locator::Locator;
use crate::session::{BrowserSession, ElementHandle, SessionError, SessionResult};

/// Named predicates over the elements a locator resolves to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    /// At least one matching element is displayed
    Visible,
    /// At least one element matches
    Present,
    /// A matching element is displayed and enabled
    Clickable,
    /// No matching element is displayed (or nothing matches)
    Invisible,
}

impl std::fmt::Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Condition::Visible => "visible",
            Condition::Present => "present",
            Condition::Clickable => "clickable",
            Condition::Invisible => "invisible",
        };
        f.write_str(name)
    }
}

/// Why a wait ended without a value
#[derive(Debug)]
pub enum WaitError {
    /// The probe never succeeded
    TimedOut(Duration),
    /// The session failed in a way polling cannot recover from
    Session(SessionError),
}

/// Polling configuration for one wait
#[derive(Debug, Clone, Copy)]
pub struct Wait {
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl Wait {
    pub fn new(timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            timeout,
            poll_interval,
        }
    }

    /// Poll `probe` until it returns `Some` or the timeout elapses
    pub fn until<T, F>(&self, mut probe: F) -> Result<T, WaitError>
    where
        F: FnMut() -> SessionResult<Option<T>>,
    {
        let start = Instant::now();
        // No representable deadline means the wait never times out
        let deadline = start.checked_add(self.timeout);
        let mut polls = 0u32;

        loop {
            polls += 1;
            match probe() {
                Ok(Some(value)) => {
                    debug!(polls, elapsed = ?start.elapsed(), "wait satisfied");
                    return Ok(value);
                }
                Ok(None) => {}
                Err(err) if err.is_transient() => {
                    debug!("transient error while polling: {}", err);
                }
                Err(err) => return Err(WaitError::Session(err)),
            }

            let now = Instant::now();
            let pause = match deadline {
                Some(deadline) if now >= deadline => {
                    return Err(WaitError::TimedOut(start.elapsed()));
                }
                Some(deadline) => self.poll_interval.min(deadline - now),
                None => self.poll_interval,
            };
            thread::sleep(pause);
        }
    }
}

/// One evaluation of `condition` against the current page.
///
/// Returns the elements that satisfy it: the first qualifying element for
/// `Visible`/`Clickable`, every match for `Present`, and an empty list for
/// `Invisible`.
pub fn probe<S: BrowserSession + ?Sized>(
    session: &mut S,
    locator: &Locator,
    condition: Condition,
) -> SessionResult<Option<Vec<ElementHandle>>> {
    let elements = session.find_elements(locator)?;

    match condition {
        Condition::Present => Ok((!elements.is_empty()).then_some(elements)),
        Condition::Visible => {
            for element in elements {
                if displayed(session, &element)? {
                    return Ok(Some(vec![element]));
                }
            }
            Ok(None)
        }
        Condition::Clickable => {
            for element in elements {
                if displayed(session, &element)? && enabled(session, &element)? {
                    return Ok(Some(vec![element]));
                }
            }
            Ok(None)
        }
        Condition::Invisible => {
            for element in &elements {
                if displayed(session, element)? {
                    return Ok(None);
                }
            }
            Ok(Some(Vec::new()))
        }
    }
}

/// A handle that went stale between lookup and check counts as not displayed
pub(crate) fn displayed<S: BrowserSession + ?Sized>(
    session: &mut S,
    element: &ElementHandle,
) -> SessionResult<bool> {
    match session.is_displayed(element) {
        Err(err) if err.is_transient() => Ok(false),
        other => other,
    }
}

pub(crate) fn enabled<S: BrowserSession + ?Sized>(
    session: &mut S,
    element: &ElementHandle,
) -> SessionResult<bool> {
    match session.is_enabled(element) {
        Err(err) if err.is_transient() => Ok(false),
        other => other,
    }
}
