//! Page-object layer: locators, explicit waits and the interaction API that
//! step definitions call.

pub mod base;
pub mod load;
pub mod locator;
pub mod wait;

use std::time::Duration;

use thiserror::Error;

use crate::session::SessionError;

pub use base::PageObject;
pub use load::{LandmarkCheck, PageLoadReport};
pub use locator::{Locator, Strategy};
pub use wait::{Condition, Wait};

/// Result type for page-object operations
pub type PageResult<T> = Result<T, PageError>;

/// Errors from page-object operations
#[derive(Debug, Error)]
pub enum PageError {
    /// An explicit wait ran out
    #[error("timed out after {elapsed:?} waiting for {locator} to be {condition}")]
    Timeout {
        locator: Locator,
        condition: Condition,
        elapsed: Duration,
    },

    /// The page is not in the expected state
    #[error("assertion failed: {0}")]
    Assertion(String),

    /// The page did not finish loading
    #[error("page load check failed: {0}")]
    Load(String),

    #[error("session error: {0}")]
    Session(#[from] SessionError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PageError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, PageError::Timeout { .. })
    }
}
