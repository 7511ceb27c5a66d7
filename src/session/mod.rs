//! Remote browser session abstraction.
//!
//! Everything the page-object layer does goes through [`BrowserSession`]:
//! - [`WebDriverSession`] drives a real browser over the W3C WebDriver protocol
//! - [`MockBrowser`] is an in-memory stub DOM for tests and dry runs

pub mod mock;
pub mod webdriver;

use thiserror::Error;

use crate::page::locator::Locator;

pub use mock::{MockBrowser, MockElement};
pub use webdriver::{BrowserOptions, WebDriverSession};

/// Result type for session operations
pub type SessionResult<T> = Result<T, SessionError>;

/// Errors reported by a browser session
#[derive(Debug, Error)]
pub enum SessionError {
    /// The element was replaced or removed after it was looked up
    #[error("stale element reference: {0}")]
    StaleElement(String),

    /// The handle does not refer to any known element
    #[error("no such element: {0}")]
    NoSuchElement(String),

    /// Could not establish or lost the connection to the browser
    #[error("connection error: {0}")]
    Connection(String),

    /// The browser rejected or failed a command
    #[error("protocol error: {0}")]
    Protocol(String),

    /// A script failed or returned something unexpected
    #[error("script error: {0}")]
    Script(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SessionError {
    pub fn is_stale(&self) -> bool {
        matches!(self, SessionError::StaleElement(_))
    }

    /// Stale and missing handles are expected while a page re-renders;
    /// wait probes treat them as "condition not met yet".
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            SessionError::StaleElement(_) | SessionError::NoSuchElement(_)
        )
    }
}

/// Opaque reference to a remote DOM node.
///
/// Handles are only valid until the page mutates the node; after that every
/// operation on them fails with [`SessionError::StaleElement`] and the
/// locator has to be resolved again.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementHandle(String);

impl ElementHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn id(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ElementHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Trait for remote browser sessions
///
/// A session is owned by exactly one scenario and used from one thread at a
/// time; implementations need no internal locking beyond what `Send` needs.
pub trait BrowserSession: Send {
    /// Source identifier for logs (e.g. "webdriver", "mock")
    fn source_type(&self) -> &str;

    /// Load a URL in the current window
    fn navigate(&mut self, url: &str) -> SessionResult<()>;

    fn current_url(&mut self) -> SessionResult<String>;

    fn title(&mut self) -> SessionResult<String>;

    /// All elements currently matching the locator (possibly none)
    fn find_elements(&mut self, locator: &Locator) -> SessionResult<Vec<ElementHandle>>;

    fn is_displayed(&mut self, element: &ElementHandle) -> SessionResult<bool>;

    fn is_enabled(&mut self, element: &ElementHandle) -> SessionResult<bool>;

    fn click(&mut self, element: &ElementHandle) -> SessionResult<()>;

    /// Clear the value of an editable element
    fn clear(&mut self, element: &ElementHandle) -> SessionResult<()>;

    /// Type text as a sequence of key events
    fn send_keys(&mut self, element: &ElementHandle, text: &str) -> SessionResult<()>;

    /// Press on `source`, move the pointer to `target` and release
    fn drag_and_drop(&mut self, source: &ElementHandle, target: &ElementHandle)
    -> SessionResult<()>;

    /// Run a synchronous script in the page and return its JSON result
    fn execute_script(&mut self, script: &str) -> SessionResult<serde_json::Value>;

    /// PNG screenshot of the current viewport
    fn screenshot(&mut self) -> SessionResult<Vec<u8>>;

    /// End the session and release the browser
    fn quit(&mut self) -> SessionResult<()>;
}

impl<S: BrowserSession + ?Sized> BrowserSession for Box<S> {
    fn source_type(&self) -> &str {
        (**self).source_type()
    }

    fn navigate(&mut self, url: &str) -> SessionResult<()> {
        (**self).navigate(url)
    }

    fn current_url(&mut self) -> SessionResult<String> {
        (**self).current_url()
    }

    fn title(&mut self) -> SessionResult<String> {
        (**self).title()
    }

    fn find_elements(&mut self, locator: &Locator) -> SessionResult<Vec<ElementHandle>> {
        (**self).find_elements(locator)
    }

    fn is_displayed(&mut self, element: &ElementHandle) -> SessionResult<bool> {
        (**self).is_displayed(element)
    }

    fn is_enabled(&mut self, element: &ElementHandle) -> SessionResult<bool> {
        (**self).is_enabled(element)
    }

    fn click(&mut self, element: &ElementHandle) -> SessionResult<()> {
        (**self).click(element)
    }

    fn clear(&mut self, element: &ElementHandle) -> SessionResult<()> {
        (**self).clear(element)
    }

    fn send_keys(&mut self, element: &ElementHandle, text: &str) -> SessionResult<()> {
        (**self).send_keys(element, text)
    }

    fn drag_and_drop(
        &mut self,
        source: &ElementHandle,
        target: &ElementHandle,
    ) -> SessionResult<()> {
        (**self).drag_and_drop(source, target)
    }

    fn execute_script(&mut self, script: &str) -> SessionResult<serde_json::Value> {
        (**self).execute_script(script)
    }

    fn screenshot(&mut self) -> SessionResult<Vec<u8>> {
        (**self).screenshot()
    }

    fn quit(&mut self) -> SessionResult<()> {
        (**self).quit()
    }
}
