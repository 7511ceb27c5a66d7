//! Per-scenario context and lifecycle hooks.
//!
//! [`ScenarioContext::start`] is the before-scenario hook: it opens a fresh
//! browser session and wraps it in a page object. [`ScenarioContext::finish`]
//! is the after-scenario hook. If a scenario bails out early (error, panic
//! unwinding) the context's `Drop` quits the session instead, so a session
//! never outlives its scenario.

use tracing::{info, warn};

use crate::artifacts::{Attachment, Attachments};
use crate::config::{Config, WaitSettings};
use crate::page::{PageObject, PageResult};
use crate::session::{BrowserOptions, BrowserSession, SessionResult, WebDriverSession};
use crate::visual::VisualComparator;

/// Creates one browser session per scenario
pub trait SessionFactory {
    fn create(&self) -> SessionResult<Box<dyn BrowserSession>>;
}

impl<F> SessionFactory for F
where
    F: Fn() -> SessionResult<Box<dyn BrowserSession>>,
{
    fn create(&self) -> SessionResult<Box<dyn BrowserSession>> {
        self()
    }
}

/// Starts sessions on a WebDriver endpoint
#[derive(Debug, Clone)]
pub struct WebDriverFactory {
    pub options: BrowserOptions,
}

impl WebDriverFactory {
    pub fn new(options: BrowserOptions) -> Self {
        Self { options }
    }
}

impl SessionFactory for WebDriverFactory {
    fn create(&self) -> SessionResult<Box<dyn BrowserSession>> {
        Ok(Box::new(WebDriverSession::connect(&self.options)?))
    }
}

/// Settings the before-scenario hook applies to every page object
#[derive(Debug, Clone)]
pub struct ScenarioSetup {
    pub waits: WaitSettings,
    pub comparator: VisualComparator,
    pub attachments: Attachments,
}

impl ScenarioSetup {
    pub fn from_config(config: &Config) -> Self {
        Self {
            waits: config.waits.clone(),
            comparator: VisualComparator::from_settings(&config.visual),
            attachments: Attachments::discard(),
        }
    }

    pub fn attachments(mut self, attachments: Attachments) -> Self {
        self.attachments = attachments;
        self
    }
}

/// State owned by one running scenario
#[derive(Debug)]
pub struct ScenarioContext {
    scenario: String,
    page: PageObject,
    finished: bool,
}

impl ScenarioContext {
    /// Before-scenario hook: open a session and build the page object
    pub fn start(
        scenario: &str,
        factory: &dyn SessionFactory,
        setup: ScenarioSetup,
    ) -> SessionResult<Self> {
        let session = factory.create()?;
        info!("scenario '{}' started on {} session", scenario, session.source_type());

        let page = PageObject::new(session)
            .with_waits(setup.waits)
            .with_comparator(setup.comparator)
            .with_attachments(setup.attachments);

        Ok(Self {
            scenario: scenario.to_string(),
            page,
            finished: false,
        })
    }

    pub fn scenario(&self) -> &str {
        &self.scenario
    }

    pub fn page(&mut self) -> &mut PageObject {
        &mut self.page
    }

    pub fn attachments(&self) -> &[Attachment] {
        self.page.attachments().entries()
    }

    /// After-scenario hook: quit the session
    pub fn finish(mut self) -> PageResult<()> {
        self.finished = true;
        info!("scenario '{}' finished", self.scenario);
        self.page.quit()
    }
}

impl Drop for ScenarioContext {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        if let Err(err) = self.page.quit() {
            warn!("failed to quit session for '{}': {}", self.scenario, err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::MockBrowser;
    use crate::session::SessionError;

    fn mock_factory(browser: &MockBrowser) -> impl Fn() -> SessionResult<Box<dyn BrowserSession>> + '_ {
        move || Ok(Box::new(browser.clone()) as Box<dyn BrowserSession>)
    }

    #[test]
    fn test_finish_quits_once() {
        let browser = MockBrowser::new();
        let factory = mock_factory(&browser);
        let ctx = ScenarioContext::start("login", &factory, ScenarioSetup::from_config(&Config::defaults()))
            .unwrap();
        ctx.finish().unwrap();
        assert_eq!(browser.quit_calls(), 1);
    }

    #[test]
    fn test_drop_quits_unfinished_scenario() {
        let browser = MockBrowser::new();
        {
            let factory = mock_factory(&browser);
            let ctx =
                ScenarioContext::start("crash", &factory, ScenarioSetup::from_config(&Config::defaults()))
                    .unwrap();
            assert_eq!(ctx.scenario(), "crash");
        }
        assert!(browser.is_closed());
        assert_eq!(browser.quit_calls(), 1);
    }

    #[test]
    fn test_factory_failure_propagates() {
        let factory = || -> SessionResult<Box<dyn BrowserSession>> {
            Err(SessionError::Connection("refused".into()))
        };
        let err = ScenarioContext::start("x", &factory, ScenarioSetup::from_config(&Config::defaults()))
            .unwrap_err();
        assert!(matches!(err, SessionError::Connection(_)));
    }
}
