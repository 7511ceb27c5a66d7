//! WebDriver-backed browser session.
//!
//! Wraps an async fantoccini [`Client`] behind the blocking [`BrowserSession`]
//! interface. The session owns a current-thread tokio runtime and drives every
//! command to completion with `block_on`, so callers never see async code.
//!
//! Element handles carry the WebDriver element id. Each remote node is cached
//! once, however often a wait re-finds it; the cache is cleared on navigation
//! and a handle unknown to it reports as stale.

use std::borrow::Cow;
use std::collections::HashMap;
use std::time::Duration;

use fantoccini::actions::{InputSource, MOUSE_BUTTON_LEFT, MouseActions, PointerAction};
use fantoccini::elements::Element;
use fantoccini::error::{CmdError, ErrorStatus};
use fantoccini::wd::{Capabilities, TimeoutConfiguration};
use fantoccini::{Client, ClientBuilder};
use serde_json::{Value, json};
use tokio::runtime::{Builder, Runtime};
use tracing::{debug, info, warn};

use super::{BrowserSession, ElementHandle, SessionError, SessionResult};
use crate::config::BrowserSettings;
use crate::page::locator::{Locator, Strategy};

/// Options used to start a browser session
#[derive(Debug, Clone)]
pub struct BrowserOptions {
    pub webdriver_url: String,
    /// Browser UI language
    pub lang: String,
    pub headless: bool,
    pub maximized: bool,
    /// Driver-side implicit wait; zero leaves all waiting to explicit waits
    pub implicit_wait: Duration,
}

impl BrowserOptions {
    pub fn from_settings(settings: &BrowserSettings) -> Self {
        Self {
            webdriver_url: settings.webdriver_url.clone(),
            lang: settings.lang.clone(),
            headless: settings.headless,
            maximized: settings.maximized,
            implicit_wait: Duration::from_secs(settings.implicit_wait),
        }
    }

    pub fn headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Chrome capabilities for these options
    pub fn capabilities(&self) -> Capabilities {
        let mut args = Vec::new();
        if self.maximized {
            args.push("--start-maximized".to_string());
        }
        args.push("--disable-infobars".to_string());
        args.push("--disable-extensions".to_string());
        args.push(format!("--lang={}", self.lang));
        if self.headless {
            args.push("--headless=new".to_string());
        }

        let mut caps = Capabilities::new();
        caps.insert(
            "goog:chromeOptions".to_string(),
            json!({
                "args": args,
                "excludeSwitches": ["enable-automation"],
                "useAutomationExtension": false,
            }),
        );
        caps
    }
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self::from_settings(&BrowserSettings::defaults())
    }
}

/// A live WebDriver session
pub struct WebDriverSession {
    runtime: Runtime,
    client: Client,
    elements: HashMap<String, Element>,
    closed: bool,
}

impl std::fmt::Debug for WebDriverSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebDriverSession")
            .field("cached_elements", &self.elements.len())
            .field("closed", &self.closed)
            .finish()
    }
}

impl WebDriverSession {
    /// Start a new browser session on the configured WebDriver endpoint
    pub fn connect(options: &BrowserOptions) -> SessionResult<Self> {
        let runtime = Builder::new_current_thread().enable_all().build()?;

        info!(
            "starting browser session at {} (headless: {})",
            options.webdriver_url, options.headless
        );
        let client = runtime
            .block_on(
                ClientBuilder::native()
                    .capabilities(options.capabilities())
                    .connect(&options.webdriver_url),
            )
            .map_err(|err| SessionError::Connection(err.to_string()))?;

        let mut session = Self {
            runtime,
            client,
            elements: HashMap::new(),
            closed: false,
        };

        if !options.implicit_wait.is_zero() {
            let timeouts = TimeoutConfiguration::new(None, None, Some(options.implicit_wait));
            let result = session
                .runtime
                .block_on(session.client.update_timeouts(timeouts));
            if let Err(err) = result {
                // The session exists; do not leak it
                let _ = session.quit();
                return Err(map_cmd_error(err, "set timeouts"));
            }
        }
        Ok(session)
    }

    fn element(&self, handle: &ElementHandle) -> SessionResult<Element> {
        self.elements
            .get(handle.id())
            .cloned()
            .ok_or_else(|| SessionError::StaleElement(handle.to_string()))
    }

    fn remember(&mut self, element: Element) -> ElementHandle {
        let id = element.element_id().to_string();
        self.elements.insert(id.clone(), element);
        ElementHandle::new(id)
    }

    fn ensure_open(&self) -> SessionResult<()> {
        if self.closed {
            Err(SessionError::Connection("session already closed".into()))
        } else {
            Ok(())
        }
    }
}

/// Map a WebDriver command error onto the session error kinds
fn map_cmd_error(err: CmdError, context: &str) -> SessionError {
    if let CmdError::Standard(wd) = &err {
        match wd.error {
            ErrorStatus::StaleElementReference => {
                return SessionError::StaleElement(format!("{}: {}", context, wd.message));
            }
            ErrorStatus::NoSuchElement => {
                return SessionError::NoSuchElement(format!("{}: {}", context, wd.message));
            }
            ErrorStatus::JavascriptError => {
                return SessionError::Script(format!("{}: {}", context, wd.message));
            }
            _ => {}
        }
    }
    SessionError::Protocol(format!("{}: {}", context, err))
}

/// Selector text sent to the driver; class names become CSS
fn wire_selector(locator: &Locator) -> Cow<'_, str> {
    match locator.strategy {
        Strategy::ClassName => Cow::Owned(format!(".{}", locator.selector)),
        _ => Cow::Borrowed(locator.selector.as_str()),
    }
}

fn to_fantoccini(strategy: Strategy, selector: &str) -> fantoccini::Locator<'_> {
    match strategy {
        Strategy::Id => fantoccini::Locator::Id(selector),
        Strategy::XPath => fantoccini::Locator::XPath(selector),
        Strategy::Css | Strategy::ClassName | Strategy::TagName => {
            fantoccini::Locator::Css(selector)
        }
    }
}

impl BrowserSession for WebDriverSession {
    fn source_type(&self) -> &str {
        "webdriver"
    }

    fn navigate(&mut self, url: &str) -> SessionResult<()> {
        self.ensure_open()?;
        debug!("navigate to {}", url);
        self.elements.clear();
        self.runtime
            .block_on(self.client.goto(url))
            .map_err(|err| map_cmd_error(err, "navigate"))
    }

    fn current_url(&mut self) -> SessionResult<String> {
        self.ensure_open()?;
        self.runtime
            .block_on(self.client.current_url())
            .map(|url| url.to_string())
            .map_err(|err| map_cmd_error(err, "current url"))
    }

    fn title(&mut self) -> SessionResult<String> {
        self.ensure_open()?;
        self.runtime
            .block_on(self.client.title())
            .map_err(|err| map_cmd_error(err, "title"))
    }

    fn find_elements(&mut self, locator: &Locator) -> SessionResult<Vec<ElementHandle>> {
        self.ensure_open()?;
        let selector = wire_selector(locator);
        let query = to_fantoccini(locator.strategy, &selector);
        let found = match self.runtime.block_on(self.client.find_all(query)) {
            Ok(found) => found,
            Err(err) => match map_cmd_error(err, "find elements") {
                SessionError::NoSuchElement(_) => Vec::new(),
                other => return Err(other),
            },
        };
        Ok(found.into_iter().map(|el| self.remember(el)).collect())
    }

    fn is_displayed(&mut self, element: &ElementHandle) -> SessionResult<bool> {
        let el = self.element(element)?;
        self.runtime
            .block_on(el.is_displayed())
            .map_err(|err| map_cmd_error(err, "is displayed"))
    }

    fn is_enabled(&mut self, element: &ElementHandle) -> SessionResult<bool> {
        let el = self.element(element)?;
        self.runtime
            .block_on(el.is_enabled())
            .map_err(|err| map_cmd_error(err, "is enabled"))
    }

    fn click(&mut self, element: &ElementHandle) -> SessionResult<()> {
        let el = self.element(element)?;
        self.runtime
            .block_on(el.click())
            .map_err(|err| map_cmd_error(err, "click"))
    }

    fn clear(&mut self, element: &ElementHandle) -> SessionResult<()> {
        let el = self.element(element)?;
        self.runtime
            .block_on(el.clear())
            .map_err(|err| map_cmd_error(err, "clear"))
    }

    fn send_keys(&mut self, element: &ElementHandle, text: &str) -> SessionResult<()> {
        let el = self.element(element)?;
        self.runtime
            .block_on(el.send_keys(text))
            .map_err(|err| map_cmd_error(err, "send keys"))
    }

    fn drag_and_drop(
        &mut self,
        source: &ElementHandle,
        target: &ElementHandle,
    ) -> SessionResult<()> {
        let source = self.element(source)?;
        let target = self.element(target)?;
        let actions = MouseActions::new("mouse".to_string())
            .then(PointerAction::MoveToElement {
                element: source,
                duration: None,
                x: Default::default(),
                y: Default::default(),
            })
            .then(PointerAction::Down {
                button: MOUSE_BUTTON_LEFT,
            })
            .then(PointerAction::MoveToElement {
                element: target,
                duration: Some(Duration::from_millis(250)),
                x: Default::default(),
                y: Default::default(),
            })
            .then(PointerAction::Up {
                button: MOUSE_BUTTON_LEFT,
            });

        self.runtime.block_on(async {
            self.client
                .perform_actions(actions)
                .await
                .map_err(|err| map_cmd_error(err, "drag and drop"))?;
            self.client
                .release_actions()
                .await
                .map_err(|err| map_cmd_error(err, "release actions"))
        })
    }

    fn execute_script(&mut self, script: &str) -> SessionResult<Value> {
        self.ensure_open()?;
        self.runtime
            .block_on(self.client.execute(script, Vec::new()))
            .map_err(|err| map_cmd_error(err, "execute script"))
    }

    fn screenshot(&mut self) -> SessionResult<Vec<u8>> {
        self.ensure_open()?;
        self.runtime
            .block_on(self.client.screenshot())
            .map_err(|err| map_cmd_error(err, "screenshot"))
    }

    fn quit(&mut self) -> SessionResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.elements.clear();
        info!("closing browser session");
        self.runtime
            .block_on(self.client.clone().close())
            .map_err(|err| map_cmd_error(err, "quit"))
    }
}

impl Drop for WebDriverSession {
    fn drop(&mut self) {
        if !self.closed {
            if let Err(err) = self.quit() {
                warn!("failed to close browser session: {}", err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chrome_args(caps: &Capabilities) -> Vec<String> {
        caps["goog:chromeOptions"]["args"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap().to_string())
            .collect()
    }

    #[test]
    fn test_capabilities_for_defaults() {
        let options = BrowserOptions::default();
        let caps = options.capabilities();
        let args = chrome_args(&caps);

        assert!(args.contains(&"--start-maximized".to_string()));
        assert!(args.contains(&"--disable-infobars".to_string()));
        assert!(args.contains(&"--disable-extensions".to_string()));
        assert!(args.contains(&"--lang=ru".to_string()));
        assert!(!args.iter().any(|a| a.starts_with("--headless")));
        assert_eq!(
            caps["goog:chromeOptions"]["excludeSwitches"],
            json!(["enable-automation"])
        );
        assert_eq!(caps["goog:chromeOptions"]["useAutomationExtension"], json!(false));
    }

    #[test]
    fn test_capabilities_headless() {
        let options = BrowserOptions {
            maximized: false,
            lang: "en".to_string(),
            ..BrowserOptions::default()
        }
        .headless(true);
        let args = chrome_args(&options.capabilities());

        assert!(args.contains(&"--headless=new".to_string()));
        assert!(args.contains(&"--lang=en".to_string()));
        assert!(!args.contains(&"--start-maximized".to_string()));
    }

    #[test]
    fn test_class_name_maps_to_css() {
        let locator = Locator::class_name("card");
        let selector = wire_selector(&locator);
        assert_eq!(selector, ".card");
        assert!(matches!(
            to_fantoccini(locator.strategy, &selector),
            fantoccini::Locator::Css(".card")
        ));

        let locator = Locator::xpath("//button");
        assert!(matches!(
            to_fantoccini(locator.strategy, &wire_selector(&locator)),
            fantoccini::Locator::XPath("//button")
        ));
    }
}
