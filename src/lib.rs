//! Page Harness - browser acceptance testing with page objects.
//!
//! This crate provides:
//! - A page-object layer with explicit waits over a remote browser session
//! - A WebDriver session backend and an in-memory mock browser
//! - Visual regression checks against reference screenshots
//! - A typed table of natural-language steps and a scenario runner
//! - Per-scenario session lifecycle with guaranteed teardown
//!
//! # Example
//!
//! ```rust,no_run
//! use page_harness::page::PageObject;
//! use page_harness::session::{BrowserOptions, WebDriverSession};
//!
//! let session = WebDriverSession::connect(&BrowserOptions::default()).unwrap();
//! let mut page = PageObject::new(Box::new(session));
//! page.open_page("https://example.com/", true, None).unwrap();
//! page.click_by_text("More information", Some("a")).unwrap();
//! page.quit().unwrap();
//! ```

pub mod artifacts;
pub mod config;
pub mod context;
pub mod logging;
pub mod page;
pub mod runner;
pub mod session;
pub mod steps;
pub mod visual;

// Re-export runner types
pub use runner::{Feature, RunResult, Runner, ScenarioResult, StepRecord, StepStatus, load_feature, parse_feature};

// Re-export the page-object layer
pub use page::{Condition, Locator, PageError, PageLoadReport, PageObject, PageResult, Strategy};

// Re-export sessions
pub use session::{BrowserOptions, BrowserSession, MockBrowser, SessionError, SessionResult, WebDriverSession};

// Re-export scenario context and steps
pub use context::{ScenarioContext, ScenarioSetup, SessionFactory, WebDriverFactory};
pub use steps::{Arg, StepError, StepResult, StepTable, standard_table};

// Re-export visual regression
pub use visual::{ComparisonReport, VisualComparator, VisualError, VisualResult};

// Re-export artifact management
pub use artifacts::{ArtifactDir, Attachment, Attachments};
