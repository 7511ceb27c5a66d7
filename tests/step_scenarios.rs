//! End-to-end scenario runs through the standard step table on mock browsers

use std::cell::RefCell;

use page_harness::artifacts::Attachments;
use page_harness::config::WaitSettings;
use page_harness::context::ScenarioSetup;
use page_harness::page::Locator;
use page_harness::runner::{Runner, StepStatus, parse_feature};
use page_harness::session::mock::{MockBrowser, MockElement, MockPage};
use page_harness::session::{BrowserSession, SessionError, SessionResult};
use page_harness::steps::standard_table;
use page_harness::visual::VisualComparator;

const LOGIN_URL: &str = "https://example.test/login";
const HOME_URL: &str = "https://example.test/home";

fn site() -> MockBrowser {
    MockBrowser::new()
        .with_page(
            LOGIN_URL,
            MockPage::new("Sign in")
                .element(MockElement::new("input").attr("placeholder", "Email"))
                .element(MockElement::new("input").attr("data-component", "password"))
                .element(MockElement::new("button").text("Sign in").navigates_to(HOME_URL)),
        )
        .with_page(
            HOME_URL,
            MockPage::new("Dashboard")
                .element(MockElement::new("header").text("Acme"))
                .element(MockElement::new("p").text("Welcome, alice"))
                .element(MockElement::new("div").class("tile").text("Orders"))
                .element(MockElement::new("div").class("tile").text("Invoices")),
        )
}

fn setup(dir: &tempfile::TempDir) -> ScenarioSetup {
    ScenarioSetup {
        waits: WaitSettings {
            explicit_wait: 1,
            poll_interval_ms: 10,
            landmark_timeout_ms: 20,
            stability_interval_ms: 5,
        },
        comparator: VisualComparator::new(dir.path().join("reference"), dir.path().join("diff")),
        attachments: Attachments::discard(),
    }
}

/// Hands out a fresh site per scenario and remembers each one
struct Sites {
    opened: RefCell<Vec<MockBrowser>>,
}

impl Sites {
    fn new() -> Self {
        Self {
            opened: RefCell::new(Vec::new()),
        }
    }

    fn factory(&self) -> impl Fn() -> SessionResult<Box<dyn BrowserSession>> + '_ {
        move || {
            let browser = site();
            self.opened.borrow_mut().push(browser.clone());
            let session: Box<dyn BrowserSession> = Box::new(browser);
            Ok(session)
        }
    }
}

const LOGIN_FEATURE: &str = r#"
Feature: Sign in

  Background:
    Given open page "https://example.test/login"

  Scenario: Successful sign in
    When the user types "alice" into the field with placeholder "Email"
    And the user types "secret" into the field with data-component "password"
    And the user clicks the "Button" with text "Sign in"
    Then the URL should be "https://example.test/home"
    And the user expects a message with text "Welcome"
    And the user sees a title containing "Dash"
    And the user expects no element with text "Error" on the page
    And the user clicks the 2nd element with class "tile"
    And the page should be fully loaded
"#;

#[test]
fn test_login_feature_passes() {
    let dir = tempfile::tempdir().unwrap();
    let sites = Sites::new();
    let factory = sites.factory();
    let runner = Runner::new(standard_table().unwrap(), &factory, setup(&dir));

    let result = runner.run_feature(&parse_feature(LOGIN_FEATURE).unwrap());
    assert!(result.success, "{:#?}", result);
    assert_eq!(result.passed(), 1);

    let scenario = &result.scenarios[0];
    assert_eq!(scenario.steps.len(), 10);
    assert!(scenario.steps.iter().all(|s| s.status == StepStatus::Passed));

    let opened = sites.opened.borrow();
    assert_eq!(opened.len(), 1);
    let browser = &opened[0];
    assert_eq!(browser.quit_calls(), 1);
    assert_eq!(
        browser.navigations(),
        vec![LOGIN_URL.to_string(), HOME_URL.to_string()]
    );

    let invoices = browser.element(&Locator::by_exact_text("Invoices", None)).unwrap();
    assert_eq!(invoices.clicks, 1);
}

const VISUAL_FEATURE: &str = r#"
Feature: Visual baseline

  Scenario: First run creates the baseline
    Given open page "https://example.test/home"
    Then the screenshot should match "dashboard" within 0.0
    And the user expects a message with text "Welcome"

  Scenario: Second run compares against it
    Given open page "https://example.test/home"
    Then the screenshot should match "dashboard" within 0.0
"#;

#[test]
fn test_missing_reference_fails_then_passes() {
    let dir = tempfile::tempdir().unwrap();
    let sites = Sites::new();
    let factory = sites.factory();
    let runner = Runner::new(standard_table().unwrap(), &factory, setup(&dir))
        .attachment_dir(dir.path().join("attachments"));

    let result = runner.run_feature(&parse_feature(VISUAL_FEATURE).unwrap());
    assert!(!result.success);
    assert_eq!(result.failed(), 1);

    let first = &result.scenarios[0];
    assert!(!first.success);
    let statuses: Vec<StepStatus> = first.steps.iter().map(|s| s.status).collect();
    assert_eq!(
        statuses,
        vec![StepStatus::Passed, StepStatus::Failed, StepStatus::Skipped]
    );
    assert!(first.steps[1].error.as_deref().unwrap().contains("rerun required"));
    assert!(dir.path().join("reference").join("dashboard.png").exists());

    // The failing step leaves a screenshot behind
    assert_eq!(first.attachments.len(), 1);
    assert_eq!(first.attachments[0].name, "step_failed_line_6");
    assert!(first.attachments[0].path.exists());

    assert!(result.scenarios[1].success);
    assert_eq!(sites.opened.borrow().len(), 2);
}

#[test]
fn test_undefined_step_fails_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let sites = Sites::new();
    let factory = sites.factory();
    let runner = Runner::new(standard_table().unwrap(), &factory, setup(&dir));

    let feature = parse_feature(
        "Feature: Unknown\n  Scenario: Typo\n    Given the moon is made of cheese\n    Then the page should be fully loaded\n",
    )
    .unwrap();
    let result = runner.run_feature(&feature);

    let scenario = &result.scenarios[0];
    assert!(!scenario.success);
    assert_eq!(scenario.steps[0].status, StepStatus::Failed);
    assert!(
        scenario.steps[0]
            .error
            .as_deref()
            .unwrap()
            .starts_with("undefined step")
    );
    assert_eq!(scenario.steps[1].status, StepStatus::Skipped);
    assert_eq!(sites.opened.borrow()[0].quit_calls(), 1);
}

#[test]
fn test_failed_assertion_names_the_url() {
    let dir = tempfile::tempdir().unwrap();
    let sites = Sites::new();
    let factory = sites.factory();
    let runner = Runner::new(standard_table().unwrap(), &factory, setup(&dir));

    let feature = parse_feature(
        "Feature: Messages\n  Scenario: Missing\n    Given open page \"https://example.test/login\"\n    Then the user expects a message with text \"Welcome\"\n",
    )
    .unwrap();
    let result = runner.run_feature(&feature);

    let error = result.scenarios[0].steps[1].error.clone().unwrap();
    assert!(error.contains("Welcome"));
    assert!(error.contains(LOGIN_URL));
}

#[test]
fn test_session_start_failure_skips_every_step() {
    let dir = tempfile::tempdir().unwrap();
    let factory = || -> SessionResult<Box<dyn BrowserSession>> {
        Err(SessionError::Connection("connection refused".into()))
    };
    let runner = Runner::new(standard_table().unwrap(), &factory, setup(&dir));

    let feature = parse_feature(LOGIN_FEATURE).unwrap();
    let result = runner.run_feature(&feature);

    let scenario = &result.scenarios[0];
    assert!(!scenario.success);
    assert!(scenario.error.as_deref().unwrap().contains("connection refused"));
    assert!(scenario.steps.iter().all(|s| s.status == StepStatus::Skipped));
}

#[test]
fn test_failed_typing_attaches_field_screenshot() {
    let dir = tempfile::tempdir().unwrap();
    let sites = Sites::new();
    let factory = sites.factory();
    let runner = Runner::new(standard_table().unwrap(), &factory, setup(&dir))
        .attachment_dir(dir.path().join("attachments"));

    let feature = parse_feature(
        "Feature: Typing\n  Scenario: Unknown field\n    Given open page \"https://example.test/login\"\n    When the user types \"x\" into the field with data-component \"otp\"\n",
    )
    .unwrap();
    let result = runner.run_feature(&feature);

    let scenario = &result.scenarios[0];
    assert_eq!(scenario.steps[1].status, StepStatus::Failed);
    assert!(scenario.steps[1].error.as_deref().unwrap().contains("otp"));

    let names: Vec<&str> = scenario.attachments.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, vec!["enter_text_failed_otp", "step_failed_line_4"]);
    assert!(scenario.attachments.iter().all(|a| a.path.exists()));
}
