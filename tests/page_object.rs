//! Integration tests for the page-object layer against the mock browser

use std::fs;
use std::time::Duration;

use page_harness::artifacts::Attachments;
use page_harness::config::WaitSettings;
use page_harness::page::{Condition, Locator, PageError, PageObject};
use page_harness::session::mock::{MockBrowser, MockElement, MockPage};
use page_harness::session::SessionError;

const LOGIN_URL: &str = "https://example.test/login";
const HOME_URL: &str = "https://example.test/home";

fn quick_waits() -> WaitSettings {
    WaitSettings {
        explicit_wait: 1,
        poll_interval_ms: 10,
        landmark_timeout_ms: 20,
        stability_interval_ms: 5,
    }
}

fn page_for(browser: &MockBrowser) -> PageObject {
    PageObject::new(Box::new(browser.clone())).with_waits(quick_waits())
}

fn short() -> Option<Duration> {
    Some(Duration::from_millis(100))
}

fn login_site() -> MockBrowser {
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
            MockPage::new("Dashboard").element(MockElement::new("p").text("Welcome, alice")),
        )
}

#[test]
fn test_login_flow() {
    let browser = login_site();
    let mut page = page_for(&browser);

    page.open_page(LOGIN_URL, true, None).unwrap();
    page.enter_text_to_placeholder("Email", "alice").unwrap();
    page.enter_text_to_data_component("password", "secret").unwrap();

    let email = browser.element(&Locator::by_placeholder("Email")).unwrap();
    assert_eq!(email.value, "alice");
    assert_eq!(email.clears, 1, "text entry clears the field first");
    assert_eq!(email.key_events, vec!["alice".to_string()]);
    let password = browser.element(&Locator::by_data_component("password")).unwrap();
    assert_eq!(password.value, "secret");

    page.click_by_text("Sign in", Some("button")).unwrap();
    assert!(page.is_text_present("Welcome", false, None));
    assert_eq!(page.current_url().unwrap(), HOME_URL);
    page.check_title_contains("Dash").unwrap();

    page.quit().unwrap();
    assert!(browser.is_closed());
}

#[test]
fn test_stale_click_is_retried_once() {
    let browser = MockBrowser::new().with_current_page(
        LOGIN_URL,
        MockPage::new("Form").element(MockElement::new("button").id("save").stale_on_click(1)),
    );
    let mut page = page_for(&browser);

    page.click_by_id("save").unwrap();
    assert_eq!(browser.element(&Locator::id("save")).unwrap().clicks, 1);
}

#[test]
fn test_second_staleness_propagates() {
    let browser = MockBrowser::new().with_current_page(
        LOGIN_URL,
        MockPage::new("Form").element(MockElement::new("button").id("save").stale_on_click(2)),
    );
    let mut page = page_for(&browser);

    let err = page.click_by_id("save").unwrap_err();
    assert!(matches!(err, PageError::Session(SessionError::StaleElement(_))));
    assert_eq!(browser.element(&Locator::id("save")).unwrap().clicks, 0);
}

#[test]
fn test_element_appearing_late_is_found() {
    let browser = MockBrowser::new().with_current_page(
        LOGIN_URL,
        MockPage::new("Slow").element(MockElement::new("div").id("toast").text("Saved").appears_after(3)),
    );
    let mut page = page_for(&browser);

    page.wait_and_find_element(&Locator::id("toast"), None).unwrap();
    assert!(browser.element(&Locator::id("toast")).unwrap().lookups >= 4);
}

#[test]
fn test_timeout_reports_locator_and_condition() {
    let browser = MockBrowser::new().with_current_page(
        LOGIN_URL,
        MockPage::new("Form").element(MockElement::new("button").id("send").disabled()),
    );
    let mut page = page_for(&browser);

    // Visible but not enabled
    assert!(page.is_element_visible(&Locator::id("send"), short()));
    let err = page.click_element(&Locator::id("send"), short()).unwrap_err();
    match err {
        PageError::Timeout {
            locator,
            condition,
            elapsed,
        } => {
            assert_eq!(locator, Locator::id("send"));
            assert_eq!(condition, Condition::Clickable);
            assert!(elapsed >= Duration::from_millis(100));
        }
        other => panic!("expected timeout, got {:?}", other),
    }
}

#[test]
fn test_text_presence_checks_are_negations() {
    let dir = tempfile::tempdir().unwrap();
    let browser = MockBrowser::new().with_current_page(
        LOGIN_URL,
        MockPage::new("Messages").element(MockElement::new("span").text("Saved successfully")),
    );
    let mut page = page_for(&browser).with_attachments(Attachments::in_dir(dir.path()));

    assert!(page.is_text_present("Saved", false, short()));
    assert!(!page.is_text_not_present("Saved", false, short()));

    assert!(!page.is_text_present("Error", false, short()));
    assert!(page.is_text_not_present("Error", false, short()));

    // Exact matching does not accept a substring
    assert!(!page.is_text_present("Saved", true, short()));

    let names: Vec<&str> = page.attachments().entries().iter().map(|a| a.name.as_str()).collect();
    assert!(names.contains(&"text_not_found_Error"));
    assert!(dir.path().join("text_not_found_Error.png").exists());
}

#[test]
fn test_click_by_class_counts_visible_matches() {
    let browser = MockBrowser::new().with_current_page(
        LOGIN_URL,
        MockPage::new("Cards")
            .element(MockElement::new("div").class("card").text("hidden").hidden())
            .element(MockElement::new("div").class("card").text("first"))
            .element(MockElement::new("div").class("card").text("second")),
    );
    let mut page = page_for(&browser);

    page.click_by_class("card", 1).unwrap();
    assert_eq!(browser.element(&Locator::by_exact_text("second", None)).unwrap().clicks, 1);
    assert_eq!(browser.element(&Locator::by_exact_text("first", None)).unwrap().clicks, 0);
}

#[test]
fn test_open_page_verifies_url() {
    let browser = MockBrowser::new().with_page(
        LOGIN_URL,
        MockPage::new("Moved").redirect_to(HOME_URL),
    );
    let mut page = page_for(&browser);

    page.open_page(LOGIN_URL, false, None).unwrap();
    let err = page.open_page(LOGIN_URL, true, None).unwrap_err();
    assert!(matches!(err, PageError::Assertion(msg) if msg.contains(HOME_URL)));
}

#[test]
fn test_open_page_waits_for_ready_state() {
    let browser = MockBrowser::new().with_page(
        LOGIN_URL,
        MockPage::new("Loading").ready_states(&["loading", "interactive", "complete"]),
    );
    let mut page = page_for(&browser);
    page.open_page(LOGIN_URL, true, None).unwrap();

    let stuck = MockBrowser::new().with_page(LOGIN_URL, MockPage::new("Stuck").ready_states(&["loading"]));
    let err = page_for(&stuck).open_page(LOGIN_URL, true, short()).unwrap_err();
    assert!(matches!(err, PageError::Load(_)));
}

#[test]
fn test_invisible_condition() {
    let browser = MockBrowser::new().with_current_page(
        LOGIN_URL,
        MockPage::new("Modal")
            .element(MockElement::new("div").id("spinner").hidden())
            .element(MockElement::new("div").id("dialog")),
    );
    let mut page = page_for(&browser);

    assert!(page.is_element_not_visible(&Locator::id("spinner"), short()));
    assert!(page.is_element_not_visible(&Locator::id("nothing"), short()));
    assert!(!page.is_element_not_visible(&Locator::id("dialog"), short()));
}

#[test]
fn test_drag_and_drop() {
    let browser = MockBrowser::new().with_current_page(
        LOGIN_URL,
        MockPage::new("Board")
            .element(MockElement::new("li").id("task").text("Write tests"))
            .element(MockElement::new("ul").id("done").text("Done")),
    );
    let mut page = page_for(&browser);

    page.drag_and_drop(&Locator::id("task"), &Locator::id("done")).unwrap();
    assert_eq!(
        browser.drags(),
        vec![("Write tests".to_string(), "Done".to_string())]
    );
}

#[test]
fn test_upload_file_sends_absolute_path() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("avatar.png");
    fs::write(&file, b"png").unwrap();

    let browser = MockBrowser::new().with_current_page(
        LOGIN_URL,
        MockPage::new("Upload").element(MockElement::new("input").attr("type", "file").hidden()),
    );
    let mut page = page_for(&browser);
    let input = Locator::by_attribute("type", "file", Some("input"));

    page.upload_file(&input, &file).unwrap();
    let expected = fs::canonicalize(&file).unwrap();
    assert_eq!(browser.element(&input).unwrap().value, expected.to_string_lossy());
}

#[test]
fn test_download_file_returns_completed_file() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("report.pdf"), b"%PDF").unwrap();
    fs::write(dir.path().join("next.pdf.crdownload"), b"partial").unwrap();

    let browser = MockBrowser::new().with_current_page(
        LOGIN_URL,
        MockPage::new("Reports").element(MockElement::new("a").text("Download report")),
    );
    let mut page = page_for(&browser);

    let path = page
        .download_file(&Locator::by_text("Download", Some("a")), dir.path(), Duration::ZERO)
        .unwrap();
    assert_eq!(path.file_name().unwrap(), "report.pdf");

    let empty = tempfile::tempdir().unwrap();
    let err = page
        .download_file(&Locator::by_text("Download", Some("a")), empty.path(), Duration::ZERO)
        .unwrap_err();
    assert!(matches!(err, PageError::Assertion(_)));
}

#[test]
fn test_attribute_and_exact_text_helpers() {
    let browser = MockBrowser::new().with_current_page(
        LOGIN_URL,
        MockPage::new("Search")
            .element(MockElement::new("input").attr("name", "q"))
            .element(MockElement::new("button").attr("type", "submit").text("Go"))
            .element(MockElement::new("a").text("Go back"))
            .element(MockElement::new("li").class("result").text("one"))
            .element(MockElement::new("li").class("result").text("two")),
    );
    let mut page = page_for(&browser);

    page.enter_text_by_attribute("name", "q", "rust", None).unwrap();
    assert_eq!(browser.element(&Locator::by_attribute("name", "q", None)).unwrap().value, "rust");

    page.click_by_attribute("type", "submit", Some("button")).unwrap();
    assert_eq!(browser.element(&Locator::by_text("Go", Some("button"))).unwrap().clicks, 1);

    // Exact text skips "Go back"
    page.click_by_exact_text("Go", None).unwrap();
    assert_eq!(browser.element(&Locator::by_text("Go", Some("button"))).unwrap().clicks, 2);
    assert_eq!(browser.element(&Locator::by_text("Go back", Some("a"))).unwrap().clicks, 0);

    let results = page
        .wait_and_find_elements(&Locator::class_name("result"), None)
        .unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(page.title().unwrap(), "Search");
}

#[test]
fn test_click_by_class_retries_stale_once() {
    let browser = MockBrowser::new().with_current_page(
        LOGIN_URL,
        MockPage::new("Cards").element(MockElement::new("div").class("card").text("only").stale_on_click(1)),
    );
    let mut page = page_for(&browser);

    page.click_by_class("card", 0).unwrap();
    assert_eq!(browser.element(&Locator::class_name("card")).unwrap().clicks, 1);

    let twice = MockBrowser::new().with_current_page(
        LOGIN_URL,
        MockPage::new("Cards").element(MockElement::new("div").class("card").stale_on_click(2)),
    );
    let err = page_for(&twice).click_by_class("card", 0).unwrap_err();
    assert!(matches!(err, PageError::Session(SessionError::StaleElement(_))));
}

#[test]
fn test_click_by_class_waits_for_enabled() {
    let browser = MockBrowser::new().with_current_page(
        LOGIN_URL,
        MockPage::new("Cards")
            .element(MockElement::new("button").class("action").text("first"))
            .element(MockElement::new("button").class("action").text("second").disabled()),
    );
    let mut page = page_for(&browser).with_waits(WaitSettings {
        explicit_wait: 0,
        ..quick_waits()
    });

    let err = page.click_by_class("action", 1).unwrap_err();
    assert!(matches!(
        err,
        PageError::Timeout {
            condition: Condition::Clickable,
            ..
        }
    ));
    assert_eq!(browser.element(&Locator::by_exact_text("second", None)).unwrap().clicks, 0);
}
