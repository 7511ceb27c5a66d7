//! Built-in step definitions.

use tracing::warn;

use super::{Arg, Handler, StepError, StepResult};
use crate::context::ScenarioContext;

/// The standard vocabulary, in match-table order
pub const STANDARD_STEPS: &[(&str, Handler)] = &[
    ("open page {string}", open_page),
    ("the URL should be {string}", url_should_be),
    (
        "the user types {string} into the field with placeholder {string}",
        type_into_placeholder,
    ),
    (
        "the user types {string} into the field with data-component {string}",
        type_into_data_component,
    ),
    ("the user sees a title containing {string}", title_contains),
    ("the user clicks the text {string}", click_text),
    ("the user clicks the {string} with text {string}", click_tag_with_text),
    ("the user clicks the element with id {string}", click_id),
    ("the user clicks the element with class {string}", click_class),
    (
        "the user clicks the {ordinal} element with class {string}",
        click_nth_class,
    ),
    (
        "the user clicks the element with data-component {string}",
        click_data_component,
    ),
    ("the user expects a message with text {string}", expect_message),
    (
        "the user expects no element with text {string} on the page",
        expect_no_text,
    ),
    ("the screenshot should match {string} within {float}", screenshot_matches),
    ("the page should be fully loaded", page_fully_loaded),
];

fn arg(args: &[Arg], index: usize) -> StepResult<&Arg> {
    args.get(index)
        .ok_or_else(|| StepError::BadArgument(format!("missing argument #{}", index + 1)))
}

fn text_arg(args: &[Arg], index: usize) -> StepResult<&str> {
    arg(args, index)?.as_str()
}

fn open_page(ctx: &mut ScenarioContext, args: &[Arg]) -> StepResult<()> {
    let url = text_arg(args, 0)?;
    ctx.page().open_page(url, true, None)?;
    Ok(())
}

fn url_should_be(ctx: &mut ScenarioContext, args: &[Arg]) -> StepResult<()> {
    let expected = text_arg(args, 0)?;
    let actual = ctx.page().current_url()?;
    if actual != expected {
        return Err(StepError::Assertion(format!(
            "expected URL {}, got {}",
            expected, actual
        )));
    }
    Ok(())
}

fn type_into_placeholder(ctx: &mut ScenarioContext, args: &[Arg]) -> StepResult<()> {
    let text = text_arg(args, 0)?;
    let placeholder = text_arg(args, 1)?;
    ctx.page().enter_text_to_placeholder(placeholder, text)?;
    Ok(())
}

/// Failures become assertions with a screenshot of the form
fn type_into_data_component(ctx: &mut ScenarioContext, args: &[Arg]) -> StepResult<()> {
    let text = text_arg(args, 0)?;
    let component = text_arg(args, 1)?;
    let page = ctx.page();

    if let Err(err) = page.enter_text_to_data_component(component, text) {
        warn!("typing into data-component '{}' failed: {}", component, err);
        page.attach_screenshot(&format!("enter_text_failed_{}", component));
        return Err(StepError::Assertion(format!(
            "could not type into the field with data-component '{}': {}",
            component, err
        )));
    }
    Ok(())
}

fn title_contains(ctx: &mut ScenarioContext, args: &[Arg]) -> StepResult<()> {
    let text = text_arg(args, 0)?;
    ctx.page().check_title_contains(text)?;
    Ok(())
}

fn click_text(ctx: &mut ScenarioContext, args: &[Arg]) -> StepResult<()> {
    let text = text_arg(args, 0)?;
    ctx.page().click_by_text(text, None)?;
    Ok(())
}

fn click_tag_with_text(ctx: &mut ScenarioContext, args: &[Arg]) -> StepResult<()> {
    let tag = text_arg(args, 0)?.to_lowercase();
    let text = text_arg(args, 1)?;
    ctx.page().click_by_text(text, Some(&tag))?;
    Ok(())
}

fn click_id(ctx: &mut ScenarioContext, args: &[Arg]) -> StepResult<()> {
    let id = text_arg(args, 0)?;
    ctx.page().click_by_id(id)?;
    Ok(())
}

fn click_class(ctx: &mut ScenarioContext, args: &[Arg]) -> StepResult<()> {
    let class = text_arg(args, 0)?;
    ctx.page().click_by_class(class, 0)?;
    Ok(())
}

/// Ordinals are one-based in scenario text
fn click_nth_class(ctx: &mut ScenarioContext, args: &[Arg]) -> StepResult<()> {
    let n = arg(args, 0)?.as_int()?;
    let class = text_arg(args, 1)?;
    let index = usize::try_from(n)
        .ok()
        .and_then(|n| n.checked_sub(1))
        .ok_or_else(|| StepError::BadArgument(format!("ordinal must be 1 or more, got {}", n)))?;
    ctx.page().click_by_class(class, index)?;
    Ok(())
}

fn click_data_component(ctx: &mut ScenarioContext, args: &[Arg]) -> StepResult<()> {
    let component = text_arg(args, 0)?;
    ctx.page().click_by_data_component(component)?;
    Ok(())
}

fn expect_message(ctx: &mut ScenarioContext, args: &[Arg]) -> StepResult<()> {
    let text = text_arg(args, 0)?;
    let page = ctx.page();
    if page.is_text_present(text, false, None) {
        return Ok(());
    }
    let url = page
        .current_url()
        .unwrap_or_else(|_| "<unknown>".to_string());
    Err(StepError::Assertion(format!(
        "text '{}' not found on {}",
        text, url
    )))
}

fn expect_no_text(ctx: &mut ScenarioContext, args: &[Arg]) -> StepResult<()> {
    let text = text_arg(args, 0)?;
    if ctx.page().is_text_not_present(text, false, None) {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "text '{}' is present on the page",
            text
        )))
    }
}

fn screenshot_matches(ctx: &mut ScenarioContext, args: &[Arg]) -> StepResult<()> {
    let name = text_arg(args, 0)?;
    let tolerance = arg(args, 1)?.as_float()?;
    let report = ctx.page().compare_screenshot(name, tolerance)?;
    if report.passed {
        return Ok(());
    }
    let diff = report
        .diff_path
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_default();
    Err(StepError::Assertion(format!(
        "screenshot '{}' differs in {:.2}% of pixels (tolerance {:.2}%), diff: {}",
        name,
        report.ratio * 100.0,
        tolerance * 100.0,
        diff
    )))
}

fn page_fully_loaded(ctx: &mut ScenarioContext, _args: &[Arg]) -> StepResult<()> {
    ctx.page().wait_for_full_page_load()?;
    Ok(())
}
