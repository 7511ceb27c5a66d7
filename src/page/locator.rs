//! Locators and the attribute/text locator builders.
//!
//! A [`Locator`] is an immutable `(strategy, selector)` pair. Scenarios talk
//! about visible text and semantic markup (`data-component`, `placeholder`)
//! rather than structural paths; the builders here turn those into CSS or
//! XPath queries.

use serde::{Deserialize, Serialize};

/// Attribute used by the `data-component` tagging convention
pub const DATA_COMPONENT_ATTR: &str = "data-component";

/// Lookup strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    Id,
    ClassName,
    TagName,
    Css,
    XPath,
}

impl Strategy {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Strategy::Id => "id",
            Strategy::ClassName => "class name",
            Strategy::TagName => "tag name",
            Strategy::Css => "css selector",
            Strategy::XPath => "xpath",
        }
    }
}

/// Identifies zero or more remote DOM nodes
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Locator {
    pub strategy: Strategy,
    pub selector: String,
}

impl Locator {
    pub fn new(strategy: Strategy, selector: impl Into<String>) -> Self {
        Self {
            strategy,
            selector: selector.into(),
        }
    }

    pub fn id(id: impl Into<String>) -> Self {
        Self::new(Strategy::Id, id)
    }

    pub fn class_name(class: impl Into<String>) -> Self {
        Self::new(Strategy::ClassName, class)
    }

    pub fn tag_name(tag: impl Into<String>) -> Self {
        Self::new(Strategy::TagName, tag)
    }

    pub fn css(selector: impl Into<String>) -> Self {
        Self::new(Strategy::Css, selector)
    }

    pub fn xpath(expr: impl Into<String>) -> Self {
        Self::new(Strategy::XPath, expr)
    }

    /// `tag[attr="value"]`; `tag` defaults to any element
    pub fn by_attribute(attr: &str, value: &str, tag: Option<&str>) -> Self {
        Self::css(format!(
            "{}[{}=\"{}\"]",
            tag.unwrap_or("*"),
            attr,
            css_escape(value)
        ))
    }

    /// Element whose own text contains `text`
    pub fn by_text(text: &str, tag: Option<&str>) -> Self {
        Self::xpath(format!(
            "//{}[contains(text(), {})]",
            tag.unwrap_or("*"),
            xpath_literal(text)
        ))
    }

    /// Element whose own text equals `text`
    pub fn by_exact_text(text: &str, tag: Option<&str>) -> Self {
        Self::xpath(format!(
            "//{}[text()={}]",
            tag.unwrap_or("*"),
            xpath_literal(text)
        ))
    }

    /// Text locator with selectable match mode
    pub fn text_match(text: &str, exact: bool) -> Self {
        if exact {
            Self::by_exact_text(text, None)
        } else {
            Self::by_text(text, None)
        }
    }

    /// `input` or `textarea` with the given placeholder
    pub fn by_placeholder(placeholder: &str) -> Self {
        Self::xpath(format!(
            "//*[@placeholder={} and (self::input or self::textarea)]",
            xpath_literal(placeholder)
        ))
    }

    pub fn by_data_component(name: &str) -> Self {
        Self::by_attribute(DATA_COMPONENT_ATTR, name, None)
    }
}

impl std::fmt::Display for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {:?})", self.strategy.as_str(), self.selector)
    }
}

/// Quote a string as an XPath literal.
///
/// XPath 1.0 has no escape sequences, so text containing both quote kinds
/// is assembled with `concat()`.
pub fn xpath_literal(text: &str) -> String {
    if !text.contains('\'') {
        format!("'{}'", text)
    } else if !text.contains('"') {
        format!("\"{}\"", text)
    } else {
        let parts: Vec<String> = text
            .split('\'')
            .map(|part| format!("'{}'", part))
            .collect();
        format!("concat({})", parts.join(", \"'\", "))
    }
}

/// Escape a value for use inside a double-quoted CSS attribute selector
pub fn css_escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        if ch == '"' || ch == '\\' {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_locator() {
        let loc = Locator::by_attribute("data-component", "login-button", None);
        assert_eq!(loc.strategy, Strategy::Css);
        assert_eq!(loc.selector, r#"*[data-component="login-button"]"#);

        let loc = Locator::by_attribute("name", "email", Some("input"));
        assert_eq!(loc.selector, r#"input[name="email"]"#);
    }

    #[test]
    fn test_data_component_matches_attribute_builder() {
        assert_eq!(
            Locator::by_data_component("menu"),
            Locator::by_attribute("data-component", "menu", None)
        );
    }

    #[test]
    fn test_text_locators() {
        assert_eq!(
            Locator::by_text("Sign in", None).selector,
            "//*[contains(text(), 'Sign in')]"
        );
        assert_eq!(
            Locator::by_text("Sign in", Some("button")).selector,
            "//button[contains(text(), 'Sign in')]"
        );
        assert_eq!(
            Locator::by_exact_text("OK", Some("span")).selector,
            "//span[text()='OK']"
        );
        assert_eq!(Locator::text_match("OK", true), Locator::by_exact_text("OK", None));
    }

    #[test]
    fn test_placeholder_locator() {
        assert_eq!(
            Locator::by_placeholder("Email").selector,
            "//*[@placeholder='Email' and (self::input or self::textarea)]"
        );
    }

    #[test]
    fn test_xpath_literal_quoting() {
        assert_eq!(xpath_literal("plain"), "'plain'");
        assert_eq!(xpath_literal("it's"), "\"it's\"");
        assert_eq!(
            xpath_literal(r#"say "it's""#),
            r#"concat('say "it', "'", 's"')"#
        );
    }

    #[test]
    fn test_css_escape() {
        assert_eq!(css_escape(r#"a"b\c"#), r#"a\"b\\c"#);
    }

    #[test]
    fn test_display() {
        let loc = Locator::id("submit");
        assert_eq!(loc.to_string(), "(id, \"submit\")");
    }
}
