//! Typed step table.
//!
//! A step is a sentence pattern with typed placeholders bound to a handler:
//!
//! | Placeholder | Matches | Argument |
//! |---|---|---|
//! | `{string}` | `"..."` | [`Arg::Str`] without the quotes |
//! | `{int}` | `-12` | [`Arg::Int`] |
//! | `{float}` | `0.05` | [`Arg::Float`] |
//! | `{ordinal}` | `2nd` | [`Arg::Int`] |
//!
//! Patterns are compiled to anchored regexes once. Gherkin keywords are
//! stripped before matching, so `Given`/`When`/`Then` are interchangeable.
//! A sentence must match exactly one pattern.

pub mod definitions;

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;
use tracing::debug;

use crate::context::ScenarioContext;
use crate::page::PageError;
use crate::visual::VisualError;

/// Result type for step execution
pub type StepResult<T> = Result<T, StepError>;

/// Step handler: the scenario context and the typed captures, in order
pub type Handler = fn(&mut ScenarioContext, &[Arg]) -> StepResult<()>;

/// Keywords that may open a step line
pub const KEYWORDS: &[&str] = &["Given", "When", "Then", "And", "But", "*"];

#[derive(Debug, Error)]
pub enum StepError {
    #[error("undefined step: {0}")]
    Undefined(String),

    #[error("ambiguous step '{step}', matches: {}", patterns.join(" | "))]
    Ambiguous { step: String, patterns: Vec<String> },

    #[error("bad argument: {0}")]
    BadArgument(String),

    #[error("assertion failed: {0}")]
    Assertion(String),

    #[error("invalid step pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error(transparent)]
    Page(#[from] PageError),

    #[error(transparent)]
    Visual(#[from] VisualError),
}

/// A typed capture
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    Str(String),
    Int(i64),
    Float(f64),
}

impl Arg {
    pub fn as_str(&self) -> StepResult<&str> {
        match self {
            Arg::Str(s) => Ok(s),
            other => Err(StepError::BadArgument(format!("expected string, got {:?}", other))),
        }
    }

    pub fn as_int(&self) -> StepResult<i64> {
        match self {
            Arg::Int(n) => Ok(*n),
            other => Err(StepError::BadArgument(format!("expected integer, got {:?}", other))),
        }
    }

    /// Floats also accept integer captures
    pub fn as_float(&self) -> StepResult<f64> {
        match self {
            Arg::Float(f) => Ok(*f),
            Arg::Int(n) => Ok(*n as f64),
            other => Err(StepError::BadArgument(format!("expected number, got {:?}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placeholder {
    String,
    Int,
    Float,
    Ordinal,
}

impl Placeholder {
    const ALL: [(&'static str, Placeholder); 4] = [
        ("{string}", Placeholder::String),
        ("{int}", Placeholder::Int),
        ("{float}", Placeholder::Float),
        ("{ordinal}", Placeholder::Ordinal),
    ];

    fn regex(self) -> &'static str {
        match self {
            Placeholder::String => r#""([^"]*)""#,
            Placeholder::Int => r"(-?\d+)",
            Placeholder::Float => r"(-?\d+(?:\.\d+)?)",
            Placeholder::Ordinal => r"(\d+)(?:st|nd|rd|th)?",
        }
    }

    fn parse(self, raw: &str) -> StepResult<Arg> {
        let bad = || StepError::BadArgument(format!("'{}' is not a valid {:?}", raw, self));
        match self {
            Placeholder::String => Ok(Arg::Str(raw.to_string())),
            Placeholder::Int | Placeholder::Ordinal => raw.parse().map(Arg::Int).map_err(|_| bad()),
            Placeholder::Float => raw.parse().map(Arg::Float).map_err(|_| bad()),
        }
    }
}

/// One compiled step pattern
#[derive(Clone)]
pub struct StepDefinition {
    pub pattern: &'static str,
    regex: Regex,
    placeholders: Vec<Placeholder>,
    handler: Handler,
}

impl StepDefinition {
    pub fn new(pattern: &'static str, handler: Handler) -> StepResult<Self> {
        let mut source = String::from("^");
        let mut placeholders = Vec::new();
        let mut rest = pattern;

        while let Some((offset, name, kind)) = next_placeholder(rest) {
            source.push_str(&regex::escape(&rest[..offset]));
            source.push_str(kind.regex());
            placeholders.push(kind);
            rest = &rest[offset + name.len()..];
        }
        source.push_str(&regex::escape(rest));
        source.push('$');

        let regex = Regex::new(&source).map_err(|err| StepError::InvalidPattern {
            pattern: pattern.to_string(),
            message: err.to_string(),
        })?;
        Ok(Self {
            pattern,
            regex,
            placeholders,
            handler,
        })
    }

    /// Typed captures if `sentence` matches; `None` otherwise
    fn captures(&self, sentence: &str) -> Option<StepResult<Vec<Arg>>> {
        let caps = self.regex.captures(sentence)?;
        let args = self
            .placeholders
            .iter()
            .enumerate()
            .map(|(i, kind)| {
                let raw = caps.get(i + 1).map(|m| m.as_str()).unwrap_or_default();
                kind.parse(raw)
            })
            .collect();
        Some(args)
    }
}

impl std::fmt::Debug for StepDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepDefinition")
            .field("pattern", &self.pattern)
            .field("placeholders", &self.placeholders)
            .finish()
    }
}

fn next_placeholder(text: &str) -> Option<(usize, &'static str, Placeholder)> {
    Placeholder::ALL
        .iter()
        .filter_map(|(name, kind)| text.find(name).map(|offset| (offset, *name, *kind)))
        .min_by_key(|(offset, _, _)| *offset)
}

/// Strip a leading Gherkin keyword
pub fn strip_keyword(line: &str) -> &str {
    let line = line.trim();
    for keyword in KEYWORDS {
        if let Some(rest) = line.strip_prefix(keyword) {
            if rest.starts_with(char::is_whitespace) {
                return rest.trim_start();
            }
        }
    }
    line
}

/// A matched step ready to run
#[derive(Debug)]
pub struct StepMatch<'a> {
    pub definition: &'a StepDefinition,
    pub args: Vec<Arg>,
}

/// Closed set of step definitions
#[derive(Debug, Clone, Default)]
pub struct StepTable {
    steps: Vec<StepDefinition>,
}

impl StepTable {
    /// The built-in step vocabulary
    pub fn standard() -> StepResult<Self> {
        let mut table = Self::default();
        for (pattern, handler) in definitions::STANDARD_STEPS {
            table.add(*pattern, *handler)?;
        }
        Ok(table)
    }

    pub fn add(&mut self, pattern: &'static str, handler: Handler) -> StepResult<()> {
        self.steps.push(StepDefinition::new(pattern, handler)?);
        Ok(())
    }

    pub fn patterns(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.steps.iter().map(|s| s.pattern)
    }

    /// Resolve a step line to exactly one definition
    pub fn find(&self, line: &str) -> StepResult<StepMatch<'_>> {
        let sentence = strip_keyword(line);
        let mut matches = self
            .steps
            .iter()
            .filter_map(|def| def.captures(sentence).map(|args| (def, args)));

        let Some((definition, args)) = matches.next() else {
            return Err(StepError::Undefined(sentence.to_string()));
        };
        let others: Vec<_> = matches.map(|(def, _)| def.pattern.to_string()).collect();
        if !others.is_empty() {
            let mut patterns = vec![definition.pattern.to_string()];
            patterns.extend(others);
            return Err(StepError::Ambiguous {
                step: sentence.to_string(),
                patterns,
            });
        }
        Ok(StepMatch {
            definition,
            args: args?,
        })
    }

    /// Find and execute the step for `line`
    pub fn run(&self, ctx: &mut ScenarioContext, line: &str) -> StepResult<()> {
        let step = self.find(line)?;
        debug!(pattern = step.definition.pattern, args = ?step.args, "running step");
        (step.definition.handler)(ctx, &step.args)
    }
}

static STANDARD_TABLE: Lazy<StepResult<StepTable>> = Lazy::new(StepTable::standard);

/// The built-in step table, compiled on first use
pub fn standard_table() -> StepResult<&'static StepTable> {
    STANDARD_TABLE.as_ref().map_err(|err| match err {
        StepError::InvalidPattern { pattern, message } => StepError::InvalidPattern {
            pattern: pattern.clone(),
            message: message.clone(),
        },
        other => StepError::InvalidPattern {
            pattern: String::new(),
            message: other.to_string(),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn noop(_: &mut ScenarioContext, _: &[Arg]) -> StepResult<()> {
        Ok(())
    }

    #[test]
    fn test_keyword_stripping() {
        assert_eq!(strip_keyword("Given open page \"x\""), "open page \"x\"");
        assert_eq!(strip_keyword("  And the page should be fully loaded"), "the page should be fully loaded");
        assert_eq!(strip_keyword("* the URL should be \"y\""), "the URL should be \"y\"");
        assert_eq!(strip_keyword("Andrew clicks"), "Andrew clicks");
    }

    #[test]
    fn test_typed_captures() {
        let def = StepDefinition::new("the {ordinal} item costs {float} times {int} in {string}", noop).unwrap();
        let args = def.captures("the 3rd item costs 0.25 times -2 in \"EUR\"").unwrap().unwrap();
        assert_eq!(
            args,
            vec![Arg::Int(3), Arg::Float(0.25), Arg::Int(-2), Arg::Str("EUR".into())]
        );
        assert!(def.captures("the third item costs 1 times 2 in \"EUR\"").is_none());
    }

    #[test]
    fn test_literal_text_is_escaped() {
        let def = StepDefinition::new("price is (approx.) {int}", noop).unwrap();
        assert!(def.captures("price is (approx.) 5").is_some());
        assert!(def.captures("price is Xapprox.) 5").is_none());
    }

    #[test]
    fn test_undefined_and_ambiguous() {
        let mut table = StepTable::default();
        table.add("the user clicks {string}", noop).unwrap();
        table.add("the user clicks \"ok\"", noop).unwrap();

        assert!(matches!(table.find("When the user waves"), Err(StepError::Undefined(s)) if s == "the user waves"));
        match table.find("When the user clicks \"ok\"") {
            Err(StepError::Ambiguous { patterns, .. }) => assert_eq!(patterns.len(), 2),
            other => panic!("expected ambiguity, got {:?}", other.map(|m| m.definition.pattern)),
        }
    }

    #[test]
    fn test_standard_vocabulary_is_unambiguous() {
        let table = standard_table().unwrap();
        let samples = [
            "Given open page \"https://example.test/login\"",
            "Then the URL should be \"https://example.test/\"",
            "When the user types \"alice\" into the field with placeholder \"Email\"",
            "When the user types \"secret\" into the field with data-component \"password\"",
            "Then the user sees a title containing \"Dashboard\"",
            "When the user clicks the text \"Sign in\"",
            "When the user clicks the \"Button\" with text \"Sign in\"",
            "When the user clicks the element with id \"submit\"",
            "When the user clicks the element with class \"card\"",
            "When the user clicks the 2nd element with class \"card\"",
            "When the user clicks the element with data-component \"menu\"",
            "Then the user expects a message with text \"Welcome\"",
            "Then the user expects no element with text \"Error\" on the page",
            "Then the screenshot should match \"home\" within 0.05",
            "Then the page should be fully loaded",
        ];
        for sample in samples {
            assert!(table.find(sample).is_ok(), "no unique match for {}", sample);
        }
        assert_eq!(table.patterns().count(), samples.len());
    }
}
