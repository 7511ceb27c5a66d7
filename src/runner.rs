//! Scenario files and run results.
//!
//! Reads the plain-text subset of Gherkin the harness needs (`Feature:`,
//! `Background:`, `Scenario:`, keyword steps, `#` comments, `@tags`) and runs
//! each scenario in its own [`ScenarioContext`].

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::artifacts::{Attachment, Attachments, sanitize_name};
use crate::context::{ScenarioContext, ScenarioSetup, SessionFactory};
use crate::steps::{KEYWORDS, StepTable};

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A parsed feature file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feature {
    pub name: String,
    pub scenarios: Vec<Scenario>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scenario {
    pub name: String,
    pub line: usize,
    /// Background steps first, then the scenario's own
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    /// 1-based line in the feature file
    pub line: usize,
    /// Full line including the keyword
    pub text: String,
}

enum Section {
    Preamble,
    Background,
    Scenario,
}

fn is_step(line: &str) -> bool {
    KEYWORDS.iter().any(|kw| {
        line.strip_prefix(kw)
            .is_some_and(|rest| rest.starts_with(char::is_whitespace))
    })
}

/// Parse feature text
pub fn parse_feature(text: &str) -> Result<Feature, RunnerError> {
    let mut name = String::new();
    let mut background = Vec::new();
    let mut scenarios: Vec<Scenario> = Vec::new();
    let mut section = Section::Preamble;
    let mut seen_step = false;

    for (idx, raw) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with('@') {
            continue;
        }

        if let Some(rest) = line.strip_prefix("Feature:") {
            name = rest.trim().to_string();
            section = Section::Preamble;
        } else if line.starts_with("Background:") {
            if !scenarios.is_empty() {
                return Err(RunnerError::Parse {
                    line: line_no,
                    message: "Background must come before the first scenario".into(),
                });
            }
            section = Section::Background;
            seen_step = false;
        } else if line.starts_with("Scenario Outline:") || line.starts_with("Examples:") {
            return Err(RunnerError::Parse {
                line: line_no,
                message: "scenario outlines are not supported".into(),
            });
        } else if let Some(rest) = line.strip_prefix("Scenario:") {
            scenarios.push(Scenario {
                name: rest.trim().to_string(),
                line: line_no,
                steps: background.clone(),
            });
            section = Section::Scenario;
            seen_step = false;
        } else if is_step(line) {
            let step = Step {
                line: line_no,
                text: line.to_string(),
            };
            match section {
                Section::Background => background.push(step),
                Section::Scenario => {
                    if let Some(scenario) = scenarios.last_mut() {
                        scenario.steps.push(step);
                    }
                }
                Section::Preamble => {
                    return Err(RunnerError::Parse {
                        line: line_no,
                        message: "step outside of a scenario".into(),
                    });
                }
            }
            seen_step = true;
        } else if seen_step {
            // Free text is only allowed as a description before the first step
            return Err(RunnerError::Parse {
                line: line_no,
                message: format!("expected a step, found '{}'", line),
            });
        }
    }

    if scenarios.is_empty() {
        return Err(RunnerError::Parse {
            line: text.lines().count(),
            message: "no scenarios found".into(),
        });
    }
    Ok(Feature { name, scenarios })
}

/// Read and parse a feature file
pub fn load_feature(path: &Path) -> Result<Feature, RunnerError> {
    parse_feature(&fs::read_to_string(path)?)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Passed,
    Failed,
    /// Not run because an earlier step failed
    Skipped,
}

/// Outcome of a single step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    pub line: usize,
    pub text: String,
    pub status: StepStatus,
    pub error: Option<String>,
    pub duration_ms: u64,
}

/// Outcome of one scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub name: String,
    pub success: bool,

    /// Error message if failed
    pub error: Option<String>,

    pub steps: Vec<StepRecord>,

    /// Screenshots attached while the scenario ran
    pub attachments: Vec<Attachment>,
}

/// Result of a complete run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    pub feature: String,

    /// Whether every scenario passed
    pub success: bool,

    pub started: DateTime<Utc>,

    pub scenarios: Vec<ScenarioResult>,
}

impl RunResult {
    pub fn passed(&self) -> usize {
        self.scenarios.iter().filter(|s| s.success).count()
    }

    pub fn failed(&self) -> usize {
        self.scenarios.len() - self.passed()
    }
}

/// Runs scenarios against sessions from a factory
pub struct Runner<'a> {
    table: &'a StepTable,
    factory: &'a dyn SessionFactory,
    setup: ScenarioSetup,
    attachment_dir: Option<PathBuf>,
}

impl<'a> Runner<'a> {
    pub fn new(table: &'a StepTable, factory: &'a dyn SessionFactory, setup: ScenarioSetup) -> Self {
        Self {
            table,
            factory,
            setup,
            attachment_dir: None,
        }
    }

    /// Store each scenario's attachments in a sub-directory of `dir`
    pub fn attachment_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.attachment_dir = Some(dir.into());
        self
    }

    pub fn run_feature(&self, feature: &Feature) -> RunResult {
        let started = Utc::now();
        info!(
            "running feature '{}' ({} scenarios)",
            feature.name,
            feature.scenarios.len()
        );
        let scenarios: Vec<ScenarioResult> = feature
            .scenarios
            .iter()
            .map(|scenario| self.run_scenario(scenario))
            .collect();

        RunResult {
            feature: feature.name.clone(),
            success: scenarios.iter().all(|s| s.success),
            started,
            scenarios,
        }
    }

    pub fn run_scenario(&self, scenario: &Scenario) -> ScenarioResult {
        let mut setup = self.setup.clone();
        if let Some(dir) = &self.attachment_dir {
            let name = format!("{:03}_{}", scenario.line, sanitize_name(&scenario.name));
            setup = setup.attachments(Attachments::in_dir(dir.join(name)));
        }

        let mut ctx = match ScenarioContext::start(&scenario.name, self.factory, setup) {
            Ok(ctx) => ctx,
            Err(err) => {
                error!("could not start session for '{}': {}", scenario.name, err);
                return ScenarioResult {
                    name: scenario.name.clone(),
                    success: false,
                    error: Some(format!("session start failed: {}", err)),
                    steps: scenario.steps.iter().map(skipped).collect(),
                    attachments: Vec::new(),
                };
            }
        };

        let mut records = Vec::with_capacity(scenario.steps.len());
        let mut failure: Option<String> = None;

        for step in &scenario.steps {
            if failure.is_some() {
                records.push(skipped(step));
                continue;
            }

            let start = Instant::now();
            let outcome = self.table.run(&mut ctx, &step.text);
            let duration_ms = start.elapsed().as_millis() as u64;

            match outcome {
                Ok(()) => records.push(StepRecord {
                    line: step.line,
                    text: step.text.clone(),
                    status: StepStatus::Passed,
                    error: None,
                    duration_ms,
                }),
                Err(err) => {
                    let message = err.to_string();
                    warn!("step failed at line {}: {}", step.line, message);
                    ctx.page()
                        .attach_screenshot(&format!("step_failed_line_{}", step.line));
                    records.push(StepRecord {
                        line: step.line,
                        text: step.text.clone(),
                        status: StepStatus::Failed,
                        error: Some(message.clone()),
                        duration_ms,
                    });
                    failure = Some(message);
                }
            }
        }

        let attachments = ctx.attachments().to_vec();
        if let Err(err) = ctx.finish() {
            warn!("teardown of '{}' failed: {}", scenario.name, err);
        }

        let success = failure.is_none();
        info!(
            "scenario '{}' {}",
            scenario.name,
            if success { "passed" } else { "failed" }
        );
        ScenarioResult {
            name: scenario.name.clone(),
            success,
            error: failure,
            steps: records,
            attachments,
        }
    }
}

fn skipped(step: &Step) -> StepRecord {
    StepRecord {
        line: step.line,
        text: step.text.clone(),
        status: StepStatus::Skipped,
        error: None,
        duration_ms: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const FEATURE: &str = r#"
# Sign-in flows
@smoke
Feature: Login
  Users sign in with email and password.

  Background:
    Given open page "https://example.test/login"

  Scenario: Successful sign in
    Some description of the scenario.
    When the user types "alice" into the field with placeholder "Email"
    And the user clicks the text "Sign in"
    Then the user expects a message with text "Welcome"

  Scenario: Page loads
    Then the page should be fully loaded
"#;

    #[test]
    fn test_parse_feature() {
        let feature = parse_feature(FEATURE).unwrap();
        assert_eq!(feature.name, "Login");
        assert_eq!(feature.scenarios.len(), 2);

        let first = &feature.scenarios[0];
        assert_eq!(first.name, "Successful sign in");
        let texts: Vec<&str> = first.steps.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(
            texts,
            vec![
                "Given open page \"https://example.test/login\"",
                "When the user types \"alice\" into the field with placeholder \"Email\"",
                "And the user clicks the text \"Sign in\"",
                "Then the user expects a message with text \"Welcome\"",
            ]
        );
        assert_eq!(first.steps[0].line, 8);
        assert_eq!(feature.scenarios[1].steps.len(), 2);
    }

    #[test]
    fn test_parse_errors() {
        let err = parse_feature("Feature: x\nGiven open page \"a\"\n").unwrap_err();
        assert!(matches!(err, RunnerError::Parse { line: 2, .. }));

        let err = parse_feature("Feature: x\nScenario: s\nGiven a\nnot a step\n").unwrap_err();
        assert!(matches!(err, RunnerError::Parse { line: 4, .. }));

        assert!(parse_feature("Feature: empty\n").is_err());
        assert!(parse_feature("Feature: x\nScenario Outline: o\n").is_err());
    }
}
