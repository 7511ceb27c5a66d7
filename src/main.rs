use clap::{Parser, Subcommand};
use std::error::Error;
use std::path::{Path, PathBuf};

use page_harness::artifacts::ArtifactDir;
use page_harness::config;
use page_harness::context::{ScenarioSetup, WebDriverFactory};
use page_harness::runner::{Runner, StepStatus, load_feature};
use page_harness::session::BrowserOptions;
use page_harness::steps::standard_table;
use page_harness::visual::compare::compare_images;
use page_harness::logging;

/// Page Harness - browser acceptance testing with page objects
#[derive(Parser, Debug)]
#[command(
    name = "page-harness",
    about = "Run natural-language browser scenarios and compare screenshots against references",
    after_help = "ENVIRONMENT VARIABLES:\n\
        PAGE_HARNESS_WEBDRIVER_URL       WebDriver endpoint\n\
        PAGE_HARNESS_LANG                Browser UI language\n\
        PAGE_HARNESS_HEADLESS            Run the browser headless\n\
        PAGE_HARNESS_EXPLICIT_WAIT       Default explicit wait (seconds)\n\
        PAGE_HARNESS_REFERENCE_DIR       Reference screenshot store\n\
        PAGE_HARNESS_DIFF_DIR            Diff screenshot store\n\
        PAGE_HARNESS_ARTIFACT_DIR        Base directory for run attachments\n\
        RUST_LOG                         Log filter (overrides --log-level)"
)]
struct Args {
    /// Log level: error, warn, info, debug, trace
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run every scenario of a feature file, one browser session each
    Run {
        /// Feature file to run
        #[arg(short, long)]
        feature: PathBuf,

        /// WebDriver endpoint URL
        #[arg(long, env = "PAGE_HARNESS_WEBDRIVER_URL")]
        webdriver: Option<String>,

        /// Run the browser without a window
        #[arg(long)]
        headless: bool,

        /// Output results as JSON
        #[arg(long)]
        json: bool,

        /// Keep attachments after completion (default: cleanup unless --output is specified)
        #[arg(long, short = 'k')]
        keep: bool,

        /// Directory for attachments (default: auto-generated under the artifact dir)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Compare two screenshots the way the visual steps do
    Compare {
        /// Reference image
        #[arg(short, long)]
        reference: PathBuf,

        /// Image to check
        #[arg(short, long)]
        actual: PathBuf,

        /// Maximum fraction of mismatched pixels (0..1)
        #[arg(short, long, default_value = "0.0")]
        tolerance: f64,

        /// Where to write the diff on failure (default: <actual>.diff.png)
        #[arg(long)]
        diff: Option<PathBuf>,

        /// Output the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the step sentences the runner understands
    Steps,
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    logging::init(&args.log_level);

    match args.command {
        Some(Commands::Run {
            feature,
            webdriver,
            headless,
            json,
            keep,
            output,
        }) => {
            let config = config::get();
            let parsed = load_feature(&feature)?;

            let mut options = BrowserOptions::from_settings(&config.browser);
            if let Some(url) = webdriver {
                options.webdriver_url = url;
            }
            let options = options.headless(headless || config.browser.headless);

            // Attachments - if output specified, use that dir and keep it
            let artifacts = if let Some(ref dir) = output {
                ArtifactDir::in_dir(dir)
            } else {
                let feature_name = feature
                    .file_stem()
                    .map(|s| s.to_string_lossy().to_string())
                    .unwrap_or_else(|| "run".to_string());
                ArtifactDir::with_name(&config.artifacts.base_dir, &feature_name).keep(keep)
            };
            artifacts.init()?;

            let table = standard_table()?;
            let factory = WebDriverFactory::new(options);
            let runner = Runner::new(table, &factory, ScenarioSetup::from_config(config))
                .attachment_dir(&artifacts.dir);
            let result = runner.run_feature(&parsed);

            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!("Feature: {}", result.feature);
                for scenario in &result.scenarios {
                    let mark = if scenario.success { "ok" } else { "FAILED" };
                    println!("  Scenario: {} ... {}", scenario.name, mark);
                    for step in &scenario.steps {
                        let status = match step.status {
                            StepStatus::Passed => "passed",
                            StepStatus::Failed => "failed",
                            StepStatus::Skipped => "skipped",
                        };
                        println!("    [{:>7}] {}", status, step.text);
                        if let Some(error) = &step.error {
                            println!("              {}", error);
                        }
                    }
                    for attachment in &scenario.attachments {
                        println!("    attachment: {}", attachment.path.display());
                    }
                }
                println!(
                    "\n{} passed, {} failed",
                    result.passed(),
                    result.failed()
                );
                if artifacts.keep {
                    println!("Attachments: {}", artifacts.dir.display());
                }
            }

            if !result.success {
                return Err(format!("{} of {} scenarios failed", result.failed(), result.scenarios.len()).into());
            }
        }

        Some(Commands::Compare {
            reference,
            actual,
            tolerance,
            diff,
            json,
        }) => {
            let diff_path = diff.unwrap_or_else(|| default_diff_path(&actual));
            let reference_image = image::open(&reference)?.to_rgba8();
            let actual_image = image::open(&actual)?.to_rgba8();
            let name = actual
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_else(|| "screenshot".to_string());

            let report = compare_images(
                &name,
                &reference_image,
                &actual_image,
                config::get().visual.pixel_threshold,
                tolerance,
                &reference,
                &diff_path,
            )?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!(
                    "{}: {} of {} pixels differ ({:.4}%), tolerance {:.4}%",
                    if report.passed { "PASS" } else { "FAIL" },
                    report.mismatched,
                    report.total,
                    report.ratio * 100.0,
                    report.tolerance * 100.0
                );
                if let Some(path) = &report.diff_path {
                    println!("  Diff: {}", path.display());
                }
            }

            if !report.passed {
                return Err("screenshots differ".into());
            }
        }

        Some(Commands::Steps) => {
            for pattern in standard_table()?.patterns() {
                println!("{}", pattern);
            }
        }

        None => {
            println!("Page Harness - browser acceptance testing with page objects");
            println!();
            println!("Usage: page-harness <COMMAND>");
            println!();
            println!("Commands:");
            println!("  run      Run the scenarios of a feature file against a WebDriver browser");
            println!("  compare  Compare two screenshots with a mismatch tolerance");
            println!("  steps    List the supported step sentences");
            println!();
            println!("Run with --help for more information.");
        }
    }

    Ok(())
}

fn default_diff_path(actual: &Path) -> PathBuf {
    let stem = actual
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "screenshot".to_string());
    actual.with_file_name(format!("{}.diff.png", stem))
}
