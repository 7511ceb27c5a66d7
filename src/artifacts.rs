//! Run artifact directories and diagnostic attachments.
//!
//! Provides centralized management of per-run artifacts with:
//! - Unique run directories under a configurable base location
//! - Screenshot attachments recorded in an `attachments.json` manifest
//! - Automatic cleanup unless explicitly preserved

use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

const MANIFEST_FILE: &str = "attachments.json";
const RUN_METADATA_FILE: &str = ".run.json";

/// A directory holding the artifacts of one harness run
#[derive(Debug)]
pub struct ArtifactDir {
    /// Unique run ID
    pub id: String,
    /// Root directory for this run
    pub dir: PathBuf,
    /// Whether to keep files after the run ends
    pub keep: bool,
}

impl ArtifactDir {
    /// Create a run directory named after a prefix and the current time
    pub fn with_name(base: impl AsRef<Path>, name: &str) -> Self {
        let id = format!("{}_{}", sanitize_name(name), generate_timestamp_suffix());
        let dir = base.as_ref().join(&id);
        Self {
            id,
            dir,
            keep: false,
        }
    }

    /// Use an explicit directory; such directories are kept by default
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let id = dir
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(generate_run_id);
        Self {
            id,
            dir,
            keep: true,
        }
    }

    /// Set whether to keep files after the run ends
    pub fn keep(mut self, keep: bool) -> Self {
        self.keep = keep;
        self
    }

    /// Create the directory and write run metadata
    pub fn init(&self) -> std::io::Result<()> {
        fs::create_dir_all(&self.dir)?;

        let metadata = serde_json::json!({
            "id": self.id,
            "created": Utc::now().to_rfc3339(),
        });
        fs::write(
            self.dir.join(RUN_METADATA_FILE),
            serde_json::to_string_pretty(&metadata)?,
        )?;
        Ok(())
    }
}

impl Drop for ArtifactDir {
    fn drop(&mut self) {
        if !self.keep {
            let _ = fs::remove_dir_all(&self.dir);
        }
    }
}

/// One diagnostic file attached to a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    pub name: String,
    pub path: PathBuf,
    pub content_type: String,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub created: DateTime<Utc>,
}

/// Attachment sink shared by the page object and the runner.
///
/// Without a directory attachments are only logged, which keeps ad-hoc page
/// objects usable outside a run.
#[derive(Debug, Default, Clone)]
pub struct Attachments {
    dir: Option<PathBuf>,
    entries: Vec<Attachment>,
}

impl Attachments {
    /// Sink that writes into `dir` (created on first attachment)
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: Some(dir.into()),
            entries: Vec::new(),
        }
    }

    /// Sink that discards attachment bytes
    pub fn discard() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[Attachment] {
        &self.entries
    }

    /// Store PNG bytes under `name`; the manifest is rewritten each time.
    ///
    /// Names are made unique within the sink by suffixing a counter.
    pub fn attach_png(&mut self, name: &str, png: &[u8]) -> std::io::Result<Option<PathBuf>> {
        let Some(dir) = &self.dir else {
            debug!("attachment '{}' discarded ({} bytes)", name, png.len());
            return Ok(None);
        };
        fs::create_dir_all(dir)?;

        let base = sanitize_name(name);
        let mut file_name = format!("{}.png", base);
        let mut n = 1;
        while self.entries.iter().any(|a| a.path.file_name() == Some(OsStr::new(&file_name))) {
            n += 1;
            file_name = format!("{}_{}.png", base, n);
        }

        let path = dir.join(file_name);
        fs::write(&path, png)?;
        self.entries.push(Attachment {
            name: name.to_string(),
            path: path.clone(),
            content_type: "image/png".to_string(),
            created: Utc::now(),
        });
        self.write_manifest()?;
        Ok(Some(path))
    }

    /// Like [`attach_png`](Self::attach_png) but only logs failures
    pub fn attach_png_best_effort(&mut self, name: &str, png: &[u8]) -> Option<PathBuf> {
        match self.attach_png(name, png) {
            Ok(path) => path,
            Err(err) => {
                warn!("could not store attachment '{}': {}", name, err);
                None
            }
        }
    }

    fn write_manifest(&self) -> std::io::Result<()> {
        if let Some(dir) = &self.dir {
            let manifest = serde_json::to_string_pretty(&self.entries)?;
            fs::write(dir.join(MANIFEST_FILE), manifest)?;
        }
        Ok(())
    }
}

/// Generate a unique run ID
fn generate_run_id() -> String {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    let pid = std::process::id();
    format!("run_{}_{}", timestamp, pid)
}

fn generate_timestamp_suffix() -> String {
    Utc::now().format("%Y%m%d_%H%M%S").to_string()
}

/// Sanitize a name for use in filenames
pub fn sanitize_name(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' => c,
            c if c.is_alphanumeric() => c,
            _ => '_',
        })
        .collect();
    if sanitized.is_empty() {
        "unnamed".to_string()
    } else {
        sanitized
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_dir_with_name() {
        let run = ArtifactDir::with_name("/tmp/page-harness-test", "login flow");
        assert!(run.id.starts_with("login_flow_"));
    }

    #[test]
    fn test_init_writes_metadata_and_drop_cleans_up() {
        let base = tempfile::tempdir().unwrap();
        let dir = {
            let run = ArtifactDir::with_name(base.path(), "smoke");
            run.init().unwrap();
            assert!(run.dir.join(RUN_METADATA_FILE).exists());
            run.dir.clone()
        };
        assert!(!dir.exists());

        let kept = ArtifactDir::in_dir(base.path().join("kept"));
        kept.init().unwrap();
        drop(kept);
        assert!(base.path().join("kept").join(RUN_METADATA_FILE).exists());
    }

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("hello world"), "hello_world");
        assert_eq!(sanitize_name("text_not_found_Sign in"), "text_not_found_Sign_in");
        assert_eq!(sanitize_name("a/b\\c"), "a_b_c");
        assert_eq!(sanitize_name("Привет"), "Привет");
        assert_eq!(sanitize_name(""), "unnamed");
    }

    #[test]
    fn test_attachments_write_files_and_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let mut attachments = Attachments::in_dir(dir.path());

        let first = attachments.attach_png("failure", b"png-1").unwrap().unwrap();
        let second = attachments.attach_png("failure", b"png-2").unwrap().unwrap();

        assert_ne!(first, second);
        assert!(second.ends_with("failure_2.png"));
        assert_eq!(fs::read(&first).unwrap(), b"png-1");
        assert_eq!(attachments.entries().len(), 2);

        let manifest: Vec<Attachment> =
            serde_json::from_str(&fs::read_to_string(dir.path().join(MANIFEST_FILE)).unwrap())
                .unwrap();
        assert_eq!(manifest.len(), 2);
        assert_eq!(manifest[0].content_type, "image/png");
    }

    #[test]
    fn test_discarding_sink_records_nothing() {
        let mut attachments = Attachments::discard();
        assert!(attachments.attach_png("x", b"data").unwrap().is_none());
        assert!(attachments.entries().is_empty());
    }
}
