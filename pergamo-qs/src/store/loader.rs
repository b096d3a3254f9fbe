//! Question tree loader
//!
//! Walks the question root recursively and turns every `details.json` into a
//! validated [`Question`]. A single bad file never aborts the load: it is
//! logged and skipped, and traversal continues.

use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, error, info, warn};
use walkdir::{DirEntry, WalkDir};

use crate::models::{Question, QuestionRecord, ValidationError};

/// Name of the per-question metadata file
pub const DETAILS_FILE: &str = "details.json";

/// Reasons a single question file is skipped
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("I/O error reading {0}: {1}")]
    Io(PathBuf, String),

    #[error("Malformed JSON in {0}: {1}")]
    Parse(PathBuf, String),

    #[error("Invalid question in {0}: {1}")]
    Invalid(PathBuf, ValidationError),
}

/// Statistics for one load pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Questions accepted into the store
    pub loaded: usize,
    /// Files skipped because they were malformed or invalid
    pub skipped: usize,
    /// Directory entries that could not be read
    pub errors: usize,
}

/// Loader output: questions in traversal order plus statistics
#[derive(Debug, Clone, Default)]
pub struct LoadOutcome {
    pub questions: Vec<Question>,
    pub report: LoadReport,
}

/// Recursive `details.json` loader
#[derive(Debug, Clone)]
pub struct QuestionLoader {
    root: PathBuf,
    asset_prefix: String,
    ignore_patterns: Vec<String>,
}

impl QuestionLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            asset_prefix: String::new(),
            ignore_patterns: vec![
                ".git".to_string(),
                "node_modules".to_string(),
                ".DS_Store".to_string(),
            ],
        }
    }

    /// URL prefix for rewritten asset references (e.g. "/assets")
    pub fn with_asset_prefix(mut self, prefix: &str) -> Self {
        self.asset_prefix = prefix.trim_end_matches('/').to_string();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Load every question under the root
    ///
    /// A missing root yields an empty outcome; the failure is only logged.
    pub fn load(&self) -> LoadOutcome {
        let mut outcome = LoadOutcome::default();

        if !self.root.is_dir() {
            error!(
                "Question root {} does not exist or is not a directory",
                self.root.display()
            );
            return outcome;
        }

        let walker = WalkDir::new(&self.root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !self.is_ignored(e));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Error accessing entry: {}", e);
                    outcome.report.errors += 1;
                    continue;
                }
            };

            if !entry.file_type().is_file() || entry.file_name() != DETAILS_FILE {
                continue;
            }

            match self.load_file(entry.path()) {
                Ok(question) => {
                    outcome.questions.push(question);
                    outcome.report.loaded += 1;
                }
                Err(e) => {
                    warn!("Skipping question file: {}", e);
                    outcome.report.skipped += 1;
                }
            }
        }

        info!(
            "Loaded {} questions from {} ({} skipped, {} unreadable entries)",
            outcome.report.loaded,
            self.root.display(),
            outcome.report.skipped,
            outcome.report.errors
        );

        outcome
    }

    /// Parse one `details.json`, tag it with its folder and rewrite assets
    pub fn load_file(&self, path: &Path) -> Result<Question, LoadError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| LoadError::Io(path.to_path_buf(), e.to_string()))?;
        let mut record: QuestionRecord = serde_json::from_str(&content)
            .map_err(|e| LoadError::Parse(path.to_path_buf(), e.to_string()))?;

        let question_dir = path.parent().unwrap_or(&self.root);
        record.dir_name = question_dir
            .file_name()
            .map(|name| name.to_string_lossy().into_owned());

        let relative_dir = self.relative_dir(question_dir);
        if let Some(files) = record.files.as_mut() {
            for file in files.iter_mut() {
                *file = self.rewrite_asset(&relative_dir, file);
            }
        }
        for alternative in record.alternatives.iter_mut() {
            if let Some(file) = alternative.file.as_mut() {
                *file = self.rewrite_asset(&relative_dir, file);
            }
        }

        let question = Question::try_from(record)
            .map_err(|e| LoadError::Invalid(path.to_path_buf(), e))?;
        debug!("Loaded question {} from {}", question.id(), path.display());
        Ok(question)
    }

    /// Path of `dir` relative to the root, `/`-separated
    fn relative_dir(&self, dir: &Path) -> String {
        dir.strip_prefix(&self.root)
            .unwrap_or(dir)
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Rewrite a relative asset reference to `{prefix}/{relative_dir}/{basename}`
    pub fn rewrite_asset(&self, relative_dir: &str, reference: &str) -> String {
        if is_absolute_reference(reference) || reference.trim().is_empty() {
            return reference.to_string();
        }

        let basename = reference
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(reference);

        let mut url = self.asset_prefix.clone();
        if !relative_dir.is_empty() {
            url.push('/');
            url.push_str(relative_dir);
        }
        url.push('/');
        url.push_str(basename);
        url
    }

    fn is_ignored(&self, entry: &DirEntry) -> bool {
        let name = entry.file_name().to_string_lossy();
        self.ignore_patterns.iter().any(|p| name == p.as_str())
    }
}

/// Scheme-prefixed references are left untouched
pub fn is_absolute_reference(reference: &str) -> bool {
    let lower = reference.trim_start().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://") || lower.starts_with("data:")
}
