//! Where station tables come from: local files or remote URLs.
//!
//! Sources are read whole into memory. Several sources are fetched
//! concurrently; each one still becomes its own assessment.

pub mod http;

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use futures::future::join_all;
use indicatif::{ProgressBar, ProgressStyle};

use crate::error::SourceError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    File(PathBuf),
    Url(String),
}

impl DataSource {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        let lower = trimmed.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            DataSource::Url(trimmed.to_string())
        } else {
            DataSource::File(PathBuf::from(trimmed))
        }
    }

    /// Full path or URL, used as the format hint and in messages.
    pub fn name(&self) -> String {
        match self {
            DataSource::File(p) => p.display().to_string(),
            DataSource::Url(u) => u.clone(),
        }
    }

    /// Short, file-name-safe label: the file stem of the path or URL.
    pub fn label(&self) -> String {
        let name = self.name();
        let without_query = name.split(['?', '#']).next().unwrap_or(&name);
        let last = without_query
            .trim_end_matches('/')
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or("dataset");
        let stem = Path::new(last)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(last);
        let label: String = stem
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        if label.is_empty() {
            "dataset".to_string()
        } else {
            label
        }
    }
}

impl std::fmt::Display for DataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Read a local file fully into memory.
pub fn read_file(path: &Path) -> Result<Vec<u8>, SourceError> {
    std::fs::read(path).map_err(|source| SourceError::Io {
        path: path.display().to_string(),
        source,
    })
}

/// Load every source, fetching remote ones concurrently.
///
/// Results come back in input order; a failing source does not stop the others.
pub async fn load_all(
    sources: &[DataSource],
    timeout: Duration,
    quiet: bool,
) -> Result<Vec<Result<Vec<u8>, SourceError>>> {
    let client = reqwest::Client::builder().timeout(timeout).build()?;

    let spinner = if !quiet && sources.iter().any(|s| matches!(s, DataSource::Url(_))) {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?,
        );
        pb.set_message(format!("Fetching {} source(s)", sources.len()));
        pb.enable_steady_tick(Duration::from_millis(100));
        Some(pb)
    } else {
        None
    };

    let futures: Vec<_> = sources
        .iter()
        .map(|source| {
            let client = client.clone();
            let source = source.clone();
            async move {
                match source {
                    DataSource::File(path) => read_file(&path),
                    DataSource::Url(url) => http::fetch_bytes(&client, &url).await,
                }
            }
        })
        .collect();

    let results = join_all(futures).await;

    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }

    Ok(results)
}
