//! Health report for a deployment: credentials, model file, index presence
//! and contents, and a sample retrieval.

use std::fmt;

use crate::core::config::{AppPaths, IndexBackend, Settings};
use crate::embedding::EmbeddingProvider;
use crate::vector::{PineconeControl, VectorIndex};

pub const SAMPLE_QUESTION: &str = "What are the symptoms of fever?";
pub const SAMPLE_TOP_K: usize = 2;
const PREVIEW_CHARS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckStatus {
    Ok,
    Warning,
    Critical,
}

#[derive(Debug, Clone)]
pub struct Check {
    pub name: &'static str,
    pub status: CheckStatus,
    pub detail: String,
}

#[derive(Debug, Default)]
pub struct DiagnosticReport {
    pub checks: Vec<Check>,
    /// Retrieved chunk previews from the sample query.
    pub samples: Vec<String>,
}

impl DiagnosticReport {
    pub fn push(&mut self, name: &'static str, status: CheckStatus, detail: impl Into<String>) {
        self.checks.push(Check {
            name,
            status,
            detail: detail.into(),
        });
    }

    pub fn has_critical(&self) -> bool {
        self.checks.iter().any(|c| c.status == CheckStatus::Critical)
    }
}

impl fmt::Display for DiagnosticReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for check in &self.checks {
            let tag = match check.status {
                CheckStatus::Ok => "OK",
                CheckStatus::Warning => "WARN",
                CheckStatus::Critical => "CRITICAL",
            };
            writeln!(f, "[{}] {}: {}", tag, check.name, check.detail)?;
        }
        for (i, sample) in self.samples.iter().enumerate() {
            writeln!(f, "Doc {}: {}...", i, sample)?;
        }
        Ok(())
    }
}

/// Credential and model file checks. Returns `false` when the remaining
/// checks can not run.
pub fn check_environment(
    settings: &Settings,
    paths: &AppPaths,
    report: &mut DiagnosticReport,
) -> bool {
    let mut can_continue = true;

    if settings.index.backend == IndexBackend::Pinecone {
        let has_key = settings
            .pinecone
            .api_key
            .as_deref()
            .is_some_and(|k| !k.trim().is_empty());
        if has_key {
            report.push("api key", CheckStatus::Ok, "PINECONE_API_KEY present");
        } else {
            report.push("api key", CheckStatus::Critical, "PINECONE_API_KEY missing");
            can_continue = false;
        }
        match settings.pinecone.environment.as_deref() {
            Some(env) if !env.trim().is_empty() => {
                report.push("environment", CheckStatus::Ok, format!("PINECONE_API_ENV={}", env))
            }
            _ => report.push("environment", CheckStatus::Warning, "PINECONE_API_ENV not set"),
        }
    }

    if let Some(url) = settings.llm.server_url.as_deref().filter(|u| !u.is_empty()) {
        report.push("model", CheckStatus::Ok, format!("using llama-server at {}", url));
    } else {
        let model_path = paths.resolve(&settings.llm.model_path);
        if model_path.is_file() {
            report.push("model", CheckStatus::Ok, format!("found at {}", model_path.display()));
        } else {
            report.push(
                "model",
                CheckStatus::Critical,
                format!("not found at {}", model_path.display()),
            );
        }
    }

    can_continue
}

/// Whether the configured Pinecone index exists.
pub async fn check_index_listing(settings: &Settings, report: &mut DiagnosticReport) -> bool {
    let control = match PineconeControl::new(&settings.pinecone, reqwest::Client::new()) {
        Ok(control) => control,
        Err(err) => {
            report.push("indexes", CheckStatus::Critical, err.to_string());
            return false;
        }
    };

    match control.list_indexes().await {
        Ok(indexes) => {
            let names: Vec<&str> = indexes.iter().map(|i| i.name.as_str()).collect();
            if names.contains(&settings.index.name.as_str()) {
                report.push(
                    "indexes",
                    CheckStatus::Ok,
                    format!("'{}' found among {:?}", settings.index.name, names),
                );
                true
            } else {
                report.push(
                    "indexes",
                    CheckStatus::Critical,
                    format!("'{}' not found; available: {:?}", settings.index.name, names),
                );
                false
            }
        }
        Err(err) => {
            report.push(
                "indexes",
                CheckStatus::Critical,
                format!("Error connecting to Pinecone: {}", err),
            );
            false
        }
    }
}

/// Index statistics, then a sample retrieval when the index has content.
pub async fn check_contents(
    index: &dyn VectorIndex,
    embedder: &dyn EmbeddingProvider,
    report: &mut DiagnosticReport,
) {
    let stats = match index.stats().await {
        Ok(stats) => stats,
        Err(err) => {
            report.push("stats", CheckStatus::Critical, err.to_string());
            return;
        }
    };
    if stats.total_vectors == 0 {
        report.push("stats", CheckStatus::Critical, "Index is EMPTY");
        return;
    }
    report.push(
        "stats",
        CheckStatus::Ok,
        format!(
            "{} vectors, dimension {}",
            stats.total_vectors,
            stats
                .dimension
                .map(|d| d.to_string())
                .unwrap_or_else(|| "unknown".to_string())
        ),
    );

    let hits = match embedder.embed(SAMPLE_QUESTION).await {
        Ok(vector) => index.query(&vector, SAMPLE_TOP_K).await,
        Err(err) => Err(err),
    };
    match hits {
        Ok(hits) => {
            report.push(
                "retrieval",
                if hits.is_empty() {
                    CheckStatus::Warning
                } else {
                    CheckStatus::Ok
                },
                format!("returned {} documents for '{}'", hits.len(), SAMPLE_QUESTION),
            );
            report.samples = hits
                .iter()
                .map(|h| h.text.chars().take(PREVIEW_CHARS).collect())
                .collect();
        }
        Err(err) => report.push("retrieval", CheckStatus::Critical, err.to_string()),
    }
}
