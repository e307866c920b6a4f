//! Centralized error collection for fuzzy construct failures.

use serde::{Deserialize, Serialize};

use std::collections::BTreeMap;

use crate::{epoch_millis, HavocError, HavocResult};

/// How construct failures are surfaced to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorMode {
    /// Unrecovered errors abort immediately.
    Strict,
    /// Errors are logged and execution continues.
    Warning,
    /// Errors are collected without logging.
    Silent,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConstructError {
    pub construct: String,
    pub message: String,
    #[serde(default)]
    pub context: String,
    pub recovered: bool,
    pub timestamp_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConstructErrorStats {
    pub total: u64,
    pub recovered: u64,
    pub failed: u64,
    pub recovery_rate: f64,
}

#[derive(Debug)]
pub struct ErrorTracker {
    mode: ErrorMode,
    errors: Vec<ConstructError>,
    counts: BTreeMap<String, u64>,
}

impl Default for ErrorTracker {
    fn default() -> Self {
        Self::new(ErrorMode::Warning)
    }
}

impl ErrorTracker {
    pub fn new(mode: ErrorMode) -> Self {
        Self {
            mode,
            errors: Vec::new(),
            counts: BTreeMap::new(),
        }
    }

    pub fn mode(&self) -> ErrorMode {
        self.mode
    }

    pub fn record(
        &mut self,
        construct: &str,
        message: &str,
        context: &str,
        recovered: bool,
    ) -> HavocResult<()> {
        self.errors.push(ConstructError {
            construct: construct.to_string(),
            message: message.to_string(),
            context: context.to_string(),
            recovered,
            timestamp_ms: epoch_millis(),
        });
        *self.counts.entry(construct.to_string()).or_insert(0) += 1;

        match self.mode {
            ErrorMode::Strict if !recovered => Err(HavocError::Construct(format!(
                "{construct} error: {message} (context: {context})"
            ))),
            ErrorMode::Warning => {
                tracing::warn!("{construct} error: {message}");
                if !context.is_empty() {
                    tracing::warn!("  context: {context}");
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    pub fn errors(&self) -> &[ConstructError] {
        &self.errors
    }

    /// Fraction of recorded errors that were recovered from; 1.0 when clean.
    pub fn error_rate(&self) -> f64 {
        if self.errors.is_empty() {
            return 1.0;
        }
        let recovered = self.errors.iter().filter(|e| e.recovered).count();
        recovered as f64 / self.errors.len() as f64
    }

    pub fn construct_stats(&self) -> BTreeMap<String, ConstructErrorStats> {
        let mut stats = BTreeMap::new();
        for construct in self.counts.keys() {
            let matching: Vec<&ConstructError> = self
                .errors
                .iter()
                .filter(|e| &e.construct == construct)
                .collect();
            let total = matching.len() as u64;
            let recovered = matching.iter().filter(|e| e.recovered).count() as u64;
            stats.insert(
                construct.clone(),
                ConstructErrorStats {
                    total,
                    recovered,
                    failed: total - recovered,
                    recovery_rate: if total > 0 {
                        recovered as f64 / total as f64
                    } else {
                        1.0
                    },
                },
            );
        }
        stats
    }

    pub fn clear(&mut self) {
        self.errors.clear();
        self.counts.clear();
    }

    pub fn summary(&self) -> String {
        if self.errors.is_empty() {
            return "no errors recorded".to_string();
        }
        let total = self.errors.len();
        let recovered = self.errors.iter().filter(|e| e.recovered).count();
        let mut lines = vec![
            "error handling summary:".to_string(),
            format!("  mode: {:?}", self.mode),
            format!("  total errors: {total}"),
            format!("  recovered: {recovered}"),
            format!("  failed: {}", total - recovered),
            format!("  recovery rate: {:.1}%", self.error_rate() * 100.0),
        ];
        if !self.counts.is_empty() {
            lines.push("  by construct:".to_string());
            let mut by_count: Vec<(&String, &u64)> = self.counts.iter().collect();
            by_count.sort_by(|a, b| b.1.cmp(a.1).then(a.0.cmp(b.0)));
            for (construct, count) in by_count {
                lines.push(format!("    - {construct}: {count} errors"));
            }
        }
        lines.join("\n")
    }
}
