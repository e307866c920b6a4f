//! Session file format (.havoc) read/write.

use serde::{Deserialize, Serialize};

use std::collections::BTreeMap;
use std::path::Path;

use crate::{HavocError, HavocResult, PersonalitySnapshot, RngCall};

pub const CURRENT_SESSION_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VersionInfo {
    pub version: String,
}

pub fn version_info() -> VersionInfo {
    VersionInfo {
        version: env!("CARGO_PKG_VERSION").to_string(),
    }
}

/// Personality configuration captured when a recording starts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InitialPersonality {
    pub mood: String,
    pub chaos_level: u8,
    pub chaos_multiplier: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    pub reproducible: bool,
    pub execution_count: u64,
    pub instability_level: f64,
}

impl InitialPersonality {
    pub fn snapshot(&self) -> PersonalitySnapshot {
        PersonalitySnapshot {
            chaos_level: self.chaos_level,
            chaos_multiplier: self.chaos_multiplier,
            execution_count: self.execution_count,
            instability_level: self.instability_level,
        }
    }
}

/// Ordered, persisted log of every randomness decision in one recorded run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecordingSession {
    pub format: String,
    pub version: u32,
    pub engine: VersionInfo,
    pub session_id: String,
    pub started_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    pub input: String,
    pub command_line: Vec<String>,
    pub working_directory: String,
    pub initial_personality: InitialPersonality,
    pub calls: Vec<RngCall>,
    #[serde(default)]
    pub construct_usage: BTreeMap<String, u64>,
    #[serde(default)]
    pub total_calls: u64,
    #[serde(default)]
    pub notes: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
}

impl RecordingSession {
    pub fn new(
        session_id: String,
        input: String,
        command_line: Vec<String>,
        initial_personality: InitialPersonality,
    ) -> Self {
        Self {
            format: "havoc-session".to_string(),
            version: CURRENT_SESSION_VERSION,
            engine: version_info(),
            session_id,
            started_at: crate::wall_time_iso_utc(),
            finished_at: None,
            duration_ms: None,
            input,
            command_line,
            working_directory: std::env::current_dir()
                .map(|p| p.to_string_lossy().to_string())
                .unwrap_or_else(|_| ".".to_string()),
            initial_personality,
            calls: Vec::new(),
            construct_usage: BTreeMap::new(),
            total_calls: 0,
            notes: String::new(),
            tags: Vec::new(),
            checksum: None,
        }
    }

    pub fn write_json(&self, path: &Path) -> HavocResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut with_checksum = self.clone();
        with_checksum.checksum = None;
        let canonical = serde_json::to_vec(&with_checksum)?;
        with_checksum.checksum = Some(blake3::hash(&canonical).to_hex().to_string());

        let bytes = serde_json::to_vec_pretty(&with_checksum)?;
        // Atomic replace to avoid concurrent writer corruption on shared paths.
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        let file_name = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("session.havoc");
        let tmp_name = format!(
            ".{file_name}.{}.{}.tmp",
            std::process::id(),
            uuid::Uuid::new_v4()
        );
        let tmp_path = parent.join(tmp_name);
        std::fs::write(&tmp_path, bytes)?;
        std::fs::rename(&tmp_path, path)?;
        Ok(())
    }

    pub fn read_json(path: &Path) -> HavocResult<Self> {
        let bytes = std::fs::read(path)?;
        let s: RecordingSession = serde_json::from_slice(&bytes).map_err(|e| {
            HavocError::Session(format!("failed to parse session {}: {e}", path.display()))
        })?;
        verify_checksum(&s, path)?;
        Ok(s)
    }
}

fn verify_checksum(session: &RecordingSession, path: &Path) -> HavocResult<()> {
    let Some(expected) = session.checksum.as_ref() else {
        return Ok(());
    };
    let mut canonical = session.clone();
    canonical.checksum = None;
    let bytes = serde_json::to_vec(&canonical)?;
    let got = blake3::hash(&bytes).to_hex().to_string();
    if &got != expected {
        return Err(HavocError::Session(format!(
            "session checksum mismatch for {} (expected {}, got {})",
            path.display(),
            expected,
            got
        )));
    }
    Ok(())
}
