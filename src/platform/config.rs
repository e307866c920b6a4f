//! `havoc.toml` config loading.

use serde::{Deserialize, Serialize};

use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Default mood for new personality contexts.
    #[serde(default = "default_mood")]
    pub mood: String,

    /// Default chaos level (1-10) for new personality contexts.
    #[serde(default = "default_chaos_level")]
    pub chaos_level: u8,

    /// Optional fixed seed; absent means fresh entropy per context.
    #[serde(default)]
    pub seed: Option<u64>,

    /// Base directory for havoc runtime artifacts.
    #[serde(default = "default_base_dir")]
    pub base_dir: PathBuf,
}

fn default_mood() -> String {
    crate::DEFAULT_MOOD.to_string()
}

fn default_chaos_level() -> u8 {
    5
}

fn default_base_dir() -> PathBuf {
    PathBuf::from(".havoc")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mood: default_mood(),
            chaos_level: default_chaos_level(),
            seed: None,
            base_dir: default_base_dir(),
        }
    }
}

impl Config {
    pub fn load_optional(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(s) => match toml::from_str::<Config>(&s) {
                Ok(cfg) => cfg,
                Err(err) => {
                    tracing::warn!("failed to parse config {}: {err}", path.display());
                    Self::default()
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(err) => {
                tracing::warn!("failed to read config {}: {err}", path.display());
                Self::default()
            }
        }
    }

    pub fn sessions_dir(&self) -> PathBuf {
        self.base_dir.join("sessions")
    }

    /// Build a personality context from the configured defaults.
    pub fn build_context(&self) -> crate::PersonalityContext {
        crate::PersonalityContext::new(&self.mood, self.chaos_level, self.seed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use uuid::Uuid;

    fn temp_file(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("havoc-config-tests-{}", Uuid::new_v4()));
        std::fs::create_dir_all(&dir).expect("temp dir");
        dir.join(name)
    }

    #[test]
    fn missing_config_falls_back_to_defaults() {
        let cfg = Config::load_optional(Path::new("/nonexistent/havoc.toml"));
        assert_eq!(cfg.mood, "playful");
        assert_eq!(cfg.chaos_level, 5);
        assert_eq!(cfg.seed, None);
    }

    #[test]
    fn corrupt_config_falls_back_to_defaults() {
        let path = temp_file("havoc.toml");
        std::fs::write(&path, "mood = [not toml").expect("write");
        let cfg = Config::load_optional(&path);
        assert_eq!(cfg.mood, "playful");
        assert_eq!(cfg.chaos_level, 5);
    }

    #[test]
    fn partial_config_keeps_unset_defaults() {
        let path = temp_file("havoc.toml");
        std::fs::write(&path, "mood = \"reliable\"\nseed = 42\n").expect("write");
        let cfg = Config::load_optional(&path);
        assert_eq!(cfg.mood, "reliable");
        assert_eq!(cfg.seed, Some(42));
        assert_eq!(cfg.chaos_level, 5);
        assert_eq!(cfg.sessions_dir(), PathBuf::from(".havoc").join("sessions"));

        let ctx = cfg.build_context();
        assert_eq!(ctx.mood(), "reliable");
        assert_eq!(ctx.seed(), Some(42));
    }
}
