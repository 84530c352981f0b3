use crate::app_dirs::AppDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_ALPHABET: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";
pub const DEFAULT_TIMER_MS: u64 = 5000;
pub const DEFAULT_QUESTION_COUNT: usize = 10;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Letters being drilled, in position order
    pub alphabet: String,
    /// Affirmations shown after a correct answer
    pub positive_messages: Vec<String>,
    /// Base per-question budget in milliseconds
    pub timer_ms: u64,
    // Last-used session settings, so restart picks up where the user left off
    pub question_count: usize,
    pub tournament: bool,
    pub typed: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            alphabet: DEFAULT_ALPHABET.to_string(),
            positive_messages: vec![
                "Correct!".to_string(),
                "Nice!".to_string(),
                "You got it!".to_string(),
                "Great job!".to_string(),
                "Keep it up!".to_string(),
            ],
            timer_ms: DEFAULT_TIMER_MS,
            question_count: DEFAULT_QUESTION_COUNT,
            tournament: false,
            typed: false,
        }
    }
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> std::io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self {
            path: AppDirs::config_path(),
        }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Config {
        if let Ok(bytes) = fs::read(&self.path) {
            if let Ok(cfg) = serde_json::from_slice::<Config>(&bytes) {
                return cfg;
            }
        }
        Config::default()
    }

    fn save(&self, cfg: &Config) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg).unwrap_or_default();
        fs::write(&self.path, data)
    }
}
