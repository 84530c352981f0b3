use directories::ProjectDirs;
use std::path::PathBuf;

const APP_NAME: &str = "alphadrill";

/// Resolves where the config file and the score database live.
/// Scores go to the XDG state dir when HOME is known; both fall back to
/// `ProjectDirs`, then to the working directory.
pub struct AppDirs;

impl AppDirs {
    pub fn config_path() -> PathBuf {
        match ProjectDirs::from("", "", APP_NAME) {
            Some(pd) => pd.config_dir().join("config.json"),
            None => PathBuf::from(format!("{APP_NAME}_config.json")),
        }
    }

    pub fn db_path() -> PathBuf {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home)
                .join(".local")
                .join("state")
                .join(APP_NAME)
                .join("scores.db");
        }
        match ProjectDirs::from("", "", APP_NAME) {
            Some(pd) => pd.data_local_dir().join("scores.db"),
            None => PathBuf::from(format!("{APP_NAME}_scores.db")),
        }
    }
}
