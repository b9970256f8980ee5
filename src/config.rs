use std::path::PathBuf;

pub const HISTORY_ENV: &str = "YTDL_SAVER_HISTORY";
pub const DOWNLOAD_DIR_ENV: &str = "YTDL_SAVER_DOWNLOAD_DIR";
pub const YTDLP_ENV: &str = "YTDL_SAVER_YTDLP";
pub const FFMPEG_ENV: &str = "YTDL_SAVER_FFMPEG";

const APP_DIR: &str = "ytdl-saver";
const HISTORY_FILE: &str = "download_history.json";

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub history_path: PathBuf,
    pub download_dir: PathBuf,
    pub ytdlp_program: String,
    pub ffmpeg_program: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults with overrides taken from `lookup`; blank values are ignored.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let history_path = get(HISTORY_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(default_history_path);
        let download_dir = get(DOWNLOAD_DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(default_download_dir);

        Self {
            history_path,
            download_dir,
            ytdlp_program: get(YTDLP_ENV).unwrap_or_else(|| "yt-dlp".to_string()),
            ffmpeg_program: get(FFMPEG_ENV).unwrap_or_else(|| "ffmpeg".to_string()),
        }
    }
}

fn default_history_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|dir| dir.join(APP_DIR))
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_default())
        .join(HISTORY_FILE)
}

fn default_download_dir() -> PathBuf {
    dirs::download_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join("Downloads")))
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_without_overrides() {
        let config = AppConfig::from_lookup(|_| None);
        assert_eq!(config.ytdlp_program, "yt-dlp");
        assert_eq!(config.ffmpeg_program, "ffmpeg");
        assert!(config.history_path.ends_with(HISTORY_FILE));
    }

    #[test]
    fn overrides_win_and_blank_values_are_ignored() {
        let vars: HashMap<&str, &str> = [
            (HISTORY_ENV, "/var/tmp/h.json"),
            (DOWNLOAD_DIR_ENV, "/var/tmp/videos"),
            (YTDLP_ENV, "/opt/bin/yt-dlp"),
            (FFMPEG_ENV, "  "),
        ]
        .into_iter()
        .collect();

        let config = AppConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string()));
        assert_eq!(config.history_path, PathBuf::from("/var/tmp/h.json"));
        assert_eq!(config.download_dir, PathBuf::from("/var/tmp/videos"));
        assert_eq!(config.ytdlp_program, "/opt/bin/yt-dlp");
        assert_eq!(config.ffmpeg_program, "ffmpeg");
    }
}
