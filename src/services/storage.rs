//! 应用数据目录解析，跟随各平台惯例：
//! - macOS: ~/Library/Application Support/phpdojo
//! - Linux: $XDG_DATA_HOME/phpdojo 或 ~/.local/share/phpdojo
//! - Windows: %APPDATA%\phpdojo

use std::io;
use std::path::PathBuf;

const APP_NAME: &str = "phpdojo";
const EXPORT_DIR: &str = "exports";
const LOG_DIR: &str = "logs";
const STATE_FILE: &str = "ui_state.json";

pub fn app_data_dir() -> Option<PathBuf> {
    #[cfg(target_os = "macos")]
    {
        std::env::var("HOME").ok().map(|home| {
            PathBuf::from(home)
                .join("Library/Application Support")
                .join(APP_NAME)
        })
    }

    #[cfg(target_os = "linux")]
    {
        if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
            Some(PathBuf::from(xdg).join(APP_NAME))
        } else {
            std::env::var("HOME")
                .ok()
                .map(|home| PathBuf::from(home).join(".local/share").join(APP_NAME))
        }
    }

    #[cfg(target_os = "windows")]
    {
        std::env::var("APPDATA")
            .ok()
            .map(|appdata| PathBuf::from(appdata).join(APP_NAME))
    }

    #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
    {
        None
    }
}

fn ensure_subdir(name: &str) -> io::Result<PathBuf> {
    let dir = app_data_dir()
        .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "cannot determine app data dir"))?
        .join(name);
    if !dir.exists() {
        std::fs::create_dir_all(&dir)?;
    }
    Ok(dir)
}

pub fn ensure_export_dir() -> io::Result<PathBuf> {
    ensure_subdir(EXPORT_DIR)
}

pub fn ensure_log_dir() -> io::Result<PathBuf> {
    ensure_subdir(LOG_DIR)
}

pub fn state_file_path() -> Option<PathBuf> {
    app_data_dir().map(|dir| dir.join(STATE_FILE))
}
