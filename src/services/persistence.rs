//! 界面状态落盘：面板尺寸和便签，一个 JSON 文件。
//!
//! 加载失败（文件缺失、损坏）一律退回默认值，绝不阻止启动。

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::storage;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedState {
    #[serde(default)]
    pub panel_sizes: BTreeMap<String, u16>,
    #[serde(default)]
    pub notes: String,
}

pub fn load() -> PersistedState {
    match storage::state_file_path() {
        Some(path) => load_from(&path),
        None => PersistedState::default(),
    }
}

pub fn load_from(path: &Path) -> PersistedState {
    let data = match std::fs::read_to_string(path) {
        Ok(data) => data,
        Err(_) => return PersistedState::default(),
    };
    match serde_json::from_str(&data) {
        Ok(state) => state,
        Err(e) => {
            warn!("ignoring corrupt ui state file {}: {e}", path.display());
            PersistedState::default()
        }
    }
}

/// 尽力而为：保存失败只记日志。
pub fn save(state: &PersistedState) {
    let Some(path) = storage::state_file_path() else {
        return;
    };
    if let Err(e) = save_to(&path, state) {
        warn!("failed to save ui state to {}: {e}", path.display());
    }
}

pub fn save_to(path: &PathBuf, state: &PersistedState) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let json = serde_json::to_string_pretty(state)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    std::fs::write(path, json)
}
