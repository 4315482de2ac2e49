// Model document load/save

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use asbuilt_recon::error::ReconError;
use asbuilt_recon::store::MemoryStore;

pub fn load_model(path: &Path) -> Result<MemoryStore, ReconError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| ReconError::Io(format!("{}: {e}", path.display())))?;
    MemoryStore::from_json(&text)
        .map_err(|e| ReconError::ModelFormat(format!("{}: {e}", path.display())))
}

pub fn save_model(store: &MemoryStore, path: &Path) -> Result<(), ReconError> {
    let json = store.to_json()?;
    std::fs::write(path, json).map_err(|e| ReconError::Io(format!("{}: {e}", path.display())))
}

/// `updated_model_{ddmmyy_HHMM}.json` in `dir`, suffixed `_1`, `_2`, ...
/// when that name is already taken.
pub fn updated_model_path(dir: &Path, at: DateTime<Local>) -> PathBuf {
    let stamp = at.format("%d%m%y_%H%M");
    let first = dir.join(format!("updated_model_{stamp}.json"));
    if !first.exists() {
        return first;
    }
    (1..)
        .map(|n| dir.join(format!("updated_model_{stamp}_{n}.json")))
        .find(|p| !p.exists())
        .unwrap_or(first)
}

/// Persist an updated store under a generated name and return its path.
pub fn save_updated_model(store: &MemoryStore, dir: &Path) -> Result<PathBuf, ReconError> {
    std::fs::create_dir_all(dir).map_err(|e| ReconError::Io(format!("{}: {e}", dir.display())))?;
    let path = updated_model_path(dir, Local::now());
    save_model(store, &path)?;
    log::info!("model written to {}", path.display());
    Ok(path)
}
