//! Box directory and box path resolution.

use anyhow::{Context, Result, bail};
use directories::BaseDirs;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::config::Config;
use crate::error::BoxError;

const APP_DIR: &str = "cryptex";
const BOXES_DIR: &str = "boxes";

/// Directory holding the boxes.
///
/// Precedence:
/// 1. `CRYPTEX_FOLDER`
/// 2. platform config dir + `cryptex/boxes`
/// 3. `LOCALAPPDATA` + `cryptex/boxes` (Windows only)
/// 4. home dir + `.cryptex/boxes`
/// 5. relative `boxes`
pub fn box_dir(config: &Config) -> PathBuf {
    if let Some(dir) = &config.folder_override {
        return dir.clone();
    }

    let base = BaseDirs::new();

    if let Some(base) = &base {
        let config_dir = base.config_dir();
        if !config_dir.as_os_str().is_empty() {
            return config_dir.join(APP_DIR).join(BOXES_DIR);
        }
    }

    if cfg!(windows) {
        if let Some(local) = &config.local_app_data {
            return local.join(APP_DIR).join(BOXES_DIR);
        }
    }

    if let Some(base) = &base {
        let home = base.home_dir();
        if !home.as_os_str().is_empty() {
            return home.join(format!(".{APP_DIR}")).join(BOXES_DIR);
        }
    }

    PathBuf::from(BOXES_DIR)
}

/// Resolves [`box_dir`] to an absolute path and creates it if missing.
///
/// Idempotent: an existing directory is left alone.
pub fn init_box_dir(config: &Config) -> Result<PathBuf> {
    let dir = box_dir(config);
    let abs = std::path::absolute(&dir).with_context(|| {
        format!(
            "failed to resolve absolute path for box folder {}",
            dir.display()
        )
    })?;

    fs::create_dir_all(&abs)
        .with_context(|| format!("failed to create box folder {}", abs.display()))?;

    Ok(abs)
}

/// Maps a box locator onto a file path.
///
/// First match wins:
/// 1. `locator` names an existing regular file
/// 2. `locator` is a bare name inside `dir`
/// 3. no locator: `CRYPTEX_BOX` inside `dir`
pub fn resolve_box_path(dir: &Path, locator: Option<&str>, config: &Config) -> Result<PathBuf> {
    let name = match locator.filter(|l| !l.is_empty()) {
        Some(locator) => {
            let candidate = Path::new(locator);
            if is_regular_file(candidate) {
                debug!(path = %candidate.display(), "box locator is an existing file");
                return Ok(candidate.to_path_buf());
            }
            locator.to_string()
        }
        None => match &config.default_box {
            Some(name) => {
                debug!(box_name = %name, "using default box from environment");
                name.clone()
            }
            None => bail!(BoxError::NoBoxSpecified),
        },
    };

    Ok(dir.join(name))
}

fn is_regular_file(path: &Path) -> bool {
    fs::metadata(path).map(|m| m.is_file()).unwrap_or(false)
}
