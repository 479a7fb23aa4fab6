//! Runtime configuration read from the environment.

use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use zeroize::Zeroizing;

/// Overrides the directory holding the boxes.
pub const ENV_FOLDER: &str = "CRYPTEX_FOLDER";
/// Box opened when no name is given.
pub const ENV_BOX: &str = "CRYPTEX_BOX";
/// Passphrase override, honoured only in debug builds.
pub const ENV_DEBUG_PASSPHRASE: &str = "CRYPTEX_DBGPWD";
/// Idle timeout of the interactive session, in seconds.
pub const ENV_TIMEOUT: &str = "CRYPTEX_TIMEOUT_SEC";
/// Log filter for the tracing subscriber.
pub const ENV_LOG: &str = "CRYPTEX_LOG";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(600);

/// Snapshot of every environment setting the vault consumes.
///
/// Built once per process; the rest of the crate never reads the environment
/// directly.
#[derive(Clone, Default)]
pub struct Config {
    pub folder_override: Option<PathBuf>,
    pub default_box: Option<String>,
    pub debug_passphrase: Option<Zeroizing<String>>,
    pub session_timeout: Option<Duration>,
    pub local_app_data: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let session_timeout = match non_empty(ENV_TIMEOUT) {
            Some(raw) => {
                let secs: u64 = raw
                    .parse()
                    .with_context(|| format!("{ENV_TIMEOUT} must be a number of seconds"))?;
                Some(Duration::from_secs(secs))
            }
            None => None,
        };

        Ok(Self {
            folder_override: non_empty(ENV_FOLDER).map(PathBuf::from),
            default_box: non_empty(ENV_BOX),
            debug_passphrase: debug_passphrase(),
            session_timeout,
            local_app_data: non_empty("LOCALAPPDATA").map(PathBuf::from),
        })
    }

    pub fn timeout(&self) -> Duration {
        self.session_timeout.unwrap_or(DEFAULT_TIMEOUT)
    }

    /// Rows for `cryptex info`; the debug passphrase is never echoed.
    pub fn describe(&self) -> Vec<(&'static str, String)> {
        let show = |v: Option<String>| v.unwrap_or_else(|| "Not set".to_string());
        vec![
            (
                ENV_FOLDER,
                show(self.folder_override.as_ref().map(|p| p.display().to_string())),
            ),
            (ENV_BOX, show(self.default_box.clone())),
            (
                ENV_TIMEOUT,
                format!("{} seconds", self.timeout().as_secs()),
            ),
            (ENV_LOG, show(non_empty(ENV_LOG))),
            (
                ENV_DEBUG_PASSPHRASE,
                if self.debug_passphrase.is_some() {
                    "set (debug build)".to_string()
                } else {
                    "Not set".to_string()
                },
            ),
        ]
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("folder_override", &self.folder_override)
            .field("default_box", &self.default_box)
            .field(
                "debug_passphrase",
                &self.debug_passphrase.as_ref().map(|_| "[REDACTED]"),
            )
            .field("session_timeout", &self.session_timeout)
            .field("local_app_data", &self.local_app_data)
            .finish()
    }
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.is_empty())
}

#[cfg(debug_assertions)]
fn debug_passphrase() -> Option<Zeroizing<String>> {
    non_empty(ENV_DEBUG_PASSPHRASE).map(Zeroizing::new)
}

#[cfg(not(debug_assertions))]
fn debug_passphrase() -> Option<Zeroizing<String>> {
    None
}
