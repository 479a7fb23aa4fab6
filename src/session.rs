//! Session context: at most one open box, reused across commands.

use anyhow::{Result, anyhow};
use tracing::debug;

use crate::auth::PassphraseSource;
use crate::boxstore::{BoxStore, OpenedBox};

/// Carries the open box between commands.
///
/// A one-shot command builds a fresh session and drops it on exit; the
/// interactive shell keeps one alive until it quits. Dropping the session
/// zeroizes the cached passphrase.
pub struct Session {
    store: BoxStore,
    passphrases: Box<dyn PassphraseSource>,
    cached: Option<OpenedBox>,
}

impl Session {
    pub fn new(store: BoxStore, passphrases: Box<dyn PassphraseSource>) -> Self {
        Self {
            store,
            passphrases,
            cached: None,
        }
    }

    pub fn store(&self) -> &BoxStore {
        &self.store
    }

    pub fn passphrases(&self) -> &dyn PassphraseSource {
        self.passphrases.as_ref()
    }

    /// The box currently held open, if any.
    pub fn current(&self) -> Option<&OpenedBox> {
        self.cached.as_ref()
    }

    /// Returns the box for `locator`, decrypting it only if it is not the
    /// one already cached. Without a locator the cached box is preferred.
    pub fn open(&mut self, locator: Option<&str>) -> Result<&mut OpenedBox> {
        let locator = locator.filter(|l| !l.is_empty());

        let hit = match (&self.cached, locator) {
            (Some(_), None) => true,
            (Some(cached), Some(_)) => self.store.resolve_path(locator)? == cached.path(),
            (None, _) => false,
        };

        if hit {
            debug!("using the box cached in this session");
            return self
                .cached
                .as_mut()
                .ok_or_else(|| anyhow!("session cache vanished"));
        }

        let opened = self.store.open(locator, self.passphrases.as_ref())?;
        Ok(self.cached.insert(opened))
    }

    /// Adopts an already opened box (e.g. one just created).
    pub fn adopt(&mut self, opened: OpenedBox) -> &mut OpenedBox {
        self.cached.insert(opened)
    }

    /// Writes the cached box back to disk.
    ///
    /// On failure the cache is dropped so the next command re-reads the
    /// file instead of trusting unsaved edits.
    pub fn save(&mut self) -> Result<()> {
        let opened = self
            .cached
            .as_ref()
            .ok_or_else(|| anyhow!("no box is open in this session"))?;

        if let Err(e) = self.store.save(opened) {
            self.clear();
            return Err(e);
        }
        Ok(())
    }

    /// Forgets the cached box and its passphrase.
    pub fn clear(&mut self) {
        if self.cached.take().is_some() {
            debug!("session cache cleared");
        }
    }

    /// Removes the cached box from the session without saving it.
    pub fn take(&mut self) -> Option<OpenedBox> {
        self.cached.take()
    }
}
