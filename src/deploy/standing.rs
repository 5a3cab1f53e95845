//! A long-lived account shared by every deployment in the process.

use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::credential::{
    AccountCredential, CleanupError, CredentialError, CredentialManager, KeyFileSystem,
};
use crate::process::CommandRunner;

/// Lazily initialised standing credential.
///
/// The lock is held across initialisation, so concurrent first callers wait
/// for a single keygen and observe the same address. A failed or cancelled
/// initialisation leaves the slot empty and its key files erased.
#[derive(Debug, Default)]
pub struct StandingAccount {
    slot: Mutex<Option<AccountCredential>>,
}

impl StandingAccount {
    /// Creates an empty slot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the standing credential, generating it on first use.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError`] when generation fails; a later call will
    /// try again.
    pub async fn get_or_init<R, F>(
        &self,
        manager: &CredentialManager<R, F>,
    ) -> Result<AccountCredential, CredentialError>
    where
        R: CommandRunner,
        F: KeyFileSystem,
    {
        let mut slot = self.slot.lock().await;
        if let Some(existing) = slot.as_ref() {
            debug!(address = %existing.address, "reusing standing account");
            return Ok(existing.clone());
        }

        let credential = manager.generate().await?.persist();
        info!(address = %credential.address, "standing account initialised");
        *slot = Some(credential.clone());
        Ok(credential)
    }

    /// Current credential, if initialised.
    pub async fn current(&self) -> Option<AccountCredential> {
        self.slot.lock().await.clone()
    }

    /// Erases the standing credential's key files and empties the slot.
    ///
    /// Returns `Ok(false)` when there was nothing to erase.
    ///
    /// # Errors
    ///
    /// Returns [`CleanupError`] when a key file could not be removed. The
    /// slot is emptied regardless.
    pub async fn shutdown<R, F>(&self, manager: &CredentialManager<R, F>) -> Result<bool, CleanupError>
    where
        R: CommandRunner,
        F: KeyFileSystem,
    {
        let Some(credential) = self.slot.lock().await.take() else {
            return Ok(false);
        };
        manager.destroy(&credential)?;
        info!(address = %credential.address, "standing account key files erased");
        Ok(true)
    }
}
