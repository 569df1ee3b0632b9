use std::cell::Cell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::overlay::overlay_model::{AuthStatus, InlineMenuCipher};

/// Credential storage as seen by the coordinator. Storage, decryption and
/// matching live behind this boundary.
pub trait VaultProvider {
    fn auth_status(&self) -> AuthStatus;

    fn ciphers_for_url(&self, url: &str) -> Vec<InlineMenuCipher>;
}

/// In-memory vault keyed by exact page url. Clones share the lock state.
#[derive(Debug, Clone, Default)]
pub struct StaticVault {
    status: Rc<Cell<AuthStatus>>,
    ciphers: HashMap<String, Vec<InlineMenuCipher>>,
}

impl StaticVault {
    pub fn new(status: AuthStatus) -> Self {
        Self {
            status: Rc::new(Cell::new(status)),
            ciphers: HashMap::new(),
        }
    }

    pub fn with_cipher(mut self, url: &str, cipher: InlineMenuCipher) -> Self {
        self.ciphers.entry(url.to_string()).or_default().push(cipher);
        self
    }

    pub fn set_status(&self, status: AuthStatus) {
        self.status.set(status);
    }
}

impl VaultProvider for StaticVault {
    fn auth_status(&self) -> AuthStatus {
        self.status.get()
    }

    fn ciphers_for_url(&self, url: &str) -> Vec<InlineMenuCipher> {
        if self.status.get() != AuthStatus::Unlocked {
            return Vec::new();
        }

        self.ciphers.get(url).cloned().unwrap_or_default()
    }
}
