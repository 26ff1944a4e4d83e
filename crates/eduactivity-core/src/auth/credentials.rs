use std::collections::HashMap;
use std::sync::Mutex;

use keyring::Entry;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Keychain service name used when none is configured
pub const DEFAULT_SERVICE_NAME: &str = "eduactivity";

/// The two fixed entries a credential store holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKey {
    Access,
    Refresh,
}

impl TokenKey {
    pub const ALL: [TokenKey; 2] = [TokenKey::Access, TokenKey::Refresh];

    /// Storage key name for this entry
    pub fn as_str(self) -> &'static str {
        match self {
            TokenKey::Access => "access_token",
            TokenKey::Refresh => "refresh_token",
        }
    }
}

#[derive(Error, Debug)]
pub enum CredentialError {
    #[error("Keychain error for {key}: {source}")]
    Keyring {
        key: &'static str,
        #[source]
        source: keyring::Error,
    },

    #[error("Credential store lock poisoned")]
    Poisoned,
}

pub type Result<T> = std::result::Result<T, CredentialError>;

/// Access and refresh token as returned by the login endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialPair {
    #[serde(rename = "access")]
    pub access_token: String,
    #[serde(rename = "refresh")]
    pub refresh_token: String,
}

impl CredentialPair {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
        }
    }
}

/// Durable key-value storage for the session's tokens.
///
/// Single-key writes are the only atomicity guaranteed; concurrent writers
/// race and the last write wins.
pub trait CredentialStore: Send + Sync {
    fn get(&self, key: TokenKey) -> Result<Option<String>>;

    fn set(&self, key: TokenKey, value: &str) -> Result<()>;

    /// Remove an entry. Removing an absent entry succeeds.
    fn remove(&self, key: TokenKey) -> Result<()>;

    fn access_token(&self) -> Result<Option<String>> {
        self.get(TokenKey::Access)
    }

    fn refresh_token(&self) -> Result<Option<String>> {
        self.get(TokenKey::Refresh)
    }

    fn set_access_token(&self, token: &str) -> Result<()> {
        self.set(TokenKey::Access, token)
    }

    fn store_pair(&self, pair: &CredentialPair) -> Result<()> {
        self.set(TokenKey::Access, &pair.access_token)?;
        self.set(TokenKey::Refresh, &pair.refresh_token)
    }

    /// Delete both tokens
    fn clear(&self) -> Result<()> {
        for key in TokenKey::ALL {
            self.remove(key)?;
        }
        Ok(())
    }
}

/// Token storage in the OS keychain.
pub struct KeyringCredentialStore {
    service: String,
}

impl KeyringCredentialStore {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self, key: TokenKey) -> Result<Entry> {
        Entry::new(&self.service, key.as_str()).map_err(|source| CredentialError::Keyring {
            key: key.as_str(),
            source,
        })
    }
}

impl Default for KeyringCredentialStore {
    fn default() -> Self {
        Self::new(DEFAULT_SERVICE_NAME)
    }
}

impl CredentialStore for KeyringCredentialStore {
    fn get(&self, key: TokenKey) -> Result<Option<String>> {
        match self.entry(key)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(source) => Err(CredentialError::Keyring {
                key: key.as_str(),
                source,
            }),
        }
    }

    fn set(&self, key: TokenKey, value: &str) -> Result<()> {
        self.entry(key)?
            .set_password(value)
            .map_err(|source| CredentialError::Keyring {
                key: key.as_str(),
                source,
            })
    }

    fn remove(&self, key: TokenKey) -> Result<()> {
        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => {
                debug!(key = key.as_str(), "Removed keychain entry");
                Ok(())
            }
            Err(source) => Err(CredentialError::Keyring {
                key: key.as_str(),
                source,
            }),
        }
    }
}

/// In-process token storage. Each instance is an isolated session.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    entries: Mutex<HashMap<TokenKey, String>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pair(pair: &CredentialPair) -> Self {
        let mut entries = HashMap::new();
        entries.insert(TokenKey::Access, pair.access_token.clone());
        entries.insert(TokenKey::Refresh, pair.refresh_token.clone());
        Self {
            entries: Mutex::new(entries),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self, key: TokenKey) -> Result<Option<String>> {
        let entries = self.entries.lock().map_err(|_| CredentialError::Poisoned)?;
        Ok(entries.get(&key).cloned())
    }

    fn set(&self, key: TokenKey, value: &str) -> Result<()> {
        let mut entries = self.entries.lock().map_err(|_| CredentialError::Poisoned)?;
        entries.insert(key, value.to_string());
        Ok(())
    }

    fn remove(&self, key: TokenKey) -> Result<()> {
        let mut entries = self.entries.lock().map_err(|_| CredentialError::Poisoned)?;
        entries.remove(&key);
        Ok(())
    }
}
