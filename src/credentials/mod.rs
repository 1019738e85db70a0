//! File-backed provider credential store.
//!
//! The store is the only component allowed to touch the credential file. Every operation
//! takes an internal lock, reloads the file, applies the change, and writes it back through a
//! temp-file rename, so concurrent HTTP requests cannot interleave partial writes.
//!
//! Keys are base64-encoded at rest. That keeps them out of casual `grep` output and nothing
//! more; the encoding is not a security boundary.

mod obfuscate;

use crate::providers::ProviderName;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use tokio::sync::Mutex;

pub use obfuscate::mask_key;

/// Errors returned by credential store operations.
#[derive(Debug, Error)]
pub enum CredentialError {
    /// No credential is stored for the requested provider.
    #[error("No API key is configured for {0}")]
    NotFound(ProviderName),
    /// The supplied key was empty.
    #[error("API key must not be empty")]
    InvalidKey,
    /// The credential file could not be read or written.
    #[error("Credential file I/O failed: {0}")]
    Io(#[from] std::io::Error),
    /// The credential file exists but could not be understood.
    #[error("Credential file is corrupt: {0}")]
    Corrupt(String),
}

/// Masked view of a stored credential, safe to show to users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CredentialSummary {
    /// Provider the key belongs to.
    pub provider: ProviderName,
    /// Key with everything but a short prefix and suffix hidden.
    pub masked_key: String,
    /// Whether this credential is used when no provider is requested explicitly.
    pub is_default: bool,
    /// RFC3339 timestamp of the first time this provider was added.
    pub added_at: String,
}

/// Raw credential handed to the summarization pipeline.
#[derive(Clone)]
pub struct ResolvedCredential {
    /// Provider the key belongs to.
    pub provider: ProviderName,
    /// Plain API key.
    pub api_key: String,
}

impl fmt::Debug for ResolvedCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedCredential")
            .field("provider", &self.provider)
            .field("api_key", &mask_key(&self.api_key))
            .finish()
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CredentialFile {
    #[serde(default)]
    providers: BTreeMap<ProviderName, StoredCredential>,
    /// Mirror of the flagged entry. Older files only record the default here.
    #[serde(default)]
    default_provider: Option<ProviderName>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredCredential {
    api_key: String,
    #[serde(default)]
    is_default: bool,
    #[serde(default)]
    added_at: String,
    #[serde(default)]
    position: u64,
}

impl CredentialFile {
    fn ordered(&self) -> Vec<(ProviderName, &StoredCredential)> {
        let mut entries: Vec<_> = self
            .providers
            .iter()
            .map(|(name, stored)| (*name, stored))
            .collect();
        entries.sort_by_key(|(name, stored)| (stored.position, *name));
        entries
    }

    fn flagged_default(&self) -> Option<ProviderName> {
        self.ordered()
            .into_iter()
            .find(|(_, stored)| stored.is_default)
            .map(|(name, _)| name)
    }

    fn mark_default(&mut self, provider: ProviderName) {
        for (name, stored) in self.providers.iter_mut() {
            stored.is_default = *name == provider;
        }
    }

    /// Restore the "exactly one default" invariant.
    ///
    /// Preference order: the first flagged entry, then the top-level `default_provider` field,
    /// then the earliest-added entry.
    fn repair_default(&mut self) {
        let defaults = self
            .providers
            .values()
            .filter(|stored| stored.is_default)
            .count();
        if defaults == 1 || self.providers.is_empty() {
            return;
        }
        let recorded = self
            .default_provider
            .filter(|name| self.providers.contains_key(name));
        let chosen = self
            .flagged_default()
            .or(recorded)
            .or_else(|| self.ordered().first().map(|(name, _)| *name));
        if let Some(provider) = chosen {
            self.mark_default(provider);
        }
    }

    fn next_position(&self) -> u64 {
        self.providers
            .values()
            .map(|stored| stored.position + 1)
            .max()
            .unwrap_or(0)
    }
}

/// Service object that owns the credential file.
pub struct CredentialStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl CredentialStore {
    /// Create a store backed by `path`. The file is created on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Location of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Store `api_key` for `provider`, replacing any existing key.
    ///
    /// The first credential added to an empty store becomes the default. Replacing a key keeps
    /// its default flag and original insertion order.
    pub async fn add(&self, provider: ProviderName, api_key: &str) -> Result<(), CredentialError> {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(CredentialError::InvalidKey);
        }

        let _guard = self.lock.lock().await;
        let mut file = self.load().await?;
        let was_empty = file.providers.is_empty();
        let next_position = file.next_position();
        let encoded = obfuscate::encode(api_key);

        match file.providers.get_mut(&provider) {
            Some(existing) => existing.api_key = encoded,
            None => {
                file.providers.insert(
                    provider,
                    StoredCredential {
                        api_key: encoded,
                        is_default: was_empty,
                        added_at: now_rfc3339(),
                        position: next_position,
                    },
                );
            }
        }

        self.save(&mut file).await?;
        tracing::info!(provider = %provider, default = was_empty, "Stored provider credential");
        Ok(())
    }

    /// Delete the credential for `provider`.
    ///
    /// When the removed entry was the default, the earliest-added remaining entry takes over.
    pub async fn remove(&self, provider: ProviderName) -> Result<(), CredentialError> {
        let _guard = self.lock.lock().await;
        let mut file = self.load().await?;
        let removed = file
            .providers
            .remove(&provider)
            .ok_or(CredentialError::NotFound(provider))?;

        let successor = file.ordered().first().map(|(name, _)| *name);
        if let (true, Some(successor)) = (removed.is_default, successor) {
            file.mark_default(successor);
            tracing::info!(provider = %successor, "Promoted credential to default");
        }

        self.save(&mut file).await?;
        tracing::info!(provider = %provider, "Removed provider credential");
        Ok(())
    }

    /// Make `provider` the default credential.
    pub async fn set_default(&self, provider: ProviderName) -> Result<(), CredentialError> {
        let _guard = self.lock.lock().await;
        let mut file = self.load().await?;
        if !file.providers.contains_key(&provider) {
            return Err(CredentialError::NotFound(provider));
        }
        file.mark_default(provider);
        self.save(&mut file).await?;
        tracing::info!(provider = %provider, "Default provider changed");
        Ok(())
    }

    /// List stored credentials in insertion order with masked keys.
    pub async fn list(&self) -> Result<Vec<CredentialSummary>, CredentialError> {
        let _guard = self.lock.lock().await;
        let file = self.load().await?;
        file.ordered()
            .into_iter()
            .map(|(provider, stored)| {
                let key = obfuscate::decode(&stored.api_key)?;
                Ok(CredentialSummary {
                    provider,
                    masked_key: mask_key(&key),
                    is_default: stored.is_default,
                    added_at: stored.added_at.clone(),
                })
            })
            .collect()
    }

    /// Return the default credential, if any provider is configured.
    pub async fn default_credential(&self) -> Result<Option<ResolvedCredential>, CredentialError> {
        let _guard = self.lock.lock().await;
        let file = self.load().await?;
        let Some(provider) = file.flagged_default() else {
            return Ok(None);
        };
        let stored = &file.providers[&provider];
        Ok(Some(ResolvedCredential {
            provider,
            api_key: obfuscate::decode(&stored.api_key)?,
        }))
    }

    /// Return the credential stored for a specific provider.
    pub async fn credential_for(
        &self,
        provider: ProviderName,
    ) -> Result<ResolvedCredential, CredentialError> {
        let _guard = self.lock.lock().await;
        let file = self.load().await?;
        let stored = file
            .providers
            .get(&provider)
            .ok_or(CredentialError::NotFound(provider))?;
        Ok(ResolvedCredential {
            provider,
            api_key: obfuscate::decode(&stored.api_key)?,
        })
    }

    /// Whether at least one provider is configured.
    pub async fn has_any(&self) -> Result<bool, CredentialError> {
        let _guard = self.lock.lock().await;
        Ok(!self.load().await?.providers.is_empty())
    }

    /// Add keys from `GEMINI_API_KEY` / `GROQ_API_KEY` for providers not yet stored.
    ///
    /// Returns the providers that were seeded.
    pub async fn seed_from_env(&self) -> Result<Vec<ProviderName>, CredentialError> {
        let keys: Vec<_> = ProviderName::ALL
            .into_iter()
            .filter_map(|provider| {
                crate::config::load_env_optional(provider.env_key()).map(|key| (provider, key))
            })
            .collect();
        self.seed(keys).await
    }

    /// Store each key whose provider has no entry yet, checking and inserting under one lock.
    async fn seed(
        &self,
        keys: Vec<(ProviderName, String)>,
    ) -> Result<Vec<ProviderName>, CredentialError> {
        let _guard = self.lock.lock().await;
        let mut file = self.load().await?;
        let mut seeded = Vec::new();
        for (provider, key) in keys {
            let key = key.trim();
            if key.is_empty() || file.providers.contains_key(&provider) {
                continue;
            }
            let is_default = file.providers.is_empty();
            let position = file.next_position();
            file.providers.insert(
                provider,
                StoredCredential {
                    api_key: obfuscate::encode(key),
                    is_default,
                    added_at: now_rfc3339(),
                    position,
                },
            );
            seeded.push(provider);
        }
        if !seeded.is_empty() {
            self.save(&mut file).await?;
            tracing::info!(providers = ?seeded, "Seeded provider credentials from environment");
        }
        Ok(seeded)
    }

    async fn load(&self) -> Result<CredentialFile, CredentialError> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                return Ok(CredentialFile::default());
            }
            Err(error) => return Err(error.into()),
        };
        if contents.trim().is_empty() {
            return Ok(CredentialFile::default());
        }
        let mut file: CredentialFile = serde_json::from_str(&contents)
            .map_err(|error| CredentialError::Corrupt(error.to_string()))?;
        file.repair_default();
        Ok(file)
    }

    async fn save(&self, file: &mut CredentialFile) -> Result<(), CredentialError> {
        file.default_provider = file.flagged_default();
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_vec_pretty(file)
            .map_err(|error| CredentialError::Corrupt(error.to_string()))?;
        let staging = self.path.with_extension("json.tmp");
        tokio::fs::write(&staging, json).await?;
        tokio::fs::rename(&staging, &self.path).await?;
        Ok(())
    }
}

fn now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default()
}
