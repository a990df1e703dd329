//! Auth token resolution: explicit override, then secret store.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::{EnvSettings, SchedulerConfig};

/// Read-only access to named secrets.
pub trait SecretStore: Send + Sync {
    fn access(&self, name: &str) -> Result<String>;
}

/// Secrets as files: `<dir>/<name>`, trimmed.
#[derive(Debug, Clone)]
pub struct FileSecretStore {
    dir: PathBuf,
}

impl FileSecretStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// `secrets_dir` from config, else `~/.config/harvest/secrets`.
    pub fn from_config(cfg: &SchedulerConfig) -> Result<Self> {
        if let Some(dir) = &cfg.secrets_dir {
            return Ok(Self::new(dir));
        }
        let xdg_dirs = xdg::BaseDirectories::with_prefix("harvest")?;
        Ok(Self::new(xdg_dirs.get_config_home().join("secrets")))
    }
}

impl SecretStore for FileSecretStore {
    fn access(&self, name: &str) -> Result<String> {
        if name.is_empty() || name.contains(['/', '\\']) || name == ".." {
            anyhow::bail!("invalid secret name: {:?}", name);
        }
        let path = self.dir.join(name);
        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("read secret {}", path.display()))?;
        let token = raw.trim();
        if token.is_empty() {
            anyhow::bail!("secret {} is empty", name);
        }
        Ok(token.to_string())
    }
}

/// Resolves the bearer token sent with direct invocations. Never fails.
#[derive(Clone, Default)]
pub struct TokenResolver {
    override_token: Option<String>,
    store: Option<Arc<dyn SecretStore>>,
    secret_name: String,
}

impl TokenResolver {
    pub fn new(
        override_token: Option<String>,
        store: Option<Arc<dyn SecretStore>>,
        secret_name: impl Into<String>,
    ) -> Self {
        Self {
            override_token,
            store,
            secret_name: secret_name.into(),
        }
    }

    pub fn from_config(cfg: &SchedulerConfig, env: &EnvSettings) -> Self {
        let store: Option<Arc<dyn SecretStore>> = if cfg.use_secret_store {
            match FileSecretStore::from_config(cfg) {
                Ok(s) => Some(Arc::new(s)),
                Err(e) => {
                    tracing::warn!(error = %format!("{:#}", e), "secret store unavailable");
                    None
                }
            }
        } else {
            None
        };
        Self::new(env.auth_token.clone(), store, cfg.secret_name.clone())
    }

    pub fn resolve(&self) -> Option<String> {
        if let Some(t) = &self.override_token {
            return Some(t.clone());
        }
        let store = self.store.as_ref()?;
        match store.access(&self.secret_name) {
            Ok(t) => Some(t),
            Err(e) => {
                tracing::warn!(
                    secret = %self.secret_name,
                    error = %format!("{:#}", e),
                    "could not load auth token, continuing without"
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn override_wins() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("tok"), "from-store\n").unwrap();
        let store: Arc<dyn SecretStore> = Arc::new(FileSecretStore::new(dir.path()));
        let r = TokenResolver::new(Some("explicit".into()), Some(store.clone()), "tok");
        assert_eq!(r.resolve().as_deref(), Some("explicit"));
        let r = TokenResolver::new(None, Some(store), "tok");
        assert_eq!(r.resolve().as_deref(), Some("from-store"));
    }

    #[test]
    fn store_failures_soft_fail() {
        let dir = tempfile::tempdir().unwrap();
        let store: Arc<dyn SecretStore> = Arc::new(FileSecretStore::new(dir.path()));
        assert!(TokenResolver::new(None, Some(store.clone()), "missing").resolve().is_none());
        std::fs::write(dir.path().join("blank"), "  \n").unwrap();
        assert!(TokenResolver::new(None, Some(store), "blank").resolve().is_none());
        assert!(TokenResolver::default().resolve().is_none());
    }

    #[test]
    fn secret_names_cannot_escape_dir() {
        let store = FileSecretStore::new("/tmp");
        assert!(store.access("../etc/passwd").is_err());
        assert!(store.access("").is_err());
    }
}
