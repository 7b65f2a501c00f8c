//! Provider registry
//!
//! Provider names are normalized (case, whitespace and separators removed) and
//! looked up exactly in the alias table of [`ProviderKey`]. No name can match
//! two providers, so resolution never depends on registration order.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::config::{Config, ProviderConfig};
use crate::error::{Error, Result};
use crate::providers::{KlingProvider, PikaProvider, ProviderContext, RunwayProvider, VideoProvider};
use crate::types::ProviderKey;

/// Builds an adapter from its validated configuration
pub type ProviderFactory = fn(&ProviderConfig, ProviderContext) -> Result<Arc<dyn VideoProvider>>;

/// Canonical form of a provider name: lowercase, without whitespace, `-`, `_` or `.`
pub fn normalize_provider_name(name: &str) -> String {
    name.trim()
        .chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, '-' | '_' | '.'))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Provider key for a human-readable name, if it names a supported provider
pub fn lookup_key(name: &str) -> Option<ProviderKey> {
    let normalized = normalize_provider_name(name);
    ProviderKey::ALL
        .into_iter()
        .find(|key| key.aliases().contains(&normalized.as_str()))
}

/// Check that every alias is normalized and claimed by exactly one provider
pub fn validate_aliases() -> Result<()> {
    let mut owners: HashMap<&'static str, ProviderKey> = HashMap::new();
    for key in ProviderKey::ALL {
        for &alias in key.aliases() {
            if normalize_provider_name(alias) != alias {
                return Err(Error::config(
                    format!("alias {alias:?} of {key} is not normalized"),
                    "aliases",
                ));
            }
            if let Some(owner) = owners.insert(alias, key) {
                return Err(Error::config(
                    format!("alias {alias:?} is claimed by both {owner} and {key}"),
                    "aliases",
                ));
            }
        }
    }
    Ok(())
}

/// Factory for each supported provider
fn factory(key: ProviderKey) -> ProviderFactory {
    match key {
        ProviderKey::Kling => |config, context| Ok(Arc::new(KlingProvider::new(config, context)?)),
        ProviderKey::Runway => |config, context| Ok(Arc::new(RunwayProvider::new(config, context)?)),
        ProviderKey::Pika => |config, context| Ok(Arc::new(PikaProvider::new(config, context)?)),
    }
}

/// Configured adapters, keyed by provider
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: BTreeMap<ProviderKey, Arc<dyn VideoProvider>>,
}

impl ProviderRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate `config` and build an adapter for every configured provider
    ///
    /// # Errors
    ///
    /// Returns a single [`Error::Config`] listing every configuration problem.
    /// No adapter is built unless the whole configuration is valid.
    pub fn from_config(config: &Config, context: ProviderContext) -> Result<Self> {
        validate_aliases()?;
        config.validate()?;

        let mut registry = Self::new();
        for provider_config in &config.providers {
            let key = lookup_key(&provider_config.name).ok_or_else(|| {
                Error::config(
                    format!("unsupported provider {:?}", provider_config.name),
                    "providers",
                )
            })?;
            let provider = factory(key)(provider_config, context.clone())?;
            tracing::debug!(provider = %key, name = %provider_config.name, "provider registered");
            registry = registry.with_provider(provider);
        }
        Ok(registry)
    }

    /// Register an adapter, replacing any adapter with the same key
    pub fn with_provider(mut self, provider: Arc<dyn VideoProvider>) -> Self {
        self.providers.insert(provider.key(), provider);
        self
    }

    /// Adapter for a human-readable provider name
    ///
    /// # Errors
    ///
    /// [`Error::Config`] when the name matches no supported provider or the
    /// provider is not configured. No request is sent either way.
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn VideoProvider>> {
        let key = lookup_key(name)
            .ok_or_else(|| Error::config(format!("unknown provider {name:?}"), "provider"))?;
        self.get(key)
            .ok_or_else(|| Error::config(format!("provider {key} is not configured"), "provider"))
    }

    /// Adapter for a provider key, if configured
    pub fn get(&self, key: ProviderKey) -> Option<Arc<dyn VideoProvider>> {
        self.providers.get(&key).cloned()
    }

    /// Configured provider keys, in key order
    pub fn keys(&self) -> Vec<ProviderKey> {
        self.providers.keys().copied().collect()
    }

    /// Whether no provider is configured
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.keys())
            .finish()
    }
}
