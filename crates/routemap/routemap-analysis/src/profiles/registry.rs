//! Profile registry. Built-in tables are compiled into the binary; extra
//! tables can be loaded from disk and override nothing.

use std::path::Path;
use std::sync::Arc;

use routemap_core::config::ProfilesConfig;
use routemap_core::errors::{ProfileError, ScanError};
use routemap_core::types::collections::FxHashMap;

use super::types::EcosystemProfile;

const BUILTIN: &[(&str, &str)] = &[
    ("express", include_str!("builtin/express.toml")),
    ("nestjs", include_str!("builtin/nestjs.toml")),
    ("fastapi", include_str!("builtin/fastapi.toml")),
    ("flask", include_str!("builtin/flask.toml")),
    ("django", include_str!("builtin/django.toml")),
    ("spring", include_str!("builtin/spring.toml")),
    ("servlet", include_str!("builtin/servlet.toml")),
    ("aspnet", include_str!("builtin/aspnet.toml")),
    ("rails", include_str!("builtin/rails.toml")),
    ("symfony", include_str!("builtin/symfony.toml")),
    ("laravel", include_str!("builtin/laravel.toml")),
    ("ktor", include_str!("builtin/ktor.toml")),
    ("gin", include_str!("builtin/gin.toml")),
    ("actix", include_str!("builtin/actix.toml")),
    ("react-router", include_str!("builtin/react_router.toml")),
];

/// Ecosystem id to prepared profile.
#[derive(Debug, Clone, Default)]
pub struct ProfileRegistry {
    profiles: FxHashMap<String, Arc<EcosystemProfile>>,
    order: Vec<String>,
}

impl ProfileRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in profile.
    pub fn builtin() -> Result<Self, ProfileError> {
        let mut registry = Self::new();
        for (id, source) in BUILTIN {
            let profile = EcosystemProfile::from_toml(source)?;
            if profile.id != *id {
                return Err(ProfileError::Invalid {
                    profile: profile.id,
                    reason: format!("built-in table registered as '{id}'"),
                });
            }
            registry.register(profile)?;
        }
        Ok(registry)
    }

    /// Built-ins filtered by `config.enabled`, then every extra table.
    pub fn from_config(config: &ProfilesConfig, root: &Path) -> Result<Self, ProfileError> {
        let mut registry = Self::builtin()?;
        registry.retain(|id| config.is_enabled(id));
        for extra in &config.extra {
            let path = root.join(extra);
            registry.load_file(&path)?;
        }
        tracing::debug!(count = registry.len(), "profile registry ready");
        Ok(registry)
    }

    pub fn register(&mut self, profile: EcosystemProfile) -> Result<(), ProfileError> {
        if self.profiles.contains_key(&profile.id) {
            return Err(ProfileError::Duplicate { id: profile.id });
        }
        self.order.push(profile.id.clone());
        self.profiles.insert(profile.id.clone(), Arc::new(profile));
        Ok(())
    }

    /// Parse and register one profile table.
    pub fn load_toml(&mut self, source: &str) -> Result<(), ProfileError> {
        self.register(EcosystemProfile::from_toml(source)?)
    }

    pub fn load_file(&mut self, path: &Path) -> Result<(), ProfileError> {
        let source = std::fs::read_to_string(path).map_err(|source| ProfileError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.load_toml(&source)
    }

    pub fn get(&self, id: &str) -> Result<Arc<EcosystemProfile>, ScanError> {
        self.profiles
            .get(id)
            .cloned()
            .ok_or_else(|| ScanError::UnknownEcosystem { id: id.to_string() })
    }

    pub fn contains(&self, id: &str) -> bool {
        self.profiles.contains_key(id)
    }

    /// Ids in registration order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Ids of profiles claiming a file extension.
    pub fn for_extension(&self, extension: &str) -> Vec<&str> {
        self.order
            .iter()
            .filter(|id| {
                self.profiles
                    .get(id.as_str())
                    .is_some_and(|p| p.extensions.iter().any(|e| e.eq_ignore_ascii_case(extension)))
            })
            .map(String::as_str)
            .collect()
    }

    pub fn retain(&mut self, mut keep: impl FnMut(&str) -> bool) {
        self.order.retain(|id| keep(id));
        let order = &self.order;
        self.profiles.retain(|id, _| order.contains(id));
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
