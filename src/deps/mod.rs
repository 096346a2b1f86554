//! Named collaborators resolved lazily per record.
//!
//! A [`Dependencies`] map is consulted first. Names it does not hold are
//! built on first use from the [`DependencyRegistry`]: the entity-scoped
//! factory (`"<Entity>.<name>"`) wins over the global one. The built value is
//! kept for later lookups.

use crate::cache::{LruObjectCache, ObjectCache};
use crate::config::StoreConfig;
use crate::core::{ObjectError, ObjectResult};
use crate::hooks::{NoopObserver, ObjectObserver};
use crate::storage::StorageBackend;
use lazy_static::lazy_static;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub const DATABASE: &str = "database";
pub const CACHE: &str = "cache";
pub const OBSERVER: &str = "observer";
pub const CONFIG: &str = "config";

lazy_static! {
    static ref DEFAULT_REGISTRY: Arc<DependencyRegistry> =
        Arc::new(DependencyRegistry::with_defaults());
}

type Shared = Arc<dyn Any + Send + Sync>;
type Factory = Arc<dyn Fn() -> ObjectResult<Shared> + Send + Sync>;

// Values are stored as `Arc<Arc<T>>` erased to `Any` so unsized `T`
// (trait objects) survive the round trip.
fn erase<T: ?Sized + Send + Sync + 'static>(value: Arc<T>) -> Shared {
    Arc::new(value)
}

fn scoped(entity: &str, name: &str) -> String {
    format!("{}.{}", entity, name)
}

/// Factories for dependencies nobody injected explicitly.
#[derive(Default)]
pub struct DependencyRegistry {
    factories: HashMap<String, Factory>,
}

impl DependencyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide cache, a no-op observer and the default configuration.
    /// No database: every caller must supply its own.
    pub fn with_defaults() -> Self {
        Self::new()
            .register::<dyn ObjectCache, _>(CACHE, || {
                Ok(LruObjectCache::global() as Arc<dyn ObjectCache>)
            })
            .register::<dyn ObjectObserver, _>(OBSERVER, || {
                Ok(Arc::new(NoopObserver) as Arc<dyn ObjectObserver>)
            })
            .register::<StoreConfig, _>(CONFIG, || Ok(Arc::new(StoreConfig::default())))
    }

    /// Like [`with_defaults`](Self::with_defaults), but serving `config` and a
    /// cache of `config.cache_capacity` rows shared by every record.
    pub fn from_config(config: StoreConfig) -> Self {
        let cache: Arc<dyn ObjectCache> = Arc::new(LruObjectCache::new(config.cache_capacity));
        let config = Arc::new(config);
        Self::new()
            .register::<dyn ObjectCache, _>(CACHE, move || Ok(cache.clone()))
            .register::<dyn ObjectObserver, _>(OBSERVER, || {
                Ok(Arc::new(NoopObserver) as Arc<dyn ObjectObserver>)
            })
            .register::<StoreConfig, _>(CONFIG, move || Ok(config.clone()))
    }

    /// Shared registry behind [`Dependencies::default`].
    pub fn global() -> Arc<DependencyRegistry> {
        DEFAULT_REGISTRY.clone()
    }

    pub fn register<T, F>(mut self, name: &str, factory: F) -> Self
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn() -> ObjectResult<Arc<T>> + Send + Sync + 'static,
    {
        self.factories
            .insert(name.to_string(), Arc::new(move || factory().map(erase)));
        self
    }

    /// Registers a factory used only by records of `entity`.
    pub fn register_for<T, F>(self, entity: &str, name: &str, factory: F) -> Self
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn() -> ObjectResult<Arc<T>> + Send + Sync + 'static,
    {
        self.register(&scoped(entity, name), factory)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    fn build(&self, name: &str) -> Option<ObjectResult<Shared>> {
        self.factories.get(name).map(|factory| factory())
    }
}

impl fmt::Debug for DependencyRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.factories.keys().collect();
        names.sort();
        f.debug_struct("DependencyRegistry")
            .field("factories", &names)
            .finish()
    }
}

/// Collaborators of one record.
///
/// Cloning copies the current map; later injections do not propagate.
pub struct Dependencies {
    registry: Arc<DependencyRegistry>,
    resolved: Mutex<HashMap<String, Shared>>,
}

impl Dependencies {
    pub fn new(registry: Arc<DependencyRegistry>) -> Self {
        Self {
            registry,
            resolved: Mutex::new(HashMap::new()),
        }
    }

    /// Adds a named collaborator. Names can be injected only once.
    pub fn inject<T: ?Sized + Send + Sync + 'static>(&self, name: &str, value: Arc<T>) -> ObjectResult<()> {
        if name.is_empty() {
            return Err(ObjectError::UnnamedDependency);
        }
        let mut resolved = self.lock();
        if resolved.contains_key(name) {
            return Err(ObjectError::DependencyAlreadyInjected(name.to_string()));
        }
        resolved.insert(name.to_string(), erase(value));
        Ok(())
    }

    pub fn with<T: ?Sized + Send + Sync + 'static>(self, name: &str, value: Arc<T>) -> ObjectResult<Self> {
        self.inject(name, value)?;
        Ok(self)
    }

    pub fn with_backend(self, backend: Arc<dyn StorageBackend>) -> ObjectResult<Self> {
        self.with(DATABASE, backend)
    }

    pub fn with_cache(self, cache: Arc<dyn ObjectCache>) -> ObjectResult<Self> {
        self.with(CACHE, cache)
    }

    pub fn with_observer(self, observer: Arc<dyn ObjectObserver>) -> ObjectResult<Self> {
        self.with(OBSERVER, observer)
    }

    pub fn with_config(self, config: StoreConfig) -> ObjectResult<Self> {
        self.with(CONFIG, Arc::new(config))
    }

    /// True when `name` is injected or was already resolved.
    pub fn is_present(&self, name: &str) -> bool {
        self.lock().contains_key(name)
    }

    /// Looks up `name` for a record of `entity`, building it from the
    /// registry when absent.
    pub fn resolve<T: ?Sized + Send + Sync + 'static>(&self, entity: &str, name: &str) -> ObjectResult<Arc<T>> {
        let scoped_name = scoped(entity, name);
        let shared = self.lookup(&scoped_name, name)?;
        shared
            .downcast_ref::<Arc<T>>()
            .cloned()
            .ok_or_else(|| ObjectError::DependencyUnresolved {
                name: name.to_string(),
                reason: format!("registered value is not a {}", std::any::type_name::<T>()),
            })
    }

    fn lookup(&self, scoped_name: &str, name: &str) -> ObjectResult<Shared> {
        {
            let resolved = self.lock();
            if let Some(shared) = resolved.get(scoped_name).or_else(|| resolved.get(name)) {
                return Ok(shared.clone());
            }
        }

        let (key, built) = match self.registry.build(scoped_name) {
            Some(built) => (scoped_name, built),
            None => match self.registry.build(name) {
                Some(built) => (name, built),
                None => {
                    return Err(ObjectError::DependencyUnresolved {
                        name: name.to_string(),
                        reason: "nothing injected and no factory registered".to_string(),
                    });
                }
            },
        };
        let shared = built.map_err(|err| ObjectError::DependencyUnresolved {
            name: name.to_string(),
            reason: err.to_string(),
        })?;

        Ok(self.lock().entry(key.to_string()).or_insert(shared).clone())
    }

    pub fn backend(&self, entity: &str) -> ObjectResult<Arc<dyn StorageBackend>> {
        self.resolve(entity, DATABASE)
    }

    pub fn cache(&self, entity: &str) -> ObjectResult<Arc<dyn ObjectCache>> {
        self.resolve(entity, CACHE)
    }

    pub fn observer(&self, entity: &str) -> ObjectResult<Arc<dyn ObjectObserver>> {
        self.resolve(entity, OBSERVER)
    }

    pub fn config(&self, entity: &str) -> ObjectResult<Arc<StoreConfig>> {
        self.resolve(entity, CONFIG)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Shared>> {
        self.resolved.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for Dependencies {
    fn default() -> Self {
        Self::new(DependencyRegistry::global())
    }
}

impl Clone for Dependencies {
    fn clone(&self) -> Self {
        Self {
            registry: self.registry.clone(),
            resolved: Mutex::new(self.lock().clone()),
        }
    }
}

impl fmt::Debug for Dependencies {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<String> = self.lock().keys().cloned().collect();
        names.sort();
        f.debug_struct("Dependencies")
            .field("resolved", &names)
            .field("registry", &self.registry)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheKey;
    use crate::storage::MemoryBackend;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_inject_rejects_empty_and_duplicate_names() {
        let deps = Dependencies::new(Arc::new(DependencyRegistry::new()));
        let config = Arc::new(StoreConfig::default());

        assert!(matches!(
            deps.inject("", config.clone()),
            Err(ObjectError::UnnamedDependency)
        ));
        deps.inject(CONFIG, config.clone()).unwrap();
        assert!(matches!(
            deps.inject(CONFIG, config),
            Err(ObjectError::DependencyAlreadyInjected(name)) if name == CONFIG
        ));
    }

    #[test]
    fn test_defaults_have_no_database() {
        let deps = Dependencies::default();
        assert!(deps.cache("Screen").is_ok());
        assert!(deps.observer("Screen").is_ok());
        assert_eq!(deps.config("Screen").unwrap().engine, "InnoDB");

        let err = deps.backend("Screen").err().unwrap();
        assert!(matches!(err, ObjectError::DependencyUnresolved { .. }));
    }

    #[test]
    fn test_injected_value_wins_over_registry() {
        let deps = Dependencies::default()
            .with_config(StoreConfig::default().engine("MyISAM"))
            .unwrap();
        assert_eq!(deps.config("Screen").unwrap().engine, "MyISAM");
    }

    #[test]
    fn test_entity_scoped_factory_wins_over_global() {
        let registry = DependencyRegistry::new()
            .register::<StoreConfig, _>(CONFIG, || Ok(Arc::new(StoreConfig::default())))
            .register_for::<StoreConfig, _>("Room", CONFIG, || {
                Ok(Arc::new(StoreConfig::default().engine("MEMORY")))
            });
        let deps = Dependencies::new(Arc::new(registry));

        assert_eq!(deps.config("Room").unwrap().engine, "MEMORY");
        assert_eq!(deps.config("Screen").unwrap().engine, "InnoDB");
    }

    #[test]
    fn test_factory_runs_once_per_dependencies() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let registry = DependencyRegistry::new().register::<dyn StorageBackend, _>(DATABASE, move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(MemoryBackend::new()) as Arc<dyn StorageBackend>)
        });
        let deps = Dependencies::new(Arc::new(registry));

        let first = deps.backend("Screen").unwrap();
        let second = deps.backend("Screen").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(deps.is_present(DATABASE));
    }

    #[test]
    fn test_registry_from_config_sizes_the_cache() {
        let registry = Arc::new(DependencyRegistry::from_config(
            StoreConfig::default().engine("MyISAM").cache_capacity(2),
        ));
        let first = Dependencies::new(registry.clone());
        let second = Dependencies::new(registry);

        let cache = first.cache("Screen").unwrap();
        for id in 1..=3 {
            cache.put(CacheKey::new("Screen", id), Vec::new());
        }
        assert_eq!(cache.len(), 2);
        assert!(cache.get(&CacheKey::new("Screen", 1)).is_none());

        assert!(Arc::ptr_eq(&cache, &second.cache("Room").unwrap()));
        assert_eq!(second.config("Room").unwrap().engine, "MyISAM");
        assert!(second.backend("Room").is_err());
    }

    #[test]
    fn test_failing_factory_and_type_mismatch() {
        let registry = DependencyRegistry::new()
            .register::<StoreConfig, _>(CONFIG, || {
                Err(ObjectError::MissingConfig("host".to_string()))
            })
            .register::<StoreConfig, _>(CACHE, || Ok(Arc::new(StoreConfig::default())));
        let deps = Dependencies::new(Arc::new(registry));

        let err = deps.config("Screen").unwrap_err();
        assert!(err.to_string().contains("Missing configuration key 'host'"));

        let err = deps.cache("Screen").err().unwrap();
        assert!(err.to_string().contains("could not be resolved"));
    }
}
