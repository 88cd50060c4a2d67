//! Type-keyed service registry.
//!
//! Handlers ask for services through the [`Inject<T>`](crate::Inject)
//! extractor. Each service type is registered once with a lifetime:
//!
//! - **singleton**: built on first use, then shared by every dispatch
//! - **transient**: built again on every resolve
//!
//! Factories receive the registry so services can depend on each other. A
//! singleton factory must not resolve its own type.

use crate::{CliResult, SystemError};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

type Instance = Arc<dyn Any + Send + Sync>;
type Factory = Arc<dyn Fn(&Services) -> Instance + Send + Sync>;

enum Registration {
    Singleton {
        factory: Factory,
        instance: OnceLock<Instance>,
    },
    Transient {
        factory: Factory,
    },
}

impl Registration {
    fn lifetime(&self) -> &'static str {
        match self {
            Registration::Singleton { .. } => "singleton",
            Registration::Transient { .. } => "transient",
        }
    }
}

/// Services available to handlers and behaviors.
///
/// # Example
///
/// ```
/// use ruta::Services;
///
/// struct Config {
///     url: String,
/// }
///
/// struct Client {
///     base: String,
/// }
///
/// let mut services = Services::new();
/// services.singleton(|_| Config { url: "https://example.com".into() });
/// services.transient(|s| Client {
///     base: s.resolve::<Config>().map(|c| c.url.clone()).unwrap_or_default(),
/// });
///
/// let client = services.resolve::<Client>().unwrap();
/// assert_eq!(client.base, "https://example.com");
/// ```
#[derive(Clone, Default)]
pub struct Services {
    registrations: HashMap<TypeId, Arc<(&'static str, Registration)>>,
}

impl Services {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `T`, built lazily at most once.
    pub fn singleton<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: Any + Send + Sync,
        F: Fn(&Services) -> T + Send + Sync + 'static,
    {
        let registration = Registration::Singleton {
            factory: erase(factory),
            instance: OnceLock::new(),
        };
        self.insert::<T>(registration)
    }

    /// Register an already built `T`.
    pub fn instance<T>(&mut self, value: T) -> &mut Self
    where
        T: Any + Send + Sync,
    {
        let instance: Instance = Arc::new(value);
        let cell = OnceLock::new();
        let _ = cell.set(Arc::clone(&instance));
        let registration = Registration::Singleton {
            factory: Arc::new(move |_| Arc::clone(&instance)),
            instance: cell,
        };
        self.insert::<T>(registration)
    }

    /// Register `T`, built anew on every resolve.
    pub fn transient<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: Any + Send + Sync,
        F: Fn(&Services) -> T + Send + Sync + 'static,
    {
        self.insert::<T>(Registration::Transient {
            factory: erase(factory),
        })
    }

    fn insert<T: Any>(&mut self, registration: Registration) -> &mut Self {
        let name = std::any::type_name::<T>();
        tracing::debug!(service = name, lifetime = registration.lifetime(), "Service registered");
        self.registrations
            .insert(TypeId::of::<T>(), Arc::new((name, registration)));
        self
    }

    /// Whether `T` is registered.
    pub fn contains<T: Any>(&self) -> bool {
        self.registrations.contains_key(&TypeId::of::<T>())
    }

    /// Resolve `T`.
    ///
    /// Fails with [`SystemError::ServiceUnavailable`] when `T` was never
    /// registered.
    pub fn resolve<T: Any + Send + Sync>(&self) -> CliResult<Arc<T>> {
        let name = std::any::type_name::<T>();
        let entry = self
            .registrations
            .get(&TypeId::of::<T>())
            .ok_or_else(|| SystemError::ServiceUnavailable(name.to_string()))?;

        let instance = match &entry.1 {
            Registration::Singleton { factory, instance } => {
                Arc::clone(instance.get_or_init(|| factory(self)))
            }
            Registration::Transient { factory } => factory(self),
        };

        instance.downcast::<T>().map_err(|_| {
            SystemError::Internal(format!("service registered for '{}' has another type", name)).into()
        })
    }
}

impl fmt::Debug for Services {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<(&str, &str)> = self
            .registrations
            .values()
            .map(|entry| (entry.0, entry.1.lifetime()))
            .collect();
        names.sort_unstable();
        f.debug_struct("Services").field("registrations", &names).finish()
    }
}

fn erase<T, F>(factory: F) -> Factory
where
    T: Any + Send + Sync,
    F: Fn(&Services) -> T + Send + Sync + 'static,
{
    Arc::new(move |services: &Services| -> Instance { Arc::new(factory(services)) })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CliError;
    use assert_matches::assert_matches;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug)]
    struct Counter(usize);

    #[test]
    fn test_singleton_built_once() {
        let built = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&built);

        let mut services = Services::new();
        services.singleton(move |_| Counter(seen.fetch_add(1, Ordering::SeqCst)));

        let a = services.resolve::<Counter>().unwrap();
        let b = services.resolve::<Counter>().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(built.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_singleton_shared_across_clones() {
        let mut services = Services::new();
        services.singleton(|_| Counter(7));

        let cloned = services.clone();
        let a = services.resolve::<Counter>().unwrap();
        let b = cloned.resolve::<Counter>().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_transient_built_each_time() {
        let built = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&built);

        let mut services = Services::new();
        services.transient(move |_| Counter(seen.fetch_add(1, Ordering::SeqCst)));

        let a = services.resolve::<Counter>().unwrap();
        let b = services.resolve::<Counter>().unwrap();
        assert_eq!((a.0, b.0), (0, 1));
        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_instance() {
        let mut services = Services::new();
        services.instance(Counter(3));
        assert_eq!(services.resolve::<Counter>().unwrap().0, 3);
        assert!(services.contains::<Counter>());
    }

    #[test]
    fn test_missing_service() {
        let services = Services::new();
        assert_matches!(
            services.resolve::<Counter>(),
            Err(CliError::System(SystemError::ServiceUnavailable(name))) if name.ends_with("Counter")
        );
    }
}
