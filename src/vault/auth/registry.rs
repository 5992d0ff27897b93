//! # Auth Method Registry
//!
//! Maps auth type names (as used in `spec.auth.type`) to constructors.
//! Constructors are looked up by exact, case-sensitive name.

use super::kubernetes;
use super::{AuthDefaults, AuthError, AuthMethod};
use crate::constants::DEFAULT_AUTH_METHOD;
use crate::crd::VaultAuthSpec;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;

/// Builds an auth method from the auth section of a resource
pub type AuthMethodFactory =
    Arc<dyn Fn(&VaultAuthSpec) -> Result<Box<dyn AuthMethod>, AuthError> + Send + Sync>;

/// Name to constructor mapping
///
/// Safe to share between reconcilers. Registration normally happens once at
/// startup, lookups happen on every new connection.
#[derive(Default)]
pub struct AuthMethodRegistry {
    methods: RwLock<HashMap<String, AuthMethodFactory>>,
}

impl std::fmt::Debug for AuthMethodRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthMethodRegistry")
            .field("methods", &self.names())
            .finish()
    }
}

impl AuthMethodRegistry {
    /// Empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in methods
    ///
    /// `kubernetes` is registered under its own name and as the default for an
    /// empty auth type.
    #[must_use]
    pub fn with_defaults(defaults: AuthDefaults) -> Self {
        let registry = Self::new();
        let factory = kubernetes::factory(defaults);
        registry.insert(DEFAULT_AUTH_METHOD, Arc::clone(&factory));
        registry.insert("", factory);
        registry
    }

    /// Register a constructor under `name`
    ///
    /// # Errors
    /// Returns `AuthError::DuplicateStrategy` if `name` is already taken. The
    /// existing registration is kept.
    pub fn register<F>(&self, name: &str, factory: F) -> Result<(), AuthError>
    where
        F: Fn(&VaultAuthSpec) -> Result<Box<dyn AuthMethod>, AuthError> + Send + Sync + 'static,
    {
        let mut methods = self.methods.write().unwrap_or_else(PoisonError::into_inner);
        if methods.contains_key(name) {
            return Err(AuthError::DuplicateStrategy(name.to_string()));
        }
        methods.insert(name.to_string(), Arc::new(factory));
        debug!(auth.method = name, "registered auth method");
        Ok(())
    }

    /// Construct the auth method registered under `name`
    ///
    /// Constructor errors are returned unchanged.
    ///
    /// # Errors
    /// Returns `AuthError::UnknownStrategy` if nothing is registered under `name`.
    pub fn invoke(
        &self,
        name: &str,
        spec: &VaultAuthSpec,
    ) -> Result<Box<dyn AuthMethod>, AuthError> {
        // Run the constructor outside the lock
        let factory = self
            .methods
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
            .ok_or_else(|| AuthError::UnknownStrategy(name.to_string()))?;
        factory(spec)
    }

    /// Registered names, sorted
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .methods
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    fn insert(&self, name: &str, factory: AuthMethodFactory) {
        self.methods
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string(), factory);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vault::auth::LoginRequest;
    use async_trait::async_trait;

    #[derive(Debug)]
    struct NamedMethod(String);

    #[async_trait]
    impl AuthMethod for NamedMethod {
        async fn authenticate(&self) -> Result<LoginRequest, AuthError> {
            Ok(LoginRequest {
                path: format!("auth/{}/login", self.0),
                ..LoginRequest::default()
            })
        }
    }

    fn named(
        name: &'static str,
    ) -> impl Fn(&VaultAuthSpec) -> Result<Box<dyn AuthMethod>, AuthError> {
        move |_: &VaultAuthSpec| -> Result<Box<dyn AuthMethod>, AuthError> {
            Ok(Box::new(NamedMethod(name.to_string())))
        }
    }

    #[tokio::test]
    async fn test_register_and_invoke() {
        let registry = AuthMethodRegistry::new();
        registry.register("dummy", named("dummy")).unwrap();

        let method = registry.invoke("dummy", &VaultAuthSpec::default()).unwrap();
        let request = method.authenticate().await.unwrap();
        assert_eq!(request.path, "auth/dummy/login");
    }

    #[tokio::test]
    async fn test_duplicate_registration_keeps_first() {
        let registry = AuthMethodRegistry::new();
        registry.register("dummy", named("first")).unwrap();

        let err = registry.register("dummy", named("second")).unwrap_err();
        assert_eq!(err.to_string(), "auth method dummy is already registered");

        let method = registry.invoke("dummy", &VaultAuthSpec::default()).unwrap();
        let request = method.authenticate().await.unwrap();
        assert_eq!(request.path, "auth/first/login");
    }

    #[test]
    fn test_unknown_method() {
        let registry = AuthMethodRegistry::new();
        let err = registry
            .invoke("ldap", &VaultAuthSpec::default())
            .unwrap_err();

        assert!(matches!(err, AuthError::UnknownStrategy(ref name) if name == "ldap"));
        assert_eq!(err.to_string(), "auth method ldap is unknown");
    }

    #[test]
    fn test_lookup_is_case_sensitive() {
        let registry = AuthMethodRegistry::new();
        registry.register("dummy", named("dummy")).unwrap();

        assert!(registry.invoke("Dummy", &VaultAuthSpec::default()).is_err());
    }

    #[test]
    fn test_constructor_error_is_propagated() {
        let registry = AuthMethodRegistry::new();
        registry
            .register("broken", |_: &VaultAuthSpec| Err(AuthError::MissingRole))
            .unwrap();

        let err = registry
            .invoke("broken", &VaultAuthSpec::default())
            .unwrap_err();
        assert!(matches!(err, AuthError::MissingRole));
    }

    #[test]
    fn test_defaults_register_kubernetes() {
        let registry = AuthMethodRegistry::with_defaults(AuthDefaults::default());
        assert_eq!(registry.names(), vec!["".to_string(), "kubernetes".to_string()]);

        let err = registry
            .register("kubernetes", named("other"))
            .unwrap_err();
        assert!(matches!(err, AuthError::DuplicateStrategy(_)));
    }

    #[test]
    fn test_concurrent_registration() {
        let registry = Arc::new(AuthMethodRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    let name = format!("method-{i}");
                    registry
                        .register(&name, |_: &VaultAuthSpec| Err(AuthError::MissingRole))
                        .unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(registry.names().len(), 8);
    }
}
