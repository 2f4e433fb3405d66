use alloc::{boxed::Box, sync::Arc, vec::Vec};
use parking_lot::{Mutex, ReentrantMutex};
use tracing::{debug, error, info_span};

use super::cache::Cache;
use crate::{
    any::{self, RcAny, ServiceKey, TypeInfo},
    autowire::{Autowired, Handler},
    cache::Resolved,
    context::Context,
    dependency_resolver::DependencyResolver,
    errors::{InstantiatorErrorKind, ResolveErrorKind, ValidationErrorKind},
    lifetime::Lifetime,
    parameter::ParameterBag,
    registry::{InstantiatorData, Registry},
    service::Service as _,
    validation,
};

/// Root container. Owns the registrations, the parameters and the singleton instances.
///
/// Cloning is cheap, every clone shares the same state.
#[derive(Clone)]
pub struct Container {
    pub(crate) inner: Arc<ContainerInner>,
}

impl Container {
    /// Creates a container after checking the registry against the parameters:
    /// every dependency must be registered, singletons may only depend on singletons
    /// and the dependency graph must be acyclic.
    ///
    /// # Errors
    /// - Returns [`ValidationErrorKind::Registration`] if a service was registered twice
    /// - Returns [`ValidationErrorKind::UnknownService`] or [`ValidationErrorKind::UnknownParameter`] for missing dependencies
    /// - Returns [`ValidationErrorKind::InvalidLifetime`] if a singleton depends on a scoped or transient service
    /// - Returns [`ValidationErrorKind::CyclicDependency`] if services depend on each other
    pub fn new(registry: Registry, params: ParameterBag) -> Result<Self, ValidationErrorKind> {
        let span = info_span!("new_container", services = registry.len(), params = params.len());
        let _guard = span.enter();

        let registry = registry.finish().map_err(|err| {
            error!("{}", err);
            ValidationErrorKind::from(err)
        })?;
        validation::assert_dependencies_valid(&registry, &params)?;

        debug!("Container created");

        Ok(Self {
            inner: Arc::new(ContainerInner {
                registry,
                params,
                cache: Mutex::new(Cache::new()),
                overrides: Mutex::new(any::Map::new()),
                creation: ReentrantMutex::new(()),
            }),
        })
    }

    /// Gets a singleton dependency from the container
    ///
    /// # Errors
    /// - Returns [`ResolveErrorKind::UnknownService`] if the service isn't registered
    /// - Returns [`ResolveErrorKind::ScopeRequired`] if the service isn't a singleton
    #[inline]
    pub fn get<Dep: Send + Sync + 'static>(&self) -> Result<Arc<Dep>, ResolveErrorKind> {
        downcast(self.get_by_key(&ServiceKey::of::<Dep>(None))?)
    }

    /// Same as [`Self::get`] for a registration with the qualifier
    #[allow(clippy::missing_errors_doc)]
    #[inline]
    pub fn get_qualified<Dep: Send + Sync + 'static>(&self, qualifier: &'static str) -> Result<Arc<Dep>, ResolveErrorKind> {
        downcast(self.get_by_key(&ServiceKey::of::<Dep>(Some(qualifier)))?)
    }

    #[inline]
    #[must_use]
    pub fn params(&self) -> &ParameterBag {
        &self.inner.params
    }

    #[inline]
    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.inner.registry
    }

    /// Enters a new scope. The scope ends when [`ScopedContainer::close`] is called or the last clone is dropped.
    #[inline]
    #[must_use]
    pub fn enter_scope(&self) -> ScopedContainer {
        self.enter_scope_with_context(Context::new())
    }

    /// Enters a new scope with values available to [`crate::FromContext`] dependencies
    #[must_use]
    pub fn enter_scope_with_context(&self, context: Context) -> ScopedContainer {
        debug!(context_len = context.map.len(), "Scope entered");

        ScopedContainer {
            inner: Arc::new(ScopedContainerInner {
                root: self.clone(),
                cache: Mutex::new(Cache::new()),
                context,
                creation: ReentrantMutex::new(()),
            }),
        }
    }

    /// Wraps a function so its arguments are injected on each call.
    /// Dependencies of the function are checked once, here.
    ///
    /// # Errors
    /// Returns [`ValidationErrorKind::UnknownService`] or [`ValidationErrorKind::UnknownParameter`] for missing dependencies
    pub fn autowire<H, Deps>(&self, handler: H) -> Result<Autowired<H, Deps>, ValidationErrorKind>
    where
        H: Handler<Deps>,
        Deps: DependencyResolver,
    {
        let dependencies = validation::get_valid_injection_annotated_parameters(self, &TypeInfo::of::<H>(), H::dependencies())?;
        Ok(Autowired::new(handler, self.clone(), dependencies))
    }

    /// Creates every singleton up front, so factory failures show up at startup
    ///
    /// # Errors
    /// Returns the first error of a singleton factory
    pub fn warmup(&self) -> Result<(), ResolveErrorKind> {
        let span = info_span!("warmup");
        let _guard = span.enter();

        let keys: Vec<ServiceKey> = self
            .inner
            .registry
            .entries()
            .filter(|(_, data)| data.config.lifetime == Lifetime::Singleton)
            .map(|(key, _)| *key)
            .collect();
        for key in keys {
            self.get_by_key(&key)?;
        }
        Ok(())
    }

    /// Replaces a registered service with the value until the returned guard is dropped.
    /// The root container and every scope, including already entered ones, get the value instead of calling the factory.
    ///
    /// # Warning
    /// Instances created before the override keep the dependencies they were created with.
    /// Finalizers aren't called for the value.
    ///
    /// # Errors
    /// Returns [`ResolveErrorKind::UnknownService`] if the service isn't registered
    #[inline]
    pub fn override_service<Dep: Send + Sync + 'static>(&self, value: Dep) -> Result<OverrideGuard, ResolveErrorKind> {
        self.override_by_key(ServiceKey::of::<Dep>(None), Arc::new(value))
    }

    /// Same as [`Self::override_service`] for a registration with the qualifier
    #[allow(clippy::missing_errors_doc)]
    #[inline]
    pub fn override_qualified_service<Dep: Send + Sync + 'static>(
        &self,
        qualifier: &'static str,
        value: Dep,
    ) -> Result<OverrideGuard, ResolveErrorKind> {
        self.override_by_key(ServiceKey::of::<Dep>(Some(qualifier)), Arc::new(value))
    }

    /// Closes the container, calling finalizers for resolved singletons in LIFO order.
    ///
    /// # Warning
    /// This method can be called multiple times, but it will only call finalizers for dependencies that were resolved since the last call
    pub fn close(&self) {
        self.inner.close();
    }
}

impl Container {
    fn override_by_key(&self, key: ServiceKey, value: RcAny) -> Result<OverrideGuard, ResolveErrorKind> {
        get_data(&self.inner.registry, &key)?;

        let previous = self.inner.overrides.lock().insert(key, value);
        debug!(dependency = key.type_info.name, qualifier = key.qualifier, "Override set");

        Ok(OverrideGuard {
            container: self.clone(),
            key,
            previous,
        })
    }

    #[inline]
    fn overridden(&self, key: &ServiceKey) -> Option<RcAny> {
        self.inner.overrides.lock().get(key).cloned()
    }

    pub(crate) fn get_by_key(&self, key: &ServiceKey) -> Result<RcAny, ResolveErrorKind> {
        let span = info_span!("get", dependency = key.type_info.name, qualifier = key.qualifier, scope = "root");
        let _guard = span.enter();

        let data = get_data(&self.inner.registry, key)?;
        if data.config.lifetime != Lifetime::Singleton {
            let err = ResolveErrorKind::ScopeRequired {
                type_info: key.type_info,
                lifetime: data.config.lifetime,
            };
            error!("{}", err);
            return Err(err);
        }

        if let Some(dependency) = self.overridden(key) {
            debug!("Overridden");
            return Ok(dependency);
        }

        if let Some(dependency) = self.inner.cache.lock().get(key) {
            debug!("Found in cache");
            return Ok(dependency);
        }
        debug!("Not found in cache");

        let _creation = self.inner.creation.lock();
        // Another thread may have created it while we were waiting
        if let Some(dependency) = self.inner.cache.lock().get(key) {
            debug!("Found in cache");
            return Ok(dependency);
        }

        let dependency = instantiate(data, Resolver::root(self.clone()))?;
        let mut guard = self.inner.cache.lock();
        guard.insert(*key, dependency.clone());
        debug!("Cached");
        if data.finalizer.is_some() {
            guard.push_resolved(Resolved {
                key: *key,
                dependency: dependency.clone(),
            });
            debug!("Pushed to resolved set");
        }
        Ok(dependency)
    }
}

pub(crate) struct ContainerInner {
    pub(crate) registry: Registry,
    pub(crate) params: ParameterBag,
    pub(crate) cache: Mutex<Cache>,
    overrides: Mutex<any::Map>,
    creation: ReentrantMutex<()>,
}

impl ContainerInner {
    fn close(&self) {
        let resolved_set = self.cache.lock().take_resolved_set();
        finalize(&self.registry, resolved_set);
    }
}

impl Drop for ContainerInner {
    fn drop(&mut self) {
        self.close();
        debug!("Container closed on drop");
    }
}

/// Keeps a service overridden, see [`Container::override_service`].
/// Dropping it restores the previous override or the registered factory.
#[must_use = "the override is removed when the guard is dropped"]
pub struct OverrideGuard {
    container: Container,
    key: ServiceKey,
    previous: Option<RcAny>,
}

impl Drop for OverrideGuard {
    fn drop(&mut self) {
        let mut overrides = self.container.inner.overrides.lock();
        match self.previous.take() {
            Some(previous) => {
                overrides.insert(self.key, previous);
            }
            None => {
                overrides.remove(&self.key);
            }
        }
        debug!(dependency = self.key.type_info.name, qualifier = self.key.qualifier, "Override removed");
    }
}

/// Container of one scope, usually one request.
///
/// Singletons are taken from the root container, scoped instances live as long as this scope,
/// transient ones are created on every resolution.
#[derive(Clone)]
pub struct ScopedContainer {
    pub(crate) inner: Arc<ScopedContainerInner>,
}

impl ScopedContainer {
    /// Gets a dependency of any lifetime
    ///
    /// # Errors
    /// - Returns [`ResolveErrorKind::UnknownService`] if the service isn't registered
    /// - Returns [`ResolveErrorKind::Instantiator`] if the factory or one of its dependencies fails
    #[inline]
    pub fn get<Dep: Send + Sync + 'static>(&self) -> Result<Arc<Dep>, ResolveErrorKind> {
        downcast(self.get_by_key(&ServiceKey::of::<Dep>(None))?)
    }

    /// Same as [`Self::get`] for a registration with the qualifier
    #[allow(clippy::missing_errors_doc)]
    #[inline]
    pub fn get_qualified<Dep: Send + Sync + 'static>(&self, qualifier: &'static str) -> Result<Arc<Dep>, ResolveErrorKind> {
        downcast(self.get_by_key(&ServiceKey::of::<Dep>(Some(qualifier)))?)
    }

    #[inline]
    #[must_use]
    pub fn root(&self) -> &Container {
        &self.inner.root
    }

    #[inline]
    #[must_use]
    pub fn context(&self) -> &Context {
        &self.inner.context
    }

    #[inline]
    #[must_use]
    pub fn params(&self) -> &ParameterBag {
        self.inner.root.params()
    }

    #[inline]
    #[must_use]
    pub fn resolver(&self) -> Resolver {
        Resolver::scoped(self.clone())
    }

    /// Closes the scope, calling finalizers for scoped and transient dependencies it created in LIFO order.
    ///
    /// # Warning
    /// This method can be called multiple times, but it will only call finalizers for dependencies that were resolved since the last call
    pub fn close(&self) {
        self.inner.close();
    }
}

impl ScopedContainer {
    pub(crate) fn get_by_key(&self, key: &ServiceKey) -> Result<RcAny, ResolveErrorKind> {
        let span = info_span!("get", dependency = key.type_info.name, qualifier = key.qualifier, scope = "scoped");
        let _guard = span.enter();

        let root = &self.inner.root;
        let data = get_data(&root.inner.registry, key)?;

        let lifetime = data.config.lifetime;
        if lifetime == Lifetime::Singleton {
            return root.get_by_key(key);
        }

        if let Some(dependency) = root.overridden(key) {
            debug!("Overridden");
            return Ok(dependency);
        }

        if !lifetime.is_cached() {
            let dependency = instantiate(data, self.resolver())?;
            if data.finalizer.is_some() {
                self.inner.cache.lock().push_resolved(Resolved {
                    key: *key,
                    dependency: dependency.clone(),
                });
                debug!("Pushed to resolved set");
            }
            return Ok(dependency);
        }

        if let Some(dependency) = self.inner.cache.lock().get(key) {
            debug!("Found in cache");
            return Ok(dependency);
        }
        debug!("Not found in cache");

        let _creation = self.inner.creation.lock();
        if let Some(dependency) = self.inner.cache.lock().get(key) {
            debug!("Found in cache");
            return Ok(dependency);
        }

        let dependency = instantiate(data, self.resolver())?;
        let mut guard = self.inner.cache.lock();
        guard.insert(*key, dependency.clone());
        debug!("Cached");
        if data.finalizer.is_some() {
            guard.push_resolved(Resolved {
                key: *key,
                dependency: dependency.clone(),
            });
            debug!("Pushed to resolved set");
        }
        Ok(dependency)
    }
}

pub(crate) struct ScopedContainerInner {
    pub(crate) root: Container,
    pub(crate) cache: Mutex<Cache>,
    pub(crate) context: Context,
    creation: ReentrantMutex<()>,
}

impl ScopedContainerInner {
    fn close(&self) {
        let resolved_set = self.cache.lock().take_resolved_set();
        finalize(&self.root.inner.registry, resolved_set);
    }
}

impl Drop for ScopedContainerInner {
    fn drop(&mut self) {
        self.close();
        debug!("Scope closed on drop");
    }
}

/// Handle passed to [`DependencyResolver::resolve`].
/// Created by the root container for singleton factories and by a scope for everything else.
#[derive(Clone)]
pub struct Resolver {
    root: Container,
    scope: Option<ScopedContainer>,
}

impl Resolver {
    #[inline]
    #[must_use]
    pub(crate) const fn root(root: Container) -> Self {
        Self { root, scope: None }
    }

    #[inline]
    #[must_use]
    pub(crate) fn scoped(scope: ScopedContainer) -> Self {
        Self {
            root: scope.inner.root.clone(),
            scope: Some(scope),
        }
    }

    /// Gets a service from the scope if there is one, otherwise from the root container
    #[allow(clippy::missing_errors_doc)]
    #[inline]
    pub fn get<Dep: Send + Sync + 'static>(&self, qualifier: Option<&'static str>) -> Result<Arc<Dep>, ResolveErrorKind> {
        let key = ServiceKey::of::<Dep>(qualifier);
        downcast(match &self.scope {
            Some(scope) => scope.get_by_key(&key)?,
            None => self.root.get_by_key(&key)?,
        })
    }

    /// Gets a value handed to the scope on entering
    ///
    /// # Errors
    /// Returns [`ResolveErrorKind::NotInContext`] outside of a scope or if the scope was entered without the value
    pub fn context<T: Send + Sync + 'static>(&self) -> Result<Arc<T>, ResolveErrorKind> {
        match self.scope.as_ref().and_then(|scope| scope.inner.context.get::<T>()) {
            Some(value) => Ok(value),
            None => {
                let err = ResolveErrorKind::NotInContext {
                    type_info: TypeInfo::of::<T>(),
                };
                error!("{}", err);
                Err(err)
            }
        }
    }

    #[inline]
    #[must_use]
    pub fn params(&self) -> &ParameterBag {
        self.root.params()
    }
}

fn get_data<'a>(registry: &'a Registry, key: &ServiceKey) -> Result<&'a InstantiatorData, ResolveErrorKind> {
    registry.get(key).ok_or_else(|| {
        let err = ResolveErrorKind::UnknownService {
            type_info: key.type_info,
            qualifier: key.qualifier,
        };
        error!("{}", err);
        err
    })
}

fn instantiate(data: &InstantiatorData, resolver: Resolver) -> Result<RcAny, ResolveErrorKind> {
    match data.instantiator.clone().call(resolver) {
        Ok(dependency) => Ok(dependency),
        Err(InstantiatorErrorKind::Deps(err)) => {
            error!("{}", err);
            Err(ResolveErrorKind::Instantiator(InstantiatorErrorKind::Deps(Box::new(err))))
        }
        Err(InstantiatorErrorKind::Factory(err)) => {
            error!("{}", err);
            Err(ResolveErrorKind::Instantiator(InstantiatorErrorKind::Factory(err)))
        }
    }
}

fn downcast<Dep: Send + Sync + 'static>(dependency: RcAny) -> Result<Arc<Dep>, ResolveErrorKind> {
    dependency.downcast::<Dep>().map_err(|incorrect_type| {
        let err = ResolveErrorKind::IncorrectType {
            expected: core::any::TypeId::of::<Dep>(),
            actual: (*incorrect_type).type_id(),
        };
        error!("{}", err);
        err
    })
}

fn finalize(registry: &Registry, mut resolved_set: crate::cache::ResolvedSet) {
    while let Some(Resolved { key, dependency }) = resolved_set.pop_last() {
        if let Some(finalizer) = registry.get(&key).and_then(|data| data.finalizer.as_ref()) {
            let _ = finalizer.clone().call(dependency);
            debug!(dependency = key.type_info.name, "Finalizer called");
        }
    }
}

#[allow(dead_code)]
#[cfg(test)]
mod tests {
    extern crate std;

    use super::Container;
    use crate::{
        errors::{InstantiateErrorKind, ResolveErrorKind},
        inject::{FromContext, Inject, InjectQualified},
        lifetime::Lifetime,
        qualifier, Config, Context, ParameterBag, Qualifier as _, Registry,
    };

    use alloc::{
        format,
        string::{String, ToString as _},
        sync::Arc,
        vec::Vec,
    };
    use core::sync::atomic::{AtomicU8, Ordering};
    use parking_lot::Mutex;
    use std::thread;
    use tracing::debug;
    use tracing_test::traced_test;

    struct Request1;
    struct Request2(Arc<Request1>);
    struct Request3(Arc<Request1>, Arc<Request2>);

    qualifier!(Primary = "primary");

    #[test]
    #[traced_test]
    fn test_singleton_get() {
        let request1_call_count = Arc::new(AtomicU8::new(0));

        let container = Container::new(
            Registry::new()
                .provide(
                    {
                        let request1_call_count = request1_call_count.clone();
                        move || {
                            request1_call_count.fetch_add(1, Ordering::SeqCst);

                            debug!("Call instantiator request1");
                            Ok::<_, InstantiateErrorKind>(Request1)
                        }
                    },
                    Lifetime::Singleton,
                )
                .provide(|Inject(req): Inject<Request1>| Ok(Request2(req)), Lifetime::Singleton),
            ParameterBag::new(),
        )
        .unwrap();

        let request2_1 = container.get::<Request2>().unwrap();
        let request2_2 = container.get::<Request2>().unwrap();
        let request2_3 = container.enter_scope().get::<Request2>().unwrap();
        let request1 = container.enter_scope().get::<Request1>().unwrap();

        assert!(Arc::ptr_eq(&request2_1, &request2_2));
        assert!(Arc::ptr_eq(&request2_1, &request2_3));
        assert!(Arc::ptr_eq(&request2_1.0, &request1));
        assert_eq!(request1_call_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    #[traced_test]
    fn test_scoped_get() {
        let request1_call_count = Arc::new(AtomicU8::new(0));

        let container = Container::new(
            Registry::new()
                .provide(
                    {
                        let request1_call_count = request1_call_count.clone();
                        move || {
                            request1_call_count.fetch_add(1, Ordering::SeqCst);
                            Ok::<_, InstantiateErrorKind>(Request1)
                        }
                    },
                    Lifetime::Scoped,
                )
                .provide(|Inject(req): Inject<Request1>| Ok(Request2(req)), Lifetime::Scoped)
                .provide(
                    |Inject(req1): Inject<Request1>, Inject(req2): Inject<Request2>| Ok(Request3(req1, req2)),
                    Lifetime::Scoped,
                ),
            ParameterBag::new(),
        )
        .unwrap();

        let scope_1 = container.enter_scope();
        let request3_1 = scope_1.get::<Request3>().unwrap();
        let request3_2 = scope_1.get::<Request3>().unwrap();

        assert!(Arc::ptr_eq(&request3_1, &request3_2));
        assert!(Arc::ptr_eq(&request3_1.0, &request3_1.1 .0));
        assert_eq!(request1_call_count.load(Ordering::SeqCst), 1);

        let scope_2 = container.enter_scope();
        let request3_3 = scope_2.get::<Request3>().unwrap();

        assert!(!Arc::ptr_eq(&request3_1, &request3_3));
        assert_eq!(request1_call_count.load(Ordering::SeqCst), 2);
    }

    #[test]
    #[traced_test]
    fn test_transient_get() {
        let request1_call_count = Arc::new(AtomicU8::new(0));

        let container = Container::new(
            Registry::new().provide(
                {
                    let request1_call_count = request1_call_count.clone();
                    move || {
                        request1_call_count.fetch_add(1, Ordering::SeqCst);
                        Ok::<_, InstantiateErrorKind>(Request1)
                    }
                },
                Lifetime::Transient,
            ),
            ParameterBag::new(),
        )
        .unwrap();

        let scope = container.enter_scope();
        let request1_1 = scope.get::<Request1>().unwrap();
        let request1_2 = scope.get::<Request1>().unwrap();

        assert!(!Arc::ptr_eq(&request1_1, &request1_2));
        assert_eq!(request1_call_count.load(Ordering::SeqCst), 2);
    }

    #[test]
    #[traced_test]
    fn test_root_requires_scope() {
        let container = Container::new(
            Registry::new()
                .provide(|| Ok(Request1), Lifetime::Scoped)
                .provide(|| Ok(1u8), Lifetime::Transient),
            ParameterBag::new(),
        )
        .unwrap();

        assert!(matches!(
            container.get::<Request1>(),
            Err(ResolveErrorKind::ScopeRequired {
                lifetime: Lifetime::Scoped,
                ..
            })
        ));
        assert!(matches!(
            container.get::<u8>(),
            Err(ResolveErrorKind::ScopeRequired {
                lifetime: Lifetime::Transient,
                ..
            })
        ));
        assert!(logs_contain("Please enter a scope first"));
    }

    #[test]
    #[traced_test]
    fn test_unknown_service() {
        let container = Container::new(Registry::new().provide(|| Ok(Request1), Lifetime::Singleton), ParameterBag::new()).unwrap();

        assert!(matches!(
            container.get::<Request2>(),
            Err(ResolveErrorKind::UnknownService { qualifier: None, .. })
        ));
        assert!(matches!(
            container.enter_scope().get_qualified::<Request1>("primary"),
            Err(ResolveErrorKind::UnknownService {
                qualifier: Some("primary"),
                ..
            })
        ));
    }

    #[test]
    #[traced_test]
    fn test_qualified_get() {
        let container = Container::new(
            Registry::new()
                .provide(|| Ok(1u32), Lifetime::Singleton)
                .provide_with_config(|| Ok(2u32), Config::new(Lifetime::Singleton).with_qualifier(Primary::NAME))
                .provide(
                    |Inject(default): Inject<u32>, InjectQualified(primary, _): InjectQualified<u32, Primary>| {
                        Ok(u64::from(*default + *primary))
                    },
                    Lifetime::Scoped,
                ),
            ParameterBag::new(),
        )
        .unwrap();

        assert_eq!(*container.get::<u32>().unwrap(), 1);
        assert_eq!(*container.get_qualified::<u32>("primary").unwrap(), 2);
        assert_eq!(*container.enter_scope().get::<u64>().unwrap(), 3);
    }

    #[test]
    #[traced_test]
    fn test_context() {
        struct Request(&'static str);
        struct Handler(&'static str);

        let container = Container::new(
            Registry::new().provide(|FromContext(request): FromContext<Request>| Ok(Handler(request.0)), Lifetime::Scoped),
            ParameterBag::new(),
        )
        .unwrap();

        let scope = container.enter_scope_with_context(Context::new().with(Request("/users")));
        assert_eq!(scope.get::<Handler>().unwrap().0, "/users");

        let scope = container.enter_scope();
        let Err(ResolveErrorKind::Instantiator(_)) = scope.get::<Handler>() else {
            panic!("context value should be missing");
        };
        assert!(logs_contain("is only available within a scope"));
    }

    #[test]
    #[traced_test]
    fn test_factory_error() {
        let container = Container::new(
            Registry::new()
                .provide(
                    || Err::<Request1, _>(InstantiateErrorKind::from(anyhow::anyhow!("connection refused"))),
                    Lifetime::Scoped,
                )
                .provide(|Inject(_): Inject<Request1>| Ok(2u8), Lifetime::Scoped),
            ParameterBag::new(),
        )
        .unwrap();
        let scope = container.enter_scope();

        assert!(matches!(
            scope.get::<Request1>(),
            Err(ResolveErrorKind::Instantiator(crate::errors::InstantiatorErrorKind::Factory(_)))
        ));
        assert!(matches!(
            scope.get::<u8>(),
            Err(ResolveErrorKind::Instantiator(crate::errors::InstantiatorErrorKind::Deps(_)))
        ));
        assert!(logs_contain("connection refused"));
    }

    #[test]
    #[traced_test]
    fn test_finalizers_lifo() {
        let finalized = Arc::new(Mutex::new(Vec::new()));

        let container = Container::new(
            Registry::new()
                .provide(|| Ok(Request1), Lifetime::Singleton)
                .provide(|Inject(req): Inject<Request1>| Ok(Request2(req)), Lifetime::Scoped)
                .provide(
                    |Inject(req1): Inject<Request1>, Inject(req2): Inject<Request2>| Ok(Request3(req1, req2)),
                    Lifetime::Transient,
                )
                .add_finalizer({
                    let finalized = finalized.clone();
                    move |_: Arc<Request1>| finalized.lock().push("request1")
                })
                .add_finalizer({
                    let finalized = finalized.clone();
                    move |_: Arc<Request2>| finalized.lock().push("request2")
                })
                .add_finalizer({
                    let finalized = finalized.clone();
                    move |_: Arc<Request3>| finalized.lock().push("request3")
                }),
            ParameterBag::new(),
        )
        .unwrap();

        let scope = container.enter_scope();
        let _ = scope.get::<Request3>().unwrap();
        let _ = scope.get::<Request3>().unwrap();
        scope.close();

        assert_eq!(*finalized.lock(), ["request3", "request3", "request2"]);

        // Closing again calls nothing
        scope.close();
        assert_eq!(finalized.lock().len(), 3);

        container.close();
        assert_eq!(*finalized.lock(), ["request3", "request3", "request2", "request1"]);
    }

    #[test]
    #[traced_test]
    fn test_scope_closed_on_drop() {
        let finalized = Arc::new(AtomicU8::new(0));

        let container = Container::new(
            Registry::new().provide(|| Ok(Request1), Lifetime::Scoped).add_finalizer({
                let finalized = finalized.clone();
                move |_: Arc<Request1>| {
                    finalized.fetch_add(1, Ordering::SeqCst);
                }
            }),
            ParameterBag::new(),
        )
        .unwrap();

        {
            let scope = container.enter_scope();
            let _ = scope.get::<Request1>().unwrap();
        }
        assert_eq!(finalized.load(Ordering::SeqCst), 1);
        assert!(logs_contain("Scope closed on drop"));
    }

    #[test]
    #[traced_test]
    fn test_warmup() {
        let request1_call_count = Arc::new(AtomicU8::new(0));

        let container = Container::new(
            Registry::new()
                .provide(
                    {
                        let request1_call_count = request1_call_count.clone();
                        move || {
                            request1_call_count.fetch_add(1, Ordering::SeqCst);
                            Ok::<_, InstantiateErrorKind>(Request1)
                        }
                    },
                    Lifetime::Singleton,
                )
                .provide(|| Ok(1u8), Lifetime::Scoped),
            ParameterBag::new(),
        )
        .unwrap();

        container.warmup().unwrap();
        assert_eq!(request1_call_count.load(Ordering::SeqCst), 1);

        let _ = container.get::<Request1>().unwrap();
        assert_eq!(request1_call_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    #[traced_test]
    fn test_concurrent_scoped_get() {
        let request1_call_count = Arc::new(AtomicU8::new(0));

        let container = Container::new(
            Registry::new()
                .provide(
                    {
                        let request1_call_count = request1_call_count.clone();
                        move || {
                            request1_call_count.fetch_add(1, Ordering::SeqCst);
                            Ok::<_, InstantiateErrorKind>(Request1)
                        }
                    },
                    Lifetime::Singleton,
                )
                .provide(|Inject(req): Inject<Request1>| Ok(Request2(req)), Lifetime::Scoped),
            ParameterBag::new(),
        )
        .unwrap();

        let scope = container.enter_scope();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let scope = scope.clone();
                thread::spawn(move || scope.get::<Request2>().unwrap())
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|handle| handle.join().unwrap()).collect();

        for result in &results {
            assert!(Arc::ptr_eq(result, &results[0]));
        }
        assert_eq!(request1_call_count.load(Ordering::SeqCst), 1);
    }

    struct Pool(&'static str);
    struct Session(Arc<Pool>);

    fn pool_registry() -> Registry {
        Registry::new()
            .provide(|| Ok(Pool("primary")), Lifetime::Singleton)
            .provide_with_config(|| Ok(Pool("replica")), Config::new(Lifetime::Singleton).with_qualifier(Primary::NAME))
            .provide(|Inject(pool): Inject<Pool>| Ok(Session(pool)), Lifetime::Scoped)
    }

    #[test]
    #[traced_test]
    fn test_override_service() {
        let container = Container::new(pool_registry(), ParameterBag::new()).unwrap();
        let entered_before = container.enter_scope();

        let guard = container.override_service(Pool("mock")).unwrap();
        assert!(logs_contain("Override set"));

        assert_eq!(container.get::<Pool>().unwrap().0, "mock");
        assert_eq!(entered_before.get::<Pool>().unwrap().0, "mock");
        assert_eq!(container.enter_scope().get::<Session>().unwrap().0 .0, "mock");
        assert_eq!(container.get_qualified::<Pool>(Primary::NAME).unwrap().0, "replica");

        drop(guard);
        assert!(logs_contain("Override removed"));

        assert_eq!(container.get::<Pool>().unwrap().0, "primary");
        assert_eq!(entered_before.get::<Pool>().unwrap().0, "primary");
        assert_eq!(container.enter_scope().get::<Session>().unwrap().0 .0, "primary");
    }

    #[test]
    #[traced_test]
    fn test_override_nested_restores_previous() {
        let container = Container::new(pool_registry(), ParameterBag::new()).unwrap();

        let outer = container.override_qualified_service(Primary::NAME, Pool("outer")).unwrap();
        let inner = container.override_qualified_service(Primary::NAME, Pool("inner")).unwrap();
        assert_eq!(container.get_qualified::<Pool>(Primary::NAME).unwrap().0, "inner");

        drop(inner);
        assert_eq!(container.get_qualified::<Pool>(Primary::NAME).unwrap().0, "outer");

        drop(outer);
        assert_eq!(container.get_qualified::<Pool>(Primary::NAME).unwrap().0, "replica");
    }

    #[test]
    #[traced_test]
    fn test_override_scoped_service() {
        let container = Container::new(pool_registry(), ParameterBag::new()).unwrap();
        let scope = container.enter_scope();
        let cached = scope.get::<Session>().unwrap();

        let guard = container.override_service(Session(Arc::new(Pool("mock")))).unwrap();
        let overridden = scope.get::<Session>().unwrap();
        assert_eq!(overridden.0 .0, "mock");
        assert!(Arc::ptr_eq(&overridden, &container.enter_scope().get::<Session>().unwrap()));
        assert!(matches!(container.get::<Session>(), Err(ResolveErrorKind::ScopeRequired { .. })));

        drop(guard);
        assert!(Arc::ptr_eq(&cached, &scope.get::<Session>().unwrap()));
    }

    #[test]
    #[traced_test]
    fn test_override_unknown_service() {
        let container = Container::new(Registry::new(), ParameterBag::new()).unwrap();

        assert!(matches!(
            container.override_service(Pool("mock")),
            Err(ResolveErrorKind::UnknownService { qualifier: None, .. })
        ));
        assert!(container.override_qualified_service(Primary::NAME, Pool("mock")).is_err());
    }
}
