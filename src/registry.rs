use alloc::{
    collections::{btree_map::Entry, BTreeMap, BTreeSet},
    vec::Vec,
};
use tracing::{debug, warn};

use super::{
    errors::{InstantiateErrorKind, RegistrationErrorKind, ResolveErrorKind},
    instantiator::BoxedCloneInstantiator,
};
use crate::{
    any::{ServiceKey, TypeInfo},
    config::Config,
    dependency::AnnotatedParameter,
    dependency_resolver::DependencyResolver,
    errors::DFSErrorKind,
    finalizer::{boxed_finalizer_factory, BoxedCloneFinalizer, Finalizer},
    instantiator::{boxed_instantiator, Instantiator},
    lifetime::Lifetime,
};

#[derive(Clone)]
pub struct InstantiatorData {
    pub(crate) instantiator: BoxedCloneInstantiator<ResolveErrorKind, InstantiateErrorKind>,
    pub(crate) finalizer: Option<BoxedCloneFinalizer>,
    pub(crate) config: Config,
    pub(crate) dependencies: Vec<AnnotatedParameter>,
}

impl InstantiatorData {
    #[inline]
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    #[inline]
    #[must_use]
    pub fn dependencies(&self) -> &[AnnotatedParameter] {
        &self.dependencies
    }

    #[inline]
    #[must_use]
    pub const fn has_finalizer(&self) -> bool {
        self.finalizer.is_some()
    }
}

/// Set of service registrations. A container is built from it.
///
/// Registrations are collected without checks; duplicates, missing dependencies and lifetime
/// mismatches are reported by [`crate::Container::new`].
#[derive(Clone, Default)]
pub struct Registry {
    entries: BTreeMap<ServiceKey, InstantiatorData>,
    finalizers: BTreeMap<ServiceKey, BoxedCloneFinalizer>,
    duplicates: Vec<RegistrationErrorKind>,
}

impl Registry {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub fn provide<Inst, Deps>(self, instantiator: Inst, lifetime: Lifetime) -> Self
    where
        Inst: Instantiator<Deps, Error = InstantiateErrorKind> + Send + Sync,
        Inst::Provides: Send + Sync,
        Deps: DependencyResolver<Error = ResolveErrorKind>,
    {
        self.provide_with_config(instantiator, Config::new(lifetime))
    }

    #[inline]
    #[must_use]
    pub fn provide_with_config<Inst, Deps>(mut self, instantiator: Inst, config: Config) -> Self
    where
        Inst: Instantiator<Deps, Error = InstantiateErrorKind> + Send + Sync,
        Inst::Provides: Send + Sync,
        Deps: DependencyResolver<Error = ResolveErrorKind>,
    {
        let key = ServiceKey::of::<Inst::Provides>(config.qualifier);
        self.add_instantiator(
            key,
            InstantiatorData {
                instantiator: boxed_instantiator(instantiator),
                finalizer: None,
                config,
                dependencies: Inst::dependencies(),
            },
        );
        self
    }

    /// Adds a finalizer for the given a non transient dependency type.
    /// The finalizer will be called when the container is being closed in LIFO order of their usage (not the order of registration).
    ///
    /// # Warning
    /// - Finalizers of transient dependencies are called when the scope that created them is closed.
    /// - [`Drop`] trait isn't a equivalent of a finalizer, because:
    ///     1. The finalizer is called in LIFO order of their usage, while [`Drop`] is called when the last reference is released.
    ///     2. The finalized used for life cycle management, while [`Drop`] is used for resource management.
    #[inline]
    #[must_use]
    pub fn add_finalizer<Dep>(self, finalizer: impl Finalizer<Dep> + Send + Sync) -> Self
    where
        Dep: Send + Sync + 'static,
    {
        self.add_finalizer_for(ServiceKey::of::<Dep>(None), finalizer)
    }

    #[inline]
    #[must_use]
    pub fn add_qualified_finalizer<Dep>(self, qualifier: &'static str, finalizer: impl Finalizer<Dep> + Send + Sync) -> Self
    where
        Dep: Send + Sync + 'static,
    {
        self.add_finalizer_for(ServiceKey::of::<Dep>(Some(qualifier)), finalizer)
    }

    /// Moves every registration of another registry, for example one built by a separate module, into this one.
    #[must_use]
    pub fn merge(mut self, other: Registry) -> Self {
        for (key, data) in other.entries {
            self.add_instantiator(key, data);
        }
        self.finalizers.extend(other.finalizers);
        self.duplicates.extend(other.duplicates);
        self
    }

    #[inline]
    #[must_use]
    pub fn is_known<T: 'static>(&self) -> bool {
        self.is_type_with_qualifier_known(&TypeInfo::of::<T>(), None)
    }

    #[inline]
    #[must_use]
    pub fn is_type_with_qualifier_known(&self, type_info: &TypeInfo, qualifier: Option<&str>) -> bool {
        self.entries
            .keys()
            .any(|key| key.type_info == *type_info && key.qualifier == qualifier)
    }

    #[inline]
    #[must_use]
    pub fn lifetime_of(&self, key: &ServiceKey) -> Option<Lifetime> {
        self.entries.get(key).map(|data| data.config.lifetime)
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn entries(&self) -> impl Iterator<Item = (&ServiceKey, &InstantiatorData)> {
        self.entries.iter()
    }
}

impl Registry {
    fn add_instantiator(&mut self, key: ServiceKey, data: InstantiatorData) {
        match self.entries.entry(key) {
            Entry::Vacant(entry) => {
                entry.insert(data);
            }
            Entry::Occupied(_) => {
                let err = RegistrationErrorKind::DuplicateService {
                    type_info: key.type_info,
                    qualifier: key.qualifier,
                };
                warn!("{}", err);
                self.duplicates.push(err);
            }
        }
    }

    fn add_finalizer_for<Dep>(mut self, key: ServiceKey, finalizer: impl Finalizer<Dep> + Send + Sync) -> Self
    where
        Dep: Send + Sync + 'static,
    {
        self.finalizers.insert(key, boxed_finalizer_factory(finalizer));
        self
    }

    #[inline]
    pub(crate) fn get(&self, key: &ServiceKey) -> Option<&InstantiatorData> {
        self.entries.get(key)
    }

    /// Attaches finalizers to their registrations.
    ///
    /// # Errors
    /// Returns the first duplicate registration
    pub(crate) fn finish(mut self) -> Result<Self, RegistrationErrorKind> {
        if let Some(err) = self.duplicates.drain(..).next() {
            return Err(err);
        }

        for (key, finalizer) in core::mem::take(&mut self.finalizers) {
            match self.entries.get_mut(&key) {
                Some(data) => {
                    data.finalizer = Some(finalizer);
                    debug!(dependency = key.type_info.name, "Finalizer attached");
                }
                None => warn!(dependency = key.type_info.name, "Finalizer for unregistered service skipped"),
            }
        }

        Ok(self)
    }

    pub(crate) fn dfs_detect(&self) -> Result<(), DFSErrorKind> {
        let mut visited = BTreeSet::new();
        let mut stack = Vec::new();

        for (key, InstantiatorData { dependencies, .. }) in &self.entries {
            if self.dfs_visit(key, dependencies, &mut visited, &mut stack) {
                // The stack ends with the key that closes the cycle
                let mut graph = stack.iter().map(|item| item.type_info);
                let first = graph.next().unwrap_or(key.type_info);
                return Err(DFSErrorKind::CyclicDependency {
                    graph: (first, graph.collect()),
                });
            }
        }
        Ok(())
    }

    fn dfs_visit(
        &self,
        key: &ServiceKey,
        dependencies: &[AnnotatedParameter],
        visited: &mut BTreeSet<ServiceKey>,
        stack: &mut Vec<ServiceKey>,
    ) -> bool {
        if visited.contains(key) {
            return false;
        }
        if let Some(start) = stack.iter().position(|item| item == key) {
            stack.drain(..start);
            stack.push(*key);
            return true;
        }
        stack.push(*key);

        for dependency in dependencies.iter().filter_map(AnnotatedParameter::service_key) {
            if let Some(InstantiatorData { dependencies, .. }) = self.entries.get(dependency) {
                if self.dfs_visit(dependency, dependencies, visited, stack) {
                    return true;
                }
            }
        }

        stack.pop();
        visited.insert(*key);
        false
    }
}
