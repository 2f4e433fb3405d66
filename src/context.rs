use alloc::{collections::BTreeMap, sync::Arc};

use crate::any::{RcAny, TypeInfo};

/// Values handed to a scope when it's entered, for example the request being handled.
///
/// Factories read them with [`crate::FromContext`].
#[derive(Clone, Default)]
pub struct Context {
    pub(crate) map: BTreeMap<TypeInfo, RcAny>,
}

impl Context {
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self { map: BTreeMap::new() }
    }

    #[inline]
    pub fn insert<T: Send + Sync + 'static>(&mut self, value: T) -> Option<Arc<T>> {
        self.insert_rc(Arc::new(value))
    }

    #[inline]
    pub fn insert_rc<T: Send + Sync + 'static>(&mut self, value: Arc<T>) -> Option<Arc<T>> {
        self.map
            .insert(TypeInfo::of::<T>(), value)
            .and_then(|boxed| boxed.downcast().ok())
    }

    #[inline]
    #[must_use]
    pub fn with<T: Send + Sync + 'static>(mut self, value: T) -> Self {
        self.insert(value);
        self
    }

    #[inline]
    #[must_use]
    pub fn get<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.map
            .get(&TypeInfo::of::<T>())
            .and_then(|boxed| boxed.clone().downcast().ok())
    }
}
