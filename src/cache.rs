use alloc::collections::vec_deque::VecDeque;
use core::mem;

use crate::any::{self, RcAny, ServiceKey};

#[derive(Default)]
pub(crate) struct Cache {
    pub(crate) map: any::Map,
    pub(crate) resolved: ResolvedSet,
}

impl Cache {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub(crate) fn insert(&mut self, key: ServiceKey, value: RcAny) -> Option<RcAny> {
        self.map.insert(key, value)
    }

    #[inline]
    #[must_use]
    pub(crate) fn get(&self, key: &ServiceKey) -> Option<RcAny> {
        self.map.get(key).cloned()
    }

    #[inline]
    pub(crate) fn push_resolved(&mut self, resolved: Resolved) {
        self.resolved.push(resolved);
    }

    /// Takes the resolved set and clears cached instances, so the owner can be reused after finalization.
    #[inline]
    #[must_use]
    pub(crate) fn take_resolved_set(&mut self) -> ResolvedSet {
        self.map.clear();
        mem::take(&mut self.resolved)
    }
}

#[derive(Clone)]
pub(crate) struct Resolved {
    pub(crate) key: ServiceKey,
    pub(crate) dependency: RcAny,
}

#[derive(Default, Clone)]
pub(crate) struct ResolvedSet(pub(crate) VecDeque<Resolved>);

impl ResolvedSet {
    pub(crate) fn push(&mut self, resolved: Resolved) {
        self.0.push_back(resolved);
    }

    pub(crate) fn pop_last(&mut self) -> Option<Resolved> {
        self.0.pop_back()
    }
}
