use alloc::sync::Arc;
use core::any::type_name;
use tracing::error;

use crate::{
    any::RcAny,
    service::{service_fn, BoxCloneService},
};

/// Called with a cached instance when the container that owns it is closed.
pub trait Finalizer<Dep>: Clone + 'static {
    fn finalize(&mut self, dependency: Arc<Dep>);
}

pub(crate) type BoxedCloneFinalizer = BoxCloneService<RcAny, (), ()>;

#[must_use]
pub(crate) fn boxed_finalizer_factory<Dep, Fin>(mut finalizer: Fin) -> BoxedCloneFinalizer
where
    Dep: Send + Sync + 'static,
    Fin: Finalizer<Dep> + Send + Sync,
{
    BoxCloneService::new(service_fn(move |dependency: RcAny| match dependency.downcast::<Dep>() {
        Ok(dependency) => {
            finalizer.finalize(dependency);
            Ok(())
        }
        Err(_) => {
            error!(dependency = type_name::<Dep>(), "Finalizer got a value of another type");
            Err(())
        }
    }))
}

impl<F, Dep> Finalizer<Dep> for F
where
    F: FnMut(Arc<Dep>) + Clone + 'static,
{
    #[inline]
    fn finalize(&mut self, dependency: Arc<Dep>) {
        self(dependency);
    }
}
