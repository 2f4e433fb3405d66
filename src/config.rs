use crate::lifetime::Lifetime;

/// Config for an instantiator
/// ## Fields
/// - `lifetime`:
///   Lifetime of the instance provided by the instantiator.
///   Singletons and scoped instances are cached and reused by the container that created them,
///   transient ones are created on every resolution.
///
///   This does **not** affect the dependencies of the instance.
/// - `qualifier`:
///   Discriminator for several registrations of the same type.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Config {
    pub lifetime: Lifetime,
    pub qualifier: Option<&'static str>,
}

impl Config {
    #[inline]
    #[must_use]
    pub const fn new(lifetime: Lifetime) -> Self {
        Self { lifetime, qualifier: None }
    }

    #[inline]
    #[must_use]
    pub const fn with_qualifier(mut self, qualifier: &'static str) -> Self {
        self.qualifier = Some(qualifier);
        self
    }
}
