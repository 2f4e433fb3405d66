use core::fmt::{self, Display, Formatter};

/// How long an instance created by a factory lives.
///
/// - [`Lifetime::Singleton`]: one instance per [`crate::Container`], shared by every scope.
/// - [`Lifetime::Scoped`]: one instance per [`crate::ScopedContainer`].
/// - [`Lifetime::Transient`]: a new instance on every resolution.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Lifetime {
    #[default]
    Singleton,
    Scoped,
    Transient,
}

impl Lifetime {
    #[inline]
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Lifetime::Singleton => "singleton",
            Lifetime::Scoped => "scoped",
            Lifetime::Transient => "transient",
        }
    }

    /// Returns `true` if instances with this lifetime are cached by the container that created them.
    #[inline]
    #[must_use]
    pub const fn is_cached(&self) -> bool {
        !matches!(self, Lifetime::Transient)
    }
}

impl Display for Lifetime {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
