//! Shared collection aliases and formatting helpers.

use std::fmt;

type BuildHasher = std::hash::BuildHasherDefault<rustc_hash::FxHasher>;

/// Hash map with deterministic (insertion-order) iteration.
pub type Map<K, V> = indexmap::IndexMap<K, V, BuildHasher>;

/// Hash set with deterministic (insertion-order) iteration.
pub type Set<T> = indexmap::IndexSet<T, BuildHasher>;

/// Wrap a closure into an ad-hoc [`fmt::Display`] adapter.
///
/// Used by the grammar-aware `display` methods, which need a `&Grammar` to
/// resolve symbol names and therefore cannot implement `Display` directly.
pub fn display_fn<F>(f: F) -> impl fmt::Display
where
    F: Fn(&mut fmt::Formatter<'_>) -> fmt::Result,
{
    struct DisplayFn<F> {
        f: F,
    }
    impl<F> fmt::Display for DisplayFn<F>
    where
        F: Fn(&mut fmt::Formatter<'_>) -> fmt::Result,
    {
        fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            (self.f)(formatter)
        }
    }
    DisplayFn { f }
}
