//! Fast hash collections (rustc-hash) and small-vector aliases used on hot paths.

pub type FxHashMap<K, V> = rustc_hash::FxHashMap<K, V>;
pub type FxHashSet<T> = rustc_hash::FxHashSet<T>;

/// Most declarations carry one or two verbs.
pub type VerbList = smallvec::SmallVec<[String; 2]>;
