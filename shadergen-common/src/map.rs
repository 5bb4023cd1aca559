/// Fast hash map type for name-keyed lookups.
pub type FastHashMap<K, V> = rustc_hash::FxHashMap<K, V>;

/// Fast hash set type for name-keyed lookups.
pub type FastHashSet<K> = rustc_hash::FxHashSet<K>;
