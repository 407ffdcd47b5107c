//! Hash collections for session, topic, and call registries, using `ahash` for speed.

pub type HashMap<K, V> = std::collections::HashMap<K, V, ahash::RandomState>;

pub type HashSet<V> = std::collections::HashSet<V, ahash::RandomState>;
