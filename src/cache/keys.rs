//! Cache key definitions.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Identity of a cached page.
///
/// The viewer is part of the key because every page embeds the viewer's
/// navigation bar.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PageKey {
    pub path: String,
    pub query_hash: u64,
    pub viewer: Option<String>,
}

impl PageKey {
    pub fn new(path: impl Into<String>, query: &str, viewer: Option<&str>) -> Self {
        Self {
            path: path.into(),
            query_hash: hash_query(query),
            viewer: viewer.map(str::to_string),
        }
    }
}

/// Compute a hash for any hashable value.
fn hash_value<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Hash a query string for page key generation.
pub fn hash_query(query: &str) -> u64 {
    hash_value(&query)
}
