use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A reference-counted, immutable string used for ids and labels.
///
/// Character ids, event ids, and titles are copied into every event block
/// and render command on each draw; wrapping `Arc<str>` turns those copies
/// into refcount bumps.
///
/// Implements `PartialEq<&str>` so `assert_eq!(block.event_id, "e1")` works.
#[derive(Debug, Clone, Eq)]
pub struct SharedStr(Arc<str>);

impl SharedStr {
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// --- Equality ---

impl PartialEq for SharedStr {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || *self.0 == *other.0
    }
}

impl PartialEq<&str> for SharedStr {
    #[inline]
    fn eq(&self, other: &&str) -> bool {
        &*self.0 == *other
    }
}

// --- Ordering ---

impl Ord for SharedStr {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.cmp(&other.0)
    }
}

impl PartialOrd for SharedStr {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

// --- Hashing ---

impl std::hash::Hash for SharedStr {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        (*self.0).hash(state);
    }
}

// --- Deref / Borrow / AsRef ---

impl std::ops::Deref for SharedStr {
    type Target = str;

    #[inline]
    fn deref(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for SharedStr {
    #[inline]
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::borrow::Borrow<str> for SharedStr {
    #[inline]
    fn borrow(&self) -> &str {
        &self.0
    }
}

// --- Conversions ---

impl From<&str> for SharedStr {
    #[inline]
    fn from(s: &str) -> Self {
        SharedStr(Arc::from(s))
    }
}

impl From<String> for SharedStr {
    #[inline]
    fn from(s: String) -> Self {
        SharedStr(Arc::from(s))
    }
}

impl From<&SharedStr> for SharedStr {
    #[inline]
    fn from(s: &SharedStr) -> Self {
        s.clone()
    }
}

// --- Display ---

impl std::fmt::Display for SharedStr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

// --- Serde (hand-rolled to avoid the `rc` feature flag) ---
//
// Deserializes through `String` so escaped JSON strings are accepted.

impl Serialize for SharedStr {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for SharedStr {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(SharedStr::from(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clone_compares_equal() {
        let a = SharedStr::from("c1");
        let b = a.clone();
        assert_eq!(a, b);
        assert_eq!(a, "c1");
    }

    #[test]
    fn hashset_lookup_by_str() {
        let mut ids = std::collections::HashSet::new();
        ids.insert(SharedStr::from("ada"));
        assert!(ids.contains("ada"));
        assert!(!ids.contains("bo"));
    }

    #[test]
    fn deserializes_escaped_strings() {
        let s: SharedStr = serde_json::from_str("\"The \\\"Long\\\" Night\"")
            .unwrap_or_else(|_| SharedStr::from(""));
        assert_eq!(s, "The \"Long\" Night");
    }

    #[test]
    fn serializes_as_plain_string() {
        let json = serde_json::to_string(&SharedStr::from("Siege")).unwrap_or_default();
        assert_eq!(json, "\"Siege\"");
    }

    #[test]
    fn ordering_and_display() {
        let a = SharedStr::from("alpha");
        let b = SharedStr::from(format!("be{}", "ta"));
        assert!(a < b);
        assert_eq!(format!("{b}"), "beta");
    }
}
