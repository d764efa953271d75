//! Redis key schema
//!
//! Key format: v{VERSION}:gallery:{entity}:{identifier}

use crate::UserId;

/// Key schema version - increment when changing key formats
pub const CACHE_VERSION: u32 = 1;

/// Cache key builder
pub struct CacheKey;

impl CacheKey {
    /// Set of every picture id a user has been shown
    /// Format: v1:gallery:viewed:{user_id}
    pub fn viewed(user: UserId) -> String {
        format!("v{}:gallery:viewed:{}", CACHE_VERSION, user)
    }

    /// Same key under a deployment namespace, e.g. `staging:v1:gallery:viewed:42`
    pub fn viewed_in(namespace: Option<&str>, user: UserId) -> String {
        match namespace {
            Some(ns) if !ns.is_empty() => format!("{}:{}", ns, Self::viewed(user)),
            _ => Self::viewed(user),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_viewed_key() {
        assert_eq!(CacheKey::viewed(UserId::new(12345)), "v1:gallery:viewed:12345");
        assert_eq!(
            CacheKey::viewed(UserId::new(-1001234)),
            "v1:gallery:viewed:-1001234"
        );
    }

    #[test]
    fn test_viewed_key_namespace() {
        let user = UserId::new(7);
        assert_eq!(CacheKey::viewed_in(None, user), "v1:gallery:viewed:7");
        assert_eq!(CacheKey::viewed_in(Some(""), user), "v1:gallery:viewed:7");
        assert_eq!(
            CacheKey::viewed_in(Some("staging"), user),
            "staging:v1:gallery:viewed:7"
        );
    }
}
