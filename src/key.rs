//! Cache key reconstruction.
//!
//! Entry nodes persist their key as a type tag plus a serialized payload.
//! Reconstructing the live key value goes through an injected
//! [`KeyTypeResolver`]: a mapping from type tag to a factory closure over
//! the payload. The shipped [`KeyTypeRegistry`] covers the common case of
//! serde-deserializable key types; hosts with exotic key encodings can
//! supply their own resolver.
//!
//! Reconstruction failures are fatal for a maintenance traversal: a node
//! with missing metadata, an unregistered type tag, or an undecodable
//! payload aborts the walk (already-committed removals stay committed).

use std::collections::HashMap;
use std::fmt;

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::node::NodeProperties;

/// A reconstructed cache key.
///
/// Keys are opaque to the engine; policies compare them against a cache
/// configuration's ownership predicate.
pub trait CacheKey: fmt::Debug + Send + Sync {
    /// Request URI this key was built from.
    fn uri(&self) -> &str;

    /// User scope of the key, when the cache partitions by user.
    fn user_id(&self) -> Option<&str> {
        None
    }

    /// Per-key expiry override (epoch millis), when the key type carries one.
    fn custom_expiry_ms(&self) -> Option<i64> {
        None
    }
}

/// Built-in key type: a request URI with optional user scope and expiry
/// override. Serves as the registry's reference key shape.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct UriKey {
    pub uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_expiry_ms: Option<i64>,
}

impl UriKey {
    #[must_use]
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            user_id: None,
            custom_expiry_ms: None,
        }
    }
}

impl CacheKey for UriKey {
    fn uri(&self) -> &str {
        &self.uri
    }

    fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    fn custom_expiry_ms(&self) -> Option<i64> {
        self.custom_expiry_ms
    }
}

#[derive(Error, Debug)]
pub enum KeyCodecError {
    #[error("entry node is missing required key metadata: {0}")]
    MissingMetadata(&'static str),
    #[error("no key factory registered for type '{0}'")]
    UnknownKeyType(String),
    #[error("failed to decode key payload: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Factory turning a serialized key payload into a live key value.
pub type KeyFactory =
    Box<dyn Fn(&Value) -> Result<Box<dyn CacheKey>, KeyCodecError> + Send + Sync>;

/// Resolves a key type tag to its factory.
pub trait KeyTypeResolver {
    fn resolve(&self, key_type: &str) -> Option<&KeyFactory>;
}

/// Factory registry keyed by type tag.
#[derive(Default)]
pub struct KeyTypeRegistry {
    factories: HashMap<String, KeyFactory>,
}

impl KeyTypeRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a serde-deserializable key type under `key_type`.
    pub fn register<K>(&mut self, key_type: impl Into<String>)
    where
        K: CacheKey + DeserializeOwned + 'static,
    {
        self.register_factory(
            key_type,
            Box::new(|payload| {
                let key: K = serde_json::from_value(payload.clone())?;
                Ok(Box::new(key) as Box<dyn CacheKey>)
            }),
        );
    }

    /// Register a hand-rolled factory for key types without a serde shape.
    pub fn register_factory(&mut self, key_type: impl Into<String>, factory: KeyFactory) {
        self.factories.insert(key_type.into(), factory);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl KeyTypeResolver for KeyTypeRegistry {
    fn resolve(&self, key_type: &str) -> Option<&KeyFactory> {
        self.factories.get(key_type)
    }
}

/// Reconstruct the cache key persisted on an entry node.
pub fn decode_entry_key<R: KeyTypeResolver + ?Sized>(
    props: &NodeProperties,
    resolver: &R,
) -> Result<Box<dyn CacheKey>, KeyCodecError> {
    let key_type = props
        .key_type
        .as_deref()
        .ok_or(KeyCodecError::MissingMetadata("key_type"))?;
    let payload = props
        .key_payload
        .as_ref()
        .ok_or(KeyCodecError::MissingMetadata("key_payload"))?;
    let factory = resolver
        .resolve(key_type)
        .ok_or_else(|| KeyCodecError::UnknownKeyType(key_type.to_owned()))?;
    factory(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn registry() -> KeyTypeRegistry {
        let mut registry = KeyTypeRegistry::new();
        registry.register::<UriKey>("uri");
        registry
    }

    fn entry_props(key_type: &str, payload: Value) -> NodeProperties {
        NodeProperties::entry(key_type, payload, b"body".to_vec())
    }

    #[test]
    fn test_decode_registered_key() {
        let props = entry_props("uri", json!({"uri": "/content/a.html"}));
        let key = decode_entry_key(&props, &registry()).unwrap();
        assert_eq!(key.uri(), "/content/a.html");
        assert!(key.user_id().is_none());
        assert!(key.custom_expiry_ms().is_none());
    }

    #[test]
    fn test_decode_key_with_user_scope_and_expiry() {
        let props = entry_props(
            "uri",
            json!({"uri": "/content/b.html", "user_id": "u-9", "custom_expiry_ms": 5_000}),
        );
        let key = decode_entry_key(&props, &registry()).unwrap();
        assert_eq!(key.user_id(), Some("u-9"));
        assert_eq!(key.custom_expiry_ms(), Some(5_000));
    }

    #[test]
    fn test_missing_key_type_is_reported() {
        let mut props = entry_props("uri", json!({"uri": "/a"}));
        props.key_type = None;
        let err = decode_entry_key(&props, &registry()).unwrap_err();
        assert!(matches!(err, KeyCodecError::MissingMetadata("key_type")));
    }

    #[test]
    fn test_missing_payload_is_reported() {
        let mut props = entry_props("uri", json!({"uri": "/a"}));
        props.key_payload = None;
        let err = decode_entry_key(&props, &registry()).unwrap_err();
        assert!(matches!(err, KeyCodecError::MissingMetadata("key_payload")));
    }

    #[test]
    fn test_unregistered_type_is_reported() {
        let props = entry_props("custom.v2", json!({"uri": "/a"}));
        let err = decode_entry_key(&props, &registry()).unwrap_err();
        match err {
            KeyCodecError::UnknownKeyType(ty) => assert_eq!(ty, "custom.v2"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_undecodable_payload_is_reported() {
        // `uri` field absent, so UriKey deserialization fails.
        let props = entry_props("uri", json!({"unrelated": true}));
        let err = decode_entry_key(&props, &registry()).unwrap_err();
        assert!(matches!(err, KeyCodecError::Decode(_)));
    }

    #[test]
    fn test_hand_rolled_factory() {
        #[derive(Debug)]
        struct RawKey(String);
        impl CacheKey for RawKey {
            fn uri(&self) -> &str {
                &self.0
            }
        }

        let mut registry = KeyTypeRegistry::new();
        registry.register_factory(
            "raw",
            Box::new(|payload| {
                let uri = payload
                    .as_str()
                    .ok_or(KeyCodecError::MissingMetadata("key_payload"))?;
                Ok(Box::new(RawKey(uri.to_owned())) as Box<dyn CacheKey>)
            }),
        );

        let props = NodeProperties::entry("raw", json!("/raw/path"), vec![]);
        let key = decode_entry_key(&props, &registry).unwrap();
        assert_eq!(key.uri(), "/raw/path");
    }

    #[test]
    fn test_registry_bookkeeping() {
        let registry = registry();
        assert_eq!(registry.len(), 1);
        assert!(!registry.is_empty());
        assert!(registry.resolve("uri").is_some());
        assert!(registry.resolve("other").is_none());
    }
}
