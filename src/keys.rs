// ============================================================================
// API KEY STORE: session-scoped and durable credentials
// ============================================================================
//
// Credentials are read through an injected `KeyStore` rather than from any
// global storage. Each known key declares its lifetime; the `KeyRing` routes
// reads and writes to the matching store and falls back to an environment
// variable when nothing is stored.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use crate::error::KeyStoreError;

const STORAGE_PREFIX: &str = "tourfe_key_";

/// How long a stored credential lives.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyLifetime {
    /// Forgotten when the editor session ends.
    Session,
    /// Persisted across sessions.
    Durable,
}

/// Static description of one credential.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeySpec {
    pub key: &'static str,
    pub label: &'static str,
    pub env_var: &'static str,
    pub group: &'static str,
    pub lifetime: KeyLifetime,
}

pub const GEMINI_API_KEY: &str = "gemini_api_key";
pub const TOUR_API_KEY: &str = "tour_api_key";
pub const STORAGE_ACCESS_KEY: &str = "storage_access_key";
pub const STORAGE_SECRET_KEY: &str = "storage_secret_key";

pub const KEY_SPECS: &[KeySpec] = &[
    KeySpec {
        key: GEMINI_API_KEY,
        label: "API Key",
        env_var: "TOURFE_GEMINI_API_KEY",
        group: "Gemini",
        lifetime: KeyLifetime::Durable,
    },
    KeySpec {
        key: TOUR_API_KEY,
        label: "Service Key",
        env_var: "TOURFE_TOUR_API_KEY",
        group: "Tour API",
        lifetime: KeyLifetime::Durable,
    },
    KeySpec {
        key: STORAGE_ACCESS_KEY,
        label: "Access Key",
        env_var: "TOURFE_STORAGE_ACCESS_KEY",
        group: "Object Storage",
        lifetime: KeyLifetime::Session,
    },
    KeySpec {
        key: STORAGE_SECRET_KEY,
        label: "Secret Key",
        env_var: "TOURFE_STORAGE_SECRET_KEY",
        group: "Object Storage",
        lifetime: KeyLifetime::Session,
    },
];

pub fn spec_for(key: &str) -> Option<&'static KeySpec> {
    KEY_SPECS.iter().find(|s| s.key == key)
}

/// A backing store for one lifetime class.
pub trait KeyStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), KeyStoreError>;
    fn remove(&mut self, key: &str) -> Result<(), KeyStoreError>;
}

/// In-memory store; the natural backend for session-scoped keys.
#[derive(Debug, Default, Clone)]
pub struct MemoryKeyStore {
    values: HashMap<String, String>,
}

impl KeyStore for MemoryKeyStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), KeyStoreError> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), KeyStoreError> {
        self.values.remove(key);
        Ok(())
    }
}

/// File-backed store (`tourfe_key_<name>=value` lines) for durable keys.
/// The whole file is rewritten on every change.
#[derive(Debug, Clone)]
pub struct FileKeyStore {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl FileKeyStore {
    /// Open (or lazily create) the store at `path`.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut values = BTreeMap::new();
        if let Ok(content) = std::fs::read_to_string(&path) {
            for line in content.lines() {
                let Some((k, v)) = line.split_once('=') else { continue };
                if let Some(name) = k.trim().strip_prefix(STORAGE_PREFIX) {
                    values.insert(name.to_string(), v.trim().to_string());
                }
            }
        }
        Self { path, values }
    }

    /// Store in the per-user config directory.
    pub fn open_default() -> Option<Self> {
        crate::settings::config_dir().map(|d| Self::open(d.join("tourfe_keys.cfg")))
    }

    fn flush(&self) -> Result<(), KeyStoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut content = String::new();
        for (k, v) in &self.values {
            content.push_str(&format!("{}{}={}\n", STORAGE_PREFIX, k, v));
        }
        std::fs::write(&self.path, content)?;
        Ok(())
    }
}

impl KeyStore for FileKeyStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), KeyStoreError> {
        self.values.insert(key.to_string(), value.to_string());
        self.flush()
    }

    fn remove(&mut self, key: &str) -> Result<(), KeyStoreError> {
        if self.values.remove(key).is_some() {
            self.flush()?;
        }
        Ok(())
    }
}

/// Routes each known key to the store matching its lifetime.
pub struct KeyRing {
    session: Box<dyn KeyStore>,
    durable: Box<dyn KeyStore>,
    env: Box<dyn Fn(&str) -> Option<String>>,
}

impl KeyRing {
    pub fn new(session: Box<dyn KeyStore>, durable: Box<dyn KeyStore>) -> Self {
        Self {
            session,
            durable,
            env: Box::new(|var| std::env::var(var).ok()),
        }
    }

    /// Both lifetimes in memory and no environment fallback.
    pub fn in_memory() -> Self {
        Self::new(Box::<MemoryKeyStore>::default(), Box::<MemoryKeyStore>::default()).with_env(|_| None)
    }

    /// Replace the environment lookup used as fallback.
    pub fn with_env(mut self, env: impl Fn(&str) -> Option<String> + 'static) -> Self {
        self.env = Box::new(env);
        self
    }

    fn store(&self, lifetime: KeyLifetime) -> &dyn KeyStore {
        match lifetime {
            KeyLifetime::Session => self.session.as_ref(),
            KeyLifetime::Durable => self.durable.as_ref(),
        }
    }

    fn store_mut(&mut self, lifetime: KeyLifetime) -> &mut dyn KeyStore {
        match lifetime {
            KeyLifetime::Session => self.session.as_mut(),
            KeyLifetime::Durable => self.durable.as_mut(),
        }
    }

    /// Stored value, else the environment variable, else empty.
    pub fn get_key(&self, key: &str) -> String {
        let Some(spec) = spec_for(key) else { return String::new() };
        if let Some(v) = self.store(spec.lifetime).get(key) {
            return v;
        }
        (self.env)(spec.env_var).unwrap_or_default()
    }

    pub fn set_key(&mut self, key: &str, value: &str) -> Result<(), KeyStoreError> {
        let spec = spec_for(key).ok_or_else(|| KeyStoreError::UnknownKey(key.to_string()))?;
        self.store_mut(spec.lifetime).set(key, value)
    }

    pub fn all_keys(&self) -> BTreeMap<&'static str, String> {
        KEY_SPECS.iter().map(|s| (s.key, self.get_key(s.key))).collect()
    }

    pub fn set_all<'a>(&mut self, keys: impl IntoIterator<Item = (&'a str, &'a str)>) -> Result<(), KeyStoreError> {
        for (k, v) in keys {
            self.set_key(k, v)?;
        }
        Ok(())
    }

    pub fn clear_all(&mut self) -> Result<(), KeyStoreError> {
        for spec in KEY_SPECS {
            self.store_mut(spec.lifetime).remove(spec.key)?;
        }
        Ok(())
    }

    /// Specs grouped by service, in declaration order.
    pub fn grouped() -> Vec<(&'static str, Vec<&'static KeySpec>)> {
        let mut groups: Vec<(&'static str, Vec<&'static KeySpec>)> = Vec::new();
        for spec in KEY_SPECS {
            match groups.iter_mut().find(|(g, _)| *g == spec.group) {
                Some((_, specs)) => specs.push(spec),
                None => groups.push((spec.group, vec![spec])),
            }
        }
        groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_route_by_lifetime() {
        let mut ring = KeyRing::in_memory();
        ring.set_key(STORAGE_ACCESS_KEY, "ak").unwrap();
        ring.set_key(GEMINI_API_KEY, "gk").unwrap();
        assert_eq!(ring.session.get(STORAGE_ACCESS_KEY).as_deref(), Some("ak"));
        assert_eq!(ring.durable.get(GEMINI_API_KEY).as_deref(), Some("gk"));
        assert!(ring.durable.get(STORAGE_ACCESS_KEY).is_none());
    }

    #[test]
    fn env_is_the_fallback() {
        let mut ring = KeyRing::in_memory().with_env(|var| {
            (var == "TOURFE_TOUR_API_KEY").then(|| "from-env".to_string())
        });
        assert_eq!(ring.get_key(TOUR_API_KEY), "from-env");
        ring.set_key(TOUR_API_KEY, "stored").unwrap();
        assert_eq!(ring.get_key(TOUR_API_KEY), "stored");
        ring.clear_all().unwrap();
        assert_eq!(ring.get_key(TOUR_API_KEY), "from-env");
        assert_eq!(ring.get_key("unknown"), "");
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let mut ring = KeyRing::in_memory();
        assert!(matches!(ring.set_key("nope", "x"), Err(KeyStoreError::UnknownKey(_))));
    }

    #[test]
    fn file_store_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keys.cfg");
        {
            let mut store = FileKeyStore::open(&path);
            store.set(GEMINI_API_KEY, "abc").unwrap();
        }
        let store = FileKeyStore::open(&path);
        assert_eq!(store.get(GEMINI_API_KEY).as_deref(), Some("abc"));
    }

    #[test]
    fn grouping_keeps_declaration_order() {
        let groups = KeyRing::grouped();
        let names: Vec<_> = groups.iter().map(|(g, _)| *g).collect();
        assert_eq!(names, ["Gemini", "Tour API", "Object Storage"]);
        assert_eq!(groups[2].1.len(), 2);
    }
}
