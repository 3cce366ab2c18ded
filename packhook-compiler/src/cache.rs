//! The compiler's in-memory cache and its named facades.

use std::{any::Any, collections::HashMap, sync::Arc};

use packhook_hooks::{Hook, HookResult};
use parking_lot::Mutex;

pub struct CacheHooks {
    /// The compiler went idle between builds.
    pub begin_idle: Hook<()>,
    /// The compiler is about to build again.
    pub end_idle: Hook<()>,
    pub shutdown: Hook<()>,
}

struct CacheEntry {
    etag: Option<String>,
    value: Arc<dyn Any + Send + Sync>,
}

/// A typed key/value store shared by a compiler and its children.
///
/// An entry stored with an etag is only returned to readers asking for the
/// same etag.
pub struct Cache {
    pub hooks: CacheHooks,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl Default for Cache {
    fn default() -> Self {
        Self::new()
    }
}

impl Cache {
    pub fn new() -> Self {
        Self {
            hooks: CacheHooks {
                begin_idle: Hook::sync("beginIdle"),
                end_idle: Hook::async_parallel("endIdle"),
                shutdown: Hook::async_parallel("shutdown"),
            },
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn get<T>(&self, identifier: &str, etag: Option<&str>) -> Option<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        let entries = self.entries.lock();
        let entry = entries.get(identifier)?;
        if entry.etag.as_deref() != etag {
            return None;
        }
        entry.value.downcast_ref::<T>().cloned()
    }

    pub fn store<T>(&self, identifier: &str, etag: Option<&str>, value: T)
    where
        T: Send + Sync + 'static,
    {
        self.entries.lock().insert(
            identifier.to_string(),
            CacheEntry {
                etag: etag.map(str::to_string),
                value: Arc::new(value),
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn begin_idle(&self) -> HookResult<()> {
        self.hooks.begin_idle.call(())
    }

    pub async fn end_idle(&self) -> HookResult<()> {
        self.hooks.end_idle.call_async(()).await
    }

    /// Run the shutdown listeners and drop every entry.
    pub async fn shutdown(&self) -> HookResult<()> {
        let result = self.hooks.shutdown.call_async(()).await;
        self.entries.lock().clear();
        result
    }
}

/// A view of the cache scoped to one name.
///
/// Identifiers are stored as `{name}|{identifier}`.
#[derive(Clone)]
pub struct CacheFacade {
    cache: Arc<Cache>,
    name: String,
}

impl CacheFacade {
    pub fn new(cache: Arc<Cache>, name: impl Into<String>) -> Self {
        Self {
            cache,
            name: name.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// A facade for `{self}/{name}`.
    pub fn child(&self, name: &str) -> CacheFacade {
        CacheFacade::new(self.cache.clone(), format!("{}/{}", self.name, name))
    }

    /// A handle on a single entry.
    pub fn item(&self, identifier: &str, etag: Option<&str>) -> ItemCacheFacade {
        ItemCacheFacade {
            cache: self.cache.clone(),
            key: self.key(identifier),
            etag: etag.map(str::to_string),
        }
    }

    fn key(&self, identifier: &str) -> String {
        format!("{}|{}", self.name, identifier)
    }

    pub fn get<T>(&self, identifier: &str, etag: Option<&str>) -> Option<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        self.cache.get(&self.key(identifier), etag)
    }

    pub fn store<T>(&self, identifier: &str, etag: Option<&str>, value: T)
    where
        T: Send + Sync + 'static,
    {
        self.cache.store(&self.key(identifier), etag, value);
    }

    /// Return the cached value or compute, store and return it.
    pub fn provide<T, F>(&self, identifier: &str, etag: Option<&str>, compute: F) -> T
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> T,
    {
        if let Some(value) = self.get(identifier, etag) {
            return value;
        }
        let value = compute();
        self.store(identifier, etag, value.clone());
        value
    }
}

/// A cache facade bound to one identifier and etag.
#[derive(Clone)]
pub struct ItemCacheFacade {
    cache: Arc<Cache>,
    key: String,
    etag: Option<String>,
}

impl ItemCacheFacade {
    pub fn get<T>(&self) -> Option<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        self.cache.get(&self.key, self.etag.as_deref())
    }

    pub fn store<T>(&self, value: T)
    where
        T: Send + Sync + 'static,
    {
        self.cache.store(&self.key, self.etag.as_deref(), value);
    }

    pub fn provide<T, F>(&self, compute: F) -> T
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> T,
    {
        if let Some(value) = self.get() {
            return value;
        }
        let value = compute();
        self.store(value.clone());
        value
    }
}
