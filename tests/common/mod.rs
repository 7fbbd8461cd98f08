#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use driftpost::bottle::BottlePolicy;
use driftpost::repo::inmem::InMemRepo;
use driftpost::storage::{HttpMetadata, ObjectHead, ObjectListing, ObjectStore, ObjectSummary, StoreError};
use driftpost::AppState;

pub const ADMIN_SECRET: &str = "tide-keeper";

// ---------------- In-memory Mock ObjectStore (tests only) ----------------
#[derive(Default)]
pub struct MockObjectStore {
    inner: Mutex<BTreeMap<String, (ObjectHead, Vec<u8>)>>,
    /// When set, `head` fails for every key (listing must degrade).
    pub broken_heads: AtomicBool,
}

impl MockObjectStore {
    pub fn keys(&self) -> Vec<String> {
        self.inner.lock().unwrap().keys().cloned().collect()
    }
}

#[async_trait::async_trait]
impl ObjectStore for MockObjectStore {
    async fn put(&self, key: &str, bytes: Vec<u8>, http: HttpMetadata, custom: BTreeMap<String, String>) -> Result<(), StoreError> {
        let head = ObjectHead {
            key: key.to_string(),
            size: bytes.len() as u64,
            etag: Some(format!("\"{:x}\"", bytes.len())),
            http,
            custom,
        };
        self.inner.lock().unwrap().insert(key.to_string(), (head, bytes));
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<(ObjectHead, Vec<u8>), StoreError> {
        self.inner.lock().unwrap().get(key).cloned().ok_or(StoreError::NotFound)
    }

    async fn head(&self, key: &str) -> Result<ObjectHead, StoreError> {
        if self.broken_heads.load(Ordering::SeqCst) {
            return Err(StoreError::Other("head unavailable".into()));
        }
        self.inner.lock().unwrap().get(key).map(|(h, _)| h.clone()).ok_or(StoreError::NotFound)
    }

    async fn list(&self, prefix: &str, limit: usize, cursor: Option<&str>) -> Result<ObjectListing, StoreError> {
        let map = self.inner.lock().unwrap();
        let skip: usize = cursor.and_then(|c| c.parse().ok()).unwrap_or(0);
        let matching: Vec<&(ObjectHead, Vec<u8>)> = map.iter().filter(|(k, _)| k.starts_with(prefix)).map(|(_, v)| v).collect();
        let page: Vec<ObjectSummary> = matching
            .iter()
            .skip(skip)
            .take(limit)
            .map(|(h, _)| ObjectSummary {
                key: h.key.clone(),
                size: h.size,
                etag: h.etag.clone(),
                uploaded: None,
                storage_class: Some("STANDARD".into()),
            })
            .collect();
        let truncated = skip + page.len() < matching.len();
        Ok(ObjectListing {
            cursor: truncated.then(|| (skip + page.len()).to_string()),
            objects: page,
            truncated,
            delimited_prefixes: Vec::new(),
        })
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.inner.lock().unwrap().remove(key);
        Ok(())
    }
}

pub fn state_with(store: Arc<MockObjectStore>, admin_secret: Option<&str>) -> AppState {
    AppState::new(InMemRepo::new(), store, BottlePolicy::default(), admin_secret.map(str::to_string))
}

pub fn state() -> AppState {
    state_with(Arc::new(MockObjectStore::default()), Some(ADMIN_SECRET))
}

pub fn json(body: &[u8]) -> serde_json::Value {
    serde_json::from_slice(body).unwrap()
}
