use super::{merge_into, Document, IDocumentStore};
use anyhow::anyhow;
use std::collections::{HashMap, HashSet};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Mutex, PoisonError,
};

pub struct InMemoryDocumentStore {
    documents: Mutex<HashMap<String, Document>>,
    fail_writes: AtomicBool,
    failing_reads: Mutex<HashSet<String>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self {
            documents: Mutex::new(HashMap::new()),
            fail_writes: AtomicBool::new(false),
            failing_reads: Mutex::new(HashSet::new()),
        }
    }

    /// Makes every following `merge_set` fail until reset
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Makes every following `get` of `path` fail
    pub fn fail_reads_of(&self, path: &str) {
        self.failing_reads
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.to_string());
    }
}

#[async_trait::async_trait]
impl IDocumentStore for InMemoryDocumentStore {
    async fn get(&self, path: &str) -> anyhow::Result<Option<Document>> {
        let failing = self
            .failing_reads
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(path);
        if failing {
            return Err(anyhow!("Document store read of {} failed", path));
        }
        let documents = self.documents.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(documents.get(path).cloned())
    }

    async fn merge_set(&self, path: &str, fields: Document) -> anyhow::Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(anyhow!("Document store write to {} rejected", path));
        }
        let mut documents = self.documents.lock().unwrap_or_else(PoisonError::into_inner);
        let document = documents.entry(path.to_string()).or_default();
        merge_into(document, fields);
        Ok(())
    }
}
