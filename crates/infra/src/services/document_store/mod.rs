mod firestore;
mod inmemory;

pub use firestore::FirestoreDocumentStore;
pub use inmemory::InMemoryDocumentStore;
use serde_json::Value;

pub type Document = serde_json::Map<String, Value>;

/// Document mirror consumed by the client applications
#[async_trait::async_trait]
pub trait IDocumentStore: Send + Sync {
    async fn get(&self, path: &str) -> anyhow::Result<Option<Document>>;
    /// Merges `fields` into the document at `path`, creating it if missing.
    /// Nested maps are merged key by key and fields not present in `fields`
    /// are left untouched.
    async fn merge_set(&self, path: &str, fields: Document) -> anyhow::Result<()>;
}

/// Deep merge of `fields` into `target`
pub fn merge_into(target: &mut Document, fields: Document) {
    for (key, value) in fields {
        match (target.get_mut(&key), value) {
            (Some(Value::Object(existing)), Value::Object(nested)) => merge_into(existing, nested),
            (_, value) => {
                target.insert(key, value);
            }
        }
    }
}

/// Dotted paths to every leaf of `fields`, these are the fields a merge write touches
pub fn field_paths(fields: &Document) -> Vec<Vec<String>> {
    let mut paths = Vec::new();
    collect_field_paths(fields, &mut Vec::new(), &mut paths);
    paths
}

fn collect_field_paths(fields: &Document, prefix: &mut Vec<String>, paths: &mut Vec<Vec<String>>) {
    for (key, value) in fields {
        prefix.push(key.clone());
        match value {
            Value::Object(nested) if !nested.is_empty() => {
                collect_field_paths(nested, prefix, paths)
            }
            _ => paths.push(prefix.clone()),
        }
        prefix.pop();
    }
}
