use super::{field_paths, Document, IDocumentStore};
use crate::services::google_auth::IAccessTokenProvider;
use anyhow::anyhow;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::error;

const FIRESTORE_API_BASE_URL: &str = "https://firestore.googleapis.com/v1";

/// Document mirror backed by the Cloud Firestore REST API
pub struct FirestoreDocumentStore {
    client: Client,
    project_id: String,
    auth: Arc<dyn IAccessTokenProvider>,
}

#[derive(Debug, Deserialize)]
struct FirestoreDocument {
    #[serde(default)]
    fields: serde_json::Map<String, Value>,
}

#[derive(Debug, Serialize)]
struct FirestoreWrite {
    fields: serde_json::Map<String, Value>,
}

impl FirestoreDocumentStore {
    pub fn new(client: Client, project_id: String, auth: Arc<dyn IAccessTokenProvider>) -> Self {
        Self {
            client,
            project_id,
            auth,
        }
    }

    fn document_url(&self, path: &str) -> String {
        format!(
            "{}/projects/{}/databases/(default)/documents/{}",
            FIRESTORE_API_BASE_URL, self.project_id, path
        )
    }
}

/// Field path segments that are not simple identifiers have to be quoted
fn quote_segment(segment: &str) -> String {
    let mut chars = segment.chars();
    let simple = match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };
    if simple {
        segment.to_string()
    } else {
        format!("`{}`", segment.replace('\\', "\\\\").replace('`', "\\`"))
    }
}

fn update_mask(fields: &Document) -> Vec<(&'static str, String)> {
    field_paths(fields)
        .into_iter()
        .map(|path| {
            let path = path
                .iter()
                .map(|segment| quote_segment(segment))
                .collect::<Vec<_>>()
                .join(".");
            ("updateMask.fieldPaths", path)
        })
        .collect()
}

fn to_firestore_value(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => match n.as_i64() {
            Some(i) => json!({ "integerValue": i.to_string() }),
            None => json!({ "doubleValue": n.as_f64() }),
        },
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(values) => json!({
            "arrayValue": { "values": values.iter().map(to_firestore_value).collect::<Vec<_>>() }
        }),
        Value::Object(map) => json!({ "mapValue": { "fields": to_firestore_fields(map) } }),
    }
}

fn to_firestore_fields(fields: &Document) -> serde_json::Map<String, Value> {
    fields
        .iter()
        .map(|(key, value)| (key.clone(), to_firestore_value(value)))
        .collect()
}

fn from_firestore_value(value: &Value) -> Value {
    let (kind, inner) = match value.as_object().and_then(|o| o.iter().next()) {
        Some(typed) => typed,
        None => return Value::Null,
    };
    match (kind.as_str(), inner) {
        ("booleanValue", b) => b.clone(),
        ("integerValue", Value::String(i)) => i.parse::<i64>().map(Value::from).unwrap_or(Value::Null),
        ("integerValue", i) => i.clone(),
        ("doubleValue", d) => d.clone(),
        ("stringValue", s) | ("timestampValue", s) | ("referenceValue", s) => s.clone(),
        ("arrayValue", array) => Value::Array(
            array
                .get("values")
                .and_then(|v| v.as_array())
                .map(|values| values.iter().map(from_firestore_value).collect())
                .unwrap_or_default(),
        ),
        ("mapValue", map) => Value::Object(
            map.get("fields")
                .and_then(|f| f.as_object())
                .map(from_firestore_fields)
                .unwrap_or_default(),
        ),
        _ => Value::Null,
    }
}

fn from_firestore_fields(fields: &serde_json::Map<String, Value>) -> Document {
    fields
        .iter()
        .map(|(key, value)| (key.clone(), from_firestore_value(value)))
        .collect()
}

#[async_trait::async_trait]
impl IDocumentStore for FirestoreDocumentStore {
    async fn get(&self, path: &str) -> anyhow::Result<Option<Document>> {
        let access_token = self.auth.access_token().await?;
        let res = self
            .client
            .get(&self.document_url(path))
            .header("authorization", format!("Bearer {}", access_token))
            .send()
            .await
            .map_err(|e| {
                error!(
                    "[Network Error] Firestore GET {} error. Error message: {:?}",
                    path, e
                );
                anyhow::Error::new(e)
            })?;

        if res.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !res.status().is_success() {
            return Err(anyhow!(
                "[Unexpected Response] Firestore GET {} returned status {}",
                path,
                res.status()
            ));
        }
        let document = res.json::<FirestoreDocument>().await?;
        Ok(Some(from_firestore_fields(&document.fields)))
    }

    async fn merge_set(&self, path: &str, fields: Document) -> anyhow::Result<()> {
        let body = FirestoreWrite {
            fields: to_firestore_fields(&fields),
        };
        let access_token = self.auth.access_token().await?;
        let res = self
            .client
            .patch(&self.document_url(path))
            .header("authorization", format!("Bearer {}", access_token))
            .query(&update_mask(&fields))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!(
                    "[Network Error] Firestore PATCH {} error. Error message: {:?}",
                    path, e
                );
                anyhow::Error::new(e)
            })?;

        if !res.status().is_success() {
            let status = res.status();
            let message = res.text().await.unwrap_or_default();
            return Err(anyhow!(
                "[Unexpected Response] Firestore PATCH {} returned status {}: {}",
                path,
                status,
                message
            ));
        }
        Ok(())
    }
}
