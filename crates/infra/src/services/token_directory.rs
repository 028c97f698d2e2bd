use super::document_store::IDocumentStore;
use planner_notify_domain::ID;
use std::sync::Arc;

/// Lookup of the push token registered by a user's device
#[async_trait::async_trait]
pub trait ITokenDirectory: Send + Sync {
    /// `Ok(None)` when the user has no token or an empty one
    async fn get_token(&self, user_id: &ID) -> anyhow::Result<Option<String>>;
}

const TOKEN_FIELD: &str = "token";

pub fn token_document_path(user_id: &ID) -> String {
    format!("Tokens/{}", user_id)
}

/// Token directory stored as single field documents in the document mirror
pub struct DocumentTokenDirectory {
    documents: Arc<dyn IDocumentStore>,
}

impl DocumentTokenDirectory {
    pub fn new(documents: Arc<dyn IDocumentStore>) -> Self {
        Self { documents }
    }
}

#[async_trait::async_trait]
impl ITokenDirectory for DocumentTokenDirectory {
    async fn get_token(&self, user_id: &ID) -> anyhow::Result<Option<String>> {
        let document = self.documents.get(&token_document_path(user_id)).await?;
        Ok(document
            .as_ref()
            .and_then(|d| d.get(TOKEN_FIELD))
            .and_then(|token| token.as_str())
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty()))
    }
}
