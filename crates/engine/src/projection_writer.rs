use crate::error::NotifyError;
use planner_notify_domain::{ProjectionPath, ProjectionUpdate};
use planner_notify_infra::{IDocumentStore, NotifyContext};
use std::sync::Arc;
use tracing::debug;

/// Mirrors ledger changes into the projection documents read by the clients
pub struct ProjectionWriter {
    documents: Arc<dyn IDocumentStore>,
}

impl ProjectionWriter {
    pub fn new(ctx: &NotifyContext) -> Self {
        Self {
            documents: ctx.documents.clone(),
        }
    }

    /// Merges exactly the fields of `update` into the document at `path`
    pub async fn write(
        &self,
        path: &ProjectionPath,
        update: &ProjectionUpdate,
    ) -> Result<(), NotifyError> {
        let path = path.to_string();
        debug!(path = %path, "Writing projection update: {:?}", update);
        self.documents
            .merge_set(&path, update.to_document())
            .await
            .map_err(|e| NotifyError::ProjectionWrite {
                path,
                message: e.to_string(),
            })
    }
}
