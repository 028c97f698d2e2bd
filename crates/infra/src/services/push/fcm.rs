use super::{fan_out, IPushGateway, PushError};
use crate::services::google_auth::IAccessTokenProvider;
use planner_notify_domain::{MulticastReport, PushMessage};
use reqwest::Client;
use serde::Serialize;
use std::{collections::BTreeMap, sync::Arc};
use tokio::sync::Semaphore;
use tracing::{error, warn};

const FCM_API_BASE_URL: &str = "https://fcm.googleapis.com/v1";

/// Firebase Cloud Messaging HTTP v1 adapter. At most `max_in_flight`
/// requests are outstanding at a time across all callers.
pub struct FcmPushGateway {
    client: Client,
    project_id: String,
    auth: Arc<dyn IAccessTokenProvider>,
    max_in_flight: usize,
    permits: Semaphore,
}

#[derive(Debug, Serialize)]
struct FcmNotification<'a> {
    title: &'a str,
    body: &'a str,
}

#[derive(Debug, Serialize)]
struct FcmMessage<'a> {
    token: &'a str,
    notification: FcmNotification<'a>,
    data: &'a BTreeMap<String, String>,
}

#[derive(Debug, Serialize)]
struct FcmSendRequest<'a> {
    message: FcmMessage<'a>,
}

impl FcmPushGateway {
    pub fn new(
        client: Client,
        project_id: String,
        auth: Arc<dyn IAccessTokenProvider>,
        max_in_flight: usize,
    ) -> Self {
        let max_in_flight = std::cmp::max(max_in_flight, 1);
        Self {
            client,
            project_id,
            auth,
            max_in_flight,
            permits: Semaphore::new(max_in_flight),
        }
    }
}

#[async_trait::async_trait]
impl IPushGateway for FcmPushGateway {
    async fn send_one(&self, token: &str, message: &PushMessage) -> Result<(), PushError> {
        let body = FcmSendRequest {
            message: FcmMessage {
                token,
                notification: FcmNotification {
                    title: &message.title,
                    body: &message.body,
                },
                data: &message.data,
            },
        };
        let access_token = self.auth.access_token().await.map_err(|e| {
            error!("Unable to get an access token for FCM. Error message: {:?}", e);
            PushError::Transport(e.to_string())
        })?;
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| PushError::Transport(e.to_string()))?;
        let res = self
            .client
            .post(&format!(
                "{}/projects/{}/messages:send",
                FCM_API_BASE_URL, self.project_id
            ))
            .header("authorization", format!("Bearer {}", access_token))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!("[Network Error] FCM send error. Error message: {:?}", e);
                PushError::Transport(e.to_string())
            })?;

        let status = res.status();
        if status.is_success() {
            Ok(())
        } else {
            let message = res.text().await.unwrap_or_default();
            warn!(
                "[Unexpected Response] FCM rejected message with status {}: {}",
                status, message
            );
            Err(PushError::Rejected {
                status: status.as_u16(),
                message,
            })
        }
    }

    async fn send_many(
        &self,
        tokens: &[String],
        message: &PushMessage,
    ) -> Result<MulticastReport, PushError> {
        // The v1 API has no multicast endpoint, fan out one request per token
        fan_out(tokens, self.max_in_flight, |token| self.send_one(token, message)).await
    }
}
