//! Order-store side of the hub: the administrative broadcast trigger.

use serde::Deserialize;

use crate::domain::dispatch::Payload;

use super::error::ClientError;

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// HTTP client for the hub's administrative endpoints.
#[derive(Debug, Clone)]
pub struct AdminClient {
    base_url: String,
    http_client: reqwest::Client,
}

impl AdminClient {
    /// `base_url` is the hub's HTTP origin, e.g. `http://127.0.0.1:3001`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http_client: reqwest::Client::new(),
        }
    }

    /// Asks the hub to push `order` to every connected driver.
    ///
    /// # Errors
    ///
    /// - `Http` if the hub is unreachable
    /// - `Rejected` if the hub answers with a non-success status
    pub async fn broadcast_new_order(&self, order: &Payload) -> Result<(), ClientError> {
        let response = self
            .http_client
            .post(format!("{}/broadcast-new-order", self.base_url))
            .json(order)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let message = match response.json::<ErrorBody>().await {
            Ok(body) => body.error,
            Err(_) => status.to_string(),
        };
        Err(ClientError::Rejected {
            status: status.as_u16(),
            message,
        })
    }
}
