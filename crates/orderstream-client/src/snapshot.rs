//! HTTP client for the snapshot and write endpoints.
//!
//! Thin, stateless wrappers: one method per endpoint. The snapshot
//! endpoint is offset-paginated with a small default page size, so
//! [`ApiClient::list_all`] pages until a short page to retrieve the full
//! list for bootstrap.

use serde::Deserialize;
use tracing::debug;

use orderstream_core::{NewOrder, Order, OrderId, OrderPatch};

use crate::error::ClientError;

/// Page size used when paging through the full snapshot.
const SNAPSHOT_PAGE_SIZE: usize = 100;

/// Client for the server's HTTP endpoints.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateBody {
    inserted_id: OrderId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WriteBody {
    affected_count: usize,
}

impl ApiClient {
    /// Creates a client for the given base URL, e.g. `http://host:3000`.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            http: reqwest::Client::new(),
            base_url,
        }
    }

    /// Fetches one page of orders.
    ///
    /// # Errors
    ///
    /// [`ClientError::Transport`] on connection or HTTP-status failure.
    pub async fn list(&self, page: usize, limit: usize) -> Result<Vec<Order>, ClientError> {
        let url = format!("{}/orders?page={page}&limit={limit}", self.base_url);
        let orders = self
            .http
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(orders)
    }

    /// Fetches the complete current order list, paging until a short
    /// page.
    ///
    /// # Errors
    ///
    /// [`ClientError::Transport`] on connection or HTTP-status failure;
    /// on error no partial list is returned.
    pub async fn list_all(&self) -> Result<Vec<Order>, ClientError> {
        let mut all = Vec::new();
        let mut page = 1;
        loop {
            let chunk = self.list(page, SNAPSHOT_PAGE_SIZE).await?;
            let done = chunk.len() < SNAPSHOT_PAGE_SIZE;
            all.extend(chunk);
            if done {
                break;
            }
            page += 1;
        }
        debug!(orders = all.len(), pages = page, "snapshot fetched");
        Ok(all)
    }

    /// Creates an order, returning the id the store assigned.
    ///
    /// # Errors
    ///
    /// [`ClientError::Transport`] on connection or HTTP-status failure
    /// (including validation rejections).
    pub async fn create(&self, new: &NewOrder) -> Result<OrderId, ClientError> {
        let body: CreateBody = self
            .http
            .post(format!("{}/orders", self.base_url))
            .json(new)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(body.inserted_id)
    }

    /// Applies a partial update; returns the affected count (0 when the
    /// id does not exist).
    ///
    /// # Errors
    ///
    /// [`ClientError::Transport`] on connection or HTTP-status failure.
    pub async fn update(&self, id: &OrderId, patch: &OrderPatch) -> Result<usize, ClientError> {
        let body: WriteBody = self
            .http
            .put(format!("{}/orders/{id}", self.base_url))
            .json(patch)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(body.affected_count)
    }

    /// Deletes an order; returns the affected count (0 when the id does
    /// not exist).
    ///
    /// # Errors
    ///
    /// [`ClientError::Transport`] on connection or HTTP-status failure.
    pub async fn delete(&self, id: &OrderId) -> Result<usize, ClientError> {
        let body: WriteBody = self
            .http
            .delete(format!("{}/orders/{id}", self.base_url))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(body.affected_count)
    }

    /// Fetches the server's observability counters (`GET /stats`).
    ///
    /// # Errors
    ///
    /// [`ClientError::Transport`] on connection or HTTP-status failure.
    pub async fn stats(&self) -> Result<serde_json::Value, ClientError> {
        let stats = self
            .http
            .get(format!("{}/stats", self.base_url))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(stats)
    }

    /// The base URL this client targets.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_stripped() {
        let client = ApiClient::new("http://localhost:3000///");
        assert_eq!(client.base_url(), "http://localhost:3000");
    }

    #[test]
    fn test_response_body_shapes() {
        let create: CreateBody = serde_json::from_str(r#"{"insertedId":"7"}"#).unwrap();
        assert_eq!(create.inserted_id, OrderId::from(7));

        let write: WriteBody = serde_json::from_str(r#"{"affectedCount":0}"#).unwrap();
        assert_eq!(write.affected_count, 0);
    }
}
