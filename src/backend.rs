//! REST access to the order service.
//!
//! [`OrderBackend`] is the seam the sync layer talks through: the fetcher
//! lists snapshots, the tracker loads single orders and views submit status
//! changes and cancellations. [`HttpBackend`] is the production
//! implementation over `reqwest`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Response, StatusCode};
use tracing::{debug, info, warn};

use crate::models::{ErrorResponse, MessageResponse, Order, OrderId, OrderStatus, StatusUpdateRequest};
use crate::{ExpoError, Result};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Order service operations used by the sync layer.
#[async_trait]
pub trait OrderBackend: Send + Sync {
    /// Lists up to `limit` recent orders for a restaurant.
    async fn list_orders(&self, restaurant_id: &str, limit: u32) -> Result<Vec<Order>>;

    /// Loads one order.
    async fn get_order(&self, id: &OrderId) -> Result<Order>;

    /// Sets an order's status and returns the updated record.
    async fn update_status(&self, id: &OrderId, status: OrderStatus) -> Result<Order>;

    /// Cancels an order.
    async fn cancel_order(&self, id: &OrderId) -> Result<()>;
}

/// [`OrderBackend`] over HTTP.
#[derive(Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    api_url: String,
}

impl HttpBackend {
    /// Builds a client for the REST base `api_url`.
    ///
    /// # Errors
    ///
    /// Returns [`ExpoError::Tls`] if the HTTP client cannot be built.
    pub fn new(api_url: impl Into<String>, tls_config: Option<rustls::ClientConfig>) -> Result<Self> {
        let mut builder = reqwest::Client::builder().timeout(REQUEST_TIMEOUT);
        if let Some(tls_config) = tls_config {
            builder = builder.use_preconfigured_tls(tls_config);
        }
        let client = builder
            .build()
            .map_err(|e| ExpoError::Tls(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.api_url)
    }
}

#[async_trait]
impl OrderBackend for HttpBackend {
    async fn list_orders(&self, restaurant_id: &str, limit: u32) -> Result<Vec<Order>> {
        let response = self
            .client
            .get(self.url(&format!("/restaurants/{restaurant_id}/orders")))
            .query(&[("limit", limit)])
            .send()
            .await?;
        let records: Vec<serde_json::Value> = check(response, restaurant_id).await?.json().await?;
        let orders = decode_snapshot(records, restaurant_id);

        debug!(restaurant_id, count = orders.len(), "Fetched order snapshot");
        Ok(orders)
    }

    async fn get_order(&self, id: &OrderId) -> Result<Order> {
        let response = self.client.get(self.url(&format!("/orders/{id}"))).send().await?;
        Ok(check(response, id.as_str()).await?.json().await?)
    }

    async fn update_status(&self, id: &OrderId, status: OrderStatus) -> Result<Order> {
        let response = self
            .client
            .patch(self.url(&format!("/orders/{id}/status")))
            .json(&StatusUpdateRequest { status })
            .send()
            .await?;
        let order: Order = check(response, id.as_str()).await?.json().await?;

        info!(order_id = %id, status = %order.status, "Order status updated");
        Ok(order)
    }

    async fn cancel_order(&self, id: &OrderId) -> Result<()> {
        let response = self.client.delete(self.url(&format!("/orders/{id}"))).send().await?;
        let ack: MessageResponse = check(response, id.as_str()).await?.json().await?;

        info!(order_id = %id, message = %ack.message, "Order cancelled");
        Ok(())
    }
}

/// Decodes a snapshot record by record, skipping ones that don't parse so
/// one bad order never freezes the rest of the list.
fn decode_snapshot(records: Vec<serde_json::Value>, restaurant_id: &str) -> Vec<Order> {
    let mut orders = Vec::with_capacity(records.len());
    for record in records {
        match serde_json::from_value::<Order>(record) {
            Ok(order) => orders.push(order),
            Err(e) => warn!(restaurant_id, error = %e, "Skipping malformed order record"),
        }
    }
    orders
}

/// Maps error statuses onto [`ExpoError`].
///
/// 404 becomes [`ExpoError::NotFound`], other client errors carry the
/// backend's `detail` in [`ExpoError::Rejected`], and server errors stay
/// transport errors.
async fn check(response: Response, subject: &str) -> Result<Response> {
    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        return Err(ExpoError::NotFound(subject.to_string()));
    }
    if status.is_client_error() {
        let detail = match response.json::<ErrorResponse>().await {
            Ok(body) => body.message(),
            Err(_) => status.to_string(),
        };
        return Err(ExpoError::Rejected(detail));
    }
    Ok(response.error_for_status()?)
}
