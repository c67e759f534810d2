//! API client module
//!
//! HTTP client for the Motormart API.

use anyhow::{Context, Result};
use motormart_core::domain::job::{Job, JobCounts, JobStatus};
use motormart_core::domain::log::LogEntry;
use motormart_core::dto::job::JobSummary;
use motormart_core::dto::order::{OrderList, OrderRequest, OrderResponse};
use reqwest::Client;
use uuid::Uuid;

const USER_ID_HEADER: &str = "x-user-id";

/// Order endpoint reply: HTTP status plus body
///
/// Rejected submissions are not transport errors; the status and message are
/// the outcome.
#[derive(Debug)]
pub struct OrderReply<T> {
    pub status: u16,
    pub body: T,
}

impl<T> OrderReply<T> {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// HTTP client for the Motormart API
pub struct ApiClient {
    base_url: String,
    client: Client,
}

impl ApiClient {
    /// Create a new API client
    ///
    /// # Arguments
    /// * `base_url` - The base URL of the API
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }

    /// Submit an order for a product in the user's cart
    pub async fn submit_order(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        req: &OrderRequest,
    ) -> Result<OrderReply<OrderResponse>> {
        let url = format!("{}/order/{}", self.base_url, product_id);
        let response = self
            .client
            .post(&url)
            .header(USER_ID_HEADER, user_id.to_string())
            .json(req)
            .send()
            .await
            .context("Failed to send submit order request")?;

        self.handle_order_response(response).await
    }

    /// Get an order by ID
    pub async fn get_order(&self, id: Uuid) -> Result<OrderReply<OrderResponse>> {
        let url = format!("{}/order/{}", self.base_url, id);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to send get order request")?;

        self.handle_order_response(response).await
    }

    /// List orders of a user
    pub async fn list_orders(&self, user_id: Uuid) -> Result<OrderReply<OrderList>> {
        let url = format!("{}/order", self.base_url);
        let response = self
            .client
            .get(&url)
            .header(USER_ID_HEADER, user_id.to_string())
            .send()
            .await
            .context("Failed to send list orders request")?;

        self.handle_order_response(response).await
    }

    /// List jobs of a queue, optionally filtered by status
    pub async fn list_jobs(&self, queue: &str, status: Option<JobStatus>) -> Result<Vec<JobSummary>> {
        let url = format!("{}/queue/{}/jobs", self.base_url, queue);
        let mut request = self.client.get(&url);
        if let Some(status) = status {
            request = request.query(&[("status", status.as_str())]);
        }
        let response = request
            .send()
            .await
            .context("Failed to send list jobs request")?;

        self.handle_response(response).await
    }

    /// Count jobs per state in a queue
    pub async fn queue_counts(&self, queue: &str) -> Result<JobCounts> {
        let url = format!("{}/queue/{}/counts", self.base_url, queue);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to send queue counts request")?;

        self.handle_response(response).await
    }

    /// Get a job by ID
    pub async fn get_job(&self, id: Uuid) -> Result<Job> {
        let url = format!("{}/job/{}", self.base_url, id);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to send get job request")?;

        self.handle_response(response).await
    }

    /// Get logs for a job
    pub async fn get_job_logs(&self, id: Uuid) -> Result<Vec<LogEntry>> {
        let url = format!("{}/job/{}/logs", self.base_url, id);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to send get job logs request")?;

        self.handle_response(response).await
    }

    /// Resubmit a failed job
    pub async fn retry_job(&self, id: Uuid) -> Result<Job> {
        let url = format!("{}/job/{}/retry", self.base_url, id);
        let response = self
            .client
            .post(&url)
            .send()
            .await
            .context("Failed to send retry job request")?;

        self.handle_response(response).await
    }

    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T> {
        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Request failed with status {}: {}", status, error_text);
        }

        response
            .json()
            .await
            .context("Failed to parse response JSON")
    }

    /// Parses order bodies for every status, not only 2xx
    async fn handle_order_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<OrderReply<T>> {
        let status = response.status();
        let text = response
            .text()
            .await
            .context("Failed to read response body")?;

        match serde_json::from_str(&text) {
            Ok(body) => Ok(OrderReply {
                status: status.as_u16(),
                body,
            }),
            Err(_) => anyhow::bail!("Request failed with status {}: {}", status, text),
        }
    }
}
