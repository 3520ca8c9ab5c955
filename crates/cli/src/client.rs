//! API client for communicating with the memwatch agent

use anyhow::{Context, Result};
use reqwest::{Client, RequestBuilder};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use url::Url;

/// API client for the agent's memory control surface
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid API URL")?;

        Ok(Self { client, base_url })
    }

    fn url(&self, path: &str) -> Result<Url> {
        self.base_url.join(path).context("Invalid path")
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.send(self.client.get(self.url(path)?)).await
    }

    /// Make a POST request without a body
    pub async fn post<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.send(self.client.post(self.url(path)?)).await
    }

    /// Make a PUT request with JSON body
    pub async fn put<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        self.send(self.client.put(self.url(path)?).json(body)).await
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request.send().await.context("Failed to send request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            // control errors carry {success, message}; show just the message
            let detail = serde_json::from_str::<ControlResponse>(&body)
                .map(|r| r.message)
                .unwrap_or(body);
            anyhow::bail!("API error ({}): {}", status, detail);
        }

        response.json().await.context("Failed to parse response")
    }
}

// API response types

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemorySnapshot {
    pub rss: u64,
    pub heap_total: u64,
    pub heap_used: u64,
    pub external: u64,
    pub heap_used_percent: f64,
    pub timestamp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryAverage {
    pub rss: u64,
    pub heap_total: u64,
    pub heap_used: u64,
    pub external: u64,
    pub heap_used_percent: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GcStats {
    pub count: u64,
    pub total_time: u64,
    pub average_time: f64,
    pub last_executed: Option<i64>,
    pub memory_freed: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GcStatus {
    pub available: bool,
    #[serde(flatten)]
    pub stats: GcStats,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryStats {
    pub current: MemorySnapshot,
    pub peak: Option<MemorySnapshot>,
    pub average: Option<MemoryAverage>,
    pub gc_stats: GcStats,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    pub interval_ms: u64,
    pub warning_threshold: f64,
    pub critical_threshold: f64,
    pub auto_gc: bool,
    pub auto_gc_threshold: f64,
    pub history_limit: usize,
}

/// Partial configuration update; unset fields keep their current value
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning_threshold: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub critical_threshold: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_gc: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_gc_threshold: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history_limit: Option<usize>,
}

impl ConfigPatch {
    pub fn is_empty(&self) -> bool {
        self.interval_ms.is_none()
            && self.warning_threshold.is_none()
            && self.critical_threshold.is_none()
            && self.auto_gc.is_none()
            && self.auto_gc_threshold.is_none()
            && self.history_limit.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlResponse {
    pub success: bool,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    const SNAPSHOT_JSON: &str = r#"{
        "rss": 10485760,
        "heap_total": 8388608,
        "heap_used": 4194304,
        "external": 0,
        "heap_used_percent": 50.0,
        "timestamp": 1700000000000
    }"#;

    #[tokio::test]
    async fn test_get_usage() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/memory/usage")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(SNAPSHOT_JSON)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let usage: MemorySnapshot = client.get("memory/usage").await.unwrap();

        mock.assert_async().await;
        assert_eq!(usage.heap_used, 4 * 1024 * 1024);
        assert_eq!(usage.heap_used_percent, 50.0);
    }

    #[tokio::test]
    async fn test_get_gc_status_flattens_stats() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/memory/gc")
            .with_status(200)
            .with_body(
                r#"{"available": true, "count": 2, "total_time": 6, "average_time": 3.0,
                    "last_executed": 1700000000000, "memory_freed": -512}"#,
            )
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let status: GcStatus = client.get("memory/gc").await.unwrap();

        assert!(status.available);
        assert_eq!(status.stats.count, 2);
        assert_eq!(status.stats.memory_freed, -512);
    }

    #[tokio::test]
    async fn test_put_sends_only_set_fields() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("PUT", "/memory/config")
            .match_body(Matcher::Json(serde_json::json!({"interval_ms": 5000})))
            .with_status(200)
            .with_body(r#"{"success": true, "message": "Memory monitor configuration updated"}"#)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let patch = ConfigPatch {
            interval_ms: Some(5000),
            ..Default::default()
        };
        let response: ControlResponse = client.put("memory/config", &patch).await.unwrap();

        mock.assert_async().await;
        assert!(response.success);
    }

    #[tokio::test]
    async fn test_error_uses_control_message() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/memory/gc")
            .with_status(503)
            .with_body(
                r#"{"success": false, "message": "memory reclamation is not available on this host"}"#,
            )
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let err = client
            .post::<ControlResponse>("memory/gc")
            .await
            .unwrap_err()
            .to_string();

        assert!(err.contains("503"));
        assert!(err.contains("not available on this host"));
        assert!(!err.contains("success"));
    }

    #[tokio::test]
    async fn test_error_falls_back_to_raw_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/memory/stats")
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let err = client
            .get::<MemoryStats>("memory/stats")
            .await
            .unwrap_err()
            .to_string();

        assert!(err.contains("boom"));
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(ApiClient::new("not a url").is_err());
    }

    #[test]
    fn test_empty_patch() {
        assert!(ConfigPatch::default().is_empty());
        assert!(!ConfigPatch {
            auto_gc: Some(false),
            ..Default::default()
        }
        .is_empty());
    }
}
