//! Async HTTP client wrapping the Perch JSON API.

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use perch_core::{
  card::{Card, Resolution},
  history::HistoryEntry,
  snapshot::Snapshot,
};
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::{Value, json};

/// Connection settings for the Perch API.
#[derive(Debug, Clone)]
pub struct ApiConfig {
  pub base_url: String,
  pub username: String,
  pub password: String,
}

/// Response of `POST /check_uid`.
#[derive(Debug, Deserialize)]
pub struct CheckResponse {
  #[serde(flatten)]
  pub resolution: Resolution,
  pub uid:        String,
}

/// Async HTTP client for the Perch JSON API.
///
/// Cheap to clone: the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct ApiClient {
  client: Client,
  config: ApiConfig,
}

impl ApiClient {
  pub fn new(config: ApiConfig) -> Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(10))
      .build()
      .context("failed to build HTTP client")?;
    Ok(Self { client, config })
  }

  fn url(&self, path: &str) -> String {
    format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
  }

  fn auth(&self, req: RequestBuilder) -> RequestBuilder {
    if self.config.username.is_empty() {
      req
    } else {
      req.basic_auth(&self.config.username, Some(&self.config.password))
    }
  }

  async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
    let resp = self
      .auth(self.client.get(self.url(path)))
      .send()
      .await
      .with_context(|| format!("GET {path} failed"))?;
    decode(path, resp).await
  }

  async fn post<T: DeserializeOwned>(&self, path: &str, body: Value) -> Result<T> {
    let resp = self
      .auth(self.client.post(self.url(path)))
      .json(&body)
      .send()
      .await
      .with_context(|| format!("POST {path} failed"))?;
    decode(path, resp).await
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  /// `GET /status`
  pub async fn status(&self) -> Result<Snapshot> { self.get("/status").await }

  /// `GET /cards` (admin)
  pub async fn cards(&self) -> Result<Vec<Card>> { self.get("/cards").await }

  // ── Occupancy ─────────────────────────────────────────────────────────────

  /// `POST /scan`
  pub async fn scan(&self, station: &str, uid: &str) -> Result<HistoryEntry> {
    self
      .post("/scan", json!({ "station": station, "uid": uid }))
      .await
  }

  /// `POST /entry`
  pub async fn enter(&self, station: &str, uid: &str) -> Result<HistoryEntry> {
    self
      .post("/entry", json!({ "station": station, "uid": uid }))
      .await
  }

  /// `POST /exit`
  pub async fn exit(&self, station: &str) -> Result<HistoryEntry> {
    self.post("/exit", json!({ "station": station })).await
  }

  /// `POST /set_leave_time`
  pub async fn set_leave_time(&self, station: &str, time: &str) -> Result<Value> {
    self
      .post("/set_leave_time", json!({ "station": station, "leave_time": time }))
      .await
  }

  /// `POST /reset` (admin)
  pub async fn reset(&self) -> Result<Value> { self.post("/reset", json!({})).await }

  // ── Cards ─────────────────────────────────────────────────────────────────

  /// `POST /check_uid`
  pub async fn check(&self, uid: &str) -> Result<CheckResponse> {
    self.post("/check_uid", json!({ "uid": uid })).await
  }

  /// `POST /save_name`
  pub async fn name(&self, uid: &str, name: &str) -> Result<Value> {
    self
      .post("/save_name", json!({ "uid": uid, "name": name }))
      .await
  }

  /// `POST /add_rfid` (admin)
  pub async fn add_card(&self, uid: &str, name: &str) -> Result<Value> {
    self
      .post("/add_rfid", json!({ "rfid_uid": uid, "name": name }))
      .await
  }
}

/// Deserialise a success body, or turn the server's `{"error": ...}` body
/// into an error message.
async fn decode<T: DeserializeOwned>(path: &str, resp: Response) -> Result<T> {
  let status = resp.status();
  if !status.is_success() {
    let message = resp
      .json::<Value>()
      .await
      .ok()
      .and_then(|body| body.get("error").and_then(Value::as_str).map(str::to_owned))
      .unwrap_or_else(|| status.to_string());
    return Err(anyhow!("{path} → {status}: {message}"));
  }
  resp
    .json()
    .await
    .with_context(|| format!("deserialising {path} response"))
}
