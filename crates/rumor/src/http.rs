//! HTTP surface: the gossip server and the outbound transport.
//!
//! Endpoints:
//! - POST /gossip   inbound `GossipMessage`
//! - GET  /peers    known peers and their last reported wants
//! - GET  /summary  local summary vector
//! - POST /publish  originate a record on this node

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use serde::{Deserialize, Serialize};

use rumor_core::{Endpoint, StreamId, SummaryVector};
use rumor_store::Store;
use rumor_sync::{GossipMessage, SyncError, Transport};

use crate::config::NodeConfig;
use crate::error::NodeError;
use crate::node::Node;

/// Path the gossip handler is mounted on.
pub const GOSSIP_PATH: &str = "/gossip";

pub fn router<S, T>(node: Arc<Node<S, T>>) -> Router
where
    S: Store + 'static,
    T: Transport + 'static,
{
    Router::new()
        .route(GOSSIP_PATH, post(handle_gossip::<S, T>))
        .route("/peers", get(handle_peers::<S, T>))
        .route("/summary", get(handle_summary::<S, T>))
        .route("/publish", post(handle_publish::<S, T>))
        .with_state(node)
}

// ---------- Data types ----------

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerView {
    pub endpoint: Endpoint,
    pub last_reported_want: SummaryVector,
    pub observed_at: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishRequest {
    pub stream_id: StreamId,
    pub payload: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishResponse {
    pub stream_id: StreamId,
    pub sequence: u64,
    pub originator: String,
}

/// Status code plus a plain-text reason.
#[derive(Debug)]
pub struct ApiError(StatusCode, String);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.0, self.1).into_response()
    }
}

impl From<SyncError> for ApiError {
    fn from(e: SyncError) -> Self {
        let status = match &e {
            SyncError::InvalidMessage(_) => StatusCode::BAD_REQUEST,
            SyncError::PipelineClosed | SyncError::PipelineFull => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        ApiError(status, e.to_string())
    }
}

impl From<NodeError> for ApiError {
    fn from(e: NodeError) -> Self {
        match e {
            NodeError::Sync(inner) => inner.into(),
            NodeError::Validation(_) => ApiError(StatusCode::BAD_REQUEST, e.to_string()),
            NodeError::PublishContended(_) => ApiError(StatusCode::CONFLICT, e.to_string()),
            _ => ApiError(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
        }
    }
}

// ---------- Handlers ----------

async fn handle_gossip<S, T>(
    State(node): State<Arc<Node<S, T>>>,
    body: Bytes,
) -> Result<StatusCode, ApiError>
where
    S: Store + 'static,
    T: Transport + 'static,
{
    let message: GossipMessage = serde_json::from_slice(&body).map_err(|e| {
        tracing::warn!(error = %e, "rejected malformed gossip");
        ApiError(StatusCode::BAD_REQUEST, format!("malformed message: {}", e))
    })?;

    let kind = message.kind();
    let from = message.reply_endpoint().clone();

    node.handler().handle(message).await.map_err(|e| {
        match &e {
            SyncError::InvalidMessage(_) => {
                tracing::warn!(kind, from = %from, error = %e, "rejected invalid gossip")
            }
            _ => tracing::error!(kind, from = %from, error = %e, "failed to process gossip"),
        }
        ApiError::from(e)
    })?;

    Ok(StatusCode::OK)
}

async fn handle_peers<S, T>(
    State(node): State<Arc<Node<S, T>>>,
) -> Result<Json<Vec<PeerView>>, ApiError>
where
    S: Store + 'static,
    T: Transport + 'static,
{
    let peers = node
        .peers()
        .await?
        .into_iter()
        .map(|p| PeerView {
            endpoint: p.endpoint,
            last_reported_want: p.last_reported_want.vector,
            observed_at: p.last_reported_want.observed_at,
        })
        .collect();
    Ok(Json(peers))
}

async fn handle_summary<S, T>(
    State(node): State<Arc<Node<S, T>>>,
) -> Result<Json<SummaryVector>, ApiError>
where
    S: Store + 'static,
    T: Transport + 'static,
{
    Ok(Json(node.summary().await?))
}

async fn handle_publish<S, T>(
    State(node): State<Arc<Node<S, T>>>,
    body: Bytes,
) -> Result<Json<PublishResponse>, ApiError>
where
    S: Store + 'static,
    T: Transport + 'static,
{
    let req: PublishRequest = serde_json::from_slice(&body)
        .map_err(|e| ApiError(StatusCode::BAD_REQUEST, format!("malformed request: {}", e)))?;

    let record = node.publish(req.stream_id, req.payload).await?;
    Ok(Json(PublishResponse {
        stream_id: record.stream_id,
        sequence: record.sequence,
        originator: record.originator,
    }))
}

// ---------- Outbound ----------

/// Sends gossip as JSON POSTs, one request per message.
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration, accept_invalid_certs: bool) -> Result<Self, NodeError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(accept_invalid_certs)
            .build()
            .map_err(|e| NodeError::Http(e.to_string()))?;
        Ok(Self { client })
    }

    pub fn from_config(config: &NodeConfig) -> Result<Self, NodeError> {
        Self::new(config.request_timeout, config.accept_invalid_certs)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, destination: &Endpoint, message: GossipMessage) -> rumor_sync::Result<()> {
        let response = self
            .client
            .post(destination.as_str())
            .json(&message)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SyncError::Timeout(format!("{} to {}", message.kind(), destination))
                } else if e.is_connect() {
                    SyncError::PeerUnreachable(destination.clone())
                } else {
                    SyncError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SyncError::PeerRejected {
                endpoint: destination.clone(),
                status: status.as_u16(),
            });
        }

        tracing::trace!(peer = %destination, kind = message.kind(), "sent");
        Ok(())
    }
}
