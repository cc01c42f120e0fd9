//! Transfer lifecycle endpoints.

use std::collections::HashMap;
use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::{Money, TransferId};
use durable::{InMemoryRuntime, RuntimeClient};
use saga::account_transfer::VISIBILITY_STEP_KEY;
use saga::{
    InMemoryBank, InMemoryNotifier, TransferConfig, TransferHandle, TransferOutcome,
    TransferRequest, TransferStatus, start_transfer,
};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
///
/// The bank and notifier are shared across all transfers; each transfer
/// gets its own durable runtime so signals and journals stay isolated.
pub struct AppState {
    pub bank: InMemoryBank,
    pub notifier: InMemoryNotifier,
    pub config: TransferConfig,
    pub transfers: RwLock<HashMap<TransferId, Arc<TransferHandle<InMemoryRuntime>>>>,
}

// -- Request types --

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTransferRequest {
    pub amount_cents: i64,
    pub from_account: String,
    pub to_account: String,
    /// Overrides the server-wide approval setting for this transfer.
    #[serde(default)]
    pub require_approval: Option<bool>,
}

// -- Response types --

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferStatusResponse {
    pub transfer_id: String,
    #[serde(flatten)]
    pub status: TransferStatus,
    /// Last step published through advanced visibility, when enabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_step: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutcomeResponse {
    pub transfer_id: String,
    #[serde(flatten)]
    pub outcome: TransferOutcome,
}

// -- Handlers --

/// POST /transfers — start a transfer; the saga runs in the background.
#[tracing::instrument(skip(state, req))]
pub async fn create(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateTransferRequest>,
) -> Result<(StatusCode, Json<TransferStatusResponse>), ApiError> {
    let mut config = state.config.clone();
    if let Some(require_approval) = req.require_approval {
        config.require_approval = require_approval;
    }

    let runtime = Arc::new(InMemoryRuntime::new());
    let request = TransferRequest::new(
        Money::from_cents(req.amount_cents),
        req.from_account,
        req.to_account,
    );
    let handle = start_transfer(
        runtime,
        state.bank.clone(),
        state.notifier.clone(),
        config,
        request,
    );

    let id = handle.id();
    let response = status_response(&handle);
    state.transfers.write().await.insert(id, Arc::new(handle));
    tracing::info!(transfer_id = %id, "transfer accepted");

    Ok((StatusCode::ACCEPTED, Json(response)))
}

/// GET /transfers — list the status of every known transfer.
#[tracing::instrument(skip(state))]
pub async fn list(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<TransferStatusResponse>>, ApiError> {
    let transfers = state.transfers.read().await;
    let responses = transfers.values().map(|handle| status_response(handle)).collect();
    Ok(Json(responses))
}

/// GET /transfers/:id — status snapshot of one transfer.
#[tracing::instrument(skip(state))]
pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<TransferStatusResponse>, ApiError> {
    let transfer_id = parse_transfer_id(&id)?;
    let transfers = state.transfers.read().await;
    let handle = transfers
        .get(&transfer_id)
        .ok_or_else(|| ApiError::NotFound(format!("Transfer {id} not found")))?;

    Ok(Json(status_response(handle)))
}

/// POST /transfers/:id/approve — deliver the approval signal.
#[tracing::instrument(skip(state))]
pub async fn approve(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<TransferStatusResponse>), ApiError> {
    let transfer_id = parse_transfer_id(&id)?;
    let transfers = state.transfers.read().await;
    let handle = transfers
        .get(&transfer_id)
        .ok_or_else(|| ApiError::NotFound(format!("Transfer {id} not found")))?;

    handle.approve();
    tracing::info!(transfer_id = %transfer_id, "approval signal delivered");

    Ok((StatusCode::ACCEPTED, Json(status_response(handle))))
}

/// POST /transfers/:id/cancel — request cancellation before the next step.
#[tracing::instrument(skip(state))]
pub async fn cancel(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<TransferStatusResponse>), ApiError> {
    let transfer_id = parse_transfer_id(&id)?;
    let transfers = state.transfers.read().await;
    let handle = transfers
        .get(&transfer_id)
        .ok_or_else(|| ApiError::NotFound(format!("Transfer {id} not found")))?;

    handle.cancel();
    tracing::info!(transfer_id = %transfer_id, "cancellation requested");

    Ok((StatusCode::ACCEPTED, Json(status_response(handle))))
}

/// GET /transfers/:id/outcome — wait for and return the terminal outcome.
#[tracing::instrument(skip(state))]
pub async fn outcome(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<OutcomeResponse>, ApiError> {
    let transfer_id = parse_transfer_id(&id)?;
    // clone the handle out so a long wait does not hold the map lock
    let handle = {
        let transfers = state.transfers.read().await;
        transfers
            .get(&transfer_id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("Transfer {id} not found")))?
    };

    let outcome = handle.wait().await?;
    Ok(Json(OutcomeResponse {
        transfer_id: transfer_id.to_string(),
        outcome,
    }))
}

fn status_response(handle: &TransferHandle<InMemoryRuntime>) -> TransferStatusResponse {
    TransferStatusResponse {
        transfer_id: handle.id().to_string(),
        status: handle.status(),
        current_step: handle.runtime().visibility_attribute(VISIBILITY_STEP_KEY),
    }
}

fn parse_transfer_id(id: &str) -> Result<TransferId, ApiError> {
    let uuid = uuid::Uuid::parse_str(id)
        .map_err(|e| ApiError::BadRequest(format!("Invalid ID format: {e}")))?;
    Ok(TransferId::from_uuid(uuid))
}
