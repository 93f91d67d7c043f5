use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::digits::digit_deltas;
use crate::error::HubError;
use crate::rates::{price_moves, RatesResponse};
use crate::staleness;
use crate::state::AppState;

// ── Route definitions ────────────────────────────────────────────────────

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/rates", get(api_rates))
        .route("/api/board", get(api_board))
}

// ── Handlers ─────────────────────────────────────────────────────────────

/// Refresh trigger: fetches upstream, rotates on change, returns the stored
/// generations.  Upstream failure with a populated store degrades to the
/// cached result.
async fn api_rates(State(state): State<Arc<AppState>>) -> Result<Json<RatesResponse>, HubError> {
    let view = state.reconciler.refresh().await?;
    Ok(Json(view))
}

/// Operator view for the physical board: stored generations plus the derived
/// staleness verdict, digit tile diff, and per-purity moves.  Reads the store
/// only, never touches upstream.
async fn api_board(State(state): State<Arc<AppState>>) -> Result<Json<Value>, HubError> {
    let view = state.reconciler.view().await?;

    let verdict = staleness::evaluate(Some(view.last_updated), Utc::now(), state.stale_threshold());
    let digits = digit_deltas(&view.current, &view.previous, state.digit_policy());
    let moves = price_moves(&view.current, &view.previous);

    Ok(Json(json!({
        "rates": view,
        "staleness": verdict,
        "digits": digits,
        "moves": moves,
    })))
}
