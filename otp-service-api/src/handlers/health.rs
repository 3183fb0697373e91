//! Orchestration probes driven by the lifecycle state.

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::{lifecycle::LifecycleState, AppState};

#[derive(Debug, Serialize)]
pub struct ProbeResponse {
    pub status: &'static str,
    pub state: &'static str,
}

fn probe(code: StatusCode, status: &'static str, state: LifecycleState) -> (StatusCode, Json<ProbeResponse>) {
    (
        code,
        Json(ProbeResponse {
            status,
            state: state.as_str(),
        }),
    )
}

/// 200 only while ready.
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<ProbeResponse>) {
    let current = state.lifecycle.state();
    if current == LifecycleState::Ready {
        probe(StatusCode::OK, "ok", current)
    } else {
        probe(StatusCode::SERVICE_UNAVAILABLE, "unavailable", current)
    }
}

/// Readiness strictly requires the ready state.
pub async fn ready(State(state): State<AppState>) -> (StatusCode, Json<ProbeResponse>) {
    let current = state.lifecycle.state();
    if state.lifecycle.is_ready() {
        probe(StatusCode::OK, "ready", current)
    } else {
        probe(StatusCode::SERVICE_UNAVAILABLE, "not_ready", current)
    }
}

/// Alive until the process has fully shut down.
pub async fn live(State(state): State<AppState>) -> (StatusCode, Json<ProbeResponse>) {
    let current = state.lifecycle.state();
    if current == LifecycleState::Shutdown {
        probe(StatusCode::SERVICE_UNAVAILABLE, "shutdown", current)
    } else {
        probe(StatusCode::OK, "alive", current)
    }
}
