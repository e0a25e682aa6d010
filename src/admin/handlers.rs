use std::sync::Arc;
use std::time::Instant;

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::load_balancer::{TargetPool, TargetSnapshot};

/// Shared state for the admin API.
#[derive(Clone)]
pub struct AdminState {
    pub pool: Arc<TargetPool>,
    pub api_key: Arc<str>,
    pub started: Instant,
}

impl AdminState {
    pub fn new(pool: Arc<TargetPool>, api_key: &str) -> Self {
        Self {
            pool,
            api_key: Arc::from(api_key),
            started: Instant::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemStatus {
    pub version: String,
    /// `operational` while any target is eligible, `degraded` otherwise.
    pub status: String,
    pub uptime_secs: u64,
    pub eligible_targets: usize,
    pub total_targets: usize,
}

pub async fn get_status(State(state): State<AdminState>) -> Json<SystemStatus> {
    let eligible = state.pool.eligible_count();
    let status = if eligible > 0 { "operational" } else { "degraded" };
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION").to_string(),
        status: status.to_string(),
        uptime_secs: state.started.elapsed().as_secs(),
        eligible_targets: eligible,
        total_targets: state.pool.targets().len(),
    })
}

pub async fn get_targets(State(state): State<AdminState>) -> Json<Vec<TargetSnapshot>> {
    Json(state.pool.snapshot())
}
