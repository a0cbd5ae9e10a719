//! Data transfer objects for dispatch HTTP endpoints.

use serde::{Deserialize, Serialize};

use crate::ports::RegistryStats;

/// Body of a successful command: `{"ok": true}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OkResponse {
    pub ok: bool,
}

impl Default for OkResponse {
    fn default() -> Self {
        Self { ok: true }
    }
}

/// Body of a rejected request: `{"error": "..."}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }

    pub fn not_found() -> Self {
        Self::new("not found")
    }
}

/// Health check body.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct HealthResponse {
    pub status: &'static str,
    #[serde(flatten)]
    pub stats: RegistryStats,
}

impl From<RegistryStats> for HealthResponse {
    fn from(stats: RegistryStats) -> Self {
        Self { status: "ok", stats }
    }
}
