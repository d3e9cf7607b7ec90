use serde::{Deserialize, Serialize};

use crate::services::ScoredFragment;

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub query: String,
    #[serde(default)]
    pub k: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct AskResponse {
    pub answer: String,
    pub contexts: Vec<ScoredFragment>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub fragments: usize,
}
