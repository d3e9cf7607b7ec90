//! Request validation shared by the CLI and the HTTP layer

use crate::error::{AppError, AppResult};

/// Return the trimmed query, rejecting blank input
pub fn validate_query(query: &str) -> AppResult<&str> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation("query required".to_string()));
    }
    Ok(trimmed)
}

/// Resolve the requested top-k against the configured default.
/// `0` yields no results and values past the corpus size return every fragment.
pub fn resolve_k(requested: Option<usize>, default_k: usize) -> usize {
    requested.unwrap_or(default_k)
}
