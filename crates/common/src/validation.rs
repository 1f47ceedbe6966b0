// Title validation, applied by the client before any optimistic insert and
// again by the service before persisting.

use crate::error::MutationError;

pub const EMPTY_TITLE_MESSAGE: &str = "Todo title cannot be empty.";

/// Trim `input` and reject it if nothing is left.
pub fn normalize_title(input: &str) -> Result<String, MutationError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(MutationError::ValidationFailed(EMPTY_TITLE_MESSAGE.to_string()));
    }
    Ok(trimmed.to_string())
}
