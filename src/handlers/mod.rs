// Protected grading and results handlers. Every route in this tree sits
// behind the JWT middleware, which injects the caller's SchoolContext.
pub mod batches;
pub mod results;
pub mod schemes;
pub mod scores;

use crate::error::ApiError;
use crate::middleware::SchoolContext;

/// Write paths are teacher-only; approval against the school is checked
/// again inside the services via the directory.
pub(crate) fn require_teacher(ctx: &SchoolContext) -> Result<(), ApiError> {
    if ctx.role == "teacher" {
        Ok(())
    } else {
        Err(ApiError::forbidden("This operation requires a teacher role"))
    }
}
