use shared_models::auth::{Role, User};
use shared_models::error::AppError;

pub fn require_role(user: &User, allowed: &[Role], action: &str) -> Result<(), AppError> {
    if user.has_any_role(allowed) {
        return Ok(());
    }
    Err(AppError::Forbidden(format!("Role {} is not allowed to {}", user.role(), action)))
}

/// Passes when the caller is the owner of the resource or holds one of `staff`.
pub fn require_self_or_role(
    user: &User,
    owner_id: &str,
    staff: &[Role],
    action: &str,
) -> Result<(), AppError> {
    if user.id == owner_id || user.has_any_role(staff) {
        return Ok(());
    }
    Err(AppError::Forbidden(format!("Not allowed to {}", action)))
}
