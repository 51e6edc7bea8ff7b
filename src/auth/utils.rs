use crate::{
    auth::claims::{Identity, Role},
    errors::{AppError, AppResult},
};

/// Only teachers and admins may create exams.
pub fn require_author(identity: &Identity) -> AppResult<()> {
    if !matches!(identity.role, Role::Teacher | Role::Admin) {
        return Err(AppError::Forbidden(
            "You do not have permission to create an exam".to_string(),
        ));
    }
    Ok(())
}

pub fn require_owner_or_admin(identity: &Identity, owner_id: i64) -> AppResult<()> {
    if identity.role != Role::Admin && identity.user_id != owner_id {
        return Err(AppError::Forbidden(
            "You can only modify your own exams".to_string(),
        ));
    }
    Ok(())
}
