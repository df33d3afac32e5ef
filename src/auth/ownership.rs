use crate::auth::extractors::AuthenticatedUser;
use crate::error::AppError;
use crate::models::Todo;

/// A resource recorded against a single owning user.
pub trait Owned {
    fn owner_id(&self) -> i64;
}

impl Owned for Todo {
    fn owner_id(&self) -> i64 {
        self.user_id
    }
}

/// Gates access to an id-addressed resource.
///
/// Existence is checked before ownership: a missing resource is `NotFound` for
/// every caller, and an existing one owned by someone else is `Forbidden`.
pub fn ensure_owner<T: Owned>(
    user: &AuthenticatedUser,
    resource: Option<T>,
    name: &str,
) -> Result<T, AppError> {
    let resource = resource.ok_or_else(|| AppError::NotFound(format!("{} not found", name)))?;

    if resource.owner_id() != user.id() {
        log::warn!(
            "user {} denied access to a {} owned by user {}",
            user.id(),
            name,
            resource.owner_id()
        );
        return Err(AppError::Forbidden(format!(
            "no permission to access this {}",
            name
        )));
    }

    Ok(resource)
}
