use crate::{
    auth::AuthenticatedUser,
    error::AppError,
    models::{ChangePasswordRequest, UpdateProfileRequest},
    response,
    services::UserService,
};
use actix_web::{get, put, web, Responder};
use validator::Validate;

#[get("/me")]
pub async fn me(
    service: web::Data<UserService>,
    user: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    Ok(response::ok(service.profile(&user).await?))
}

/// Updates email and/or avatar URL. Absent fields are left as they are.
#[put("/me")]
pub async fn update_me(
    service: web::Data<UserService>,
    user: AuthenticatedUser,
    profile: web::Json<UpdateProfileRequest>,
) -> Result<impl Responder, AppError> {
    profile.validate()?;
    let updated = service.update_profile(&user, profile.into_inner()).await?;
    Ok(response::ok(updated))
}

#[put("/me/password")]
pub async fn change_password(
    service: web::Data<UserService>,
    user: AuthenticatedUser,
    passwords: web::Json<ChangePasswordRequest>,
) -> Result<impl Responder, AppError> {
    passwords.validate()?;
    service.change_password(&user, passwords.into_inner()).await?;
    Ok(response::ok_empty())
}
