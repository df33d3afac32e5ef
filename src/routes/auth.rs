use crate::{
    auth::{LoginRequest, RefreshRequest, RegisterRequest},
    error::AppError,
    response,
    services::AuthService,
};
use actix_web::{post, web, Responder};
use validator::Validate;

/// Register a new user
///
/// Creates the account and returns an access token, a refresh token and the
/// public profile. A taken username or email is a 400.
#[post("/register")]
pub async fn register(
    service: web::Data<AuthService>,
    register_data: web::Json<RegisterRequest>,
) -> Result<impl Responder, AppError> {
    register_data.validate()?;
    let auth = service.register(register_data.into_inner()).await?;
    Ok(response::ok(auth))
}

/// Login user
///
/// Authenticates by username and password. Any credential failure is a 401.
#[post("/login")]
pub async fn login(
    service: web::Data<AuthService>,
    login_data: web::Json<LoginRequest>,
) -> Result<impl Responder, AppError> {
    login_data.validate()?;
    let auth = service.login(login_data.into_inner()).await?;
    Ok(response::ok(auth))
}

/// Exchanges a refresh token for a new access token.
#[post("/refresh")]
pub async fn refresh(
    service: web::Data<AuthService>,
    refresh_data: web::Json<RefreshRequest>,
) -> Result<impl Responder, AppError> {
    refresh_data.validate()?;
    let auth = service.refresh(refresh_data.into_inner()).await?;
    Ok(response::ok(auth))
}
