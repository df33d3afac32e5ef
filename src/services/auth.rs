use std::sync::Arc;

use crate::auth::{
    AuthResponse, IssuedToken, LoginRequest, PasswordHasher, RefreshRequest, RegisterRequest,
    TokenEngine, TokenKind,
};
use crate::error::AppError;
use crate::models::{NewUser, User};
use crate::repository::UserRepository;

/// Registration, login and token refresh. The only caller of the token engine's
/// issuing side and of password verification at login.
pub struct AuthService {
    users: Arc<dyn UserRepository>,
    tokens: Arc<TokenEngine>,
    hasher: PasswordHasher,
    /// Checked against when the username is unknown, so a miss costs one bcrypt
    /// verification like a wrong password does.
    dummy_hash: Option<String>,
}

const DUMMY_PASSWORD: &str = "no-such-user-password";

impl AuthService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        tokens: Arc<TokenEngine>,
        hasher: PasswordHasher,
    ) -> Self {
        let dummy_hash = match hasher.hash(DUMMY_PASSWORD) {
            Ok(hash) => Some(hash),
            Err(e) => {
                log::warn!("unknown-user logins will skip bcrypt: {}", e);
                None
            }
        };
        Self {
            users,
            tokens,
            hasher,
            dummy_hash,
        }
    }

    /// Creates the account and signs it in. Uniqueness is enforced by the store, so
    /// two concurrent registrations for one username cannot both succeed.
    pub async fn register(&self, input: RegisterRequest) -> Result<AuthResponse, AppError> {
        let password_hash = self.hasher.hash_blocking(input.password).await?;

        let user = self
            .users
            .create(NewUser {
                username: input.username,
                email: input.email,
                password_hash,
            })
            .await?;

        log::info!("registered user {} ({})", user.id, user.username);
        self.sign_in(user)
    }

    /// Unknown usernames and wrong passwords are indistinguishable to the caller.
    pub async fn login(&self, input: LoginRequest) -> Result<AuthResponse, AppError> {
        let user = match self.users.find_by_username(&input.username).await? {
            Some(user) => user,
            None => {
                if let Some(dummy_hash) = self.dummy_hash.clone() {
                    self.hasher.verify_blocking(input.password, dummy_hash).await?;
                }
                return Err(AppError::InvalidCredentials);
            }
        };

        let valid = self
            .hasher
            .verify_blocking(input.password, user.password_hash.clone())
            .await?;
        if !valid {
            log::warn!("failed login for user {}", user.id);
            return Err(AppError::InvalidCredentials);
        }

        if !user.status.can_login() {
            log::warn!("login refused for disabled user {}", user.id);
            return Err(AppError::AccountDisabled);
        }

        log::info!("user {} logged in", user.id);
        self.sign_in(user)
    }

    /// Mints a new access token from a refresh token. The refresh token itself is
    /// neither rotated nor revoked.
    pub async fn refresh(&self, input: RefreshRequest) -> Result<AuthResponse, AppError> {
        let access = self.tokens.refresh(&input.refresh_token)?;

        let user = self
            .users
            .find_by_id(access.claims.user_id)
            .await?
            .ok_or_else(|| AppError::InvalidToken("user no longer exists".into()))?;
        if !user.status.can_login() {
            return Err(AppError::AccountDisabled);
        }

        log::debug!("refreshed access token for user {}", user.id);
        Ok(auth_response(access, None, user))
    }

    fn sign_in(&self, user: User) -> Result<AuthResponse, AppError> {
        let access = self.tokens.issue(user.id, &user.username, TokenKind::Access)?;
        let refresh = self.tokens.issue(user.id, &user.username, TokenKind::Refresh)?;
        Ok(auth_response(access, Some(refresh.token), user))
    }
}

fn auth_response(access: IssuedToken, refresh_token: Option<String>, user: User) -> AuthResponse {
    AuthResponse {
        expires_at: access.expires_at(),
        access_token: access.token,
        refresh_token,
        user: user.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::JwtConfig;
    use crate::error::ErrorKind;
    use crate::models::UserStatus;
    use crate::repository::MemoryStore;

    fn service(store: &MemoryStore) -> AuthService {
        let tokens = TokenEngine::new(&JwtConfig {
            secret: "auth_service_secret".into(),
            access_ttl_secs: 60,
            refresh_ttl_secs: 600,
            issuer: "todo-api-tests".into(),
        })
        .unwrap();
        AuthService::new(Arc::new(store.clone()), Arc::new(tokens), PasswordHasher::new(4))
    }

    fn alice() -> RegisterRequest {
        RegisterRequest {
            username: "alice".into(),
            email: "alice@x.com".into(),
            password: "secret1".into(),
        }
    }

    fn login(password: &str) -> LoginRequest {
        LoginRequest {
            username: "alice".into(),
            password: password.into(),
        }
    }

    #[actix_rt::test]
    async fn test_register_then_login() {
        let store = MemoryStore::new();
        let service = service(&store);

        let registered = service.register(alice()).await.unwrap();
        assert!(registered.refresh_token.is_some());
        assert_eq!(registered.user.username, "alice");

        let logged_in = service.login(login("secret1")).await.unwrap();
        assert_eq!(logged_in.user.id, registered.user.id);

        let err = service.login(login("wrong1")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authentication);

        let err = service
            .login(LoginRequest {
                username: "nobody".into(),
                password: "secret1".into(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "invalid username or password");
    }

    #[actix_rt::test]
    async fn test_unknown_user_pays_for_a_bcrypt_check() {
        let store = MemoryStore::new();
        let service = service(&store);

        // Same cost as real hashes, so the miss path does equivalent work.
        let dummy = service.dummy_hash.clone().unwrap();
        assert!(dummy.starts_with("$2b$04$"));
        assert!(PasswordHasher::new(4).verify(DUMMY_PASSWORD, &dummy).unwrap());

        let err = service
            .login(LoginRequest {
                username: "ghost".into(),
                password: DUMMY_PASSWORD.into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidCredentials));
    }

    #[actix_rt::test]
    async fn test_duplicate_registration_conflicts() {
        let store = MemoryStore::new();
        let service = service(&store);
        service.register(alice()).await.unwrap();

        let err = service.register(alice()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[actix_rt::test]
    async fn test_disabled_account_cannot_log_in() {
        let store = MemoryStore::new();
        let service = service(&store);
        let registered = service.register(alice()).await.unwrap();
        store
            .set_user_status(registered.user.id, UserStatus::Disabled)
            .await;

        let err = service.login(login("secret1")).await.unwrap_err();
        assert!(matches!(err, AppError::AccountDisabled));
    }

    #[actix_rt::test]
    async fn test_refresh_returns_access_token_only() {
        let store = MemoryStore::new();
        let service = service(&store);
        let registered = service.register(alice()).await.unwrap();

        let refreshed = service
            .refresh(RefreshRequest {
                refresh_token: registered.refresh_token.clone().unwrap(),
            })
            .await
            .unwrap();
        assert!(refreshed.refresh_token.is_none());
        assert_eq!(refreshed.user.id, registered.user.id);

        let err = service
            .refresh(RefreshRequest {
                refresh_token: registered.access_token,
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authentication);
    }
}
