//! Servicio de autenticación
//!
//! Cuentas con contraseña bcrypt y sesiones explícitas. El JWT solo
//! transporta el id de sesión: al hacer logout la sesión desaparece del
//! store y el token deja de servir aunque no haya expirado.

use std::sync::Arc;

use bcrypt::{hash, verify};
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::dto::auth_dto::{AuthResponse, LoginRequest, SignupRequest};
use crate::models::{NewUser, Session, User, UserResponse, UserRole};
use crate::repositories::ShuttleRepository;
use crate::state::SessionStore;
use crate::utils::errors::{forbidden_error, validation_error, AppError, AppResult};
use crate::utils::jwt::{generate_token, JwtConfig};

pub struct AuthService {
    repo: Arc<dyn ShuttleRepository>,
    sessions: SessionStore,
    jwt: JwtConfig,
    bcrypt_cost: u32,
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// bcrypt es CPU pura: fuera del runtime
async fn blocking<T, F>(work: F) -> AppResult<T>
where
    F: FnOnce() -> Result<T, bcrypt::BcryptError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| AppError::Internal(format!("bcrypt task failed: {}", e)))?
        .map_err(|e| AppError::Hash(e.to_string()))
}

impl AuthService {
    pub fn new(repo: Arc<dyn ShuttleRepository>, sessions: SessionStore, jwt: JwtConfig, bcrypt_cost: u32) -> Self {
        Self {
            repo,
            sessions,
            jwt,
            bcrypt_cost,
        }
    }

    async fn hash_password(&self, password: &str) -> AppResult<String> {
        let password = password.to_string();
        let cost = self.bcrypt_cost;
        blocking(move || hash(password, cost)).await
    }

    async fn verify_password(&self, password: &str, password_hash: &str) -> AppResult<bool> {
        let password = password.to_string();
        let password_hash = password_hash.to_string();
        blocking(move || verify(password, &password_hash)).await
    }

    async fn open_session(&self, user: User) -> AppResult<AuthResponse> {
        let session = Session::for_user(&user, self.jwt.expiration);
        let token = generate_token(user.id, session.id, user.role, &self.jwt)?;
        let expires_at = session.expires_at;

        self.sessions.insert(session).await;

        Ok(AuthResponse {
            token,
            expires_at,
            user: UserResponse::from(user),
        })
    }

    pub async fn signup(&self, request: SignupRequest) -> AppResult<AuthResponse> {
        request.validate()?;

        if request.role == UserRole::Admin {
            return Err(forbidden_error("sign up", "admin accounts are provisioned by the server"));
        }

        let driver_number = request
            .driver_number
            .map(|number| number.trim().to_string())
            .filter(|number| !number.is_empty());
        if request.role == UserRole::Driver && driver_number.is_none() {
            return Err(validation_error("driver_number", "driver number is required for drivers"));
        }

        let user = self
            .repo
            .insert_user(NewUser {
                email: normalize_email(&request.email),
                password_hash: self.hash_password(&request.password).await?,
                role: request.role,
                name: request.name.trim().to_string(),
                driver_number: if request.role == UserRole::Driver { driver_number } else { None },
            })
            .await?;

        info!("👤 Nuevo usuario {} ({})", user.email, user.role.as_str());
        self.open_session(user).await
    }

    pub async fn login(&self, request: LoginRequest) -> AppResult<AuthResponse> {
        request.validate()?;

        let invalid = || AppError::Unauthorized("Invalid email or password".to_string());

        let user = self
            .repo
            .find_user_by_email(&normalize_email(&request.email))
            .await?
            .ok_or_else(invalid)?;

        let valid = self.verify_password(&request.password, &user.password_hash).await?;
        if !valid {
            warn!("⚠️ Login fallido para {}", user.email);
            return Err(invalid());
        }

        info!("✅ Login de {}", user.email);
        self.open_session(user).await
    }

    pub async fn logout(&self, session_id: Uuid) -> AppResult<()> {
        match self.sessions.remove(session_id).await {
            Some(session) => {
                info!("👋 Logout de {}", session.email);
                Ok(())
            }
            None => Err(AppError::Unauthorized("Session not found".to_string())),
        }
    }

    pub async fn current_user(&self, session: &Session) -> AppResult<UserResponse> {
        self.repo
            .find_user(session.user_id)
            .await?
            .map(UserResponse::from)
            .ok_or_else(|| AppError::Unauthorized("User no longer exists".to_string()))
    }

    /// Crea la cuenta admin configurada si no existe
    pub async fn ensure_admin(&self, email: &str, password: &str) -> AppResult<User> {
        let email = normalize_email(email);

        if let Some(existing) = self.repo.find_user_by_email(&email).await? {
            if existing.role != UserRole::Admin {
                warn!("⚠️ {} existe pero no es admin", email);
            }
            return Ok(existing);
        }

        let admin = self
            .repo
            .insert_user(NewUser {
                email,
                password_hash: self.hash_password(password).await?,
                role: UserRole::Admin,
                name: "Administrator".to_string(),
                driver_number: None,
            })
            .await?;

        info!("🔑 Cuenta admin creada: {}", admin.email);
        Ok(admin)
    }
}
