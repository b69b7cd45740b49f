use crate::dto::auth_dto::{AuthResponse, LoginRequest, SignupRequest};
use crate::dto::ApiResponse;
use crate::models::{Session, UserResponse};
use crate::services::auth_service::AuthService;
use crate::state::AppState;
use crate::utils::errors::AppError;

pub struct AuthController {
    service: AuthService,
}

impl AuthController {
    pub fn new(state: &AppState) -> Self {
        Self {
            service: AuthService::new(
                state.repo.clone(),
                state.sessions.clone(),
                state.jwt.clone(),
                state.config.bcrypt_cost,
            ),
        }
    }

    pub async fn signup(&self, request: SignupRequest) -> Result<ApiResponse<AuthResponse>, AppError> {
        let response = self.service.signup(request).await?;
        Ok(ApiResponse::success_with_message(response, "Account created".to_string()))
    }

    pub async fn login(&self, request: LoginRequest) -> Result<ApiResponse<AuthResponse>, AppError> {
        let response = self.service.login(request).await?;
        Ok(ApiResponse::success(response))
    }

    pub async fn logout(&self, session: &Session) -> Result<ApiResponse<()>, AppError> {
        self.service.logout(session.id).await?;
        Ok(ApiResponse::success_with_message((), "Logged out".to_string()))
    }

    pub async fn me(&self, session: &Session) -> Result<ApiResponse<UserResponse>, AppError> {
        Ok(ApiResponse::success(self.service.current_user(session).await?))
    }
}
