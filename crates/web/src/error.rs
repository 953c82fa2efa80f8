//! Unified error handling with Sentry integration.
//!
//! Handlers return `Result<T, AppError>`. `AppError` captures server errors to
//! Sentry and turns into a bare response carrying an [`ErrorReport`];
//! [`error_page_middleware`] then renders that report as the error page.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{
        Request, State,
        multipart::MultipartError,
        rejection::{FormRejection, PathRejection},
    },
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tower_sessions::Session;

use crate::db::RepositoryError;
use crate::filters;
use crate::middleware::request_id::RequestId;
use crate::models::{CurrentUser, session_keys};
use crate::services::auth::AuthError;
use crate::services::upload::UploadError;
use crate::state::AppState;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Picture validation or storage failed.
    #[error("Upload error: {0}")]
    Upload(#[from] UploadError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Session could not be read or written.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Multipart body could not be read.
    #[error("Multipart error: {0}")]
    Multipart(#[from] MultipartError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Actor may not touch this resource.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Database(_) | Self::Session(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::Upload(err) => match err {
                UploadError::UnsupportedType(_) | UploadError::TooLarge { .. } => {
                    StatusCode::BAD_REQUEST
                }
                UploadError::Http(_) | UploadError::Rejected(_) => StatusCode::BAD_GATEWAY,
                UploadError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Auth(err) => {
                if err.is_user_facing() {
                    StatusCode::BAD_REQUEST
                } else {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            }
            Self::Multipart(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
        }
    }

    /// Message that is safe to show in production.
    fn public_message(&self) -> String {
        match self {
            Self::NotFound(_) => "The page you were looking for does not exist.".to_owned(),
            Self::Forbidden(_) => "You are not allowed to do that.".to_owned(),
            Self::BadRequest(msg) => msg.clone(),
            Self::Upload(err) if err.is_client_error() => err.to_string(),
            Self::Auth(err) if err.is_user_facing() => err.to_string(),
            Self::Multipart(_) => "The submitted form could not be read.".to_owned(),
            _ => "Something went wrong on our side.".to_owned(),
        }
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<FormRejection> for AppError {
    fn from(rejection: FormRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

/// What went wrong, attached to error responses for the error page renderer.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub status: StatusCode,
    pub message: String,
    /// Full error chain, outermost first.
    pub detail: String,
}

/// Render an error and every `source()` beneath it, one per line.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut chain = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        chain.push_str("\ncaused by: ");
        chain.push_str(&cause.to_string());
        source = cause.source();
    }
    chain
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else {
            tracing::debug!(error = %self, status = %status, "Client error");
        }

        let report = ErrorReport {
            status,
            message: self.public_message(),
            detail: error_chain(&self),
        };

        let mut response = (status, report.message.clone()).into_response();
        response.extensions_mut().insert(report);
        response
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Error page template.
#[derive(Template, WebTemplate)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub current_user: Option<CurrentUser>,
    pub status: u16,
    pub reason: String,
    pub message: String,
    pub detail: Option<String>,
    pub request_id: Option<String>,
}

/// Render responses carrying an [`ErrorReport`] as the error page.
///
/// The error chain is only included in development.
pub async fn error_page_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let session = request.extensions().get::<Session>().cloned();
    let request_id = request
        .extensions()
        .get::<RequestId>()
        .map(|id| id.0.clone());
    let response = next.run(request).await;

    let Some(report) = response.extensions().get::<ErrorReport>().cloned() else {
        return response;
    };

    let current_user = match session {
        Some(session) => session
            .get::<CurrentUser>(session_keys::CURRENT_USER)
            .await
            .ok()
            .flatten(),
        None => None,
    };

    let page = ErrorTemplate {
        current_user,
        status: report.status.as_u16(),
        reason: report
            .status
            .canonical_reason()
            .unwrap_or("Error")
            .to_owned(),
        message: report.message,
        detail: state.config().is_development().then_some(report.detail),
        request_id,
    };

    (report.status, page).into_response()
}

/// Fallback for unknown routes.
pub async fn not_found() -> AppError {
    AppError::NotFound("no route matches this path".to_owned())
}

/// Set the Sentry user context after sign-in.
pub fn set_sentry_user(user: &CurrentUser) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user.id.to_string()),
            username: Some(user.username.clone()),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context on sign-out.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}
