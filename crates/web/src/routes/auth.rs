//! Authentication route handlers.
//!
//! Sign-up, sign-in and sign-out with email and password. Form errors
//! re-render the form; everything else goes to the error page.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{AppError, Result, clear_sentry_user, set_sentry_user};
use crate::extract::Form;
use crate::filters;
use crate::middleware::{OptionalAuth, clear_current_user, set_current_user};
use crate::models::{CurrentUser, User};
use crate::services::auth::{AuthError, AuthService};
use crate::state::AppState;

/// Where a freshly signed-in user lands.
const AFTER_SIGN_IN: &str = "/places/my-list";

// =============================================================================
// Form Types
// =============================================================================

/// Sign-up form data.
#[derive(Debug, Deserialize)]
pub struct SignUpForm {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Sign-in form data.
#[derive(Debug, Deserialize)]
pub struct SignInForm {
    pub email: String,
    pub password: String,
}

// =============================================================================
// Templates
// =============================================================================

/// Sign-up page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/sign_up.html")]
pub struct SignUpTemplate {
    pub current_user: Option<CurrentUser>,
    pub error: Option<String>,
    pub username: String,
    pub email: String,
}

/// Sign-in page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/sign_in.html")]
pub struct SignInTemplate {
    pub current_user: Option<CurrentUser>,
    pub error: Option<String>,
    pub email: String,
}

// =============================================================================
// Handlers
// =============================================================================

/// Put `user` in the session as the actor.
async fn sign_in_session(session: &Session, user: &User) -> Result<()> {
    let current = CurrentUser::from(user);
    set_current_user(session, &current).await?;
    set_sentry_user(&current);
    Ok(())
}

/// Display the sign-up page.
pub async fn sign_up_page(OptionalAuth(user): OptionalAuth) -> SignUpTemplate {
    SignUpTemplate {
        current_user: user,
        error: None,
        username: String::new(),
        email: String::new(),
    }
}

/// Handle sign-up form submission.
#[instrument(skip(state, session, form), fields(username = %form.username))]
pub async fn sign_up(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<SignUpForm>,
) -> Result<Response> {
    let auth = AuthService::new(state.users());

    match auth
        .sign_up(&form.username, &form.email, &form.password)
        .await
    {
        Ok(user) => {
            sign_in_session(&session, &user).await?;
            Ok(Redirect::to(AFTER_SIGN_IN).into_response())
        }
        Err(e) if e.is_user_facing() => {
            tracing::debug!(error = %e, "Sign-up rejected");
            let status = match &e {
                AuthError::EmailTaken | AuthError::UsernameTaken => StatusCode::CONFLICT,
                _ => StatusCode::BAD_REQUEST,
            };
            let page = SignUpTemplate {
                current_user: None,
                error: Some(sign_up_message(&e)),
                username: form.username,
                email: form.email,
            };
            Ok((status, page).into_response())
        }
        Err(e) => Err(AppError::Auth(e)),
    }
}

/// User-facing text for a rejected sign-up.
fn sign_up_message(err: &AuthError) -> String {
    match err {
        AuthError::EmailTaken => "An account with this email already exists.".to_owned(),
        AuthError::UsernameTaken => "That username is taken.".to_owned(),
        AuthError::InvalidEmail(_) => "Please enter a valid email address.".to_owned(),
        AuthError::InvalidUsername(e) => format!("Invalid username: {e}."),
        AuthError::WeakPassword(msg) => format!("Weak password: {msg}."),
        _ => "Could not create the account.".to_owned(),
    }
}

/// Display the sign-in page.
pub async fn sign_in_page(OptionalAuth(user): OptionalAuth) -> SignInTemplate {
    SignInTemplate {
        current_user: user,
        error: None,
        email: String::new(),
    }
}

/// Handle sign-in form submission.
#[instrument(skip(state, session, form))]
pub async fn sign_in(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<SignInForm>,
) -> Result<Response> {
    let auth = AuthService::new(state.users());

    match auth.sign_in(&form.email, &form.password).await {
        Ok(user) => {
            sign_in_session(&session, &user).await?;
            tracing::info!(user_id = %user.id, "User signed in");
            Ok(Redirect::to(AFTER_SIGN_IN).into_response())
        }
        Err(AuthError::InvalidCredentials) => {
            tracing::warn!("Sign-in failed: invalid credentials");
            let page = SignInTemplate {
                current_user: None,
                error: Some("Wrong email or password.".to_owned()),
                email: form.email,
            };
            Ok((StatusCode::UNAUTHORIZED, page).into_response())
        }
        Err(e) => Err(AppError::Auth(e)),
    }
}

/// Handle sign-out.
pub async fn sign_out(session: Session) -> Result<Redirect> {
    clear_current_user(&session).await?;
    clear_sentry_user();
    Ok(Redirect::to("/"))
}
