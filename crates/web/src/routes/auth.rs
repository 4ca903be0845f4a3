//! Authentication route handlers.
//!
//! Handles sign-in, sign-up, sign-out, and password recovery through the
//! hosted auth API. Forms follow Post-Redirect-Get: failures redirect back
//! with an `?error=` code that the page maps to a message.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use gainsy_core::Email;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::backend::{BackendError, SignUpOutcome};
use crate::error::{add_breadcrumb, clear_sentry_user, set_sentry_user};
use crate::middleware::{OptionalAuth, clear_current_user, set_current_user};
use crate::models::CurrentUser;
use crate::state::AppState;

/// Minimum password length accepted at sign-up.
pub const PASSWORD_MIN: usize = 8;

const DEFAULT_RETURN: &str = "/dashboard";

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub next: Option<String>,
}

/// Sign-up form data.
#[derive(Debug, Deserialize)]
pub struct SignupForm {
    #[serde(default)]
    pub full_name: Option<String>,
    pub email: String,
    pub password: String,
    pub password_confirm: String,
}

/// Forgot password form data.
#[derive(Debug, Deserialize)]
pub struct ForgotPasswordForm {
    pub email: String,
}

// =============================================================================
// Query Types
// =============================================================================

/// Query parameters for error/success display.
#[derive(Debug, Default, Deserialize)]
pub struct MessageQuery {
    pub error: Option<String>,
    pub success: Option<String>,
    pub next: Option<String>,
}

/// Friendly text for an `?error=` code.
#[must_use]
pub fn error_message(code: &str) -> &'static str {
    match code {
        "credentials" => "That email and password don't match an account.",
        "unconfirmed" => "Please confirm your email address before signing in.",
        "invalid_email" => "Please enter a valid email address.",
        "password_mismatch" => "Passwords don't match.",
        "password_too_short" => "Passwords must be at least 8 characters.",
        "email_taken" => "An account with that email already exists. Try signing in.",
        "rate_limited" => "Too many attempts. Please wait a moment and try again.",
        "session" => "We couldn't start your session. Please try again.",
        "expired" => "Your session expired. Please sign in again.",
        "unavailable" => "Sign-in is temporarily unavailable. Please try again shortly.",
        _ => "Something went wrong. Please try again.",
    }
}

/// Friendly text for a `?success=` code.
#[must_use]
pub fn success_message(code: &str) -> &'static str {
    match code {
        "email_sent" => "If an account exists for that email, a reset link is on its way.",
        "logged_out" => "You've been signed out.",
        _ => "Done.",
    }
}

/// Keep a post-login return path on this site.
///
/// Anything but an absolute local path (including `//host` and `/\host`
/// forms browsers treat as external) falls back to the dashboard. Paths
/// with control characters or inner whitespace are rejected too: they are
/// not valid `Location` values, and browsers strip tabs and newlines, which
/// turns `/\t/host` into `//host`.
#[must_use]
pub fn safe_next(next: Option<&str>) -> &str {
    match next.map(str::trim) {
        Some(path)
            if path.starts_with('/')
                && !path.starts_with("//")
                && !path.contains('\\')
                && !path.chars().any(|c| c.is_control() || c.is_whitespace())
                && !path.starts_with("/auth/") =>
        {
            path
        }
        _ => DEFAULT_RETURN,
    }
}

fn login_redirect(error: &str, next: Option<&str>) -> Redirect {
    let next = safe_next(next);
    if next == DEFAULT_RETURN {
        Redirect::to(&format!("/auth/login?error={error}"))
    } else {
        Redirect::to(&format!(
            "/auth/login?error={error}&next={}",
            urlencoding::encode(next)
        ))
    }
}

/// Map a sign-in failure to an error code.
fn sign_in_error_code(error: &BackendError) -> &'static str {
    match error {
        BackendError::Api { status: 400, message } if message.contains("not confirmed") => {
            "unconfirmed"
        }
        BackendError::Api { status: 400, .. } | BackendError::Unauthorized => "credentials",
        BackendError::RateLimited(_) => "rate_limited",
        _ => "unavailable",
    }
}

/// Store a freshly signed-in user, rotating the session ID first.
async fn start_session(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    set_current_user(session, user).await?;
    set_sentry_user(&user.id, Some(&user.email));
    add_breadcrumb("auth", "Signed in", None);
    Ok(())
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub error: Option<&'static str>,
    pub success: Option<&'static str>,
    pub next: String,
}

/// Sign-up page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/signup.html")]
pub struct SignupTemplate {
    pub error: Option<&'static str>,
}

/// Shown when the new account must confirm its email first.
#[derive(Template, WebTemplate)]
#[template(path = "auth/signup_pending.html")]
pub struct SignupPendingTemplate {
    pub email: String,
}

/// Forgot password page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/forgot_password.html")]
pub struct ForgotPasswordTemplate {
    pub error: Option<&'static str>,
    pub success: Option<&'static str>,
}

// =============================================================================
// Login
// =============================================================================

/// Display the login page.
pub async fn login_page(
    OptionalAuth(user): OptionalAuth,
    Query(query): Query<MessageQuery>,
) -> Response {
    let next = safe_next(query.next.as_deref()).to_string();
    if user.is_some() {
        return Redirect::to(&next).into_response();
    }

    LoginTemplate {
        error: query.error.as_deref().map(error_message),
        success: query.success.as_deref().map(success_message),
        next,
    }
    .into_response()
}

/// Handle login form submission.
#[instrument(skip(state, session, form))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Response {
    let next = form.next.as_deref();

    let Ok(email) = Email::parse(&form.email) else {
        return login_redirect("invalid_email", next).into_response();
    };

    match state
        .backend()
        .sign_in_with_password(&email, &form.password)
        .await
    {
        Ok(auth) => {
            let user = CurrentUser::from(auth);
            if let Err(e) = start_session(&session, &user).await {
                tracing::error!("Failed to set session: {}", e);
                return login_redirect("session", next).into_response();
            }
            tracing::info!(user_id = %user.id, "Seller signed in");
            Redirect::to(safe_next(next)).into_response()
        }
        Err(e) => {
            tracing::warn!(email_domain = email.domain(), "Login failed: {}", e);
            login_redirect(sign_in_error_code(&e), next).into_response()
        }
    }
}

// =============================================================================
// Sign-up
// =============================================================================

/// Display the sign-up page.
pub async fn signup_page(
    OptionalAuth(user): OptionalAuth,
    Query(query): Query<MessageQuery>,
) -> Response {
    if user.is_some() {
        return Redirect::to(DEFAULT_RETURN).into_response();
    }
    SignupTemplate {
        error: query.error.as_deref().map(error_message),
    }
    .into_response()
}

/// Handle sign-up form submission.
///
/// Projects that auto-confirm accounts sign the seller straight in; otherwise
/// a page asks them to check their inbox.
#[instrument(skip(state, session, form))]
pub async fn signup(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<SignupForm>,
) -> Response {
    let Ok(email) = Email::parse(&form.email) else {
        return Redirect::to("/auth/signup?error=invalid_email").into_response();
    };

    if form.password != form.password_confirm {
        return Redirect::to("/auth/signup?error=password_mismatch").into_response();
    }

    if form.password.chars().count() < PASSWORD_MIN {
        return Redirect::to("/auth/signup?error=password_too_short").into_response();
    }

    let full_name = gainsy_core::non_blank(form.full_name.as_deref());

    match state
        .backend()
        .sign_up(&email, &form.password, full_name.as_deref())
        .await
    {
        Ok(SignUpOutcome::SignedIn(auth)) => {
            let user = CurrentUser::from(auth);
            if let Err(e) = start_session(&session, &user).await {
                tracing::error!("Failed to set session after sign-up: {}", e);
                return Redirect::to("/auth/login?error=session").into_response();
            }
            tracing::info!(user_id = %user.id, "Seller signed up");
            Redirect::to("/dashboard?welcome=1").into_response()
        }
        Ok(SignUpOutcome::ConfirmationRequired { email: confirmed }) => {
            tracing::info!(email_domain = email.domain(), "Sign-up awaiting confirmation");
            SignupPendingTemplate {
                email: if confirmed.is_empty() {
                    email.into_inner()
                } else {
                    confirmed
                },
            }
            .into_response()
        }
        Err(BackendError::Conflict(_)) => {
            Redirect::to("/auth/signup?error=email_taken").into_response()
        }
        Err(BackendError::RateLimited(_)) => {
            Redirect::to("/auth/signup?error=rate_limited").into_response()
        }
        Err(e) => {
            tracing::warn!("Sign-up failed: {}", e);
            Redirect::to("/auth/signup?error=failed").into_response()
        }
    }
}

// =============================================================================
// Logout
// =============================================================================

/// Sign out: revoke the refresh token and drop the session.
#[instrument(skip_all)]
pub async fn logout(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
) -> impl IntoResponse {
    if let Some(user) = user {
        if let Err(e) = state.backend().sign_out(&user.access_token).await {
            tracing::warn!(user_id = %user.id, "Token revocation failed: {}", e);
        }
        state.invalidate_stats(user.id).await;
    }

    if let Err(e) = clear_current_user(&session).await {
        tracing::error!("Failed to clear session: {}", e);
    }
    if let Err(e) = session.flush().await {
        tracing::error!("Failed to flush session: {}", e);
    }
    clear_sentry_user();

    Redirect::to("/auth/login?success=logged_out")
}

// =============================================================================
// Password Recovery
// =============================================================================

/// Display the forgot password page.
pub async fn forgot_password_page(Query(query): Query<MessageQuery>) -> impl IntoResponse {
    ForgotPasswordTemplate {
        error: query.error.as_deref().map(error_message),
        success: query.success.as_deref().map(success_message),
    }
}

/// Handle forgot password form submission.
///
/// Always reports success so the form can't be used to probe for accounts.
#[instrument(skip(state, form))]
pub async fn forgot_password(
    State(state): State<AppState>,
    Form(form): Form<ForgotPasswordForm>,
) -> impl IntoResponse {
    let Ok(email) = Email::parse(&form.email) else {
        return Redirect::to("/auth/forgot-password?error=invalid_email");
    };

    if let Err(e) = state.backend().recover_password(&email).await {
        tracing::warn!(email_domain = email.domain(), "Password recovery request failed: {}", e);
    }

    Redirect::to("/auth/forgot-password?success=email_sent")
}
