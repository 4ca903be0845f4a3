//! Account settings.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::backend::UserMetadata;
use crate::middleware::{RequireAuth, set_current_user};
use crate::models::CurrentUser;
use crate::state::AppState;

use super::dashboard::{Nav, NoticeQuery, write_failure};
use super::fallback::Banner;

const DISPLAY_NAME_MAX: usize = 100;

/// Settings form data.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SettingsForm {
    pub full_name: String,
}

impl SettingsForm {
    /// Trimmed display name; blank clears it.
    ///
    /// # Errors
    ///
    /// Returns a message when the name is too long.
    pub fn display_name(&self) -> Result<Option<String>, String> {
        let name = self.full_name.trim();
        if name.chars().count() > DISPLAY_NAME_MAX {
            return Err(format!(
                "Display name must be at most {DISPLAY_NAME_MAX} characters"
            ));
        }
        Ok((!name.is_empty()).then(|| name.to_string()))
    }
}

/// Settings page template.
#[derive(Template, WebTemplate)]
#[template(path = "dashboard/settings.html")]
pub struct SettingsTemplate {
    pub nav: Nav,
    pub banners: Vec<Banner>,
    pub full_name: String,
    pub email: String,
}

impl SettingsTemplate {
    fn new(user: &CurrentUser, full_name: String, banners: Vec<Banner>) -> Self {
        Self {
            nav: Nav::new(user, "settings"),
            banners,
            full_name,
            email: user.email.clone(),
        }
    }
}

/// Display the settings page.
pub async fn show(
    RequireAuth(user): RequireAuth,
    Query(notice): Query<NoticeQuery>,
) -> impl IntoResponse {
    let banners = notice.banner("Settings").into_iter().collect();
    let name = user.full_name.clone().unwrap_or_default();
    SettingsTemplate::new(&user, name, banners)
}

/// Update the seller's display name.
///
/// The name lives in the auth user's metadata; the session copy is updated
/// so the new name shows immediately.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(mut user): RequireAuth,
    session: Session,
    Form(form): Form<SettingsForm>,
) -> Response {
    let full_name = match form.display_name() {
        Ok(name) => name,
        Err(message) => {
            return (
                StatusCode::UNPROCESSABLE_ENTITY,
                SettingsTemplate::new(&user, form.full_name, vec![Banner::error(message)]),
            )
                .into_response();
        }
    };

    let metadata = UserMetadata {
        full_name: full_name.clone(),
    };
    match state
        .backend()
        .update_user_metadata(&user.access_token, &metadata)
        .await
    {
        Ok(updated) => {
            user.full_name = updated.full_name().map(ToString::to_string).or(full_name);
            if let Err(e) = set_current_user(&session, &user).await {
                tracing::error!("Failed to update session: {}", e);
            }
            tracing::info!("Display name updated");
            Redirect::to("/dashboard/settings?notice=saved").into_response()
        }
        Err(e) => {
            let (status, message) = write_failure(e, "save your settings");
            (
                status,
                SettingsTemplate::new(&user, form.full_name, vec![Banner::error(message)]),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_trims_and_clears() {
        let form = SettingsForm {
            full_name: "  Rowan Maker ".to_string(),
        };
        assert_eq!(form.display_name().unwrap().as_deref(), Some("Rowan Maker"));

        let form = SettingsForm {
            full_name: "   ".to_string(),
        };
        assert_eq!(form.display_name().unwrap(), None);
    }

    #[test]
    fn test_display_name_length_limit() {
        let form = SettingsForm {
            full_name: "x".repeat(DISPLAY_NAME_MAX + 1),
        };
        assert!(form.display_name().is_err());
    }
}
