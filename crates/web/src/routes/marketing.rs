//! Public marketing pages and the contact form.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use gainsy_core::{Email, ValidationError};
use serde::Deserialize;
use tracing::instrument;

use crate::backend::{ContactMessage, ContactTable};
use crate::error::AppError;
use crate::filters;
use crate::middleware::OptionalAuth;
use crate::state::AppState;

const CONTACT_NAME_MAX: usize = 100;
const CONTACT_SUBJECT_MAX: usize = 150;
const CONTACT_MESSAGE_MAX: usize = 5_000;

// =============================================================================
// Static content
// =============================================================================

/// A subscription plan on the pricing page.
#[derive(Debug, Clone, Copy)]
pub struct PricingTier {
    pub name: &'static str,
    /// Monthly price in whole dollars; zero means free.
    pub monthly_price: u32,
    pub tagline: &'static str,
    pub store_limit: &'static str,
    pub features: &'static [&'static str],
    pub highlighted: bool,
}

impl PricingTier {
    /// Price label, e.g. `$29/mo` or `Free`.
    #[must_use]
    pub fn price_label(&self) -> String {
        if self.monthly_price == 0 {
            "Free".to_string()
        } else {
            format!("${}/mo", self.monthly_price)
        }
    }
}

/// Plans shown on the pricing page, cheapest first.
pub const PRICING_TIERS: &[PricingTier] = &[
    PricingTier {
        name: "Starter",
        monthly_price: 0,
        tagline: "For makers opening their first shop.",
        store_limit: "1 store",
        features: &[
            "Up to 50 products",
            "3 listing templates",
            "30-day analytics",
        ],
        highlighted: false,
    },
    PricingTier {
        name: "Growth",
        monthly_price: 29,
        tagline: "For sellers ready to scale.",
        store_limit: "3 stores",
        features: &[
            "Unlimited products",
            "Unlimited listing templates",
            "90-day analytics",
            "Low-stock alerts",
        ],
        highlighted: true,
    },
    PricingTier {
        name: "Studio",
        monthly_price: 79,
        tagline: "For teams running several shops.",
        store_limit: "Unlimited stores",
        features: &[
            "Everything in Growth",
            "All-time analytics",
            "Priority support",
            "Early access to new tools",
        ],
        highlighted: false,
    },
];

/// A feature card on the home and features pages.
#[derive(Debug, Clone, Copy)]
pub struct Feature {
    pub title: &'static str,
    pub summary: &'static str,
    pub details: &'static [&'static str],
}

pub const FEATURES: &[Feature] = &[
    Feature {
        title: "Every shop in one place",
        summary: "Connect all of your Etsy stores and manage them from a single dashboard.",
        details: &[
            "Pause or reconnect stores without losing history",
            "Per-store revenue and conversion at a glance",
        ],
    },
    Feature {
        title: "Product management",
        summary: "Search, filter, and edit listings across stores with Etsy's limits built in.",
        details: &[
            "Title, tag, and quantity limits checked as you type",
            "Low-stock flags on active listings",
        ],
    },
    Feature {
        title: "Listing templates",
        summary: "Write titles, descriptions, and shop policies once and reuse them everywhere.",
        details: &[
            "Placeholders like {title}, {price}, and {store}",
            "Preview any template against a real product",
        ],
    },
    Feature {
        title: "Analytics that matter",
        summary: "Views, favorites, sales, and revenue rolled up by store and product.",
        details: &[
            "7, 30, and 90-day windows",
            "Top performers ranked by revenue",
        ],
    },
];

// =============================================================================
// Templates
// =============================================================================

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "marketing/home.html")]
pub struct HomeTemplate {
    pub signed_in: bool,
    pub features: &'static [Feature],
    pub tiers: &'static [PricingTier],
}

/// Features page template.
#[derive(Template, WebTemplate)]
#[template(path = "marketing/features.html")]
pub struct FeaturesTemplate {
    pub signed_in: bool,
    pub features: &'static [Feature],
}

/// Pricing page template.
#[derive(Template, WebTemplate)]
#[template(path = "marketing/pricing.html")]
pub struct PricingTemplate {
    pub signed_in: bool,
    pub tiers: &'static [PricingTier],
}

/// About page template.
#[derive(Template, WebTemplate)]
#[template(path = "marketing/about.html")]
pub struct AboutTemplate {
    pub signed_in: bool,
}

/// Contact page template.
#[derive(Template, WebTemplate)]
#[template(path = "marketing/contact.html")]
pub struct ContactTemplate {
    pub signed_in: bool,
    pub form: ContactForm,
    pub error: Option<String>,
    pub sent: bool,
}

// =============================================================================
// Pages
// =============================================================================

/// Display the home page.
pub async fn home(OptionalAuth(user): OptionalAuth) -> impl IntoResponse {
    HomeTemplate {
        signed_in: user.is_some(),
        features: FEATURES,
        tiers: PRICING_TIERS,
    }
}

/// Display the features page.
pub async fn features(OptionalAuth(user): OptionalAuth) -> impl IntoResponse {
    FeaturesTemplate {
        signed_in: user.is_some(),
        features: FEATURES,
    }
}

/// Display the pricing page.
pub async fn pricing(OptionalAuth(user): OptionalAuth) -> impl IntoResponse {
    PricingTemplate {
        signed_in: user.is_some(),
        tiers: PRICING_TIERS,
    }
}

/// Display the about page.
pub async fn about(OptionalAuth(user): OptionalAuth) -> impl IntoResponse {
    AboutTemplate {
        signed_in: user.is_some(),
    }
}

/// Not-found page template.
#[derive(Template, WebTemplate)]
#[template(path = "not_found.html")]
pub struct NotFoundTemplate {
    pub signed_in: bool,
}

/// Fallback for unmatched paths.
pub async fn not_found(OptionalAuth(user): OptionalAuth) -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        NotFoundTemplate {
            signed_in: user.is_some(),
        },
    )
}

// =============================================================================
// Contact
// =============================================================================

/// Contact form data.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ContactForm {
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
}

impl ContactForm {
    /// Validate and convert to a storable message.
    ///
    /// # Errors
    ///
    /// Returns a user-facing message for the first invalid field.
    pub fn to_message(&self) -> Result<ContactMessage, String> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ValidationError::Required("Name").to_string());
        }
        if name.chars().count() > CONTACT_NAME_MAX {
            return Err(ValidationError::TooLong {
                field: "Name",
                max: CONTACT_NAME_MAX,
            }
            .to_string());
        }

        let email = Email::parse(&self.email).map_err(|e| format!("Please check your email: {e}"))?;

        let subject = self.subject.trim();
        if subject.chars().count() > CONTACT_SUBJECT_MAX {
            return Err(ValidationError::TooLong {
                field: "Subject",
                max: CONTACT_SUBJECT_MAX,
            }
            .to_string());
        }

        let message = self.message.trim();
        if message.is_empty() {
            return Err(ValidationError::Required("Message").to_string());
        }
        if message.chars().count() > CONTACT_MESSAGE_MAX {
            return Err(ValidationError::TooLong {
                field: "Message",
                max: CONTACT_MESSAGE_MAX,
            }
            .to_string());
        }

        Ok(ContactMessage {
            name: name.to_string(),
            email,
            subject: (!subject.is_empty()).then(|| subject.to_string()),
            message: message.to_string(),
        })
    }
}

/// Query parameters for the contact page.
#[derive(Debug, Default, Deserialize)]
pub struct ContactQuery {
    pub success: Option<String>,
}

/// Display the contact page.
pub async fn contact_page(
    OptionalAuth(user): OptionalAuth,
    Query(query): Query<ContactQuery>,
) -> impl IntoResponse {
    ContactTemplate {
        signed_in: user.is_some(),
        form: ContactForm::default(),
        error: None,
        sent: query.success.as_deref() == Some("sent"),
    }
}

/// Handle contact form submission.
///
/// Stores the message with the public key; the backend only allows inserts
/// on this table.
#[instrument(skip(state, user, form))]
pub async fn contact(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    Form(form): Form<ContactForm>,
) -> Response {
    let signed_in = user.is_some();

    let message = match form.to_message() {
        Ok(message) => message,
        Err(error) => {
            return (
                StatusCode::UNPROCESSABLE_ENTITY,
                ContactTemplate {
                    signed_in,
                    form,
                    error: Some(error),
                    sent: false,
                },
            )
                .into_response();
        }
    };

    match ContactTable::new(state.backend()).submit(&message).await {
        Ok(()) => {
            tracing::info!(email_domain = message.email.domain(), "Contact message stored");
            Redirect::to("/contact?success=sent").into_response()
        }
        Err(e) => {
            let status = AppError::from(e).status();
            tracing::error!(status = %status, "Failed to store contact message");
            (
                status,
                ContactTemplate {
                    signed_in,
                    form,
                    error: Some(
                        "We couldn't send your message right now. Please try again shortly."
                            .to_string(),
                    ),
                    sent: false,
                },
            )
                .into_response()
        }
    }
}
