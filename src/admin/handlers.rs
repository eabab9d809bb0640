use std::time::Instant;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};

use crate::admin::AdminState;
use crate::events::SecurityFormSubmitted;

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub stages: Vec<&'static str>,
    pub firewall_entries: usize,
    pub throttle_keys: usize,
    pub global_requests: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ValidationQuery {
    pub hostname: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Default, Serialize)]
pub struct ValidationResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname_allowed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_allowed: Option<bool>,
}

pub async fn get_status(State(state): State<AdminState>) -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        stages: state.pipeline.stage_names(),
        firewall_entries: state.firewall.entries().len(),
        throttle_keys: state.throttle.tracked_keys(),
        global_requests: state.throttle.global_count(Instant::now()),
    })
}

/// Publish the submission; the config store listener persists it.
pub async fn submit_security_form(
    State(state): State<AdminState>,
    Json(form): Json<SecurityFormSubmitted>,
) -> impl IntoResponse {
    if form.is_empty() {
        return (StatusCode::BAD_REQUEST, "Empty submission").into_response();
    }

    let receivers = state.pipeline.bus().publish_security_form(form);
    tracing::info!(receivers, "Security form submitted");
    (
        StatusCode::ACCEPTED,
        Json(serde_json::json!({ "accepted": true, "receivers": receivers })),
    )
        .into_response()
}

/// Run the form-validation predicates on the supplied values.
pub async fn validate_values(
    State(state): State<AdminState>,
    Json(query): Json<ValidationQuery>,
) -> Json<ValidationResult> {
    let mut result = ValidationResult::default();
    if let Some(hostname) = &query.hostname {
        result.hostname_allowed = Some(state.validators.not_banned_hostname(hostname).await);
    }
    if let Some(email) = &query.email {
        result.email_allowed = Some(state.validators.not_banned_email(email).await);
    }
    Json(result)
}
