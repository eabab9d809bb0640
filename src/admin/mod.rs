//! Admin API.
//!
//! - `GET /admin/status`: pipeline and counter sizes
//! - `POST /admin/security`: publish a `SecurityFormSubmitted`
//! - `POST /admin/validate`: run the form-validation predicates
//!
//! Every route requires `Authorization: Bearer <admin.api_key>`.

pub mod auth;
pub mod handlers;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::firewall::Firewall;
use crate::lifecycle::Components;
use crate::pipeline::AdmissionPipeline;
use crate::security::{Throttle, Validators};

#[derive(Clone)]
pub struct AdminState {
    pub api_key: Arc<str>,
    pub pipeline: Arc<AdmissionPipeline>,
    pub firewall: Arc<Firewall>,
    pub throttle: Arc<Throttle>,
    pub validators: Validators,
}

impl AdminState {
    pub fn new(api_key: &str, components: &Components) -> Self {
        Self {
            api_key: api_key.into(),
            pipeline: components.pipeline.clone(),
            firewall: components.firewall.clone(),
            throttle: components.throttle.clone(),
            validators: components.validators.clone(),
        }
    }
}

pub fn setup_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/security", post(submit_security_form))
        .route("/admin/validate", post(validate_values))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .with_state(state)
}
