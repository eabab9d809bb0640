//! Rejection responses.
//!
//! # Design Decisions
//! - 429 for rate limits, 403 for every other cause
//! - The body never reveals which rule matched

use axum::body::Body;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::events::ResponseEffect;
use crate::pipeline::Cause;

pub fn rejection(cause: &Cause) -> Response {
    if cause.is_rate_limit() {
        (StatusCode::TOO_MANY_REQUESTS, "Too many requests").into_response()
    } else {
        (StatusCode::FORBIDDEN, "Access denied").into_response()
    }
}

/// Apply listener effects. Unencodable header values are dropped with a warning.
pub fn apply_effects(response: &mut Response<Body>, effects: &[ResponseEffect]) {
    for effect in effects {
        match effect {
            ResponseEffect::SetCookie(value) => match HeaderValue::from_str(value) {
                Ok(value) => {
                    response.headers_mut().append(header::SET_COOKIE, value);
                }
                Err(e) => tracing::warn!(error = %e, "Dropping unencodable Set-Cookie value"),
            },
        }
    }
}
