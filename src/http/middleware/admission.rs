//! Admission middleware.
//! Runs every request through the pipeline before it reaches the application.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::config::schema::GuardConfig;
use crate::http::request::{
    client_ip, host_of, is_form_submission, parse_cookies, parse_form, request_id,
};
use crate::http::response::{apply_effects, rejection};
use crate::pipeline::{AdmissionPipeline, ClientRequest, Decision, Moment};
use crate::security::is_guarded_path;

#[derive(Clone)]
pub struct GuardState {
    pipeline: Arc<AdmissionPipeline>,
    trusted_proxies: Arc<[IpAddr]>,
    form_paths: Arc<[String]>,
    max_form_bytes: usize,
}

impl GuardState {
    pub fn new(pipeline: Arc<AdmissionPipeline>, config: &GuardConfig) -> Self {
        Self {
            pipeline,
            trusted_proxies: config.listener.trusted_proxies.iter().map(|ip| ip.to_canonical()).collect(),
            form_paths: config.banned_email.paths.clone().into(),
            max_form_bytes: config.listener.max_form_bytes,
        }
    }
}

pub async fn admission_middleware(
    State(state): State<GuardState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let headers = request.headers();
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());

    let mut client = ClientRequest::new(request.uri().path())
        .with_cookies(parse_cookies(headers));
    if let Some(peer) = peer {
        client = client.with_ip(client_ip(peer, headers, &state.trusted_proxies));
    }
    if let Some(host) = host_of(headers) {
        client = client.with_host(host);
    }
    if let Some(id) = request_id(headers) {
        client = client.with_request_id(id);
    }

    // Buffer guarded form submissions so the body can be inspected and replayed.
    // An unreadable body still goes through the pipeline, without its form.
    let mut body_rejected = false;
    let request = if is_form_submission(request.method(), headers)
        && is_guarded_path(&state.form_paths, request.uri().path())
    {
        let (parts, body) = request.into_parts();
        match axum::body::to_bytes(body, state.max_form_bytes).await {
            Ok(bytes) => {
                client = client.with_form(parse_form(&bytes));
                Request::from_parts(parts, Body::from(bytes))
            }
            Err(e) => {
                tracing::debug!(error = %e, path = %parts.uri.path(), "Form body rejected");
                body_rejected = true;
                Request::from_parts(parts, Body::empty())
            }
        }
    } else {
        request
    };

    match state.pipeline.admit(&client, &Moment::now()).await {
        Decision::Allowed if body_rejected => {
            (StatusCode::PAYLOAD_TOO_LARGE, "Form body too large").into_response()
        }
        Decision::Allowed => next.run(request).await,
        Decision::Blocked { event, effects } => {
            let mut response = rejection(&event.cause);
            apply_effects(&mut response, &effects);
            response
        }
    }
}
