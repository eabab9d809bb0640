//! Event payloads.

use std::net::IpAddr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::schema::{DdosConfig, FirewallEntryConfig, ThrottleConfig};
use crate::firewall::EntryAction;
use crate::pipeline::{Cause, ClientRequest};

/// Identifying attributes of the request that got blocked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIdentity {
    pub ip: Option<IpAddr>,
    pub host: Option<String>,
    pub path: String,
    pub request_id: Option<String>,
}

impl From<&ClientRequest> for ClientIdentity {
    fn from(request: &ClientRequest) -> Self {
        Self {
            ip: request.ip(),
            host: request.host().map(str::to_string),
            path: request.path().to_string(),
            request_id: request.request_id().map(str::to_string),
        }
    }
}

/// Emitted once per blocked request. Never persisted.
#[derive(Debug, Clone)]
pub struct Banned {
    pub cause: Cause,
    pub client: ClientIdentity,
    pub at: DateTime<Utc>,
}

impl Banned {
    pub fn new(cause: Cause, request: &ClientRequest, at: DateTime<Utc>) -> Self {
        Self {
            cause,
            client: ClientIdentity::from(request),
            at,
        }
    }
}

/// Security settings submitted by an administrator.
///
/// Unset fields leave the stored configuration untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityFormSubmitted {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub firewall_entries: Option<Vec<FirewallEntryConfig>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_action: Option<EntryAction>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub throttle: Option<ThrottleConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub ddos: Option<DdosConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cookie_tracking: Option<bool>,
}

impl SecurityFormSubmitted {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}
