//! Cookie-ban fast path.
//!
//! Denies clients presenting a valid, unexpired ban token. Anything else,
//! including a forged or expired token, is allowed through.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::pipeline::{Cause, ClientRequest, Moment, Stage, Verdict};
use crate::security::token::{BanToken, TokenSigner};

pub struct CookieBan {
    signer: TokenSigner,
    cookie_name: String,
}

impl CookieBan {
    pub fn new(signer: TokenSigner, cookie_name: impl Into<String>) -> Self {
        Self {
            signer,
            cookie_name: cookie_name.into(),
        }
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    /// The verified token, if the client carries one.
    pub fn check(&self, cookies: &HashMap<String, String>, now: DateTime<Utc>) -> Option<BanToken> {
        let raw = cookies.get(&self.cookie_name)?;
        match self.signer.verify(raw, now) {
            Ok(token) => Some(token),
            Err(e) => {
                tracing::debug!(error = %e, "Ignoring invalid ban token");
                None
            }
        }
    }
}

#[async_trait]
impl Stage for CookieBan {
    fn name(&self) -> &'static str {
        "cookie_ban"
    }

    async fn check(&self, request: &ClientRequest, now: &Moment) -> Verdict {
        match CookieBan::check(self, request.cookies(), now.wall) {
            Some(token) => Verdict::Deny(Cause::PriorBan(token)),
            None => Verdict::Allow,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn cookies(value: &str) -> HashMap<String, String> {
        HashMap::from([("ban_token".to_string(), value.to_string())])
    }

    #[test]
    fn test_valid_token_denies() {
        let signer = TokenSigner::random();
        let now = Utc::now();
        let raw = signer
            .sign(&BanToken::issue("firewall", now, Duration::hours(1)).unwrap())
            .unwrap();

        let stage = CookieBan::new(signer, "ban_token");
        assert!(stage.check(&cookies(&raw), now).is_some());
    }

    #[test]
    fn test_forged_expired_and_missing_allow() {
        let signer = TokenSigner::random();
        let stage = CookieBan::new(signer.clone(), "ban_token");
        let now = Utc::now();

        let forged = TokenSigner::random()
            .sign(&BanToken::issue("firewall", now, Duration::hours(1)).unwrap())
            .unwrap();
        let expired = signer
            .sign(
                &BanToken::issue("firewall", now - Duration::hours(2), Duration::hours(1)).unwrap(),
            )
            .unwrap();

        assert!(stage.check(&cookies(&forged), now).is_none());
        assert!(stage.check(&cookies(&expired), now).is_none());
        assert!(stage.check(&cookies("garbage"), now).is_none());
        assert!(stage.check(&HashMap::new(), now).is_none());
    }

    #[tokio::test]
    async fn test_stage_reports_prior_ban() {
        let signer = TokenSigner::random();
        let moment = Moment::now();
        let raw = signer
            .sign(&BanToken::issue("email", moment.wall, Duration::minutes(10)).unwrap())
            .unwrap();
        let stage = CookieBan::new(signer, "ban_token");

        let request = ClientRequest::new("/").with_cookie("ban_token", raw);
        let verdict = Stage::check(&stage, &request, &moment).await;
        assert!(matches!(verdict, Verdict::Deny(Cause::PriorBan(t)) if t.reason == "email"));
    }
}
