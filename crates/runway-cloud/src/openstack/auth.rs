//! Keystone v3 password authentication and compute endpoint discovery.
use std::fmt;

use serde::Deserialize;
use serde_json::json;
use time::{Duration as TimeDuration, OffsetDateTime, format_description::well_known::Rfc3339};

use super::wire::TokenResponse;
use crate::http::{check, decode, transport};
use runway_core::client::{ClientError, ClientResult};

/// Tokens this close to expiry are refreshed before use.
const REFRESH_MARGIN: TimeDuration = TimeDuration::seconds(60);

/// How the adapter obtains a compute endpoint and a token for it.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpenStackCredentials {
    /// Keystone v3 password authentication.
    #[serde(rename = "auth")]
    Password(PasswordAuth),
    /// Pre-issued token and a fixed compute endpoint.
    Static(StaticAuth),
}

#[derive(Clone, Deserialize)]
pub struct PasswordAuth {
    /// Identity endpoint, with or without the trailing `/v3`.
    pub auth_url: String,
    pub username: String,
    /// May be left empty in files and supplied from the environment.
    #[serde(default)]
    pub password: String,
    pub project_name: String,
    #[serde(default = "default_domain")]
    pub user_domain_name: String,
    #[serde(default = "default_domain")]
    pub project_domain_name: String,
    #[serde(default)]
    pub region_name: Option<String>,
    #[serde(default = "default_interface")]
    pub interface: String,
}

fn default_domain() -> String {
    "Default".into()
}

fn default_interface() -> String {
    "public".into()
}

impl fmt::Debug for PasswordAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordAuth")
            .field("auth_url", &self.auth_url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("project_name", &self.project_name)
            .field("user_domain_name", &self.user_domain_name)
            .field("project_domain_name", &self.project_domain_name)
            .field("region_name", &self.region_name)
            .field("interface", &self.interface)
            .finish()
    }
}

#[derive(Clone, Deserialize)]
pub struct StaticAuth {
    pub token: String,
    pub compute_url: String,
}

impl fmt::Debug for StaticAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticAuth")
            .field("token", &"<redacted>")
            .field("compute_url", &self.compute_url)
            .finish()
    }
}

/// Token plus the compute endpoint it is valid for.
#[derive(Clone)]
pub(super) struct Session {
    pub token: String,
    pub compute_url: String,
    pub expires_at: Option<OffsetDateTime>,
}

impl Session {
    pub fn fixed(auth: &StaticAuth) -> Self {
        Self {
            token: auth.token.clone(),
            compute_url: auth.compute_url.trim_end_matches('/').to_string(),
            expires_at: None,
        }
    }

    pub fn is_fresh(&self, now: OffsetDateTime) -> bool {
        self.expires_at.is_none_or(|at| at - REFRESH_MARGIN > now)
    }
}

fn tokens_url(auth_url: &str) -> String {
    let base = auth_url.trim_end_matches('/');
    if base.ends_with("/v3") {
        format!("{base}/auth/tokens")
    } else {
        format!("{base}/v3/auth/tokens")
    }
}

/// Issue a project-scoped token and pick the compute endpoint from its catalog.
pub(super) async fn authenticate(
    http: &reqwest::Client,
    auth: &PasswordAuth,
) -> ClientResult<Session> {
    let body = json!({
        "auth": {
            "identity": {
                "methods": ["password"],
                "password": {
                    "user": {
                        "name": auth.username,
                        "domain": { "name": auth.user_domain_name },
                        "password": auth.password,
                    }
                }
            },
            "scope": {
                "project": {
                    "name": auth.project_name,
                    "domain": { "name": auth.project_domain_name },
                }
            }
        }
    });

    let resp = http
        .post(tokens_url(&auth.auth_url))
        .json(&body)
        .send()
        .await
        .map_err(transport)?;
    let resp = check(resp).await?;

    let token = resp
        .headers()
        .get("X-Subject-Token")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .ok_or_else(|| ClientError::Auth("identity response carried no X-Subject-Token".into()))?;
    let issued: TokenResponse = decode(resp).await?;

    let compute_url = issued
        .token
        .catalog
        .iter()
        .filter(|svc| svc.kind == "compute")
        .flat_map(|svc| svc.endpoints.iter())
        .find(|ep| {
            let region_ok = auth.region_name.as_deref().is_none_or(|region| {
                ep.region_id.as_deref() == Some(region) || ep.region.as_deref() == Some(region)
            });
            ep.interface == auth.interface && region_ok
        })
        .map(|ep| ep.url.trim_end_matches('/').to_string())
        .ok_or_else(|| {
            ClientError::Auth(format!(
                "no {} compute endpoint in service catalog",
                auth.interface
            ))
        })?;

    let expires_at = issued
        .token
        .expires_at
        .as_deref()
        .and_then(|s| OffsetDateTime::parse(s, &Rfc3339).ok());

    Ok(Session {
        token,
        compute_url,
        expires_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_url_accepts_both_forms() {
        assert_eq!(
            tokens_url("https://keystone.example:5000"),
            "https://keystone.example:5000/v3/auth/tokens"
        );
        assert_eq!(
            tokens_url("https://keystone.example:5000/v3/"),
            "https://keystone.example:5000/v3/auth/tokens"
        );
    }

    #[test]
    fn session_refreshes_inside_margin() {
        let now = OffsetDateTime::now_utc();
        let session = |expires_at| Session {
            token: "t".into(),
            compute_url: "http://nova".into(),
            expires_at,
        };

        assert!(session(None).is_fresh(now));
        assert!(session(Some(now + TimeDuration::minutes(10))).is_fresh(now));
        assert!(!session(Some(now + TimeDuration::seconds(30))).is_fresh(now));
    }

    #[test]
    fn credentials_parse_either_shape() {
        let pw: OpenStackCredentials = serde_json::from_value(json!({
            "auth": {
                "auth_url": "https://keystone.example:5000",
                "username": "ci",
                "project_name": "runners"
            }
        }))
        .unwrap();
        match pw {
            OpenStackCredentials::Password(p) => {
                assert_eq!(p.user_domain_name, "Default");
                assert_eq!(p.interface, "public");
                assert!(p.password.is_empty());
                assert!(format!("{p:?}").contains("<redacted>"));
            }
            other => panic!("unexpected {other:?}"),
        }

        let st: OpenStackCredentials = serde_json::from_value(json!({
            "static": { "token": "gAAAA", "compute_url": "http://nova:8774/v2.1/" }
        }))
        .unwrap();
        assert!(matches!(st, OpenStackCredentials::Static(_)));
    }
}
