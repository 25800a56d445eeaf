//! OpenStack compute adapter (Nova), authenticated through Keystone v3 or a static token.
//!
//! Creation is a `POST /servers` followed by polling `GET /servers/{id}` until the
//! server is `ACTIVE` or `ERROR`, or the caller's deadline passes.
mod auth;
pub use auth::{OpenStackCredentials, PasswordAuth, StaticAuth};

mod wire;

use std::time::Duration;

use async_trait::async_trait;
use base64::{Engine, prelude::BASE64_STANDARD};
use reqwest::{RequestBuilder, Response, header::HeaderValue};
use time::OffsetDateTime;
use tokio::{sync::Mutex, time::Instant};
use tracing::{debug, info, instrument, warn};

use crate::{
    error::CloudError,
    http::{check, decode, transport},
};
use auth::Session;
use runway_core::client::{ClientError, ClientResult, ComputeProvider, CreateInstanceRequest};
use runway_model::{InstanceRecord, InstanceStatus, RESERVED_PREFIX, RunnerName};

/// Default delay between status polls while waiting for a new server.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

const USER_AGENT: &str = concat!("runway/", env!("CARGO_PKG_VERSION"));
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const AUTH_HEADER: &str = "X-Auth-Token";

pub struct OpenStackClient {
    http: reqwest::Client,
    credentials: OpenStackCredentials,
    session: Mutex<Option<Session>>,
    poll_interval: Duration,
}

impl OpenStackClient {
    pub fn new(credentials: OpenStackCredentials) -> Result<Self, CloudError> {
        let session = match &credentials {
            OpenStackCredentials::Static(s) => {
                HeaderValue::from_str(&s.token)
                    .map_err(|_| CloudError::InvalidCredential("openstack token"))?;
                Some(Session::fixed(s))
            }
            OpenStackCredentials::Password(_) => None,
        };

        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(DEFAULT_REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            credentials,
            session: Mutex::new(session),
            poll_interval: DEFAULT_POLL_INTERVAL,
        })
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Current session, authenticating first if there is none or it is about to expire.
    async fn session(&self) -> ClientResult<Session> {
        let mut current = self.session.lock().await;
        if let Some(s) = current.as_ref().filter(|s| s.is_fresh(OffsetDateTime::now_utc())) {
            return Ok(s.clone());
        }

        let fresh = match &self.credentials {
            OpenStackCredentials::Static(s) => Session::fixed(s),
            OpenStackCredentials::Password(p) => {
                debug!(auth_url = %p.auth_url, user = %p.username, "requesting keystone token");
                auth::authenticate(&self.http, p).await?
            }
        };
        *current = Some(fresh.clone());
        Ok(fresh)
    }

    async fn send(&self, session: &Session, req: RequestBuilder) -> ClientResult<Response> {
        let resp = req
            .header(AUTH_HEADER, &session.token)
            .send()
            .await
            .map_err(transport)?;

        match check(resp).await {
            Err(ClientError::Auth(message)) => {
                // Revoked or expired early: drop it so the next call re-authenticates.
                *self.session.lock().await = None;
                Err(ClientError::Auth(message))
            }
            other => other,
        }
    }

    async fn get_server(&self, id: &str) -> ClientResult<wire::Server> {
        let session = self.session().await?;
        let url = format!("{}/servers/{id}", session.compute_url);
        let resp = self.send(&session, self.http.get(url)).await?;
        let envelope: wire::ServerEnvelope = decode(resp).await?;
        Ok(envelope.server)
    }

    /// Ids of servers named exactly `name`.
    async fn resolve(&self, session: &Session, name: &str) -> ClientResult<Vec<String>> {
        let url = format!("{}/servers", session.compute_url);
        let req = self.http.get(url).query(&[("name", format!("^{name}$"))]);
        let list: wire::ServerList = decode(self.send(session, req).await?).await?;

        Ok(list
            .servers
            .into_iter()
            .filter(|s| s.name == name)
            .map(|s| s.id)
            .collect())
    }

    async fn delete_by_id(&self, session: &Session, id: &str) -> ClientResult<()> {
        let url = format!("{}/servers/{id}", session.compute_url);
        match self.send(session, self.http.delete(url)).await {
            Ok(_) => Ok(()),
            Err(ClientError::NotFound(_)) => {
                debug!(instance_id = id, "instance already gone");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl ComputeProvider for OpenStackClient {
    #[instrument(
        name = "openstack.create_instance",
        skip(self, req),
        fields(name = %req.name, image = %req.image, flavor = %req.flavor)
    )]
    async fn create_instance(
        &self,
        req: &CreateInstanceRequest,
        timeout: Duration,
    ) -> ClientResult<InstanceRecord> {
        let deadline = Instant::now() + timeout;
        let session = self.session().await?;

        let body = wire::CreateServer {
            server: wire::NewServer {
                name: req.name.as_str(),
                image_ref: &req.image,
                flavor_ref: &req.flavor,
                networks: vec![wire::Network { uuid: &req.network }],
                key_name: req.key_name.as_deref(),
                user_data: BASE64_STANDARD.encode(&req.user_data),
            },
        };
        let url = format!("{}/servers", session.compute_url);
        let resp = self.send(&session, self.http.post(url).json(&body)).await?;
        let created: wire::CreatedServer = decode(resp).await?;
        let id = created.server.id;
        info!(instance_id = %id, "instance accepted");

        loop {
            match self.get_server(&id).await {
                Ok(server) => match server.status() {
                    InstanceStatus::Active | InstanceStatus::Error => return Ok(server.into()),
                    status => debug!(%status, "waiting for instance"),
                },
                Err(e) if e.is_transient() => warn!(error = %e, "status poll failed; retrying"),
                Err(e) => return Err(e),
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(ClientError::Timeout(timeout));
            }
            tokio::time::sleep(self.poll_interval.min(deadline - now)).await;
        }
    }

    #[instrument(name = "openstack.list_instances", skip(self))]
    async fn list_instances(&self) -> ClientResult<Vec<InstanceRecord>> {
        let session = self.session().await?;
        let url = format!("{}/servers/detail", session.compute_url);
        let first = self
            .http
            .get(url)
            .query(&[("name", format!("^{RESERVED_PREFIX}"))]);

        let mut instances = Vec::new();
        let mut resp = self.send(&session, first).await?;
        loop {
            let page: wire::ServerList = decode(resp).await?;
            let next = page.next_link().map(str::to_string);
            instances.extend(
                page.servers
                    .into_iter()
                    .map(InstanceRecord::from)
                    .filter(InstanceRecord::is_managed),
            );

            match next {
                Some(href) => resp = self.send(&session, self.http.get(href)).await?,
                None => break,
            }
        }

        debug!(count = instances.len(), "listed instances");
        Ok(instances)
    }

    #[instrument(name = "openstack.delete_instance", skip(self))]
    async fn delete_instance(&self, name_or_id: &str) -> ClientResult<()> {
        let session = self.session().await?;
        if !RunnerName::is_managed(name_or_id) {
            return self.delete_by_id(&session, name_or_id).await;
        }

        let ids = self.resolve(&session, name_or_id).await?;
        if ids.is_empty() {
            debug!("no instance with that name");
        }
        for id in ids {
            self.delete_by_id(&session, &id).await?;
        }
        Ok(())
    }
}
