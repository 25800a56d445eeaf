use serde::{Deserialize, Serialize};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

use runway_model::{InstanceRecord, InstanceStatus};

#[derive(Deserialize)]
pub(super) struct TokenResponse {
    pub token: Token,
}

#[derive(Deserialize)]
pub(super) struct Token {
    pub expires_at: Option<String>,
    #[serde(default)]
    pub catalog: Vec<CatalogService>,
}

#[derive(Deserialize)]
pub(super) struct CatalogService {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub endpoints: Vec<CatalogEndpoint>,
}

#[derive(Deserialize)]
pub(super) struct CatalogEndpoint {
    pub interface: String,
    pub region: Option<String>,
    pub region_id: Option<String>,
    pub url: String,
}

#[derive(Serialize)]
pub(super) struct CreateServer<'a> {
    pub server: NewServer<'a>,
}

#[derive(Serialize)]
pub(super) struct NewServer<'a> {
    pub name: &'a str,
    #[serde(rename = "imageRef")]
    pub image_ref: &'a str,
    #[serde(rename = "flavorRef")]
    pub flavor_ref: &'a str,
    pub networks: Vec<Network<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_name: Option<&'a str>,
    /// Base64 of the cloud-init document.
    pub user_data: String,
}

#[derive(Serialize)]
pub(super) struct Network<'a> {
    pub uuid: &'a str,
}

#[derive(Deserialize)]
pub(super) struct CreatedServer {
    pub server: ServerRef,
}

#[derive(Deserialize)]
pub(super) struct ServerRef {
    pub id: String,
}

#[derive(Deserialize)]
pub(super) struct ServerEnvelope {
    pub server: Server,
}

#[derive(Deserialize)]
pub(super) struct ServerList {
    pub servers: Vec<Server>,
    #[serde(default)]
    pub servers_links: Vec<Link>,
}

impl ServerList {
    pub fn next_link(&self) -> Option<&str> {
        self.servers_links
            .iter()
            .find(|l| l.rel == "next")
            .map(|l| l.href.as_str())
    }
}

#[derive(Deserialize)]
pub(super) struct Link {
    pub rel: String,
    pub href: String,
}

#[derive(Deserialize)]
pub(super) struct Server {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub created: Option<String>,
}

impl Server {
    pub fn status(&self) -> InstanceStatus {
        let Ok(status) = self.status.as_deref().unwrap_or_default().parse::<InstanceStatus>();
        status
    }
}

impl From<Server> for InstanceRecord {
    fn from(s: Server) -> Self {
        InstanceRecord {
            status: s.status(),
            created_at: s
                .created
                .as_deref()
                .and_then(|c| OffsetDateTime::parse(c, &Rfc3339).ok()),
            id: s.id,
            name: s.name,
        }
    }
}
