//! GitHub REST adapter for the organization's self-hosted runner registry.
mod wire;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};
use tracing::{debug, instrument};

use crate::{
    error::CloudError,
    http::{check, decode, transport},
};
use runway_core::client::{CiControlPlane, ClientError, ClientResult};
use runway_model::{RegistrationRequest, RegistrationToken, RunnerRecord};

pub const DEFAULT_API_URL: &str = "https://api.github.com";

const API_VERSION: &str = "2022-11-28";
const USER_AGENT: &str = concat!("runway/", env!("CARGO_PKG_VERSION"));
const PER_PAGE: usize = 100;
const WORK_FOLDER: &str = "_work";
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub struct GithubClient {
    base_url: String,
    http: reqwest::Client,
}

impl GithubClient {
    /// Create a client against `base_url` (the REST root, e.g. [`DEFAULT_API_URL`]).
    pub fn new(base_url: impl Into<String>, token: &str) -> Result<Self, CloudError> {
        let mut auth = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|_| CloudError::InvalidCredential("github token"))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert("X-GitHub-Api-Version", HeaderValue::from_static(API_VERSION));
        headers.insert(AUTHORIZATION, auth);

        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(DEFAULT_REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        })
    }

    fn runners_url(&self, org: &str) -> String {
        format!("{}/orgs/{org}/actions/runners", self.base_url)
    }
}

#[async_trait]
impl CiControlPlane for GithubClient {
    #[instrument(name = "github.list_runners", skip(self))]
    async fn list_runners(&self, org: &str) -> ClientResult<Vec<RunnerRecord>> {
        let url = self.runners_url(org);
        let mut runners = Vec::new();

        for page in 1.. {
            let resp = self
                .http
                .get(&url)
                .query(&[("per_page", PER_PAGE), ("page", page)])
                .send()
                .await
                .map_err(transport)?;
            let body: wire::RunnersPage = decode(check(resp).await?).await?;

            let fetched = body.runners.len();
            runners.extend(body.runners.into_iter().map(RunnerRecord::from));
            if fetched < PER_PAGE || runners.len() >= body.total_count {
                break;
            }
        }

        debug!(count = runners.len(), "listed runners");
        Ok(runners)
    }

    #[instrument(
        name = "github.generate_jitconfig",
        skip(self, req),
        fields(runner = %req.name, runner_group_id = req.runner_group_id)
    )]
    async fn generate_registration_token(
        &self,
        org: &str,
        req: &RegistrationRequest,
    ) -> ClientResult<RegistrationToken> {
        let payload = wire::JitConfigRequest {
            name: req.name.as_str(),
            runner_group_id: req.runner_group_id,
            labels: &req.labels,
            work_folder: WORK_FOLDER,
        };
        let resp = self
            .http
            .post(format!("{}/generate-jitconfig", self.runners_url(org)))
            .json(&payload)
            .send()
            .await
            .map_err(transport)?;
        let body: wire::JitConfigResponse = decode(check(resp).await?).await?;

        debug!(runner_id = body.runner.id, "jit config generated");
        Ok(RegistrationToken::new(body.encoded_jit_config, Some(body.runner.id)))
    }

    #[instrument(name = "github.delete_runner", skip(self))]
    async fn delete_runner(&self, org: &str, runner_id: u64) -> ClientResult<()> {
        let resp = self
            .http
            .delete(format!("{}/{runner_id}", self.runners_url(org)))
            .send()
            .await
            .map_err(transport)?;

        match check(resp).await {
            Ok(_) => Ok(()),
            Err(ClientError::NotFound(_)) => {
                debug!("runner already gone");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}
