//! Thin HTTP client for the node API, plus the operator profile it reads
//! its defaults from.

use anyhow::Context;
use clap::Args;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use gatepass_core::Role;

pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:8412";
pub const DEFAULT_PROFILE: &str = "gatepass-cli.toml";

/// Who the operator is and which node they talk to. Written by `gatepass init`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    pub actor_id: String,
    #[serde(default = "default_role")]
    pub role: Role,
    #[serde(default)]
    pub display_name: Option<String>,
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.into()
}
fn default_role() -> Role {
    Role::Scanner
}

impl Profile {
    /// Load the profile, or `None` if the file does not exist.
    pub fn load(path: &Path) -> anyhow::Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(path)?;
        let profile = toml::from_str(&contents)
            .with_context(|| format!("invalid profile {}", path.display()))?;
        Ok(Some(profile))
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let contents = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, contents)?;
        Ok(())
    }
}

/// Connection flags shared by every command that talks to the node.
#[derive(Args, Debug, Clone)]
pub struct ConnectionArgs {
    /// API endpoint of the node.
    #[arg(short, long)]
    pub endpoint: Option<String>,

    /// Acting user id.
    #[arg(long)]
    pub actor: Option<String>,

    /// Acting role (admin, staff, scanner).
    #[arg(long)]
    pub role: Option<Role>,

    /// Operator profile written by `gatepass init`.
    #[arg(long, default_value = DEFAULT_PROFILE)]
    pub profile: PathBuf,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: String,
}

pub struct NodeClient {
    http: reqwest::Client,
    endpoint: String,
    actor_id: Option<String>,
    role: Option<Role>,
    display_name: Option<String>,
}

impl NodeClient {
    /// Resolve flags over the profile; flags win.
    pub fn from_args(args: &ConnectionArgs) -> anyhow::Result<Self> {
        let profile = Profile::load(&args.profile)?;
        let endpoint = args
            .endpoint
            .clone()
            .or_else(|| profile.as_ref().map(|p| p.endpoint.clone()))
            .unwrap_or_else(default_endpoint);

        Ok(Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            actor_id: args
                .actor
                .clone()
                .or_else(|| profile.as_ref().map(|p| p.actor_id.clone())),
            role: args.role.or_else(|| profile.as_ref().map(|p| p.role)),
            display_name: profile.and_then(|p| p.display_name),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/api/v1/{}", self.endpoint, path.trim_start_matches('/'))
    }

    fn with_actor(&self, mut req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let Some(ref actor) = self.actor_id {
            req = req.header("x-actor-id", actor);
        }
        if let Some(role) = self.role {
            req = req.header("x-actor-role", role.to_string());
        }
        if let Some(ref name) = self.display_name {
            req = req.header("x-actor-name", name);
        }
        req
    }

    pub fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.with_actor(self.http.get(self.url(path)))
    }

    pub fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> reqwest::RequestBuilder {
        self.with_actor(self.http.post(self.url(path)).json(body))
    }

    /// Send and decode a JSON response, turning API errors into messages.
    pub async fn send_json<T: DeserializeOwned>(
        &self,
        req: reqwest::RequestBuilder,
    ) -> anyhow::Result<T> {
        let resp = self.send(req).await?;
        Ok(resp.json().await?)
    }

    /// Send and return the raw successful response.
    pub async fn send(&self, req: reqwest::RequestBuilder) -> anyhow::Result<reqwest::Response> {
        let resp = req.send().await.with_context(|| {
            format!(
                "could not reach node at {} (is gatepass-node running?)",
                self.endpoint
            )
        })?;
        let status = resp.status();
        tracing::debug!(%status, url = %resp.url(), "node responded");
        if status.is_success() {
            return Ok(resp);
        }
        match resp.json::<ErrorResponse>().await {
            Ok(err) => anyhow::bail!("node returned HTTP {}: {}", status, err.error),
            Err(_) => anyhow::bail!("node returned HTTP {}", status),
        }
    }
}
