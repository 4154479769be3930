//! HTTP client for the Omnistrate fleet API.
//!
//! All fleet calls are scoped to one service environment and live under
//! `/2022-09-01-00/fleet/service/{serviceId}/environment/{environmentId}`.
//!
//! # Example
//!
//! ```rust,no_run
//! use omnistrate_ctl::client::FleetClient;
//! use omnistrate_ctl::config::Scope;
//!
//! # async fn example() -> Result<(), omnistrate_ctl::CliError> {
//! let client = FleetClient::new("https://api.omnistrate.cloud", Some("jwt".into()))?;
//! let scope = Scope {
//!     service_id: "s-123".into(),
//!     environment_id: "se-456".into(),
//! };
//! for instance in client.list_instances(&scope).await? {
//!     println!("{} {}", instance.id, instance.status);
//! }
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use omni_workflow::{
    ResourceWorkflowSnapshot, WorkflowError, WorkflowFetch, WorkflowInfo, WorkflowQuery,
    WorkflowResult, WorkflowSource,
};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use tracing::{debug, info, trace};

use crate::config::{Scope, Settings};
use crate::error::{CliError, CliResult};
use crate::model::{CreateInstanceRequest, Instance, Snapshot};

/// API version prefix.
const API_PREFIX: &str = "/2022-09-01-00";

/// Default connection timeout.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default request timeout.
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Upper bound on workflow event pages fetched per poll.
const MAX_EVENT_PAGES: usize = 50;

/// Fleet API client.
#[derive(Clone)]
pub struct FleetClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl std::fmt::Debug for FleetClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FleetClient")
            .field("base_url", &self.base_url)
            .field("authenticated", &self.token.is_some())
            .finish_non_exhaustive()
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInResponse {
    jwt_token: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct InstanceList {
    #[serde(default, alias = "resourceInstances")]
    instances: Vec<Instance>,
}

#[derive(Deserialize)]
struct CreatedInstance {
    #[serde(alias = "instanceId")]
    id: String,
}

#[derive(Deserialize)]
struct SnapshotList {
    #[serde(default)]
    snapshots: Vec<Snapshot>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatedSnapshot {
    #[serde(alias = "id")]
    snapshot_id: String,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    message: Option<String>,
}

/// One page of workflow debug events.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkflowEventsPage {
    /// Per-resource events on this page.
    pub resources: Vec<ResourceWorkflowSnapshot>,
    /// Workflow record, repeated on every page.
    #[serde(alias = "workflow")]
    pub workflow_info: Option<WorkflowInfo>,
    /// Token for the next page, absent on the last page.
    pub next_page_token: Option<String>,
}

impl FleetClient {
    /// Creates a client for the given API base URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is not http(s) or the HTTP client cannot be built.
    pub fn new(base_url: &str, token: Option<String>) -> CliResult<Self> {
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(CliError::config(format!(
                "invalid API URL: {base_url}, must start with http:// or https://"
            )));
        }

        let client = Client::builder()
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .timeout(DEFAULT_REQUEST_TIMEOUT)
            .user_agent(concat!("omnistrate-ctl/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
            token,
        })
    }

    /// Creates an authenticated client from resolved settings.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::NotAuthenticated`] if no token is stored.
    pub fn from_settings(settings: &Settings) -> CliResult<Self> {
        let token = settings.require_token()?.to_string();
        Self::new(&settings.api_url, Some(token))
    }

    /// Base URL without trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{API_PREFIX}{path}", self.base_url)
    }

    fn fleet_path(scope: &Scope, rest: &str) -> String {
        format!(
            "/fleet/service/{}/environment/{}{rest}",
            scope.service_id, scope.environment_id
        )
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = self.url(path);
        trace!(%method, %url, "Fleet API request");
        let request = self.client.request(method, url);
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> CliResult<T> {
        let response = check(request.send().await?).await?;
        Ok(response.json().await?)
    }

    async fn send_empty(&self, request: RequestBuilder) -> CliResult<()> {
        check(request.send().await?).await?;
        Ok(())
    }

    /// Exchanges credentials for an API token.
    ///
    /// # Errors
    ///
    /// Returns an error if the credentials are rejected or the request fails.
    pub async fn sign_in(&self, email: &str, password: &str) -> CliResult<String> {
        debug!(email = %email, "Signing in");
        let request = self
            .request(Method::POST, "/signin")
            .json(&json!({ "email": email, "password": password }));
        let response: SignInResponse = self.send_json(request).await?;
        Ok(response.jwt_token)
    }

    /// Lists instances in a service environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn list_instances(&self, scope: &Scope) -> CliResult<Vec<Instance>> {
        let path = Self::fleet_path(scope, "/instances");
        let list: InstanceList = self.send_json(self.request(Method::GET, &path)).await?;
        Ok(list.instances)
    }

    /// Fetches one instance.
    ///
    /// # Errors
    ///
    /// Returns an error if the instance does not exist or the request fails.
    pub async fn describe_instance(&self, scope: &Scope, instance_id: &str) -> CliResult<Instance> {
        let path = Self::fleet_path(scope, &format!("/instance/{instance_id}"));
        self.send_json(self.request(Method::GET, &path)).await
    }

    /// Creates an instance and returns its ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the request is rejected.
    pub async fn create_instance(
        &self,
        scope: &Scope,
        request: &CreateInstanceRequest,
    ) -> CliResult<String> {
        let path = Self::fleet_path(scope, "/instance");
        let created: CreatedInstance = self
            .send_json(self.request(Method::POST, &path).json(request))
            .await?;
        debug!(instance = %created.id, "Instance created");
        Ok(created.id)
    }

    /// Updates instance parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if the request is rejected.
    pub async fn modify_instance(
        &self,
        scope: &Scope,
        instance_id: &str,
        params: &Map<String, Value>,
    ) -> CliResult<()> {
        let path = Self::fleet_path(scope, &format!("/instance/{instance_id}"));
        let body = json!({ "requestParams": params });
        self.send_empty(self.request(Method::PATCH, &path).json(&body))
            .await
    }

    /// Deletes an instance.
    ///
    /// # Errors
    ///
    /// Returns an error if the request is rejected.
    pub async fn delete_instance(&self, scope: &Scope, instance_id: &str) -> CliResult<()> {
        let path = Self::fleet_path(scope, &format!("/instance/{instance_id}"));
        self.send_empty(self.request(Method::DELETE, &path)).await
    }

    /// Starts, stops or restarts an instance.
    ///
    /// # Errors
    ///
    /// Returns an error if the request is rejected.
    pub async fn power_action(
        &self,
        scope: &Scope,
        instance_id: &str,
        action: PowerAction,
    ) -> CliResult<()> {
        let path = Self::fleet_path(
            scope,
            &format!("/instance/{instance_id}/{}", action.as_str()),
        );
        self.send_empty(self.request(Method::POST, &path)).await
    }

    /// Lists snapshots of an instance.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn list_snapshots(&self, scope: &Scope, instance_id: &str) -> CliResult<Vec<Snapshot>> {
        let path = Self::fleet_path(scope, &format!("/instance/{instance_id}/snapshot"));
        let list: SnapshotList = self.send_json(self.request(Method::GET, &path)).await?;
        Ok(list.snapshots)
    }

    /// Fetches one snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot does not exist or the request fails.
    pub async fn describe_snapshot(
        &self,
        scope: &Scope,
        instance_id: &str,
        snapshot_id: &str,
    ) -> CliResult<Snapshot> {
        let path = Self::fleet_path(
            scope,
            &format!("/instance/{instance_id}/snapshot/{snapshot_id}"),
        );
        self.send_json(self.request(Method::GET, &path)).await
    }

    /// Takes a snapshot and returns its ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the request is rejected.
    pub async fn create_snapshot(&self, scope: &Scope, instance_id: &str) -> CliResult<String> {
        let path = Self::fleet_path(scope, &format!("/instance/{instance_id}/snapshot"));
        let created: CreatedSnapshot = self.send_json(self.request(Method::POST, &path)).await?;
        Ok(created.snapshot_id)
    }

    /// Deletes a snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the request is rejected.
    pub async fn delete_snapshot(
        &self,
        scope: &Scope,
        instance_id: &str,
        snapshot_id: &str,
    ) -> CliResult<()> {
        let path = Self::fleet_path(
            scope,
            &format!("/instance/{instance_id}/snapshot/{snapshot_id}"),
        );
        self.send_empty(self.request(Method::DELETE, &path)).await
    }

    /// Restores a snapshot into a new instance and returns the new instance ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the request is rejected.
    pub async fn restore_snapshot(
        &self,
        scope: &Scope,
        instance_id: &str,
        snapshot_id: &str,
        params: &Map<String, Value>,
    ) -> CliResult<String> {
        let path = Self::fleet_path(
            scope,
            &format!("/instance/{instance_id}/snapshot/{snapshot_id}/restore"),
        );
        let body = json!({ "inputParametersOverride": params });
        let created: CreatedInstance = self
            .send_json(self.request(Method::POST, &path).json(&body))
            .await?;
        Ok(created.id)
    }

    /// Fetches one page of workflow debug events.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn workflow_events(
        &self,
        query: &WorkflowQuery,
        page_token: Option<&str>,
    ) -> CliResult<WorkflowEventsPage> {
        let scope = Scope {
            service_id: query.service_id.clone(),
            environment_id: query.environment_id.clone(),
        };
        let path = Self::fleet_path(
            &scope,
            &format!("/instance/{}/workflow-events", query.instance_id),
        );

        let mut params = vec![
            ("actionType", query.action.as_str().to_string()),
            ("enhancedStatus", query.enhanced.to_string()),
        ];
        if let Some(token) = page_token {
            params.push(("nextPageToken", token.to_string()));
        }

        self.send_json(self.request(Method::GET, &path).query(&params))
            .await
    }

    /// Fetches every page of workflow events and merges them per resource.
    ///
    /// # Errors
    ///
    /// Returns an error if any page fails.
    pub async fn collect_workflow(&self, query: &WorkflowQuery) -> CliResult<WorkflowFetch> {
        let mut fetch = WorkflowFetch::default();
        let mut token: Option<String> = None;

        for page_number in 1..=MAX_EVENT_PAGES {
            let page = self.workflow_events(query, token.as_deref()).await?;
            let next = page.next_page_token.clone().filter(|t| !t.is_empty());
            merge_page(&mut fetch, page);

            match next {
                Some(next) if token.as_deref() != Some(next.as_str()) => {
                    trace!(page = page_number, "Following workflow events page token");
                    token = Some(next);
                }
                _ => return Ok(fetch),
            }
        }

        info!(pages = MAX_EVENT_PAGES, "Workflow events truncated");
        Ok(fetch)
    }
}

impl WorkflowSource for FleetClient {
    async fn fetch(&self, query: &WorkflowQuery) -> WorkflowResult<WorkflowFetch> {
        self.collect_workflow(query)
            .await
            .map_err(WorkflowError::fetch)
    }
}

/// Instance power operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerAction {
    /// Start a stopped instance.
    Start,
    /// Stop a running instance.
    Stop,
    /// Restart an instance.
    Restart,
}

impl PowerAction {
    /// Path segment for the operation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Restart => "restart",
        }
    }
}

/// Folds one page of events into the accumulated fetch.
///
/// Events for a resource already seen are appended step by step; a non-blank
/// explicit status on a later page replaces an earlier one.
pub fn merge_page(fetch: &mut WorkflowFetch, page: WorkflowEventsPage) {
    for resource in page.resources {
        match fetch.resources.iter_mut().find(|r| r.key() == resource.key()) {
            Some(existing) => {
                existing.steps.append(resource.steps);
                if resource
                    .status
                    .as_deref()
                    .is_some_and(|s| !s.trim().is_empty())
                {
                    existing.status = resource.status;
                }
                if existing.resource_name.is_empty() {
                    existing.resource_name = resource.resource_name;
                }
            }
            None => fetch.resources.push(resource),
        }
    }

    if page.workflow_info.is_some() {
        fetch.workflow = page.workflow_info;
    }
}

async fn check(response: Response) -> CliResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(CliError::Api {
        status: status.as_u16(),
        message: error_message(&body, status),
    })
}

/// Extracts a human-readable message from an error response body.
fn error_message(body: &str, status: StatusCode) -> String {
    serde_json::from_str::<ApiErrorBody>(body)
        .ok()
        .and_then(|b| b.message)
        .filter(|m| !m.trim().is_empty())
        .or_else(|| Some(body.trim().to_string()).filter(|b| !b.is_empty()))
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown error").to_string())
}
