//! IcingaClient - Fetches state from and dispatches actions to the Icinga API
//!
//! ## Fetching
//!
//! One GET per object kind, or one GET per (kind, group) when group filters
//! are enabled. Filtered requests carry two parameters so that both backend
//! flavours understand them:
//!
//! - `filter="<group>" in host.groups` for a plain Icinga 2 API
//! - `hostgroup=<group>` for translation proxies that ignore filter syntax
//!
//! ## Actions
//!
//! ```text
//! items → split by kind → chunks of 20 → (expr) || (expr) ... → POST per chunk
//! ```
//!
//! Hosts are always dispatched before services. Requests are sequential and
//! the first failure aborts the call; chunks sent before it stay applied.

use std::collections::{BTreeSet, HashSet};

use reqwest::header::ACCEPT;
use reqwest::{RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument, trace, warn};

use crate::config::{Auth, ClientConfig};
use crate::error::{IcingaError, IcingaResult};
use crate::filter::Filter;
use crate::item::{CurrentState, Item, ItemKind};

/// Maximum number of objects OR-ed into a single action filter
pub const CHUNK_SIZE: usize = 20;

const RECHECK_ENDPOINT: &str = "actions/reschedule-check";
const ACKNOWLEDGE_ENDPOINT: &str = "actions/acknowledge-problem";
const DOWNTIME_ENDPOINT: &str = "actions/schedule-downtime";

/// Downtimes on children start only once the parent's downtime triggers
const DOWNTIME_CHILD_OPTIONS: &str = "DowntimeTriggeredChildren";

#[derive(Debug, Deserialize)]
struct ResultsEnvelope {
    results: Vec<Value>,
}

/// Body of every action request: object type, filter and action fields
#[derive(Debug, Serialize)]
struct ActionRequest<'a, P: Serialize> {
    #[serde(rename = "type")]
    kind: ItemKind,
    filter: String,
    #[serde(flatten)]
    payload: &'a P,
}

#[derive(Debug, Serialize)]
struct Recheck {
    force: bool,
}

#[derive(Debug, Serialize)]
struct Acknowledge<'a> {
    author: &'a str,
    comment: &'a str,
    sticky: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    expiry: Option<i64>,
}

#[derive(Debug, Serialize)]
struct Downtime<'a> {
    author: &'a str,
    comment: &'a str,
    start_time: i64,
    end_time: i64,
    child_options: &'static str,
}

/// Client for a single Icinga API endpoint
///
/// The configuration is fixed at construction; the HTTP client is reused
/// across all requests.
#[derive(Debug, Clone)]
pub struct IcingaClient {
    config: ClientConfig,
    client: reqwest::Client,
}

impl IcingaClient {
    pub fn new(config: ClientConfig) -> IcingaResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .danger_accept_invalid_certs(!config.ssl_verify)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| IcingaError::InvalidConfig(e.to_string()))?;

        Ok(Self { config, client })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn api(&self, endpoint: &str) -> String {
        format!("{}/api/v1/{endpoint}", self.config.base_url.trim_end_matches('/'))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.config.auth {
            Some(Auth::Basic { username, password }) => {
                request.basic_auth(username, password.as_ref())
            }
            Some(Auth::Token { token }) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Send a request and turn transport failures and non-2xx answers into errors
    async fn send(&self, endpoint: &str, request: RequestBuilder) -> IcingaResult<Response> {
        let response = request.send().await.map_err(|e| {
            warn!("{endpoint}: request failed: {e}");
            IcingaError::request(endpoint, e)
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("{endpoint}: HTTP error {status}: {body}");
            return Err(IcingaError::ApiRequest {
                endpoint: endpoint.to_string(),
                status: Some(status.as_u16()),
                message: if body.is_empty() {
                    status.to_string()
                } else {
                    body
                },
            });
        }

        Ok(response)
    }

    /// Fetch all hosts and services, honouring configured group filters
    #[instrument(skip(self))]
    pub async fn fetch_state(&self) -> IcingaResult<CurrentState> {
        let hosts = self.fetch_kind(ItemKind::Host).await?;
        let services = self.fetch_kind(ItemKind::Service).await?;

        debug!(
            hosts = hosts.len(),
            services = services.len(),
            "fetched current state"
        );

        Ok(CurrentState { hosts, services })
    }

    /// Groups to restrict `kind` to; empty means unrestricted
    fn groups_for(&self, kind: ItemKind) -> &[String] {
        if !self.config.use_group_filters {
            return &[];
        }

        let groups = match kind {
            ItemKind::Host => &self.config.group_filters.host_groups,
            ItemKind::Service => &self.config.group_filters.service_groups,
        };
        groups.as_deref().unwrap_or_default()
    }

    async fn fetch_kind(&self, kind: ItemKind) -> IcingaResult<Vec<Item>> {
        let groups = self.groups_for(kind);
        if groups.is_empty() {
            return self.fetch_objects(kind, None).await;
        }

        // Overlapping groups yield the same object twice; that is kept.
        let mut items = Vec::new();
        for group in groups {
            items.extend(self.fetch_objects(kind, Some(group)).await?);
        }
        Ok(items)
    }

    async fn fetch_objects(&self, kind: ItemKind, group: Option<&str>) -> IcingaResult<Vec<Item>> {
        let endpoint = format!("objects/{}", kind.plural());
        let mut request = self.authorize(self.client.get(self.api(&endpoint)));

        if let Some(group) = group {
            let filter = Filter::in_group(kind, group).to_string();
            request = request.query(&[("filter", filter.as_str()), (kind.group_param(), group)]);
        }

        debug!(group, "GET {endpoint}");

        let response = self.send(&endpoint, request).await?;
        let body = response
            .text()
            .await
            .map_err(|e| IcingaError::request(&endpoint, e))?;

        let envelope: ResultsEnvelope =
            serde_json::from_str(&body).map_err(|e| IcingaError::malformed(kind, e))?;

        trace!("{endpoint}: received {} results", envelope.results.len());

        envelope
            .results
            .iter()
            .map(|result| Item::from_result(kind, result))
            .collect()
    }

    /// Run the chunked dispatch of one action, hosts first, then services
    async fn dispatch<P: Serialize>(
        &self,
        endpoint: &str,
        items: &[Item],
        payload: &P,
    ) -> IcingaResult<()> {
        for kind in [ItemKind::Host, ItemKind::Service] {
            let selected: Vec<&Item> = items.iter().filter(|item| item.kind() == kind).collect();

            for (index, chunk) in selected.chunks(CHUNK_SIZE).enumerate() {
                let body = ActionRequest {
                    kind,
                    filter: Filter::any_of(chunk.iter().copied()).to_string(),
                    payload,
                };

                debug!("POST {endpoint}: {kind} chunk {index} with {} objects", chunk.len());
                trace!("filter: {}", body.filter);

                let request = self
                    .authorize(self.client.post(self.api(endpoint)))
                    .header(ACCEPT, "application/json")
                    .json(&body);

                self.send(endpoint, request).await?;
            }
        }

        Ok(())
    }

    /// Force an immediate check of every item
    #[instrument(skip_all, fields(items = items.len()))]
    pub async fn queue_check(&self, items: &[Item]) -> IcingaResult<()> {
        self.dispatch(RECHECK_ENDPOINT, items, &Recheck { force: true })
            .await
    }

    /// Acknowledge the problems of every item
    ///
    /// Acknowledgements are sticky; `expiry` (epoch seconds) clears them early.
    #[instrument(skip(self, items), fields(items = items.len()))]
    pub async fn set_ack(
        &self,
        items: &[Item],
        comment: &str,
        expiry: Option<i64>,
    ) -> IcingaResult<()> {
        let payload = Acknowledge {
            author: self.config.author(),
            comment,
            sticky: true,
            expiry,
        };
        self.dispatch(ACKNOWLEDGE_ENDPOINT, items, &payload).await
    }

    /// Acknowledge every host and service on the hosts touched by `selection`
    #[instrument(skip(self, selection, full_state), fields(items = selection.len()))]
    pub async fn set_ack_for_host(
        &self,
        selection: &[Item],
        full_state: &CurrentState,
        comment: &str,
        expiry: Option<i64>,
    ) -> IcingaResult<()> {
        let expanded = expand_to_hosts(selection, full_state);
        debug!("expanded {} selected items to {}", selection.len(), expanded.len());
        self.set_ack(&expanded, comment, expiry).await
    }

    /// Schedule a downtime from `start_time` to `end_time` (epoch seconds)
    #[instrument(skip(self, items), fields(items = items.len()))]
    pub async fn set_downtime(
        &self,
        items: &[Item],
        comment: &str,
        start_time: i64,
        end_time: i64,
    ) -> IcingaResult<()> {
        let payload = Downtime {
            author: self.config.author(),
            comment,
            start_time,
            end_time,
            child_options: DOWNTIME_CHILD_OPTIONS,
        };
        self.dispatch(DOWNTIME_ENDPOINT, items, &payload).await
    }

    /// Schedule a downtime on the host objects behind `selection`
    ///
    /// Services follow through the triggered-children option, so they need
    /// not be listed.
    #[instrument(skip(self, selection), fields(items = selection.len()))]
    pub async fn set_downtime_for_host(
        &self,
        selection: &[Item],
        comment: &str,
        start_time: i64,
        end_time: i64,
    ) -> IcingaResult<()> {
        let hosts = host_placeholders(selection);
        self.set_downtime(&hosts, comment, start_time, end_time)
            .await
    }
}

/// Every item in `full_state` living on a host referenced by `selection`
///
/// De-duplicated by value and returned worst first.
pub fn expand_to_hosts(selection: &[Item], full_state: &CurrentState) -> Vec<Item> {
    let host_names: HashSet<&str> = selection.iter().map(Item::host_name).collect();

    let expanded: HashSet<&Item> = full_state
        .all()
        .filter(|item| host_names.contains(item.host_name()))
        .collect();

    let mut items: Vec<Item> = expanded.into_iter().cloned().collect();
    items.sort();
    items
}

/// One placeholder host per distinct host name in `selection`, by name
pub fn host_placeholders(selection: &[Item]) -> Vec<Item> {
    selection
        .iter()
        .map(Item::host_name)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(Item::placeholder)
        .collect()
}
