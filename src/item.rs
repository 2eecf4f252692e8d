//! Canonical model for hosts and services reported by Icinga
//!
//! Every poll rebuilds all items from the raw API response. Items are plain
//! values: two polls producing the same field values produce equal items with
//! equal hashes, so change detection is a set comparison.
//!
//! ## Ordering
//!
//! Items sort worst-first: severity descending, then host name, then service
//! name. The remaining fields only break ties so that `Ord` agrees with `Eq`.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{IcingaError, IcingaResult};
use crate::filter::{Field, Filter};

/// Service name used for items that stand for the host itself
pub const HOST_SENTINEL: &str = "-- HOST --";

/// Severity a host with any non-zero state is normalized to
pub const HOST_DOWN_STATE: i64 = 2;

/// Object type as named by the Icinga API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum ItemKind {
    Host,
    Service,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Host => "Host",
            ItemKind::Service => "Service",
        }
    }

    /// Collection name under `objects/`
    pub fn plural(&self) -> &'static str {
        match self {
            ItemKind::Host => "hosts",
            ItemKind::Service => "services",
        }
    }

    /// Shorthand group parameter understood by API translation proxies
    pub fn group_param(&self) -> &'static str {
        match self {
            ItemKind::Host => "hostgroup",
            ItemKind::Service => "servicegroup",
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Attributes of a host or service record as the API delivers them
///
/// Counters arrive as JSON floats (`0.0`), so every numeric field is read as
/// `f64` and truncated afterwards.
#[derive(Debug, Deserialize)]
struct RawAttrs {
    state: f64,
    state_type: f64,
    acknowledgement: f64,
    downtime_depth: f64,
    display_name: String,
    #[serde(default)]
    host_name: Option<String>,
    #[serde(default)]
    last_check_result: Option<RawCheckResult>,
}

#[derive(Debug, Deserialize)]
struct RawCheckResult {
    #[serde(default)]
    output: Option<String>,
}

/// One monitored object, normalized
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Item {
    kind: ItemKind,
    host_name: String,
    service_name: String,
    state: i64,
    state_type: i64,
    acknowledgement: i64,
    downtime_depth: i64,
    output_lines: Vec<String>,
}

impl Item {
    /// Normalize the `attrs` mapping of a single host or service record
    pub fn from_record(kind: ItemKind, attrs: &Value) -> IcingaResult<Self> {
        let raw = RawAttrs::deserialize(attrs).map_err(|e| IcingaError::malformed(kind, e))?;

        if raw.downtime_depth < 0.0 {
            return Err(IcingaError::malformed(
                kind,
                format!("negative downtime_depth {}", raw.downtime_depth),
            ));
        }

        let state = raw.state as i64;
        let (host_name, service_name, state) = match kind {
            ItemKind::Host => {
                let state = if state != 0 { HOST_DOWN_STATE } else { 0 };
                (raw.display_name, HOST_SENTINEL.to_string(), state)
            }
            ItemKind::Service => {
                let host_name = raw
                    .host_name
                    .ok_or_else(|| IcingaError::malformed(kind, "missing field `host_name`"))?;
                (host_name, raw.display_name, state)
            }
        };

        let output_lines = raw
            .last_check_result
            .and_then(|result| result.output)
            .map(|output| output.lines().map(str::to_string).collect())
            .unwrap_or_default();

        Ok(Self {
            kind,
            host_name,
            service_name,
            state,
            state_type: raw.state_type as i64,
            acknowledgement: raw.acknowledgement as i64,
            downtime_depth: raw.downtime_depth as i64,
            output_lines,
        })
    }

    /// Normalize one entry of an API `results` array
    pub fn from_result(kind: ItemKind, result: &Value) -> IcingaResult<Self> {
        let attrs = result
            .get("attrs")
            .filter(|attrs| attrs.is_object())
            .ok_or_else(|| IcingaError::malformed(kind, "result without `attrs` object"))?;
        Self::from_record(kind, attrs)
    }

    /// Host-wide stand-in without any monitoring data behind it
    pub fn placeholder(host_name: impl Into<String>) -> Self {
        Self {
            kind: ItemKind::Host,
            host_name: host_name.into(),
            service_name: HOST_SENTINEL.to_string(),
            state: 0,
            state_type: 0,
            acknowledgement: 0,
            downtime_depth: 0,
            output_lines: Vec::new(),
        }
    }

    pub fn kind(&self) -> ItemKind {
        self.kind
    }

    pub fn host_name(&self) -> &str {
        &self.host_name
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    pub fn state(&self) -> i64 {
        self.state
    }

    pub fn state_type(&self) -> i64 {
        self.state_type
    }

    pub fn acknowledgement(&self) -> i64 {
        self.acknowledgement
    }

    pub fn downtime_depth(&self) -> i64 {
        self.downtime_depth
    }

    pub fn output_lines(&self) -> &[String] {
        &self.output_lines
    }

    pub fn is_problem(&self) -> bool {
        self.state != 0
    }

    pub fn is_soft(&self) -> bool {
        self.state_type == 0
    }

    pub fn is_acknowledged(&self) -> bool {
        self.acknowledgement != 0
    }

    pub fn in_downtime(&self) -> bool {
        self.downtime_depth > 0
    }

    pub fn state_label(&self) -> &'static str {
        match (self.kind, self.state) {
            (ItemKind::Host, 0) => "UP",
            (ItemKind::Host, _) => "DOWN",
            (ItemKind::Service, 0) => "OK",
            (ItemKind::Service, 1) => "WARNING",
            (ItemKind::Service, 2) => "CRITICAL",
            (ItemKind::Service, _) => "UNKNOWN",
        }
    }

    /// Filter selecting exactly this object
    pub fn filter(&self) -> Filter {
        let host = Filter::matches(self.host_name.as_str(), Field::HostName);
        match self.kind {
            ItemKind::Host => host,
            ItemKind::Service => {
                host.and(Filter::matches(self.service_name.as_str(), Field::ServiceName))
            }
        }
    }

    pub fn filter_expression(&self) -> String {
        self.filter().to_string()
    }

    /// Status flags, host column padded to `column_width`, then the service
    pub fn display_line(&self, column_width: usize) -> String {
        let soft = if self.is_soft() { 'S' } else { ' ' };
        let ack = if self.is_acknowledged() { 'A' } else { ' ' };
        let downtime = if self.in_downtime() { 'D' } else { ' ' };

        format!(
            "{soft}{ack}{downtime} {:<column_width$} {}",
            self.host_name, self.service_name
        )
    }
}

impl Ord for Item {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .state
            .cmp(&self.state)
            .then_with(|| self.host_name.cmp(&other.host_name))
            .then_with(|| self.service_name.cmp(&other.service_name))
            .then_with(|| self.kind.cmp(&other.kind))
            .then_with(|| self.state_type.cmp(&other.state_type))
            .then_with(|| self.acknowledgement.cmp(&other.acknowledgement))
            .then_with(|| self.downtime_depth.cmp(&other.downtime_depth))
            .then_with(|| self.output_lines.cmp(&other.output_lines))
    }
}

impl PartialOrd for Item {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Hosts and services from one poll
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CurrentState {
    pub hosts: Vec<Item>,
    pub services: Vec<Item>,
}

impl CurrentState {
    /// Hosts first, then services, in fetch order
    pub fn all(&self) -> impl Iterator<Item = &Item> {
        self.hosts.iter().chain(self.services.iter())
    }

    /// Every item, worst first
    pub fn sorted(&self) -> Vec<Item> {
        let mut items: Vec<Item> = self.all().cloned().collect();
        items.sort();
        items
    }

    /// Items in a non-OK state, worst first
    pub fn problems(&self) -> Vec<Item> {
        let mut items: Vec<Item> = self.all().filter(|item| item.is_problem()).cloned().collect();
        items.sort();
        items
    }

    pub fn len(&self) -> usize {
        self.hosts.len() + self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty() && self.services.is_empty()
    }
}
