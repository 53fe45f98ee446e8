//! Protobuf wire messages exchanged between oracles each round.
//!
//! These are hand-declared `prost` messages; field numbers are part of the
//! wire contract and must never be reused.

pub mod values;

use std::collections::BTreeMap;

pub use prost_types::Timestamp;
pub use values::{value, List, Map, Value};

/// Identity of one unit of consensus work. Equality across the protocol is
/// by `workflow_execution_id` alone.
#[derive(Clone, PartialEq, Eq, Hash, ::prost::Message)]
pub struct Id {
    #[prost(string, tag = "1")]
    pub workflow_execution_id: String,
    #[prost(string, tag = "2")]
    pub workflow_id: String,
    #[prost(string, tag = "3")]
    pub workflow_owner: String,
    #[prost(string, tag = "4")]
    pub workflow_name: String,
    #[prost(uint32, tag = "5")]
    pub workflow_don_id: u32,
    #[prost(uint32, tag = "6")]
    pub workflow_don_config_version: u32,
    #[prost(string, tag = "7")]
    pub report_id: String,
    #[prost(string, tag = "8")]
    pub key_id: String,
}

/// Batch of ids proposed by the leader for this round.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Query {
    #[prost(message, repeated, tag = "1")]
    pub ids: Vec<Id>,
}

/// One oracle's local data for one execution id.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Observation {
    #[prost(message, optional, tag = "1")]
    pub id: Option<Id>,
    #[prost(message, optional, tag = "2")]
    pub observations: Option<List>,
    #[prost(string, tag = "3")]
    pub overridden_encoder_name: String,
    #[prost(message, optional, tag = "4")]
    pub overridden_encoder_config: Option<Map>,
}

/// Everything one oracle broadcasts for a round.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Observations {
    #[prost(message, repeated, tag = "1")]
    pub observations: Vec<Observation>,
    #[prost(string, repeated, tag = "2")]
    pub registered_workflow_ids: Vec<String>,
    #[prost(message, optional, tag = "3")]
    pub timestamp: Option<Timestamp>,
}

/// Per-workflow consensus state carried from round to round.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AggregationOutcome {
    #[prost(message, optional, tag = "1")]
    pub encodable_outcome: Option<Map>,
    /// Aggregator-private state.
    #[prost(bytes = "vec", tag = "2")]
    pub metadata: Vec<u8>,
    #[prost(bool, tag = "3")]
    pub should_report: bool,
    /// Sequence number of the last round in which F+1 oracles served this workflow.
    #[prost(uint64, tag = "4")]
    pub last_seen_at: u64,
    #[prost(message, optional, tag = "5")]
    pub timestamp: Option<Timestamp>,
}

/// Round output. `outcomes` persists across rounds; `current_reports` is
/// rebuilt from scratch each round.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Outcome {
    #[prost(btree_map = "string, message", tag = "1")]
    pub outcomes: BTreeMap<String, AggregationOutcome>,
    #[prost(message, repeated, tag = "2")]
    pub current_reports: Vec<Report>,
}

/// A finalized item for the current round.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Report {
    #[prost(message, optional, tag = "1")]
    pub id: Option<Id>,
    #[prost(message, optional, tag = "2")]
    pub outcome: Option<AggregationOutcome>,
    #[prost(string, tag = "3")]
    pub overridden_encoder_name: String,
    #[prost(message, optional, tag = "4")]
    pub overridden_encoder_config: Option<Map>,
}

/// Envelope emitted next to every report so the transmitter can close out
/// the unit of work whether or not a report body was produced.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ReportInfo {
    #[prost(message, optional, tag = "1")]
    pub id: Option<Id>,
    #[prost(bool, tag = "2")]
    pub should_report: bool,
}

impl Id {
    /// Builds an id carrying only the execution and workflow ids.
    pub fn new(workflow_execution_id: impl Into<String>, workflow_id: impl Into<String>) -> Self {
        Self {
            workflow_execution_id: workflow_execution_id.into(),
            workflow_id: workflow_id.into(),
            ..Default::default()
        }
    }
}

impl Report {
    /// Execution id of this report, or the empty string if it carries no id.
    pub fn execution_id(&self) -> &str {
        self.id
            .as_ref()
            .map(|id| id.workflow_execution_id.as_str())
            .unwrap_or_default()
    }
}

impl Observation {
    pub fn execution_id(&self) -> &str {
        self.id
            .as_ref()
            .map(|id| id.workflow_execution_id.as_str())
            .unwrap_or_default()
    }
}
