//! Report metadata stamped into the encodable outcome before encoding

use crate::wire::{AggregationOutcome, Id, Map, Value};

/// Key under which metadata is inserted into the encodable outcome.
pub const METADATA_FIELD_NAME: &str = "INTERNAL_METADATA";

/// Current metadata layout version.
pub const METADATA_VERSION: u32 = 1;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReportMetadata {
    pub version: u32,
    pub execution_id: String,
    /// Unix seconds of the round's consensus timestamp.
    pub timestamp: u32,
    pub don_id: u32,
    pub don_config_version: u32,
    pub workflow_id: String,
    pub workflow_name: String,
    pub workflow_owner: String,
    pub report_id: String,
}

impl ReportMetadata {
    /// Builds metadata for a report on `id` agreed at `timestamp`.
    pub fn for_report(id: &Id, timestamp: u32) -> Self {
        Self {
            version: METADATA_VERSION,
            execution_id: id.workflow_execution_id.clone(),
            timestamp,
            don_id: id.workflow_don_id,
            don_config_version: id.workflow_don_config_version,
            workflow_id: id.workflow_id.clone(),
            workflow_name: id.workflow_name.clone(),
            workflow_owner: id.workflow_owner.clone(),
            report_id: id.report_id.clone(),
        }
    }

    pub fn to_map(&self) -> Map {
        Map::new()
            .with("Version", i64::from(self.version))
            .with("ExecutionID", self.execution_id.as_str())
            .with("Timestamp", i64::from(self.timestamp))
            .with("DONID", i64::from(self.don_id))
            .with("DONConfigVersion", i64::from(self.don_config_version))
            .with("WorkflowID", self.workflow_id.as_str())
            .with("WorkflowName", self.workflow_name.as_str())
            .with("WorkflowOwner", self.workflow_owner.as_str())
            .with("ReportID", self.report_id.as_str())
    }
}

/// Returns the outcome's encodable payload with `meta` inserted under
/// [`METADATA_FIELD_NAME`]. A missing payload is treated as an empty map.
pub fn append_metadata(outcome: &AggregationOutcome, meta: &ReportMetadata) -> Map {
    let mut encodable = outcome.encodable_outcome.clone().unwrap_or_default();
    encodable.insert(METADATA_FIELD_NAME, Value::map(meta.to_map()));
    encodable
}
