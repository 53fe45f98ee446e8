//! The three batch shapes packed each round. All of them truncate in
//! insertion order.

use super::packer::Packable;
use crate::wire::{AggregationOutcome, Id, Observation, Observations, Outcome, Query, Report, Timestamp};
use prost::Message;
use std::collections::BTreeMap;

/// Ids proposed in a `Query`.
#[derive(Clone, Debug, Default)]
pub struct QueryBatch {
    pub ids: Vec<Id>,
}

impl QueryBatch {
    pub fn new(ids: Vec<Id>) -> Self {
        Self { ids }
    }
}

impl Packable for QueryBatch {
    fn len(&self) -> usize {
        self.ids.len()
    }

    fn prefix(&self, n: usize) -> Self {
        Self::new(self.ids[..n].to_vec())
    }

    fn encode(&self) -> Vec<u8> {
        Query {
            ids: self.ids.clone(),
        }
        .encode_to_vec()
    }

    fn item_ids(&self) -> Vec<String> {
        self.ids
            .iter()
            .map(|id| id.workflow_execution_id.clone())
            .collect()
    }
}

/// Observations broadcast by this oracle. Only `observations` is truncated;
/// the registered workflow ids and timestamp are always sent.
#[derive(Clone, Debug, Default)]
pub struct ObservationBatch {
    pub observations: Vec<Observation>,
    pub registered_workflow_ids: Vec<String>,
    pub timestamp: Option<Timestamp>,
}

impl ObservationBatch {
    pub fn into_message(self) -> Observations {
        Observations {
            observations: self.observations,
            registered_workflow_ids: self.registered_workflow_ids,
            timestamp: self.timestamp,
        }
    }

    /// Encoded size of everything except the observations.
    pub fn base_size(&self) -> usize {
        Observations {
            observations: Vec::new(),
            registered_workflow_ids: self.registered_workflow_ids.clone(),
            timestamp: self.timestamp.clone(),
        }
        .encoded_len()
    }
}

impl Packable for ObservationBatch {
    fn len(&self) -> usize {
        self.observations.len()
    }

    fn prefix(&self, n: usize) -> Self {
        Self {
            observations: self.observations[..n].to_vec(),
            registered_workflow_ids: self.registered_workflow_ids.clone(),
            timestamp: self.timestamp.clone(),
        }
    }

    fn encode(&self) -> Vec<u8> {
        self.clone().into_message().encode_to_vec()
    }

    fn item_ids(&self) -> Vec<String> {
        self.observations
            .iter()
            .map(|o| o.execution_id().to_string())
            .collect()
    }
}

/// A round outcome. Persistent per-workflow outcomes are always kept; only
/// the current reports are truncated.
#[derive(Clone, Debug, Default)]
pub struct OutcomeBatch {
    pub outcomes: BTreeMap<String, AggregationOutcome>,
    pub current_reports: Vec<Report>,
}

impl OutcomeBatch {
    pub fn from_outcome(outcome: Outcome) -> Self {
        Self {
            outcomes: outcome.outcomes,
            current_reports: outcome.current_reports,
        }
    }

    pub fn into_outcome(self) -> Outcome {
        Outcome {
            outcomes: self.outcomes,
            current_reports: self.current_reports,
        }
    }

    /// Encoded size of the persistent outcomes alone.
    pub fn base_size(&self) -> usize {
        Outcome {
            outcomes: self.outcomes.clone(),
            current_reports: Vec::new(),
        }
        .encoded_len()
    }
}

impl Packable for OutcomeBatch {
    fn len(&self) -> usize {
        self.current_reports.len()
    }

    fn prefix(&self, n: usize) -> Self {
        Self {
            outcomes: self.outcomes.clone(),
            current_reports: self.current_reports[..n].to_vec(),
        }
    }

    fn encode(&self) -> Vec<u8> {
        self.clone().into_outcome().encode_to_vec()
    }

    fn item_ids(&self) -> Vec<String> {
        self.current_reports
            .iter()
            .map(|r| r.execution_id().to_string())
            .collect()
    }
}
