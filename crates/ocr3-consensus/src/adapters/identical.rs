//! Identical-observation aggregator
//!
//! Reports the observation payload that at least `f + 1` oracles sent
//! byte-for-byte. With at most `f` faulty oracles, such a payload came from
//! at least one honest node.

use crate::domain::OracleId;
use crate::error::AggregationError;
use crate::ports::Aggregator;
use crate::wire::{AggregationOutcome, List, Map, Value};
use prost::Message;
use std::collections::BTreeMap;
use tracing::debug;

/// Key under which the agreed payload is placed in the encodable outcome.
pub const REPORTS_FIELD_NAME: &str = "Reports";

/// Aggregator that requires `f + 1` identical observations.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdenticalAggregator;

impl Aggregator for IdenticalAggregator {
    fn aggregate(
        &self,
        _previous: Option<&AggregationOutcome>,
        observations: &BTreeMap<OracleId, Vec<Value>>,
        f: usize,
    ) -> Result<AggregationOutcome, AggregationError> {
        // Keyed by encoded bytes, so ties resolve to the smallest encoding.
        let mut candidates: BTreeMap<Vec<u8>, (usize, List)> = BTreeMap::new();
        for values in observations.values() {
            let list = List::new(values.clone());
            let entry = candidates
                .entry(list.encode_to_vec())
                .or_insert_with(|| (0, list));
            entry.0 += 1;
        }

        let required = f + 1;
        let mut best: Option<&(usize, List)> = None;
        for candidate in candidates.values() {
            if best.map_or(true, |b| candidate.0 > b.0) {
                best = Some(candidate);
            }
        }

        match best {
            Some((count, list)) if *count >= required => {
                debug!(support = count, required, "Identical observations agreed");
                Ok(AggregationOutcome {
                    encodable_outcome: Some(
                        Map::new().with(REPORTS_FIELD_NAME, Value::list(list.clone())),
                    ),
                    should_report: true,
                    ..Default::default()
                })
            }
            best => Err(AggregationError::InsufficientAgreement {
                got: best.map_or(0, |(count, _)| *count),
                required,
            }),
        }
    }
}
