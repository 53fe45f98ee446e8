//! Exact protobuf size arithmetic for the messages that are batched.
//!
//! Every function here must agree byte-for-byte with `prost` encoding:
//! proto3 scalars at their default value are omitted, optional messages are
//! written whenever present (even when empty), and nested messages are
//! length-delimited. Opaque nested payloads are measured with
//! `Message::encoded_len`, which does not allocate.

use crate::wire::{Id, Observation, Report};
use prost::encoding::{encoded_len_varint, key_len};
use prost::Message;

/// Field number of `Query.ids`.
const QUERY_IDS_TAG: u32 = 1;
/// Field number of `Observations.observations`.
const OBSERVATIONS_TAG: u32 = 1;
/// Field number of `Outcome.current_reports`.
const CURRENT_REPORTS_TAG: u32 = 2;

fn length_delimited(len: usize) -> usize {
    encoded_len_varint(len as u64) + len
}

fn string_field(tag: u32, value: &str) -> usize {
    if value.is_empty() {
        0
    } else {
        key_len(tag) + length_delimited(value.len())
    }
}

fn uint32_field(tag: u32, value: u32) -> usize {
    if value == 0 {
        0
    } else {
        key_len(tag) + encoded_len_varint(u64::from(value))
    }
}

fn message_field<M: Message>(tag: u32, value: Option<&M>) -> usize {
    value.map_or(0, |m| key_len(tag) + length_delimited(m.encoded_len()))
}

/// Size of one element of a repeated message field with the given body size.
fn repeated_element(tag: u32, body: usize) -> usize {
    key_len(tag) + length_delimited(body)
}

/// Encoded size of an `Id`.
pub fn id_size(id: &Id) -> usize {
    string_field(1, &id.workflow_execution_id)
        + string_field(2, &id.workflow_id)
        + string_field(3, &id.workflow_owner)
        + string_field(4, &id.workflow_name)
        + uint32_field(5, id.workflow_don_id)
        + uint32_field(6, id.workflow_don_config_version)
        + string_field(7, &id.report_id)
        + string_field(8, &id.key_id)
}

/// Encoded size of an `Observation`.
pub fn observation_size(observation: &Observation) -> usize {
    observation
        .id
        .as_ref()
        .map_or(0, |id| repeated_element(1, id_size(id)))
        + message_field(2, observation.observations.as_ref())
        + string_field(3, &observation.overridden_encoder_name)
        + message_field(4, observation.overridden_encoder_config.as_ref())
}

/// Encoded size of a `Report`.
pub fn report_size(report: &Report) -> usize {
    report
        .id
        .as_ref()
        .map_or(0, |id| repeated_element(1, id_size(id)))
        + message_field(2, report.outcome.as_ref())
        + string_field(3, &report.overridden_encoder_name)
        + message_field(4, report.overridden_encoder_config.as_ref())
}

/// Encoded size of a `Query` holding `ids`.
pub fn query_size(ids: &[Id]) -> usize {
    ids.iter()
        .map(|id| repeated_element(QUERY_IDS_TAG, id_size(id)))
        .sum()
}

/// Encoded size of the `observations` field of an `Observations` message.
pub fn observations_size(observations: &[Observation]) -> usize {
    observations
        .iter()
        .map(|o| repeated_element(OBSERVATIONS_TAG, observation_size(o)))
        .sum()
}

/// Encoded size of the `current_reports` field of an `Outcome` message.
pub fn reports_size(reports: &[Report]) -> usize {
    reports
        .iter()
        .map(|r| repeated_element(CURRENT_REPORTS_TAG, report_size(r)))
        .sum()
}

/// Checks whether appending `id` to a query of `cached_size` bytes stays
/// within `limit`. Returns whether it fits and the cumulative size after
/// appending; `None` adds nothing.
pub fn check_query_size_limit(cached_size: usize, id: Option<&Id>, limit: usize) -> (bool, usize) {
    let added = id.map_or(0, |id| repeated_element(QUERY_IDS_TAG, id_size(id)));
    fits(cached_size, added, limit)
}

/// Same as [`check_query_size_limit`] for an observation appended to an
/// `Observations` message.
pub fn check_observation_size_limit(
    cached_size: usize,
    observation: Option<&Observation>,
    limit: usize,
) -> (bool, usize) {
    let added = observation.map_or(0, |o| repeated_element(OBSERVATIONS_TAG, observation_size(o)));
    fits(cached_size, added, limit)
}

/// Same as [`check_query_size_limit`] for a report appended to an
/// `Outcome`'s current reports.
pub fn check_report_size_limit(
    cached_size: usize,
    report: Option<&Report>,
    limit: usize,
) -> (bool, usize) {
    let added = report.map_or(0, |r| repeated_element(CURRENT_REPORTS_TAG, report_size(r)));
    fits(cached_size, added, limit)
}

fn fits(cached_size: usize, added: usize, limit: usize) -> (bool, usize) {
    let total = cached_size + added;
    (total <= limit, total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::{
        AggregationOutcome, List, Map, Observations, Outcome, Query, Timestamp, Value,
    };

    fn full_id(n: usize) -> Id {
        Id {
            workflow_execution_id: format!("exec-{n:04}"),
            workflow_id: format!("wf-{n}"),
            workflow_owner: "0xowner".into(),
            workflow_name: "price-feed".into(),
            workflow_don_id: 1 + n as u32,
            workflow_don_config_version: 300,
            report_id: "0001".into(),
            key_id: "evm".into(),
        }
    }

    fn observation(n: usize) -> Observation {
        Observation {
            id: Some(full_id(n)),
            observations: Some(List::new(vec![
                Value::string("x".repeat(n * 40)),
                Value::int64(-(n as i64)),
            ])),
            overridden_encoder_name: if n % 2 == 0 { "evm".into() } else { String::new() },
            overridden_encoder_config: (n % 3 == 0).then(|| Map::new().with("abi", "uint256")),
        }
    }

    fn report(n: usize) -> Report {
        Report {
            id: Some(full_id(n)),
            outcome: Some(AggregationOutcome {
                encodable_outcome: Some(Map::new().with("Reports", Value::bytes(vec![7u8; n]))),
                metadata: vec![1; n % 5],
                should_report: n % 2 == 1,
                last_seen_at: n as u64 * 1000,
                timestamp: Some(Timestamp {
                    seconds: 1_700_000_000,
                    nanos: 5,
                }),
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_id_size_matches_encoding() {
        for id in [Id::default(), Id::new("a", ""), full_id(0), full_id(300)] {
            assert_eq!(id_size(&id), id.encoded_len());
        }
    }

    #[test]
    fn test_query_size_matches_encoding() {
        let ids: Vec<Id> = (0..50).map(full_id).collect();
        for n in [0, 1, 7, 50] {
            let query = Query {
                ids: ids[..n].to_vec(),
            };
            assert_eq!(query_size(&query.ids), query.encode_to_vec().len());
        }
    }

    #[test]
    fn test_observations_size_matches_encoding() {
        let obs: Vec<Observation> = (0..12).map(observation).collect();
        let msg = Observations {
            observations: obs.clone(),
            ..Default::default()
        };
        assert_eq!(observations_size(&obs), msg.encode_to_vec().len());
    }

    #[test]
    fn test_reports_size_matches_encoding() {
        let reports: Vec<Report> = (0..9).map(report).collect();
        let msg = Outcome {
            current_reports: reports.clone(),
            ..Default::default()
        };
        assert_eq!(reports_size(&reports), msg.encode_to_vec().len());
    }

    #[test]
    fn test_default_element_costs_two_bytes() {
        assert_eq!(query_size(&[Id::default()]), 2);
        assert_eq!(observations_size(&[Observation::default()]), 2);
        assert_eq!(reports_size(&[Report::default()]), 2);
    }

    #[test]
    fn test_none_does_not_change_cumulative_size() {
        assert_eq!(check_query_size_limit(40, None, 100), (true, 40));
        assert_eq!(check_observation_size_limit(40, None, 10), (false, 40));
        assert_eq!(check_report_size_limit(0, None, 0), (true, 0));
    }

    #[test]
    fn test_incremental_checks_agree_with_full_encoding() {
        let mut query = Query::default();
        let mut cached = 0;
        for n in 0..30 {
            let id = full_id(n);
            let (ok, size) = check_query_size_limit(cached, Some(&id), usize::MAX);
            assert!(ok);
            query.ids.push(id);
            cached = size;
            assert_eq!(cached, query.encoded_len());
        }

        let mut msg = Observations {
            registered_workflow_ids: vec!["wf-1".into(), "wf-2".into()],
            timestamp: Some(Timestamp::default()),
            ..Default::default()
        };
        let mut cached = msg.encoded_len();
        for n in 0..10 {
            let o = observation(n);
            let (_, size) = check_observation_size_limit(cached, Some(&o), usize::MAX);
            msg.observations.push(o);
            cached = size;
            assert_eq!(cached, msg.encoded_len());
        }

        let mut outcome = Outcome::default();
        outcome.outcomes.insert("wf-1".into(), AggregationOutcome::default());
        let mut cached = outcome.encoded_len();
        for n in 0..10 {
            let r = report(n);
            let (_, size) = check_report_size_limit(cached, Some(&r), usize::MAX);
            outcome.current_reports.push(r);
            cached = size;
            assert_eq!(cached, outcome.encoded_len());
        }
    }

    #[test]
    fn test_check_reports_overflow() {
        let id = full_id(1);
        let element = query_size(std::slice::from_ref(&id));
        assert_eq!(check_query_size_limit(0, Some(&id), element), (true, element));
        assert_eq!(
            check_query_size_limit(1, Some(&id), element),
            (false, element + 1)
        );
    }
}
