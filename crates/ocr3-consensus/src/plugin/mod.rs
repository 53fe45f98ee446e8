//! OCR3 Reporting Plugin - the per-round state machine
//!
//! # Phases
//! - Query: leader proposes the oldest pending execution ids
//! - Observation: each oracle attaches its local payload for those ids
//! - Outcome: 2f+1 observers per id, per-workflow aggregation, pruning
//! - Reports: outcome entries become encoded report bodies
//!
//! Every phase is synchronous and must be deterministic given the same
//! inputs; maps are ordered so that oracles produce identical outcomes.

mod factory;

pub use factory::{
    ReportingPluginFactory, ReportingPluginInfo, ReportingPluginLimits, PLUGIN_NAME,
};

use crate::config::{Ocr3Config, SizeLimits};
use crate::domain::{
    append_metadata, AttributedObservation, OracleId, OutcomeContext, Quorum,
    ReportMetadata, ReportWithInfo, ReportingPluginConfig,
};
use crate::error::{PluginError, PluginResult, ReportError};
use crate::limits::{
    check_observation_size_limit, check_query_size_limit, check_report_size_limit,
    pack_to_size_limit, ObservationBatch, OutcomeBatch, Packable, QueryBatch,
};
use crate::metrics;
use crate::ports::{CapabilityRegistry, ReportingPlugin, SystemTimeSource, TimeSource};
use crate::requests::RequestStore;
use crate::wire::{
    AggregationOutcome, Id, Map, Observation, Observations, Outcome, Query, Report, ReportInfo,
    Timestamp, Value,
};
use prost::Message;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Encoder override as observed on one oracle's observation.
#[derive(Clone, Debug)]
struct EncoderOverride {
    name: String,
    config: Option<Map>,
}

impl EncoderOverride {
    /// Identity used when counting agreement: name plus encoded config.
    fn key(&self) -> (String, Vec<u8>) {
        let config = self
            .config
            .as_ref()
            .map(|config| config.encode_to_vec())
            .unwrap_or_default();
        (self.name.clone(), config)
    }
}

/// Everything gathered from one round's attributed observations.
#[derive(Default)]
struct RoundObservations {
    /// Execution id -> observer -> payload.
    payloads: HashMap<String, BTreeMap<OracleId, Vec<Value>>>,
    /// Execution id -> observer -> encoder override.
    overrides: HashMap<String, BTreeMap<OracleId, EncoderOverride>>,
    /// Workflow id -> number of distinct observers serving it.
    workflow_liveness: HashMap<String, usize>,
    timestamps: Vec<Timestamp>,
}

/// The reporting plugin.
///
/// Shares the request store with the request handler and looks up
/// aggregators and encoders through the capability registry.
pub struct OcrReportingPlugin<C: CapabilityRegistry> {
    store: Arc<RequestStore>,
    registry: Arc<C>,
    config: ReportingPluginConfig,
    batch_size: usize,
    outcome_pruning_threshold: u64,
    limits: SizeLimits,
    time_source: Arc<dyn TimeSource>,
}

impl<C: CapabilityRegistry> OcrReportingPlugin<C> {
    pub fn new(
        store: Arc<RequestStore>,
        registry: Arc<C>,
        config: ReportingPluginConfig,
        settings: &Ocr3Config,
    ) -> Self {
        Self {
            store,
            registry,
            config,
            batch_size: settings.batch_size,
            outcome_pruning_threshold: settings.outcome_pruning_threshold,
            limits: settings.limits.clone(),
            time_source: Arc::new(SystemTimeSource),
        }
    }

    /// Set custom time source (for testing)
    pub fn with_time_source(mut self, time_source: Arc<dyn TimeSource>) -> Self {
        self.time_source = time_source;
        self
    }

    pub fn config(&self) -> &ReportingPluginConfig {
        &self.config
    }

    fn collect_observations(&self, observations: &[AttributedObservation]) -> RoundObservations {
        let mut round = RoundObservations::default();

        for attributed in observations {
            let decoded = match Observations::decode(attributed.observation.as_slice()) {
                Ok(decoded) => decoded,
                Err(e) => {
                    warn!(observer = attributed.observer, error = %e, "Skipping undecodable observation");
                    continue;
                }
            };

            let registered: BTreeSet<&String> = decoded.registered_workflow_ids.iter().collect();
            for workflow_id in registered {
                *round
                    .workflow_liveness
                    .entry(workflow_id.clone())
                    .or_default() += 1;
            }

            if let Some(timestamp) = decoded.timestamp {
                round.timestamps.push(timestamp);
            }

            for observation in decoded.observations {
                let Some(id) = observation.id else {
                    debug!(observer = attributed.observer, "Observation without id");
                    continue;
                };
                let execution_id = id.workflow_execution_id;

                let payload = observation.observations.map(|l| l.fields).unwrap_or_default();
                round
                    .payloads
                    .entry(execution_id.clone())
                    .or_default()
                    .insert(attributed.observer, payload);

                if !observation.overridden_encoder_name.is_empty() {
                    round.overrides.entry(execution_id).or_default().insert(
                        attributed.observer,
                        EncoderOverride {
                            name: observation.overridden_encoder_name,
                            config: observation.overridden_encoder_config,
                        },
                    );
                }
            }
        }

        round
    }

    /// The override that at least f+1 observers sent for an execution id.
    fn agreed_override(
        &self,
        overrides: Option<&BTreeMap<OracleId, EncoderOverride>>,
    ) -> Option<EncoderOverride> {
        let mut counts: BTreeMap<(String, Vec<u8>), (usize, &EncoderOverride)> = BTreeMap::new();
        for encoder in overrides?.values() {
            counts.entry(encoder.key()).or_insert((0, encoder)).0 += 1;
        }

        let mut best: Option<(usize, &EncoderOverride)> = None;
        for &(count, encoder) in counts.values() {
            let better = best.map_or(true, |(c, _)| count > c);
            if self.config.reached(Quorum::FPlusOne, count) && better {
                best = Some((count, encoder));
            }
        }
        best.map(|(_, encoder)| encoder.clone())
    }

    fn prune(&self, outcome: &mut Outcome, liveness: &HashMap<String, usize>, seq_nr: u64) {
        let mut stale = Vec::new();

        for (workflow_id, aggregation) in outcome.outcomes.iter_mut() {
            let live = liveness.get(workflow_id).copied().unwrap_or(0);
            if self.config.reached(Quorum::FPlusOne, live) {
                aggregation.last_seen_at = seq_nr;
            } else if seq_nr.saturating_sub(aggregation.last_seen_at) > self.outcome_pruning_threshold {
                stale.push(workflow_id.clone());
            }
        }

        for workflow_id in stale {
            outcome.outcomes.remove(&workflow_id);
            self.registry.unregister_workflow_id(&workflow_id);
            metrics::record_outcome_pruned();
            info!(workflow_id = %workflow_id, seq_nr, "Pruned stale workflow outcome");
        }
    }

    /// Encodes the outcome, dropping trailing current reports that would
    /// exceed the outcome size limit.
    ///
    /// `priors[i]` is the workflow outcome that `current_reports[i]`
    /// replaced. A dropped report rolls its workflow back to that value, so
    /// stored state never runs ahead of the reports actually emitted.
    fn encode_outcome(&self, outcome: Outcome, priors: Vec<PriorOutcome>) -> Vec<u8> {
        let limit = self.limits.max_outcome_length_bytes;
        let mut batch = OutcomeBatch::from_outcome(outcome);
        let total = batch.current_reports.len();

        let mut kept = 0;
        let mut cached = batch.base_size();
        for report in &batch.current_reports {
            let (fits, size) = check_report_size_limit(cached, Some(report), limit);
            if !fits {
                break;
            }
            cached = size;
            kept += 1;
        }
        batch.current_reports.truncate(kept);

        if !batch.is_empty() {
            kept = match pack_to_size_limit(&batch, limit) {
                Ok(packed) => packed.batch.len(),
                Err(e) => {
                    warn!(error = %e, "Could not pack current reports, dropping all");
                    0
                }
            };
            batch.current_reports.truncate(kept);
        }

        if kept < total {
            warn!(kept, total, limit, "Outcome size limit reached, dropping reports");
            restore_priors(&mut batch.outcomes, priors.into_iter().skip(kept));
        }
        batch.encode()
    }

    fn encode_report(
        &self,
        report: &Report,
        id: &Id,
        aggregation: &AggregationOutcome,
    ) -> Result<Vec<u8>, ReportError> {
        let seconds = aggregation.timestamp.as_ref().map_or(0, |t| t.seconds);
        let metadata = ReportMetadata::for_report(id, u32::try_from(seconds).unwrap_or(0));
        let encodable = append_metadata(aggregation, &metadata);

        let encoder = if report.overridden_encoder_name.is_empty() {
            self.registry.encoder(&id.workflow_id)?
        } else {
            self.registry.encoder_by_name(
                &report.overridden_encoder_name,
                report.overridden_encoder_config.as_ref(),
            )?
        };

        let body = encoder.encode(&encodable)?;
        let limit = self.limits.max_report_length_bytes;
        if body.len() > limit {
            return Err(ReportError::TooLarge {
                size: body.len(),
                limit,
            });
        }
        Ok(body)
    }
}

/// A workflow id and the outcome it held before this round's aggregation.
type PriorOutcome = (String, Option<AggregationOutcome>);

/// Rolls workflows back to their pre-round outcomes, latest report first so
/// the earliest dropped report decides the final value. Workflows pruned
/// this round stay pruned; restored entries keep this round's `last_seen_at`.
fn restore_priors(
    outcomes: &mut BTreeMap<String, AggregationOutcome>,
    dropped: impl DoubleEndedIterator<Item = PriorOutcome>,
) {
    for (workflow_id, prior) in dropped.rev() {
        let Some(current) = outcomes.get_mut(&workflow_id) else {
            continue;
        };
        match prior {
            Some(mut prior) => {
                prior.last_seen_at = current.last_seen_at;
                *current = prior;
            }
            None => {
                outcomes.remove(&workflow_id);
            }
        }
        debug!(workflow_id = %workflow_id, "Restored outcome of dropped report");
    }
}

/// Median of the observed timestamps. With an even count the two middle
/// values' seconds are averaged and nanos dropped.
pub fn median_timestamp(mut timestamps: Vec<Timestamp>) -> Option<Timestamp> {
    if timestamps.is_empty() {
        return None;
    }
    timestamps.sort_by_key(|t| (t.seconds, t.nanos));

    let mid = timestamps.len() / 2;
    if timestamps.len() % 2 == 1 {
        return Some(timestamps[mid].clone());
    }
    let (a, b) = (timestamps[mid - 1].seconds, timestamps[mid].seconds);
    // widened: peer timestamps are untrusted and may sit at the i64 bounds
    let seconds = i128::from(a) + (i128::from(b) - i128::from(a)) / 2;
    Some(Timestamp {
        seconds: i64::try_from(seconds).unwrap_or(a),
        nanos: 0,
    })
}

impl<C: CapabilityRegistry> ReportingPlugin for OcrReportingPlugin<C> {
    fn query(&self, ctx: &OutcomeContext) -> PluginResult<Vec<u8>> {
        let pending = self.store.first_n(self.batch_size)?;
        let limit = self.limits.max_query_length_bytes;

        let mut ids = Vec::with_capacity(pending.len());
        let mut cached = 0;
        for request in &pending {
            let (fits, size) = check_query_size_limit(cached, Some(&request.id), limit);
            if !fits {
                warn!(
                    included = ids.len(),
                    pending = pending.len(),
                    limit,
                    "Query size limit reached"
                );
                break;
            }
            cached = size;
            ids.push(request.id.clone());
        }

        if pending.is_empty() {
            debug!(seq_nr = ctx.seq_nr, "No pending requests, empty query");
            return Ok(Query::default().encode_to_vec());
        }

        let packed = pack_to_size_limit(&QueryBatch::new(ids), limit)?;
        debug!(
            seq_nr = ctx.seq_nr,
            count = packed.ids.len(),
            ids = ?packed.ids,
            "Built query"
        );
        Ok(packed.encoded)
    }

    fn observation(&self, ctx: &OutcomeContext, query: &[u8]) -> PluginResult<Vec<u8>> {
        let query = Query::decode(query).map_err(PluginError::decode("query"))?;
        let mut seen = HashSet::new();
        let execution_ids: Vec<&str> = query
            .ids
            .iter()
            .map(|id| id.workflow_execution_id.as_str())
            .filter(|id| seen.insert(*id))
            .collect();
        let requests = self.store.get_by_ids(&execution_ids);
        let matched = requests.len();
        let limit = self.limits.max_observation_length_bytes;

        let mut batch = ObservationBatch {
            observations: Vec::with_capacity(requests.len()),
            registered_workflow_ids: self.registry.registered_workflow_ids(),
            timestamp: Some(self.time_source.now()),
        };

        let mut cached = batch.base_size();
        for request in requests {
            let observation = Observation {
                id: Some(request.id.clone()),
                observations: Some(request.observations.as_ref().clone()),
                overridden_encoder_name: request.overridden_encoder_name.clone().unwrap_or_default(),
                overridden_encoder_config: request.overridden_encoder_config.as_deref().cloned(),
            };
            let (fits, size) = check_observation_size_limit(cached, Some(&observation), limit);
            if !fits {
                warn!(
                    included = batch.observations.len(),
                    limit, "Observation size limit reached"
                );
                break;
            }
            cached = size;
            batch.observations.push(observation);
        }

        debug!(
            seq_nr = ctx.seq_nr,
            queried = query.ids.len(),
            observed = batch.observations.len(),
            "Built observation"
        );

        if matched == 0 {
            return Ok(batch.into_message().encode_to_vec());
        }
        Ok(pack_to_size_limit(&batch, limit)?.encoded)
    }

    fn validate_observation(
        &self,
        _ctx: &OutcomeContext,
        _query: &[u8],
        _observation: &AttributedObservation,
    ) -> PluginResult<()> {
        Ok(())
    }

    fn observation_quorum(&self, _ctx: &OutcomeContext, _query: &[u8]) -> PluginResult<Quorum> {
        Ok(Quorum::TwoFPlusOne)
    }

    fn outcome(
        &self,
        ctx: &OutcomeContext,
        query: &[u8],
        observations: &[AttributedObservation],
    ) -> PluginResult<Vec<u8>> {
        let mut round = self.collect_observations(observations);
        let timestamp = median_timestamp(std::mem::take(&mut round.timestamps));

        let query = Query::decode(query).map_err(PluginError::decode("query"))?;
        let mut outcome = Outcome::decode(ctx.previous_outcome.as_slice())
            .map_err(PluginError::decode("previous outcome"))?;
        outcome.current_reports.clear();
        let mut priors: Vec<PriorOutcome> = Vec::new();

        for id in query.ids {
            let execution_id = id.workflow_execution_id.as_str();
            let Some(payloads) = round.payloads.remove(execution_id) else {
                debug!(execution_id, "No observations for queried id");
                continue;
            };
            if !self.config.reached(Quorum::TwoFPlusOne, payloads.len()) {
                debug!(
                    execution_id,
                    observers = payloads.len(),
                    required = self.config.byzantine_quorum(),
                    "Not enough observers"
                );
                continue;
            }

            let aggregator = match self.registry.aggregator(&id.workflow_id) {
                Ok(aggregator) => aggregator,
                Err(e) => {
                    warn!(execution_id, error = %e, "Skipping id");
                    continue;
                }
            };

            let previous = outcome.outcomes.get(&id.workflow_id);
            let mut aggregated = match aggregator.aggregate(previous, &payloads, self.config.f) {
                Ok(aggregated) => aggregated,
                Err(e) => {
                    debug!(execution_id, error = %e, "Aggregation produced no outcome");
                    continue;
                }
            };
            if let Some(previous) = previous {
                aggregated.last_seen_at = previous.last_seen_at;
            }
            aggregated.timestamp = timestamp.clone();

            let encoder = self.agreed_override(round.overrides.get(execution_id));
            debug!(
                execution_id,
                should_report = aggregated.should_report,
                encoder_override = encoder.as_ref().map(|e| e.name.as_str()),
                "Aggregated"
            );

            let workflow_id = id.workflow_id.clone();
            outcome.current_reports.push(Report {
                id: Some(id),
                outcome: Some(aggregated.clone()),
                overridden_encoder_name: encoder.as_ref().map(|e| e.name.clone()).unwrap_or_default(),
                overridden_encoder_config: encoder.and_then(|e| e.config),
            });
            let prior = outcome.outcomes.insert(workflow_id.clone(), aggregated);
            priors.push((workflow_id, prior));
        }

        self.prune(&mut outcome, &round.workflow_liveness, ctx.seq_nr);

        let reports = outcome.current_reports.len();
        let encoded = self.encode_outcome(outcome, priors);
        debug!(
            seq_nr = ctx.seq_nr,
            reports,
            outcome_hash = %hex::encode(Sha256::digest(&encoded)),
            "Built outcome"
        );
        Ok(encoded)
    }

    fn reports(&self, seq_nr: u64, outcome: &[u8]) -> PluginResult<Vec<ReportWithInfo>> {
        let outcome = Outcome::decode(outcome).map_err(PluginError::decode("outcome"))?;
        let mut reports = Vec::with_capacity(outcome.current_reports.len());

        for report in &outcome.current_reports {
            let (Some(id), Some(aggregation)) = (report.id.as_ref(), report.outcome.as_ref()) else {
                warn!(seq_nr, "Skipping report without id or outcome");
                continue;
            };

            let info = ReportInfo {
                id: Some(id.clone()),
                should_report: aggregation.should_report,
            }
            .encode_to_vec();

            let body = if aggregation.should_report {
                match self.encode_report(report, id, aggregation) {
                    Ok(body) => body,
                    Err(e) => {
                        error!(
                            seq_nr,
                            execution_id = %id.workflow_execution_id,
                            error = %e,
                            "Skipping report"
                        );
                        continue;
                    }
                }
            } else {
                Vec::new()
            };

            metrics::record_report(aggregation.should_report);
            reports.push(ReportWithInfo { report: body, info });
        }

        debug!(seq_nr, count = reports.len(), "Built reports");
        Ok(reports)
    }

    fn should_accept_attested_report(
        &self,
        _seq_nr: u64,
        _report: &ReportWithInfo,
    ) -> PluginResult<bool> {
        Ok(true)
    }

    fn should_transmit_accepted_report(
        &self,
        _seq_nr: u64,
        _report: &ReportWithInfo,
    ) -> PluginResult<bool> {
        Ok(true)
    }

    fn close(&self) -> PluginResult<()> {
        Ok(())
    }
}
