//! Driven ports (Outbound dependencies)
//!
//! Aggregators and encoders are looked up per workflow through the
//! capability registry; this crate never owns or locks them.

use crate::domain::OracleId;
use crate::error::{AggregationError, EncodeError, RegistryError};
use crate::wire::{AggregationOutcome, Map, Timestamp, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Per-workflow consensus logic.
pub trait Aggregator: Send + Sync {
    /// Fold this round's observations into a new outcome.
    ///
    /// `previous` is the workflow's outcome from earlier rounds, if any.
    /// Implementations leave `last_seen_at` at zero; the plugin carries it
    /// forward.
    fn aggregate(
        &self,
        previous: Option<&AggregationOutcome>,
        observations: &BTreeMap<OracleId, Vec<Value>>,
        f: usize,
    ) -> Result<AggregationOutcome, AggregationError>;
}

/// Turns an encodable outcome into report bytes.
pub trait Encoder: Send + Sync {
    fn encode(&self, input: &Map) -> Result<Vec<u8>, EncodeError>;
}

/// Builds encoders by name for per-request overrides.
pub trait EncoderFactory: Send + Sync {
    fn build(&self, config: Option<&Map>) -> Result<Arc<dyn Encoder>, EncodeError>;
}

/// The capability the plugin runs inside: owns workflow registrations.
pub trait CapabilityRegistry: Send + Sync {
    fn aggregator(&self, workflow_id: &str) -> Result<Arc<dyn Aggregator>, RegistryError>;

    fn encoder(&self, workflow_id: &str) -> Result<Arc<dyn Encoder>, RegistryError>;

    fn encoder_by_name(
        &self,
        name: &str,
        config: Option<&Map>,
    ) -> Result<Arc<dyn Encoder>, RegistryError>;

    /// Workflow ids this node currently serves.
    fn registered_workflow_ids(&self) -> Vec<String>;

    /// Called when a workflow's outcome is pruned.
    fn unregister_workflow_id(&self, workflow_id: &str);
}

/// Wall-clock source for observation timestamps.
pub trait TimeSource: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Default time source using system time
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> Timestamp {
        Timestamp::from(std::time::SystemTime::now())
    }
}
