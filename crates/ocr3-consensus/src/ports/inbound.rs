//! Driving ports (Inbound API)

use crate::domain::{AttributedObservation, OutcomeContext, Quorum, ReportWithInfo, Request, Response};
use crate::error::{HandlerError, PluginResult};
use async_trait::async_trait;
use tokio::sync::oneshot;

/// The OCR3 reporting plugin contract, called by the host runtime once per
/// round in this order: `query`, `observation` (every oracle),
/// `validate_observation` (every received observation),
/// `observation_quorum`, `outcome`, `reports`, then the two report gates.
pub trait ReportingPlugin: Send + Sync {
    /// Leader only: propose the ids to work on this round.
    fn query(&self, ctx: &OutcomeContext) -> PluginResult<Vec<u8>>;

    /// Every oracle: report local data for the proposed ids.
    fn observation(&self, ctx: &OutcomeContext, query: &[u8]) -> PluginResult<Vec<u8>>;

    fn validate_observation(
        &self,
        ctx: &OutcomeContext,
        query: &[u8],
        observation: &AttributedObservation,
    ) -> PluginResult<()>;

    fn observation_quorum(&self, ctx: &OutcomeContext, query: &[u8]) -> PluginResult<Quorum>;

    /// Merge all observations into the next outcome. Must be deterministic.
    fn outcome(
        &self,
        ctx: &OutcomeContext,
        query: &[u8],
        observations: &[AttributedObservation],
    ) -> PluginResult<Vec<u8>>;

    fn reports(&self, seq_nr: u64, outcome: &[u8]) -> PluginResult<Vec<ReportWithInfo>>;

    fn should_accept_attested_report(
        &self,
        seq_nr: u64,
        report: &ReportWithInfo,
    ) -> PluginResult<bool>;

    fn should_transmit_accepted_report(
        &self,
        seq_nr: u64,
        report: &ReportWithInfo,
    ) -> PluginResult<bool>;

    fn close(&self) -> PluginResult<()>;
}

/// Entry point for the capability front door (requests) and the
/// transmitter (responses).
///
/// Both calls wait for the handler to accept the message; dropping the
/// returned future abandons the send.
#[async_trait]
pub trait RequestSender: Send + Sync {
    /// Submit a request; its single response is delivered on `callback`.
    async fn send_request(
        &self,
        request: Request,
        callback: oneshot::Sender<Response>,
    ) -> Result<(), HandlerError>;

    /// Submit the final response for an execution id.
    async fn send_response(&self, response: Response) -> Result<(), HandlerError>;
}
