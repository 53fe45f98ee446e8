//! Types of the host OCR3 runtime contract

/// Index of an oracle within the DON.
pub type OracleId = u8;

/// Static parameters of the oracle network the plugin runs in.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReportingPluginConfig {
    /// Number of oracles.
    pub n: usize,
    /// Maximum number of faulty oracles tolerated.
    pub f: usize,
}

impl ReportingPluginConfig {
    pub fn new(n: usize, f: usize) -> Self {
        Self { n, f }
    }

    /// Observer count required before an execution id is aggregated (2f+1).
    pub fn byzantine_quorum(&self) -> usize {
        Quorum::TwoFPlusOne.threshold(self.f)
    }

    /// Observer count proving at least one honest oracle agrees (f+1).
    pub fn honest_threshold(&self) -> usize {
        Quorum::FPlusOne.threshold(self.f)
    }

    pub fn reached(&self, quorum: Quorum, count: usize) -> bool {
        quorum.reached(self.f, count)
    }
}

/// Per-round context handed to the plugin by the host.
#[derive(Clone, Debug, Default)]
pub struct OutcomeContext {
    pub seq_nr: u64,
    /// Encoded `Outcome` of the previous round, empty on the first round.
    pub previous_outcome: Vec<u8>,
}

/// An observation together with the oracle that sent it.
#[derive(Clone, Debug)]
pub struct AttributedObservation {
    pub observation: Vec<u8>,
    pub observer: OracleId,
}

/// A report body plus its encoded `ReportInfo` envelope.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReportWithInfo {
    pub report: Vec<u8>,
    pub info: Vec<u8>,
}

/// Observation quorum policies understood by the host runtime.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Quorum {
    /// At least 2f+1 observations.
    TwoFPlusOne,
    /// At least f+1 observations.
    FPlusOne,
}

impl Quorum {
    /// Number of observations this policy requires.
    pub fn threshold(self, f: usize) -> usize {
        match self {
            Quorum::TwoFPlusOne => 2 * f + 1,
            Quorum::FPlusOne => f + 1,
        }
    }

    pub fn reached(self, f: usize, count: usize) -> bool {
        count >= self.threshold(f)
    }
}
