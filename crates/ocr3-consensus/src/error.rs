//! Error types for the OCR3 consensus core

use thiserror::Error;

/// Request store errors.
///
/// These are returned synchronously to whoever called the store.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("request with id {0} already exists")]
    DuplicateId(String),

    #[error("batch size cannot be 0")]
    ZeroBatchSize,

    #[error("start index {start} out of bounds for store of length {len}")]
    StartOutOfBounds { start: usize, len: usize },
}

/// Request handler lifecycle errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HandlerError {
    #[error("request handler is closed")]
    Closed,

    #[error("request handler already started")]
    AlreadyStarted,
}

/// Application-level failure delivered to a caller inside a `Response`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResponseError {
    #[error("timeout exceeded: could not process request before expiry, workflowExecutionID {0}")]
    Timeout(String),

    #[error("request with workflowExecutionID {0} is already pending")]
    DuplicateRequest(String),

    #[error("{0}")]
    Failed(String),
}

/// Batch packing errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PackError {
    #[error("no suitable batch size found: {candidates} candidates, limit {limit} bytes")]
    NoSuitableBatchSize { candidates: usize, limit: usize },
}

/// Aggregation failures raised by an `Aggregator`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AggregationError {
    #[error("insufficient agreement: best candidate has {got} observers, need {required}")]
    InsufficientAgreement { got: usize, required: usize },

    #[error("aggregation failed: {0}")]
    Other(String),
}

/// Encoding failures raised by an `Encoder`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EncodeError {
    #[error("invalid encoder config: {0}")]
    InvalidConfig(String),

    #[error("encoding failed: {0}")]
    Failed(String),
}

/// Capability registry lookup failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("no aggregator registered for workflow {0}")]
    AggregatorNotFound(String),

    #[error("no encoder registered for workflow {0}")]
    EncoderNotFound(String),

    #[error("no encoder factory named {0}")]
    EncoderFactoryNotFound(String),

    #[error("failed to build encoder {name}: {source}")]
    EncoderBuild {
        name: String,
        #[source]
        source: EncodeError,
    },
}

/// Reasons a single report is skipped in the reports phase.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReportError {
    #[error("encoder lookup failed: {0}")]
    Registry(#[from] RegistryError),

    #[error("{0}")]
    Encode(#[from] EncodeError),

    #[error("report is {size} bytes, limit is {limit}")]
    TooLarge { size: usize, limit: usize },
}

/// Errors fatal to a protocol round.
#[derive(Debug, Error)]
pub enum PluginError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("could not decode {what}: {source}")]
    Decode {
        what: &'static str,
        #[source]
        source: prost::DecodeError,
    },

    #[error("packing error: {0}")]
    Pack(#[from] PackError),
}

/// Configuration errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("batch size must be greater than 0")]
    ZeroBatchSize,

    #[error("size limit {name} must be greater than 0")]
    ZeroSizeLimit { name: &'static str },

    #[error("sweep interval must be greater than 0")]
    ZeroSweepInterval,
}

pub type StoreResult<T> = Result<T, StoreError>;

pub type PluginResult<T> = Result<T, PluginError>;

impl PluginError {
    pub(crate) fn decode(what: &'static str) -> impl FnOnce(prost::DecodeError) -> Self {
        move |source| PluginError::Decode { what, source }
    }
}
