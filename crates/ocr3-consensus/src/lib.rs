//! # ocr3-consensus
//!
//! Aggregation core of an OCR3 consensus capability.
//!
//! ## Architecture
//!
//! Oracles agree round by round on values computed from data each of them
//! observed locally. An external BFT runtime drives the five-phase protocol
//! and calls into the [`ReportingPlugin`]:
//!
//! ```text
//! caller ──send_request──→ [RequestHandler] ──add──→ [RequestStore]
//!                                                        │ first_n / get_by_ids
//!                                                        ↓
//!          Query → Observation → Outcome → Reports → accept / transmit
//!                                   │
//!                      Aggregator (per workflow, via CapabilityRegistry)
//!
//! transmitter ──send_response──→ [RequestHandler] ──deliver──→ caller
//! ```
//!
//! ### Wire-Size Limits
//!
//! Every message the plugin emits is kept under the host's byte budgets:
//! exact protobuf size arithmetic pre-truncates each batch and a
//! binary-search packer verifies the result against the real encoding.
//!
//! ### Request Correlation
//!
//! The [`RequestHandler`] is a single tokio task that matches responses to
//! pending requests, times requests out, and caches responses that arrive
//! before their request.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ocr3_consensus::{
//!     InMemoryCapabilityRegistry, Ocr3Config, ReportingPluginConfig, ReportingPluginFactory,
//!     RequestHandler, RequestStore,
//! };
//!
//! let config = Ocr3Config::default();
//! let store = Arc::new(RequestStore::new());
//! let registry = Arc::new(InMemoryCapabilityRegistry::new());
//!
//! let handler = RequestHandler::new(Arc::clone(&store), &config);
//! handler.start()?;
//!
//! let factory = ReportingPluginFactory::new(store, registry, config)?;
//! let (plugin, info) = factory.new_reporting_plugin(ReportingPluginConfig::new(4, 1));
//! ```

pub mod adapters;
pub mod config;
pub mod domain;
pub mod error;
pub mod limits;
pub mod metrics;
pub mod plugin;
pub mod ports;
pub mod requests;
pub mod wire;

// Re-export main types
pub use adapters::{
    IdenticalAggregator, InMemoryCapabilityRegistry, ProtoMapEncoder, ProtoMapEncoderFactory,
};
pub use config::{Ocr3Config, SizeLimits};
pub use domain::{
    AttributedObservation, OracleId, OutcomeContext, Quorum, ReportMetadata, ReportWithInfo,
    ReportingPluginConfig, Request, Response,
};
pub use error::{
    AggregationError, ConfigError, EncodeError, HandlerError, PackError, PluginError,
    PluginResult, RegistryError, ReportError, ResponseError, StoreError, StoreResult,
};
pub use plugin::{OcrReportingPlugin, ReportingPluginFactory, ReportingPluginInfo};
pub use ports::{
    Aggregator, CapabilityRegistry, Encoder, EncoderFactory, ReportingPlugin, RequestSender,
    TimeSource,
};
pub use requests::{RequestHandler, RequestStore};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_matches_advertised_limits() {
        let config = Ocr3Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.limits, SizeLimits::default());
        assert_eq!(config.batch_size, 20);
    }
}
