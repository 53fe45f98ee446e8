//! Adapters layer: in-process implementations of the outbound ports.

mod encoder;
mod identical;
mod registry;

pub use encoder::{ProtoMapEncoder, ProtoMapEncoderFactory, PREFIX_CONFIG_KEY};
pub use identical::{IdenticalAggregator, REPORTS_FIELD_NAME};
pub use registry::InMemoryCapabilityRegistry;
