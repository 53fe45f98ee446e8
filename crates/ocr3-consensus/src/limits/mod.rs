//! Wire-size limits: exact size arithmetic, batch shapes, and the packer
//! that keeps each round's messages under the host's byte budgets.

pub mod batch;
pub mod packer;
pub mod size;

pub use batch::{ObservationBatch, OutcomeBatch, QueryBatch};
pub use packer::{pack_to_size_limit, Packable, PackedBatch};
pub use size::{
    check_observation_size_limit, check_query_size_limit, check_report_size_limit, id_size,
    observation_size, observations_size, query_size, report_size, reports_size,
};
