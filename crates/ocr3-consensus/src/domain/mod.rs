//! Domain layer: requests, responses, report metadata and the host
//! runtime's round types.

mod metadata;
mod ocr;
mod request;

pub use metadata::*;
pub use ocr::*;
pub use request::*;
