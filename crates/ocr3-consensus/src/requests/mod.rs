//! Request intake: the shared store and the handler actor that feeds it.

pub mod handler;
pub mod store;

pub use handler::RequestHandler;
pub use store::RequestStore;
