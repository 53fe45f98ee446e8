//! Pending requests and their responses

use crate::error::ResponseError;
use crate::wire::{Id, List, Map};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// One pending unit of consensus work.
///
/// The payload sits behind `Arc`, so cloning a request (which the store does
/// on every read) shares the value tree instead of copying it. Mutating a
/// clone goes through `Arc::make_mut` and never touches the stored original.
#[derive(Debug, Clone)]
pub struct Request {
    pub id: Id,
    pub observations: Arc<List>,
    pub overridden_encoder_name: Option<String>,
    pub overridden_encoder_config: Option<Arc<Map>>,
    pub expires_at: Instant,
}

impl Request {
    pub fn new(id: Id, observations: List, expires_at: Instant) -> Self {
        Self {
            id,
            observations: Arc::new(observations),
            overridden_encoder_name: None,
            overridden_encoder_config: None,
            expires_at,
        }
    }

    /// A request that expires `timeout` from now, usually
    /// `Ocr3Config::request_timeout()`.
    pub fn with_timeout(id: Id, observations: List, timeout: Duration) -> Self {
        Self::new(id, observations, Instant::now() + timeout)
    }

    /// Overrides the workflow's encoder for this request only.
    pub fn with_encoder_override(mut self, name: impl Into<String>, config: Option<Map>) -> Self {
        self.overridden_encoder_name = Some(name.into());
        self.overridden_encoder_config = config.map(Arc::new);
        self
    }

    pub fn workflow_execution_id(&self) -> &str {
        &self.id.workflow_execution_id
    }

}

/// Final answer for a request, delivered once on the caller's channel.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub workflow_execution_id: String,
    pub result: Result<Map, ResponseError>,
}

impl Response {
    pub fn ok(workflow_execution_id: impl Into<String>, value: Map) -> Self {
        Self {
            workflow_execution_id: workflow_execution_id.into(),
            result: Ok(value),
        }
    }

    pub fn err(workflow_execution_id: impl Into<String>, err: ResponseError) -> Self {
        Self {
            workflow_execution_id: workflow_execution_id.into(),
            result: Err(err),
        }
    }

    pub(crate) fn timeout(workflow_execution_id: &str) -> Self {
        Self::err(
            workflow_execution_id,
            ResponseError::Timeout(workflow_execution_id.to_string()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Ocr3Config;
    use crate::wire::Value;

    #[test]
    fn test_clone_shares_payload_until_mutated() {
        let req = Request::new(
            Id::new("exec-1", "wf-1"),
            List::new(vec![Value::string("a")]),
            Instant::now(),
        );
        let mut copy = req.clone();
        assert!(Arc::ptr_eq(&req.observations, &copy.observations));

        Arc::make_mut(&mut copy.observations)
            .fields
            .push(Value::string("b"));
        assert_eq!(req.observations.len(), 1);
        assert_eq!(copy.observations.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_timeout_uses_config_default() {
        let config = Ocr3Config::default();
        let before = Instant::now();
        let req = Request::with_timeout(Id::new("e", "w"), List::default(), config.request_timeout());
        assert_eq!(req.expires_at, before + Duration::from_secs(20 * 60));
    }

    #[test]
    fn test_timeout_response_message() {
        let resp = Response::timeout("exec-9");
        let err = resp.result.unwrap_err();
        assert!(err.to_string().contains("timeout exceeded"));
        assert!(err.to_string().contains("exec-9"));
    }
}
