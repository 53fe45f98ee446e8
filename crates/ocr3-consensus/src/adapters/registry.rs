//! In-memory capability registry
//!
//! Implements the `CapabilityRegistry` port: workflow registrations with
//! their aggregator and encoder, plus named encoder factories used for
//! per-request encoder overrides.

use crate::error::RegistryError;
use crate::ports::{Aggregator, CapabilityRegistry, Encoder, EncoderFactory};
use crate::wire::Map;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Clone)]
struct WorkflowEntry {
    aggregator: Arc<dyn Aggregator>,
    encoder: Arc<dyn Encoder>,
}

/// Registry of the workflows this node serves.
#[derive(Default)]
pub struct InMemoryCapabilityRegistry {
    workflows: RwLock<HashMap<String, WorkflowEntry>>,
    encoder_factories: RwLock<HashMap<String, Arc<dyn EncoderFactory>>>,
}

impl InMemoryCapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) a workflow's aggregator and encoder.
    pub fn register_workflow(
        &self,
        workflow_id: impl Into<String>,
        aggregator: Arc<dyn Aggregator>,
        encoder: Arc<dyn Encoder>,
    ) {
        let workflow_id = workflow_id.into();
        info!(workflow_id = %workflow_id, "Registering workflow");
        self.workflows.write().insert(
            workflow_id,
            WorkflowEntry {
                aggregator,
                encoder,
            },
        );
    }

    /// Makes an encoder available by name for overrides.
    pub fn register_encoder_factory(
        &self,
        name: impl Into<String>,
        factory: Arc<dyn EncoderFactory>,
    ) {
        self.encoder_factories.write().insert(name.into(), factory);
    }

    pub fn is_registered(&self, workflow_id: &str) -> bool {
        self.workflows.read().contains_key(workflow_id)
    }
}

impl CapabilityRegistry for InMemoryCapabilityRegistry {
    fn aggregator(&self, workflow_id: &str) -> Result<Arc<dyn Aggregator>, RegistryError> {
        self.workflows
            .read()
            .get(workflow_id)
            .map(|entry| Arc::clone(&entry.aggregator))
            .ok_or_else(|| RegistryError::AggregatorNotFound(workflow_id.to_string()))
    }

    fn encoder(&self, workflow_id: &str) -> Result<Arc<dyn Encoder>, RegistryError> {
        self.workflows
            .read()
            .get(workflow_id)
            .map(|entry| Arc::clone(&entry.encoder))
            .ok_or_else(|| RegistryError::EncoderNotFound(workflow_id.to_string()))
    }

    fn encoder_by_name(
        &self,
        name: &str,
        config: Option<&Map>,
    ) -> Result<Arc<dyn Encoder>, RegistryError> {
        let factory = self
            .encoder_factories
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::EncoderFactoryNotFound(name.to_string()))?;
        factory
            .build(config)
            .map_err(|source| RegistryError::EncoderBuild {
                name: name.to_string(),
                source,
            })
    }

    fn registered_workflow_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.workflows.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    fn unregister_workflow_id(&self, workflow_id: &str) {
        if self.workflows.write().remove(workflow_id).is_some() {
            debug!(workflow_id = %workflow_id, "Unregistered workflow");
        }
    }
}
