//! Builds reporting plugins for a given oracle network configuration.

use super::OcrReportingPlugin;
use crate::config::Ocr3Config;
use crate::domain::ReportingPluginConfig;
use crate::error::ConfigError;
use crate::ports::{CapabilityRegistry, SystemTimeSource, TimeSource};
use crate::requests::RequestStore;
use std::sync::Arc;
use tracing::info;

/// Name the plugin advertises to the host runtime.
pub const PLUGIN_NAME: &str = "OCR3 Capability Plugin";

/// Message size limits advertised to the host runtime.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReportingPluginLimits {
    pub max_query_length: usize,
    pub max_observation_length: usize,
    pub max_outcome_length: usize,
    pub max_report_length: usize,
    pub max_report_count: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReportingPluginInfo {
    pub name: String,
    pub limits: ReportingPluginLimits,
}

/// Creates one plugin per OCR instance, all sharing the same request store
/// and capability registry.
pub struct ReportingPluginFactory<C: CapabilityRegistry> {
    store: Arc<RequestStore>,
    registry: Arc<C>,
    config: Ocr3Config,
    time_source: Arc<dyn TimeSource>,
}

impl<C: CapabilityRegistry> ReportingPluginFactory<C> {
    /// # Errors
    ///
    /// Returns the first problem found by [`Ocr3Config::validate`].
    pub fn new(
        store: Arc<RequestStore>,
        registry: Arc<C>,
        config: Ocr3Config,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            store,
            registry,
            config,
            time_source: Arc::new(SystemTimeSource),
        })
    }

    pub fn with_time_source(mut self, time_source: Arc<dyn TimeSource>) -> Self {
        self.time_source = time_source;
        self
    }

    pub fn info(&self) -> ReportingPluginInfo {
        let limits = &self.config.limits;
        ReportingPluginInfo {
            name: PLUGIN_NAME.to_string(),
            limits: ReportingPluginLimits {
                max_query_length: limits.max_query_length_bytes,
                max_observation_length: limits.max_observation_length_bytes,
                max_outcome_length: limits.max_outcome_length_bytes,
                max_report_length: limits.max_report_length_bytes,
                max_report_count: self.config.batch_size,
            },
        }
    }

    pub fn new_reporting_plugin(
        &self,
        config: ReportingPluginConfig,
    ) -> (OcrReportingPlugin<C>, ReportingPluginInfo) {
        info!(n = config.n, f = config.f, "Creating reporting plugin");
        let plugin = OcrReportingPlugin::new(
            Arc::clone(&self.store),
            Arc::clone(&self.registry),
            config,
            &self.config,
        )
        .with_time_source(Arc::clone(&self.time_source));
        (plugin, self.info())
    }
}
