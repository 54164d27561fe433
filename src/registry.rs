//! Request-scoped metric registry.
//!
//! Every probe builds its own [`ProbeRegistry`], fills it with the probe
//! outcome indicator and, on success, every sample the engine returned, then
//! renders it once into an [`Exposition`]. Nothing here is shared between
//! requests.

use axum::{
    http::{header::CONTENT_TYPE, StatusCode},
    response::{IntoResponse, Response},
};
use prometheus::{core::Collector, Counter, Encoder, Gauge, Opts, Registry, TextEncoder};
use std::collections::HashMap;
use thiserror::Error;

use crate::engine::{MetricSample, QueryError, SampleKind};

/// Name of the probe outcome indicator.
pub const PROBE_SUCCESS_METRIC: &str = "weblogic_probe_success";

const PROBE_SUCCESS_HELP: &str = "Displays whether or not the probe was a success";

/// Buffer capacity for exposition encoding.
const BUFFER_CAP: usize = 16 * 1024;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("metric '{0}' is already registered in this probe")]
    Duplicate(String),

    #[error("invalid metric '{name}': {source}")]
    InvalidMetric {
        name: String,
        source: prometheus::Error,
    },

    #[error("counter '{0}' has a negative value")]
    NegativeCounter(String),

    #[error("failed to encode probe metrics: {0}")]
    Encoding(String),
}

/// A value going into the registry.
#[derive(Debug, Clone)]
pub enum ExposedMetric {
    /// The fixed indicator: 1 for success, 0 for failure.
    ProbeOutcome(bool),
    /// A sample forwarded unchanged from the query engine.
    Forwarded(MetricSample),
}

/// Ephemeral registry owned by a single probe request.
pub struct ProbeRegistry {
    registry: Registry,
    registered: usize,
}

impl Default for ProbeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ProbeRegistry {
    pub fn new() -> Self {
        Self {
            registry: Registry::new(),
            registered: 0,
        }
    }

    /// Builds the registry for an engine result: the indicator, plus the
    /// samples when the query succeeded.
    pub fn for_result(
        result: &Result<Vec<MetricSample>, QueryError>,
    ) -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        match result {
            Ok(samples) => {
                registry.register(ExposedMetric::ProbeOutcome(true))?;
                for sample in samples {
                    registry.register(ExposedMetric::Forwarded(sample.clone()))?;
                }
            }
            Err(_) => registry.register(ExposedMetric::ProbeOutcome(false))?,
        }
        Ok(registry)
    }

    /// Registers one metric. Registering the same metric twice fails.
    pub fn register(&mut self, metric: ExposedMetric) -> Result<(), RegistryError> {
        let (name, collector) = match metric {
            ExposedMetric::ProbeOutcome(success) => {
                let gauge = Gauge::new(PROBE_SUCCESS_METRIC, PROBE_SUCCESS_HELP).map_err(
                    |source| RegistryError::InvalidMetric {
                        name: PROBE_SUCCESS_METRIC.to_string(),
                        source,
                    },
                )?;
                gauge.set(if success { 1.0 } else { 0.0 });
                let boxed: Box<dyn Collector> = Box::new(gauge);
                (PROBE_SUCCESS_METRIC.to_string(), boxed)
            }
            ExposedMetric::Forwarded(sample) => {
                let collector = sample_collector(&sample)?;
                (sample.name, collector)
            }
        };

        match self.registry.register(collector) {
            Ok(()) => {
                self.registered += 1;
                Ok(())
            }
            Err(prometheus::Error::AlreadyReg) => Err(RegistryError::Duplicate(name)),
            Err(source) => Err(RegistryError::InvalidMetric { name, source }),
        }
    }

    /// Number of metrics registered so far.
    pub fn len(&self) -> usize {
        self.registered
    }

    pub fn is_empty(&self) -> bool {
        self.registered == 0
    }

    /// Renders the registry in the Prometheus text format.
    pub fn render(self) -> Result<Exposition, RegistryError> {
        let families = self.registry.gather();
        let encoder = TextEncoder::new();
        let mut buffer = Vec::with_capacity(BUFFER_CAP);

        encoder
            .encode(&families, &mut buffer)
            .map_err(|e| RegistryError::Encoding(e.to_string()))?;
        let body = String::from_utf8(buffer).map_err(|e| RegistryError::Encoding(e.to_string()))?;

        Ok(Exposition {
            content_type: encoder.format_type().to_string(),
            body,
        })
    }
}

/// Turns a forwarded sample into a single-series collector carrying its labels.
fn sample_collector(sample: &MetricSample) -> Result<Box<dyn Collector>, RegistryError> {
    let invalid = |source| RegistryError::InvalidMetric {
        name: sample.name.clone(),
        source,
    };

    let help = if sample.help.is_empty() {
        sample.name.clone()
    } else {
        sample.help.clone()
    };
    let labels: HashMap<String, String> = sample
        .labels
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    let opts = Opts::new(sample.name.clone(), help).const_labels(labels);

    match sample.kind {
        SampleKind::Gauge => {
            let gauge = Gauge::with_opts(opts).map_err(invalid)?;
            gauge.set(sample.value);
            Ok(Box::new(gauge))
        }
        SampleKind::Counter => {
            if sample.value < 0.0 {
                return Err(RegistryError::NegativeCounter(sample.name.clone()));
            }
            let counter = Counter::with_opts(opts).map_err(invalid)?;
            counter.inc_by(sample.value);
            Ok(Box::new(counter))
        }
    }
}

/// Immutable rendered document, written as the full response body.
#[derive(Debug, Clone, PartialEq)]
pub struct Exposition {
    content_type: String,
    body: String,
}

impl Exposition {
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    /// Value of the unlabelled series `name`, if present.
    pub fn value_of(&self, name: &str) -> Option<f64> {
        self.body.lines().find_map(|line| {
            let rest = line.strip_prefix(name)?.strip_prefix(' ')?;
            rest.trim().parse().ok()
        })
    }

    /// Outcome indicator value: `Some(1.0)` or `Some(0.0)`.
    pub fn probe_success(&self) -> Option<f64> {
        self.value_of(PROBE_SUCCESS_METRIC)
    }
}

impl IntoResponse for Exposition {
    fn into_response(self) -> Response {
        (
            StatusCode::OK,
            [(CONTENT_TYPE, self.content_type)],
            self.body,
        )
            .into_response()
    }
}
