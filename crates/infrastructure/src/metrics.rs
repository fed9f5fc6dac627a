use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::encoding::text::encode;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::registry::Registry;

use ports::secondary::metrics_port::{AdmissionMetrics, EventMetrics, RuleMetrics};

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
struct DecisionLabels {
    resource: String,
    outcome: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
struct ReasonLabels {
    reason: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
struct ComponentLabels {
    component: String,
}

/// Prometheus registry for the admission service.
pub struct ServiceMetrics {
    registry: Registry,
    decisions: Family<DecisionLabels, Counter>,
    events_published: Counter,
    events_dropped: Family<ReasonLabels, Counter>,
    rules_loaded: Family<ComponentLabels, Gauge>,
}

impl ServiceMetrics {
    pub fn new() -> Self {
        let mut registry = Registry::with_prefix("admission");

        let decisions = Family::<DecisionLabels, Counter>::default();
        registry.register(
            "decisions",
            "Admission decisions by resource and outcome",
            decisions.clone(),
        );

        let events_published = Counter::default();
        registry.register(
            "events_published",
            "Events delivered to bus subscribers",
            events_published.clone(),
        );

        let events_dropped = Family::<ReasonLabels, Counter>::default();
        registry.register(
            "events_dropped",
            "Events dropped by the bus, by reason",
            events_dropped.clone(),
        );

        let rules_loaded = Family::<ComponentLabels, Gauge>::default();
        registry.register(
            "rules_loaded",
            "Rules currently loaded, by component",
            rules_loaded.clone(),
        );

        Self {
            registry,
            decisions,
            events_published,
            events_dropped,
            rules_loaded,
        }
    }

    /// Render the registry in the Prometheus text exposition format.
    pub fn render(&self) -> String {
        let mut output = String::new();
        if encode(&mut output, &self.registry).is_err() {
            output.clear();
        }
        output
    }
}

impl Default for ServiceMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl AdmissionMetrics for ServiceMetrics {
    fn record_decision(&self, resource: &str, outcome: &str) {
        self.decisions
            .get_or_create(&DecisionLabels {
                resource: resource.to_string(),
                outcome: outcome.to_string(),
            })
            .inc();
    }
}

impl RuleMetrics for ServiceMetrics {
    fn set_rules_loaded(&self, component: &str, count: u64) {
        self.rules_loaded
            .get_or_create(&ComponentLabels {
                component: component.to_string(),
            })
            .set(count as i64);
    }
}

impl EventMetrics for ServiceMetrics {
    fn record_event_published(&self) {
        self.events_published.inc();
    }

    fn record_event_dropped(&self, reason: &str) {
        self.events_dropped
            .get_or_create(&ReasonLabels {
                reason: reason.to_string(),
            })
            .inc();
    }
}
