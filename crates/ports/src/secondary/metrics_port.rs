// Focused sub-traits for recording metrics, grouped by concern.
//
// Default implementations are no-ops so test mocks only implement the
// sub-traits relevant to the service under test.

// ── Admission decision metrics ─────────────────────────────────────

pub trait AdmissionMetrics: Send + Sync {
    /// Record one admission decision with resource and outcome labels
    /// (`allowed`, `blocked_by_rule`, `rate_limited`).
    fn record_decision(&self, _resource: &str, _outcome: &str) {}
}

// ── Rule store metrics ─────────────────────────────────────────────

pub trait RuleMetrics: Send + Sync {
    /// Set the number of loaded rules for a component
    /// (`security`, `ratelimit`).
    fn set_rules_loaded(&self, _component: &str, _count: u64) {}
}

// ── Event pipeline metrics ─────────────────────────────────────────

pub trait EventMetrics: Send + Sync {
    /// Record an event delivered to a subscriber.
    fn record_event_published(&self) {}

    /// Record an event dropped with a reason label
    /// (`subscriber_full`, `subscriber_closed`).
    fn record_event_dropped(&self, _reason: &str) {}
}

// ── Composite super-trait ──────────────────────────────────────────

/// Unified metrics port composing all sub-traits. Services accept
/// `Arc<dyn MetricsPort>` for full access.
pub trait MetricsPort: AdmissionMetrics + RuleMetrics + EventMetrics {}

/// Blanket implementation: any type implementing all sub-traits is a
/// `MetricsPort`.
impl<T> MetricsPort for T where T: AdmissionMetrics + RuleMetrics + EventMetrics {}
