use std::sync::Arc;
use std::time::Duration;

use domain::common::entity::RuleId;
use domain::common::error::DomainError;
use domain::ratelimit::aggregate::{RateLimitAggregate, aggregate_id, window_bounds};
use domain::ratelimit::entity::{Algorithm, RateLimitRule};
use domain::ratelimit::event::{EventMeta, RateLimitEvent};
use ports::secondary::clock::Clock;
use ports::secondary::event_sink::EventSink;
use ports::secondary::event_store::EventStore;
use ports::secondary::rate_limit_rule_store::RateLimitRuleStore;
use uuid::Uuid;

/// The closed set of rate-limiter commands.
#[derive(Debug, Clone)]
pub enum Command {
    ApplyRateLimit {
        client_id: String,
        resource: String,
        ip_address: String,
        user_agent: String,
    },
    CreateRule {
        resource: String,
        limit: u32,
        window: Duration,
        algorithm: Algorithm,
    },
    UpdateRule {
        rule_id: RuleId,
        resource: String,
        limit: u32,
        window: Duration,
        algorithm: Algorithm,
    },
    ResetRateLimit {
        client_id: String,
        resource: String,
    },
}

/// What a successfully handled command produced.
#[derive(Debug, Clone)]
pub enum CommandOutcome {
    /// An event was appended to the aggregate's stream (and published).
    EventPersisted(RateLimitEvent),
    /// A rate-limit rule was stored or updated.
    RuleStored(RateLimitRule),
}

/// Write-side handler: rehydrates aggregates, decides, appends, publishes.
pub struct CommandHandler {
    event_store: Arc<dyn EventStore>,
    rules: Arc<dyn RateLimitRuleStore>,
    sink: Arc<dyn EventSink>,
    clock: Arc<dyn Clock>,
}

impl CommandHandler {
    pub fn new(
        event_store: Arc<dyn EventStore>,
        rules: Arc<dyn RateLimitRuleStore>,
        sink: Arc<dyn EventSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            event_store,
            rules,
            sink,
            clock,
        }
    }

    pub fn handle(&self, command: Command) -> Result<CommandOutcome, DomainError> {
        match command {
            Command::ApplyRateLimit {
                client_id,
                resource,
                ..
            } => self.apply_rate_limit(&client_id, &resource),
            Command::CreateRule {
                resource,
                limit,
                window,
                algorithm,
            } => self.create_rule(&resource, limit, window, algorithm),
            Command::UpdateRule {
                rule_id,
                resource,
                limit,
                window,
                algorithm,
            } => self.update_rule(&rule_id, &resource, limit, window, algorithm),
            Command::ResetRateLimit {
                client_id,
                resource,
            } => self.reset_rate_limit(&client_id, &resource),
        }
    }

    /// Admit or refuse one request against the most restrictive rule for
    /// the resource. A concurrency conflict on the append is retried once
    /// against the refreshed stream before surfacing.
    fn apply_rate_limit(
        &self,
        client_id: &str,
        resource: &str,
    ) -> Result<CommandOutcome, DomainError> {
        let mut attempts_left = 2;
        loop {
            attempts_left -= 1;
            match self.apply_rate_limit_once(client_id, resource) {
                Err(err) if err.is_retryable() && attempts_left > 0 => {
                    tracing::debug!(
                        client_id,
                        resource,
                        error = %err,
                        "concurrency conflict applying rate limit, retrying"
                    );
                }
                other => return other,
            }
        }
    }

    fn apply_rate_limit_once(
        &self,
        client_id: &str,
        resource: &str,
    ) -> Result<CommandOutcome, DomainError> {
        let agg_id = aggregate_id(client_id, resource);
        let events = self.event_store.get_events(&agg_id)?;
        let aggregate = RateLimitAggregate::rehydrate(client_id, resource, &events);

        let rules = self.rules.get_by_resource(resource)?;
        let Some(rule) = most_restrictive(&rules) else {
            return Err(DomainError::NoRulesForResource(resource.to_string()));
        };

        let now = self.clock.now();
        let meta = EventMeta {
            id: format!("evt-{}", Uuid::new_v4()),
            aggregate_id: agg_id.clone(),
            version: aggregate.version + 1,
            timestamp: now,
        };

        let event = if aggregate.can_make_request(rule, now) {
            let (window_start, window_end) = window_bounds(now, rule.window);
            // A rolled-over window restarts the counter.
            let prior = if now > aggregate.state.window_end
                || window_start != aggregate.state.window_start
            {
                0
            } else {
                aggregate.state.request_count
            };
            let request_count = prior + 1;
            RateLimitEvent::RateLimitApplied {
                meta,
                client_id: client_id.to_string(),
                resource: resource.to_string(),
                window_start,
                window_end,
                request_count,
                limit: rule.limit,
                remaining_quota: rule.limit.saturating_sub(request_count),
            }
        } else {
            // Refused requests do not advance the counter.
            RateLimitEvent::RateLimitExceeded {
                meta,
                client_id: client_id.to_string(),
                resource: resource.to_string(),
                request_count: aggregate.state.request_count,
                limit: rule.limit,
                window_start: aggregate.state.window_start,
                window_end: aggregate.state.window_end,
                blocked_until: aggregate.state.window_end,
            }
        };

        self.event_store
            .save_events(&agg_id, std::slice::from_ref(&event), aggregate.version)?;
        self.publish(&event);
        Ok(CommandOutcome::EventPersisted(event))
    }

    fn create_rule(
        &self,
        resource: &str,
        limit: u32,
        window: Duration,
        algorithm: Algorithm,
    ) -> Result<CommandOutcome, DomainError> {
        let now = self.clock.now();
        let rule = RateLimitRule {
            id: RuleId(format!("rule-{}", Uuid::new_v4())),
            resource: resource.to_string(),
            limit,
            window,
            algorithm,
            created_at: now,
            updated_at: now,
        };
        rule.validate()?;
        self.rules.save(rule.clone())?;
        Ok(CommandOutcome::RuleStored(rule))
    }

    fn update_rule(
        &self,
        rule_id: &RuleId,
        resource: &str,
        limit: u32,
        window: Duration,
        algorithm: Algorithm,
    ) -> Result<CommandOutcome, DomainError> {
        let mut rule = self.rules.get_by_id(rule_id)?;
        rule.resource = resource.to_string();
        rule.limit = limit;
        rule.window = window;
        rule.algorithm = algorithm;
        rule.updated_at = self.clock.now();
        rule.validate()?;
        self.rules.update(rule.clone())?;
        Ok(CommandOutcome::RuleStored(rule))
    }

    /// Reset a counter out of band at the current wall time.
    fn reset_rate_limit(
        &self,
        client_id: &str,
        resource: &str,
    ) -> Result<CommandOutcome, DomainError> {
        let agg_id = aggregate_id(client_id, resource);
        let events = self.event_store.get_events(&agg_id)?;
        let version = events.len() as u64;
        let now = self.clock.now();

        let event = RateLimitEvent::RateLimitWindowReset {
            meta: EventMeta {
                id: format!("evt-{}", Uuid::new_v4()),
                aggregate_id: agg_id.clone(),
                version: version + 1,
                timestamp: now,
            },
            client_id: client_id.to_string(),
            resource: resource.to_string(),
            window_start: now,
        };

        self.event_store
            .save_events(&agg_id, std::slice::from_ref(&event), version)?;
        self.publish(&event);
        Ok(CommandOutcome::EventPersisted(event))
    }

    fn publish(&self, event: &RateLimitEvent) {
        if let Err(err) = self.sink.publish(event) {
            tracing::warn!(
                event_id = %event.meta().id,
                event_type = event.event_type(),
                error = %err,
                "event publish failed"
            );
        }
    }
}

/// The rule minimizing admitted requests per second; the first such rule on
/// ties, so store order stays the deterministic tie-break.
fn most_restrictive(rules: &[RateLimitRule]) -> Option<&RateLimitRule> {
    let mut best: Option<&RateLimitRule> = None;
    for rule in rules {
        match best {
            Some(current) if rule.restrictiveness() >= current.restrictiveness() => {}
            _ => best = Some(rule),
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{InMemoryEvents, InMemoryRules, at, make_rule};
    use ports::test_utils::{ManualClock, NoopEventSink};
    use std::time::UNIX_EPOCH;

    fn handler(
        events: Arc<InMemoryEvents>,
        rules: Arc<InMemoryRules>,
        clock: Arc<ManualClock>,
    ) -> CommandHandler {
        CommandHandler::new(events, rules, Arc::new(NoopEventSink), clock)
    }

    fn setup(limit: u32, window_secs: u64) -> (Arc<InMemoryEvents>, Arc<ManualClock>, CommandHandler)
    {
        let events = Arc::new(InMemoryEvents::default());
        let rules = Arc::new(InMemoryRules::default());
        rules
            .save(make_rule("rl-api", "api", limit, window_secs))
            .unwrap();
        let clock = Arc::new(ManualClock::starting_at(at(600)));
        let h = handler(Arc::clone(&events), rules, Arc::clone(&clock));
        (events, clock, h)
    }

    fn apply(h: &CommandHandler) -> RateLimitEvent {
        match h
            .handle(Command::ApplyRateLimit {
                client_id: "u".to_string(),
                resource: "api".to_string(),
                ip_address: "1.2.3.4".to_string(),
                user_agent: "test".to_string(),
            })
            .unwrap()
        {
            CommandOutcome::EventPersisted(event) => event,
            other => panic!("expected event, got {other:?}"),
        }
    }

    // ── ApplyRateLimit ───────────────────────────────────────────────

    #[test]
    fn first_request_applies_with_count_one() {
        let (_, _, h) = setup(3, 300);
        let event = apply(&h);
        match event {
            RateLimitEvent::RateLimitApplied {
                request_count,
                remaining_quota,
                window_start,
                window_end,
                ..
            } => {
                assert_eq!(request_count, 1);
                assert_eq!(remaining_quota, 2);
                assert_eq!(window_start, at(600));
                assert_eq!(window_end, at(900));
            }
            other => panic!("expected Applied, got {other:?}"),
        }
    }

    #[test]
    fn counts_accumulate_within_window() {
        let (_, _, h) = setup(3, 300);
        for expected in 1..=3u32 {
            match apply(&h) {
                RateLimitEvent::RateLimitApplied {
                    request_count,
                    remaining_quota,
                    ..
                } => {
                    assert_eq!(request_count, expected);
                    assert_eq!(remaining_quota, 3 - expected);
                }
                other => panic!("expected Applied, got {other:?}"),
            }
        }
    }

    #[test]
    fn over_quota_emits_exceeded_without_advancing_count() {
        let (_, _, h) = setup(3, 300);
        for _ in 0..3 {
            apply(&h);
        }
        match apply(&h) {
            RateLimitEvent::RateLimitExceeded {
                request_count,
                blocked_until,
                ..
            } => {
                assert_eq!(request_count, 3);
                assert_eq!(blocked_until, at(900));
            }
            other => panic!("expected Exceeded, got {other:?}"),
        }
        // A second refusal still reports the same count.
        match apply(&h) {
            RateLimitEvent::RateLimitExceeded { request_count, .. } => {
                assert_eq!(request_count, 3)
            }
            other => panic!("expected Exceeded, got {other:?}"),
        }
    }

    #[test]
    fn window_rollover_restarts_count() {
        let (_, clock, h) = setup(3, 300);
        for _ in 0..3 {
            apply(&h);
        }
        clock.advance(Duration::from_secs(301));
        match apply(&h) {
            RateLimitEvent::RateLimitApplied {
                request_count,
                window_start,
                ..
            } => {
                assert_eq!(request_count, 1);
                assert_eq!(window_start, at(900));
            }
            other => panic!("expected Applied, got {other:?}"),
        }
    }

    #[test]
    fn versions_are_contiguous() {
        let (events, _, h) = setup(2, 300);
        for expected_version in 1..=4u64 {
            let event = apply(&h);
            assert_eq!(event.meta().version, expected_version);
        }
        assert_eq!(events.get_events("u:api").unwrap().len(), 4);
    }

    #[test]
    fn zero_limit_denies_every_request() {
        let (_, _, h) = setup(0, 300);
        assert!(apply(&h).is_denial());
        assert!(apply(&h).is_denial());
    }

    #[test]
    fn limit_one_allows_exactly_one_per_window() {
        let (_, clock, h) = setup(1, 300);
        assert!(!apply(&h).is_denial());
        assert!(apply(&h).is_denial());
        clock.advance(Duration::from_secs(301));
        assert!(!apply(&h).is_denial());
    }

    #[test]
    fn missing_rules_fail() {
        let events = Arc::new(InMemoryEvents::default());
        let rules = Arc::new(InMemoryRules::default());
        let clock = Arc::new(ManualClock::starting_at(at(600)));
        let h = handler(events, rules, clock);

        let result = h.handle(Command::ApplyRateLimit {
            client_id: "u".to_string(),
            resource: "ghost".to_string(),
            ip_address: String::new(),
            user_agent: String::new(),
        });
        assert_eq!(
            result.unwrap_err(),
            DomainError::NoRulesForResource("ghost".to_string())
        );
    }

    #[test]
    fn most_restrictive_rule_wins() {
        let events = Arc::new(InMemoryEvents::default());
        let rules = Arc::new(InMemoryRules::default());
        // 100 per minute is looser than 2 per minute.
        rules.save(make_rule("rl-loose", "api", 100, 60)).unwrap();
        rules.save(make_rule("rl-tight", "api", 2, 60)).unwrap();
        let clock = Arc::new(ManualClock::starting_at(at(600)));
        let h = handler(events, rules, clock);

        apply(&h);
        apply(&h);
        assert!(apply(&h).is_denial());
    }

    #[test]
    fn most_restrictive_prefers_first_on_tie() {
        let a = make_rule("a", "api", 10, 60);
        let b = make_rule("b", "api", 10, 60);
        let rules = vec![a.clone(), b];
        let chosen = most_restrictive(&rules).unwrap();
        assert_eq!(chosen.id, a.id);
    }

    // ── ResetRateLimit ───────────────────────────────────────────────

    #[test]
    fn reset_appends_window_reset_at_stream_head() {
        let (events, clock, h) = setup(3, 300);
        apply(&h);
        apply(&h);
        clock.advance(Duration::from_secs(10));

        let outcome = h
            .handle(Command::ResetRateLimit {
                client_id: "u".to_string(),
                resource: "api".to_string(),
            })
            .unwrap();
        match outcome {
            CommandOutcome::EventPersisted(RateLimitEvent::RateLimitWindowReset {
                meta,
                window_start,
                ..
            }) => {
                assert_eq!(meta.version, 3);
                assert_eq!(window_start, at(610));
            }
            other => panic!("expected WindowReset, got {other:?}"),
        }
        assert_eq!(events.get_events("u:api").unwrap().len(), 3);
    }

    #[test]
    fn reset_then_next_request_counts_from_one() {
        let (_, clock, h) = setup(3, 300);
        for _ in 0..4 {
            apply(&h);
        }
        clock.advance(Duration::from_secs(1));
        h.handle(Command::ResetRateLimit {
            client_id: "u".to_string(),
            resource: "api".to_string(),
        })
        .unwrap();
        clock.advance(Duration::from_secs(1));

        match apply(&h) {
            RateLimitEvent::RateLimitApplied {
                request_count,
                remaining_quota,
                ..
            } => {
                assert_eq!(request_count, 1);
                assert_eq!(remaining_quota, 2);
            }
            other => panic!("expected Applied, got {other:?}"),
        }
    }

    // ── Rule commands ────────────────────────────────────────────────

    #[test]
    fn create_rule_persists_with_generated_id() {
        let events = Arc::new(InMemoryEvents::default());
        let rules = Arc::new(InMemoryRules::default());
        let clock = Arc::new(ManualClock::starting_at(at(600)));
        let h = handler(events, Arc::clone(&rules), clock);

        let outcome = h
            .handle(Command::CreateRule {
                resource: "upload".to_string(),
                limit: 10,
                window: Duration::from_secs(3600),
                algorithm: Algorithm::SlidingWindow,
            })
            .unwrap();
        let CommandOutcome::RuleStored(rule) = outcome else {
            panic!("expected RuleStored");
        };
        assert!(rule.id.0.starts_with("rule-"));
        let loaded = rules.get_by_resource("upload").unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0], rule);
    }

    #[test]
    fn update_rule_requires_existing_id() {
        let events = Arc::new(InMemoryEvents::default());
        let rules = Arc::new(InMemoryRules::default());
        let clock = Arc::new(ManualClock::starting_at(at(600)));
        let h = handler(events, rules, clock);

        let result = h.handle(Command::UpdateRule {
            rule_id: RuleId("missing".to_string()),
            resource: "api".to_string(),
            limit: 10,
            window: Duration::from_secs(60),
            algorithm: Algorithm::FixedWindow,
        });
        assert!(matches!(result, Err(DomainError::NotFound(_))));
    }

    #[test]
    fn update_rule_replaces_fields() {
        let events = Arc::new(InMemoryEvents::default());
        let rules = Arc::new(InMemoryRules::default());
        rules.save(make_rule("rl-api", "api", 100, 60)).unwrap();
        let clock = Arc::new(ManualClock::starting_at(at(600)));
        let h = handler(events, Arc::clone(&rules), clock);

        h.handle(Command::UpdateRule {
            rule_id: RuleId("rl-api".to_string()),
            resource: "api".to_string(),
            limit: 50,
            window: Duration::from_secs(30),
            algorithm: Algorithm::FixedWindow,
        })
        .unwrap();

        let rule = rules.get_by_id(&RuleId("rl-api".to_string())).unwrap();
        assert_eq!(rule.limit, 50);
        assert_eq!(rule.window, Duration::from_secs(30));
        assert_eq!(rule.algorithm, Algorithm::FixedWindow);
        assert_eq!(rule.updated_at, at(600));
        assert_eq!(rule.created_at, UNIX_EPOCH);
    }

    // ── Optimistic concurrency retry ─────────────────────────────────

    #[test]
    fn conflict_is_retried_once_and_observes_prior_write() {
        let events = Arc::new(InMemoryEvents::default());
        let rules = Arc::new(InMemoryRules::default());
        rules.save(make_rule("rl-api", "api", 10, 60)).unwrap();
        let clock = Arc::new(ManualClock::starting_at(at(600)));

        // A store that lets a competing writer slip in before the first
        // append, forcing exactly one conflict.
        let racing = Arc::new(crate::test_support::ConflictOnce::new(
            Arc::clone(&events),
            |inner| {
                let competing = RateLimitEvent::RateLimitApplied {
                    meta: EventMeta {
                        id: "evt-racer".to_string(),
                        aggregate_id: "u:api".to_string(),
                        version: 1,
                        timestamp: at(600),
                    },
                    client_id: "u".to_string(),
                    resource: "api".to_string(),
                    window_start: at(600),
                    window_end: at(660),
                    request_count: 1,
                    limit: 10,
                    remaining_quota: 9,
                };
                inner
                    .save_events("u:api", std::slice::from_ref(&competing), 0)
                    .unwrap();
            },
        ));
        let h = CommandHandler::new(racing, rules, Arc::new(NoopEventSink), clock);

        let event = apply(&h);
        // The retry saw the racer's event and appended after it.
        assert_eq!(event.meta().version, 2);
        match event {
            RateLimitEvent::RateLimitApplied { request_count, .. } => {
                assert_eq!(request_count, 2)
            }
            other => panic!("expected Applied, got {other:?}"),
        }
        assert_eq!(events.get_events("u:api").unwrap().len(), 2);
    }
}
