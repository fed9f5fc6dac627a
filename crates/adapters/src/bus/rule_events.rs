use domain::common::error::DomainError;
use domain::rules::entity::RuleEvaluationResult;
use ports::secondary::event_sink::RuleEventSink;

/// Rule-evaluation event sink that records to the structured log.
///
/// Evaluation events are high-volume and observational; matched events are
/// the interesting signal and log at info.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogRuleEventSink;

impl LogRuleEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl RuleEventSink for LogRuleEventSink {
    fn publish_rule_evaluated(&self, result: &RuleEvaluationResult) -> Result<(), DomainError> {
        tracing::debug!(
            rule_id = %result.rule_id,
            rule_name = %result.rule_name,
            matched = result.matched,
            "rule evaluated"
        );
        Ok(())
    }

    fn publish_rule_matched(&self, result: &RuleEvaluationResult) -> Result<(), DomainError> {
        tracing::info!(
            rule_id = %result.rule_id,
            rule_name = %result.rule_name,
            actions = result.actions.len(),
            "rule matched"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::common::entity::RuleId;
    use std::collections::HashMap;
    use std::time::UNIX_EPOCH;

    #[test]
    fn publishing_never_fails() {
        let sink = LogRuleEventSink::new();
        let result = RuleEvaluationResult {
            rule_id: RuleId("r1".to_string()),
            rule_name: "rule".to_string(),
            matched: true,
            actions: Vec::new(),
            metadata: HashMap::new(),
            evaluated_at: UNIX_EPOCH,
        };
        assert!(sink.publish_rule_evaluated(&result).is_ok());
        assert!(sink.publish_rule_matched(&result).is_ok());
    }
}
