use serde::{Deserialize, Serialize};

/// Longest accepted rule identifier, in bytes.
pub const MAX_RULE_ID_LEN: usize = 128;

/// Namespace prefix of rules installed by matched `rate_limit` actions.
const DYNAMIC_PREFIX: &str = "dyn-";

/// Identifier shared by security rules and rate-limit rules.
///
/// Operator-supplied ids are slug-like (`block-suspicious-agents`,
/// `rule-<uuid>`). Rules installed dynamically by the admission pipeline
/// live in the `dyn-<resource>` namespace, one per resource, so a repeated
/// install overwrites instead of accumulating.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RuleId(pub String);

impl RuleId {
    /// The id of the dynamic rate-limit rule for a resource.
    pub fn dynamic(resource: &str) -> Self {
        Self(format!("{DYNAMIC_PREFIX}{resource}"))
    }

    /// Whether this id lives in the dynamic-rule namespace.
    pub fn is_dynamic(&self) -> bool {
        self.0.starts_with(DYNAMIC_PREFIX)
    }

    /// Validate the id shape: non-empty, at most `MAX_RULE_ID_LEN` bytes,
    /// starting with an alphanumeric character, and limited to
    /// alphanumerics plus `-`, `_`, `.`, `:` and `/`. Resource names flow
    /// into dynamic ids, so path-like segments are accepted.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.0.is_empty() {
            return Err("rule ID must not be empty");
        }
        if self.0.len() > MAX_RULE_ID_LEN {
            return Err("rule ID is too long");
        }
        if !self.0.chars().next().is_some_and(char::is_alphanumeric) {
            return Err("rule ID must start with an alphanumeric character");
        }
        if !self
            .0
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.' | ':' | '/'))
        {
            return Err("rule ID contains unsupported characters");
        }
        Ok(())
    }
}

impl std::fmt::Display for RuleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
