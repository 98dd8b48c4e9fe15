//! [`TopicAuthority`] implementations.

use crate::domain::{Identity, TopicPattern};
use crate::error::{EventAdminError, Result};
use crate::ports::{TopicAction, TopicAuthority};
use parking_lot::RwLock;

/// Grants everything. Used when no security is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAllAuthority;

impl TopicAuthority for AllowAllAuthority {
    fn is_authorized(&self, _identity: &Identity, _topic: &str, _action: TopicAction) -> bool {
        true
    }
}

#[derive(Debug, Clone)]
struct Grant {
    /// `None` grants to every identity.
    identity: Option<Identity>,
    pattern: TopicPattern,
    action: TopicAction,
}

/// Deny-by-default authority driven by explicit grants.
///
/// Answers are cached by the event admin, so grants should be in place
/// before the first event is published.
#[derive(Debug, Default)]
pub struct RuleBasedAuthority {
    grants: RwLock<Vec<Grant>>,
}

impl RuleBasedAuthority {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allows `identity` to perform `action` on topics matching `pattern`
    /// (`*`, `a/b/*` or a literal topic).
    ///
    /// # Errors
    /// - `InvalidTopic`: `pattern` is not a valid topic pattern
    pub fn grant(&self, identity: Identity, pattern: &str, action: TopicAction) -> Result<()> {
        self.push(Some(identity), pattern, action)
    }

    /// Like [`grant`](Self::grant), for every identity.
    pub fn grant_all(&self, pattern: &str, action: TopicAction) -> Result<()> {
        self.push(None, pattern, action)
    }

    fn push(&self, identity: Option<Identity>, pattern: &str, action: TopicAction) -> Result<()> {
        let parsed = TopicPattern::parse(pattern).ok_or_else(|| EventAdminError::InvalidTopic {
            topic: pattern.to_string(),
            reason: "not a topic pattern",
        })?;
        self.grants.write().push(Grant {
            identity,
            pattern: parsed,
            action,
        });
        Ok(())
    }
}

impl TopicAuthority for RuleBasedAuthority {
    fn is_authorized(&self, identity: &Identity, topic: &str, action: TopicAction) -> bool {
        self.grants.read().iter().any(|grant| {
            grant.action == action
                && grant.identity.as_ref().map_or(true, |granted| granted == identity)
                && grant.pattern.matches(topic)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deny_by_default() {
        let authority = RuleBasedAuthority::new();
        assert!(!authority.is_authorized(&Identity::system(), "x", TopicAction::Publish));
    }

    #[test]
    fn test_grants_are_scoped_by_identity_topic_and_action() {
        let authority = RuleBasedAuthority::new();
        authority
            .grant(Identity::new("billing"), "billing/*", TopicAction::Publish)
            .unwrap();
        authority.grant_all("billing/*", TopicAction::Subscribe).unwrap();

        let billing = Identity::new("billing");
        let other = Identity::new("other");
        assert!(authority.is_authorized(&billing, "billing/paid", TopicAction::Publish));
        assert!(!authority.is_authorized(&other, "billing/paid", TopicAction::Publish));
        assert!(!authority.is_authorized(&billing, "audit/paid", TopicAction::Publish));
        assert!(authority.is_authorized(&other, "billing/paid", TopicAction::Subscribe));
    }

    #[test]
    fn test_invalid_pattern_is_rejected() {
        let authority = RuleBasedAuthority::new();
        let err = authority
            .grant(Identity::system(), "a//b", TopicAction::Publish)
            .unwrap_err();
        assert_eq!(err.as_label(), "invalid_topic");
    }
}
