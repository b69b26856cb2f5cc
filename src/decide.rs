//! Authorization Decision Service: resolves a session token, builds the
//! membership predicate and evaluates the caller's group expression into an
//! allow/deny decision. Response shaping is left to the HTTP layer.

use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::expr::{self, Membership, ParseError};
use crate::groups;
use crate::store::{SessionStore, StoreError};

#[derive(Debug, Error)]
pub enum DecisionError {
    #[error("group-expression header is required")]
    MissingExpression,
    #[error("invalid group expression: {0}")]
    InvalidExpression(#[from] ParseError),
    /// Store failure is never downgraded to anonymous: an infrastructure
    /// fault must not masquerade as an access decision.
    #[error(transparent)]
    StoreUnavailable(#[from] StoreError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub allowed: bool,
    /// Resolved user id; `None` when the request was anonymous.
    pub user_id: Option<String>,
}

/// Per-request orchestration over an injected session store. Stateless across
/// requests; sessions are immutable once written, so no locking is needed
/// here.
#[derive(Clone)]
pub struct DecisionService {
    sessions: Arc<dyn SessionStore>,
}

impl DecisionService {
    pub fn new(sessions: Arc<dyn SessionStore>) -> Self {
        Self { sessions }
    }

    /// Evaluate `expression` for the session identified by `token`. A missing
    /// or unknown token is the anonymous case; a missing expression and a
    /// store fault are errors.
    pub fn authorize(
        &self,
        token: Option<&str>,
        expression: Option<&str>,
    ) -> Result<Decision, DecisionError> {
        let Some(text) = expression else {
            return Err(DecisionError::MissingExpression);
        };

        let record = match token {
            Some(t) => self.sessions.get(t)?,
            None => None,
        };
        let (membership, user_id) = match record {
            Some(rec) => (
                Membership::logged_in(groups::decode(&rec.groups)),
                Some(rec.user_id),
            ),
            None => (Membership::anonymous(), None),
        };

        let ast = expr::parse(text)?;
        let allowed = expr::evaluate(&ast, &membership);
        debug!(expression = text, user_id = user_id.as_deref().unwrap_or(""), allowed, "decision");
        Ok(Decision { allowed, user_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionRecord;
    use crate::store::MemoryStore;
    use std::collections::HashSet;

    /// Store stub that models an unreachable backend.
    struct FailingStore;

    impl SessionStore for FailingStore {
        fn put(&self, _token: &str, _record: SessionRecord) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("connection refused".into()))
        }
        fn get(&self, _token: &str) -> Result<Option<SessionRecord>, StoreError> {
            Err(StoreError::Unavailable("connection refused".into()))
        }
    }

    fn service_with_session(token: &str, user_id: &str, group_names: &[&str]) -> DecisionService {
        let store = MemoryStore::new();
        let set: HashSet<String> = group_names.iter().map(|s| s.to_string()).collect();
        store
            .put(token, SessionRecord { user_id: user_id.into(), groups: groups::encode(&set) })
            .unwrap();
        DecisionService::new(Arc::new(store))
    }

    #[test]
    fn missing_expression_fails_before_touching_the_store() {
        let svc = DecisionService::new(Arc::new(FailingStore));
        assert!(matches!(
            svc.authorize(Some("tok"), None),
            Err(DecisionError::MissingExpression)
        ));
    }

    #[test]
    fn invalid_expression_is_rejected_unevaluated() {
        let svc = service_with_session("tok", "u1", &["g1"]);
        assert!(matches!(
            svc.authorize(Some("tok"), Some("g1 &&")),
            Err(DecisionError::InvalidExpression(_))
        ));
    }

    #[test]
    fn store_failure_surfaces_instead_of_anonymous() {
        let svc = DecisionService::new(Arc::new(FailingStore));
        assert!(matches!(
            svc.authorize(Some("tok"), Some("true")),
            Err(DecisionError::StoreUnavailable(_))
        ));
    }

    #[test]
    fn resolved_session_evaluates_against_its_groups() {
        let svc = service_with_session("tok", "u1", &["g1", "g2"]);
        let d = svc.authorize(Some("tok"), Some("g1 && g2")).unwrap();
        assert!(d.allowed);
        assert_eq!(d.user_id.as_deref(), Some("u1"));

        let d = svc.authorize(Some("tok"), Some("g1 && !g2")).unwrap();
        assert!(!d.allowed);
        assert_eq!(d.user_id.as_deref(), Some("u1"));

        let d = svc.authorize(Some("tok"), Some("logged")).unwrap();
        assert!(d.allowed);
    }

    #[test]
    fn no_token_is_anonymous() {
        let svc = service_with_session("tok", "u1", &["g1"]);
        let d = svc.authorize(None, Some("true")).unwrap();
        assert!(d.allowed);
        assert_eq!(d.user_id, None);

        assert!(!svc.authorize(None, Some("g1")).unwrap().allowed);
        assert!(!svc.authorize(None, Some("logged")).unwrap().allowed);
    }

    #[test]
    fn unknown_token_is_treated_like_no_token() {
        let svc = service_with_session("tok", "u1", &["g1"]);
        let d = svc.authorize(Some("someone-elses-token"), Some("g1")).unwrap();
        assert!(!d.allowed);
        assert_eq!(d.user_id, None);
    }

    #[test]
    fn corrupt_groups_field_degrades_to_no_memberships() {
        let store = MemoryStore::new();
        store
            .put("tok", SessionRecord { user_id: "u1".into(), groups: "not json".into() })
            .unwrap();
        let svc = DecisionService::new(Arc::new(store));
        // Still logged in, but with no real groups
        assert!(svc.authorize(Some("tok"), Some("logged")).unwrap().allowed);
        assert!(!svc.authorize(Some("tok"), Some("g1")).unwrap().allowed);
    }
}
