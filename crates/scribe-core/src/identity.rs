//! Acting-user lookup for audit rows.
//!
//! The actor is an opaque collaborator: whatever sits in front of the save
//! (a CLI flag, a request context) implements [`ActorProvider`]. When no
//! actor resolves, rows are attributed to a fixed sentinel.

/// Sentinel user name for saves with no resolvable actor.
pub const SYSTEM_ACTOR: &str = "system";

/// Source of the current acting user.
pub trait ActorProvider: Send + Sync {
    fn current_actor(&self) -> Option<String>;
}

/// Actor fixed at construction time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FixedActor(pub Option<String>);

impl FixedActor {
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self(Some(name.into()))
    }

    #[must_use]
    pub const fn anonymous() -> Self {
        Self(None)
    }
}

impl ActorProvider for FixedActor {
    fn current_actor(&self) -> Option<String> {
        self.0.clone()
    }
}

/// Resolve the user name for an audit row. Blank names count as unresolved.
#[must_use]
pub fn resolve_actor(provider: &dyn ActorProvider, fallback: &str) -> String {
    provider
        .current_actor()
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| fallback.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_actor_wins() {
        assert_eq!(resolve_actor(&FixedActor::named("alice"), SYSTEM_ACTOR), "alice");
    }

    #[test]
    fn missing_actor_falls_back() {
        assert_eq!(resolve_actor(&FixedActor::anonymous(), SYSTEM_ACTOR), "system");
    }

    #[test]
    fn blank_actor_falls_back() {
        assert_eq!(resolve_actor(&FixedActor::named("  "), "batch"), "batch");
    }
}
