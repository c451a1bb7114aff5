//! Audit attribution configuration.

use scribe_core::identity::{FixedActor, SYSTEM_ACTOR};
use serde::{Deserialize, Serialize};

fn default_system_actor() -> String {
    SYSTEM_ACTOR.to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuditConfig {
    /// User name recorded when no actor resolves.
    #[serde(default = "default_system_actor")]
    pub system_actor: String,

    /// Acting user for saves from this process. Empty means unresolved.
    #[serde(default)]
    pub actor: String,
}

impl AuditConfig {
    /// Actor provider for the configured user.
    #[must_use]
    pub fn actor_provider(&self) -> FixedActor {
        if self.actor.trim().is_empty() {
            FixedActor::anonymous()
        } else {
            FixedActor::named(self.actor.trim())
        }
    }
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            system_actor: default_system_actor(),
            actor: String::new(),
        }
    }
}
