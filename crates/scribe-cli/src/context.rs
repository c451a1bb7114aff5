use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use scribe_config::ScribeConfig;
use scribe_db::ScribeService;

/// Shared application resources initialized once at startup.
pub struct AppContext {
    pub service: ScribeService,
    pub config: ScribeConfig,
}

impl AppContext {
    /// Open the configured database and build the audited service over it.
    pub async fn init(config: ScribeConfig) -> anyhow::Result<Self> {
        if !config.database.is_memory() {
            ensure_parent_dir(Path::new(&config.database.path))?;
        }

        let actor = Arc::new(config.audit.actor_provider());
        let service = ScribeService::new_local(&config.database.path, actor)
            .await
            .with_context(|| format!("failed to open database at {}", config.database.path))?
            .with_system_actor(config.audit.system_actor.as_str());

        tracing::debug!(path = %config.database.path, "scribe database opened");
        Ok(Self { service, config })
    }
}

fn ensure_parent_dir(path: &Path) -> anyhow::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() && !parent.exists() => {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))
        }
        _ => Ok(()),
    }
}
