use anyhow::Context;
use scribe_config::ScribeConfig;

use crate::cli::GlobalFlags;

/// Load layered configuration, then apply `--db` and `--user`.
pub fn load_config(flags: &GlobalFlags) -> anyhow::Result<ScribeConfig> {
    let mut config = ScribeConfig::load_with_dotenv().context("failed to load configuration")?;
    apply_flag_overrides(&mut config, flags);
    config
        .validate()
        .context("invalid configuration after applying command-line flags")?;
    Ok(config)
}

fn apply_flag_overrides(config: &mut ScribeConfig, flags: &GlobalFlags) {
    if let Some(db) = &flags.db {
        config.database.path.clone_from(db);
    }
    if let Some(user) = &flags.user {
        config.audit.actor.clone_from(user);
    }
}
