//! Integration tests for TOML configuration loading.
//!
//! Uses figment::Jail for sandboxed files and env vars.

use figment::{
    Figment, Jail,
    providers::{Env, Format, Serialized, Toml},
};
use pretty_assertions::assert_eq;
use scribe_config::ScribeConfig;

#[test]
fn loads_sections_from_toml() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "config.toml",
            r#"
[database]
path = "audit.db"

[audit]
system_actor = "batch"
actor = "alice"

[general]
default_limit = 50
"#,
        )?;

        let config: ScribeConfig = Figment::from(Serialized::defaults(ScribeConfig::default()))
            .merge(Toml::file("config.toml"))
            .extract()?;

        assert_eq!(config.database.path, "audit.db");
        assert_eq!(config.audit.system_actor, "batch");
        assert_eq!(config.audit.actor, "alice");
        assert_eq!(config.general.default_limit, 50);
        Ok(())
    });
}

#[test]
fn partial_toml_keeps_defaults() {
    Jail::expect_with(|jail| {
        jail.create_file("config.toml", "[audit]\nactor = \"bob\"\n")?;

        let config: ScribeConfig = Figment::from(Serialized::defaults(ScribeConfig::default()))
            .merge(Toml::file("config.toml"))
            .extract()?;

        assert_eq!(config.audit.actor, "bob");
        assert_eq!(config.audit.system_actor, "system");
        assert_eq!(config.database.path, ".scribe/scribe.db");
        Ok(())
    });
}

#[test]
fn project_file_is_picked_up() {
    Jail::expect_with(|jail| {
        jail.create_dir(".scribe")?;
        jail.create_file(".scribe/config.toml", "[database]\npath = \":memory:\"\n")?;

        let config = ScribeConfig::load().expect("config loads");
        assert!(config.database.is_memory());
        Ok(())
    });
}

#[test]
fn env_beats_toml() {
    Jail::expect_with(|jail| {
        jail.create_file("config.toml", "[general]\ndefault_limit = 5\n")?;
        jail.set_env("SCRIBE_GENERAL__DEFAULT_LIMIT", "7");

        let config: ScribeConfig = Figment::from(Serialized::defaults(ScribeConfig::default()))
            .merge(Toml::file("config.toml"))
            .merge(Env::prefixed("SCRIBE_").split("__"))
            .extract()?;

        assert_eq!(config.general.default_limit, 7);
        Ok(())
    });
}
