use anyhow::Context;
use scribe_core::entities::TransactionLog;
use scribe_core::enums::AuditAction;
use scribe_db::repos::TransactionLogFilter;

use crate::cli::GlobalFlags;
use crate::cli::subcommands::LogCommands;
use crate::commands::shared::limit::effective_limit;
use crate::context::AppContext;
use crate::output::output;

/// Handle `scribe log`.
pub async fn handle(action: &LogCommands, ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    match action {
        LogCommands::List {
            table,
            action,
            key,
            user_name,
        } => {
            let filter = TransactionLogFilter {
                table_name: table.clone(),
                action: parse_action(action.as_deref())?,
                table_pk: key.clone(),
                user_name: user_name.clone(),
                limit: Some(effective_limit(flags.limit, ctx.config.general.default_limit)),
            };
            let logs: Vec<TransactionLog> = ctx.service.query_transaction_logs(&filter).await?;
            output(&logs, flags.format)
        }
    }
}

fn parse_action(raw: Option<&str>) -> anyhow::Result<Option<AuditAction>> {
    raw.map(|value| {
        value
            .parse::<AuditAction>()
            .with_context(|| format!("invalid action '{value}'"))
    })
    .transpose()
}
