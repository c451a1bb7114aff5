use anyhow::{Context, bail};
use scribe_core::entities::{EmployeeUpdate, NewEmployee};
use serde_json::json;

use crate::cli::GlobalFlags;
use crate::cli::subcommands::EmployeeCommands;
use crate::commands::shared::limit::effective_limit;
use crate::commands::shared::report::warn_degraded;
use crate::context::AppContext;
use crate::output::output;

/// Handle `scribe employee`.
pub async fn handle(
    action: &EmployeeCommands,
    ctx: &AppContext,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    match action {
        EmployeeCommands::Add {
            first_name,
            last_name,
            phone,
        } => {
            let mut new = NewEmployee::new(first_name.as_str(), last_name.as_str());
            new.phone_number.clone_from(phone);
            let (employee, report) = ctx
                .service
                .add_employee(&new)
                .await
                .context("failed to add employee")?;
            warn_degraded(&report, flags);
            output(&json!({ "employee": employee, "audit": report }), flags.format)
        }
        EmployeeCommands::Update {
            id,
            first_name,
            last_name,
            phone,
            clear_phone,
        } => {
            let update = build_update(
                first_name.as_deref(),
                last_name.as_deref(),
                phone.as_deref(),
                *clear_phone,
            );
            if update.is_empty() {
                bail!("nothing to update: pass --first-name, --last-name, --phone or --clear-phone");
            }
            let Some((employee, report)) = ctx
                .service
                .update_employee(*id, &update)
                .await
                .with_context(|| format!("failed to update employee {id}"))?
            else {
                bail!("employee {id} not found");
            };
            warn_degraded(&report, flags);
            output(&json!({ "employee": employee, "audit": report }), flags.format)
        }
        EmployeeCommands::Delete { id } => {
            let Some((employee, report)) = ctx
                .service
                .delete_employee(*id)
                .await
                .with_context(|| format!("failed to delete employee {id}"))?
            else {
                bail!("employee {id} not found");
            };
            warn_degraded(&report, flags);
            output(&json!({ "deleted": employee, "audit": report }), flags.format)
        }
        EmployeeCommands::Get { id } => {
            let Some(employee) = ctx.service.get_employee(*id).await? else {
                bail!("employee {id} not found");
            };
            output(&employee, flags.format)
        }
        EmployeeCommands::List => {
            let limit = effective_limit(flags.limit, ctx.config.general.default_limit);
            let employees = ctx.service.list_employees(limit).await?;
            output(&employees, flags.format)
        }
    }
}

fn build_update(
    first_name: Option<&str>,
    last_name: Option<&str>,
    phone: Option<&str>,
    clear_phone: bool,
) -> EmployeeUpdate {
    EmployeeUpdate {
        first_name: first_name.map(str::to_string),
        last_name: last_name.map(str::to_string),
        phone_number: if clear_phone {
            Some(None)
        } else {
            phone.map(|p| Some(p.to_string()))
        },
    }
}

#[cfg(test)]
mod tests {
    use super::build_update;
    use pretty_assertions::assert_eq;

    #[test]
    fn clear_phone_sets_null() {
        let update = build_update(None, None, None, true);
        assert_eq!(update.phone_number, Some(None));
    }

    #[test]
    fn phone_is_set_when_given() {
        let update = build_update(Some("Jon"), None, Some("555"), false);
        assert_eq!(update.first_name.as_deref(), Some("Jon"));
        assert_eq!(update.phone_number, Some(Some("555".into())));
    }

    #[test]
    fn no_flags_is_empty() {
        assert!(build_update(None, None, None, false).is_empty());
    }
}
