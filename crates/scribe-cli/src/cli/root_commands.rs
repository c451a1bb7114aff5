use clap::{Args, Subcommand};

use crate::cli::subcommands::{EmployeeCommands, LogCommands};

/// Top-level command tree.
#[derive(Clone, Debug, Subcommand)]
pub enum Commands {
    /// Employee records (every change is audited).
    Employee {
        #[command(subcommand)]
        action: EmployeeCommands,
    },
    /// Transaction log queries.
    Log {
        #[command(subcommand)]
        action: LogCommands,
    },
    /// Print the JSON Schema of an audit type, or list the available ones.
    Schema(SchemaArgs),
}

#[derive(Clone, Debug, Args)]
pub struct SchemaArgs {
    /// Schema name, e.g. `transaction_log`
    pub name: Option<String>,
}
