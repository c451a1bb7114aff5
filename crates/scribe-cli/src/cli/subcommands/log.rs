use clap::Subcommand;

/// Transaction log commands.
#[derive(Clone, Debug, Subcommand)]
pub enum LogCommands {
    /// List audit rows, newest first.
    List {
        /// Audited table name.
        #[arg(long)]
        table: Option<String>,
        /// insert, update or delete.
        #[arg(long)]
        action: Option<String>,
        /// Primary key text as stored in `table_pk`.
        #[arg(long)]
        key: Option<String>,
        /// Acting user.
        #[arg(long = "by")]
        user_name: Option<String>,
    },
}
