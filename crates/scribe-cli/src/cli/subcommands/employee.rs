use clap::Subcommand;

/// Employee commands.
#[derive(Clone, Debug, Subcommand)]
pub enum EmployeeCommands {
    /// Add an employee.
    Add {
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        #[arg(long)]
        phone: Option<String>,
    },
    /// Update an employee.
    Update {
        id: i64,
        #[arg(long)]
        first_name: Option<String>,
        #[arg(long)]
        last_name: Option<String>,
        #[arg(long, conflicts_with = "clear_phone")]
        phone: Option<String>,
        /// Remove the phone number.
        #[arg(long)]
        clear_phone: bool,
    },
    /// Delete an employee.
    Delete { id: i64 },
    /// Get an employee by id.
    Get { id: i64 },
    /// List employees.
    List,
}
