mod employee;
mod log;

pub use employee::EmployeeCommands;
pub use log::LogCommands;
