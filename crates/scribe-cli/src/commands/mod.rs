pub mod dispatch;
pub mod employee;
pub mod log;
pub mod schema;
pub mod shared;
