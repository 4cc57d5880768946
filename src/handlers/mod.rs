//! Component F: command handlers and read-only queries, each a unit of work
//! over Component H's repository contract.

pub mod commands;
pub mod error;
pub mod queries;
pub mod unit_of_work;

pub use commands::CommandHandlers;
pub use error::CommandError;
pub use queries::QueryHandlers;
pub use unit_of_work::UnitOfWork;
