//! Task tracking: per-user to-do items with a finished flag.

pub mod errors;
pub mod manager;
pub mod models;

pub use errors::{TaskError, TaskResult};
pub use manager::TaskManager;
pub use models::{NewTask, Task, TaskId};
