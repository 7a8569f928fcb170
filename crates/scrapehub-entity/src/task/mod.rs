//! Task entity: persisted record of a submitted extraction request.

pub mod model;
pub mod status;

pub use model::{Task, TaskStatusView};
pub use status::TaskStatus;
