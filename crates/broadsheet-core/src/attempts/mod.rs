//! Send attempts: one record per run of the send workflow.

mod model;
mod repository;

pub use model::{Attempt, AttemptId};
pub use repository::AttemptRepository;
