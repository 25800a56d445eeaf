mod job;
pub use job::{JobAction, JobEvent};
