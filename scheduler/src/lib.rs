pub mod engine;
pub mod retry;
pub mod types;

pub use engine::QueueScheduler;
pub use types::SchedulerConfig;
