pub mod coordinator;
pub mod error;
pub mod planner;

pub use coordinator::MixCoordinator;
pub use error::MixError;
pub use planner::{DeliveryPlan, RecipientRequest};
