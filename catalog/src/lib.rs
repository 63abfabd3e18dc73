pub mod catalog;
pub mod types;

pub use catalog::PoolCatalog;
pub use types::Pool;
