pub mod entities;
pub mod repositories;
pub mod value_objects;

pub use entities::*;
pub use repositories::*;
pub use syncsched_errors::{SchedulerError, SchedulerResult};
pub use value_objects::*;
