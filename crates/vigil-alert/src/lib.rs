pub mod directory;
pub mod engine;
pub mod store;

pub use directory::{Session, SubscriberDirectory};
pub use engine::{check_thresholds, Alert, AlertEngine};
pub use store::ThresholdStore;
