pub mod loader;
pub mod model;

pub use loader::load;
pub use model::{AlertConfig, AppConfig, AuthConfig, BotConfig, DataConfig};
