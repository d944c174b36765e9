pub mod parser;
pub mod watcher;

pub use parser::{parse_batch, parse_str, BatchError};
pub use watcher::BatchWatcher;
