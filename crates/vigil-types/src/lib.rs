pub mod reading;
pub mod threshold;

pub use reading::{Reading, SensorMetric};
pub use threshold::{MetricRange, ThresholdConfig};

/// 聊天会话标识（Telegram chat id）
pub type ChatId = i64;
