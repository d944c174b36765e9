use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;
use vigil_types::{ChatId, ThresholdConfig};

/// 阈值与告警频率存储（内存实现）
///
/// 每个订阅者可以覆盖默认配置，读取时未覆盖则回退到默认值。
/// 写入是整体替换，没有删除操作。不校验 min <= max。
pub struct ThresholdStore {
    default_thresholds: ThresholdConfig,
    default_frequency: u32,
    thresholds: Arc<RwLock<HashMap<ChatId, ThresholdConfig>>>,
    frequencies: Arc<RwLock<HashMap<ChatId, u32>>>,
}

impl ThresholdStore {
    pub fn new(default_thresholds: ThresholdConfig, default_frequency: u32) -> Self {
        Self {
            default_thresholds,
            default_frequency,
            thresholds: Arc::new(RwLock::new(HashMap::new())),
            frequencies: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// 取订阅者的阈值配置，未设置时返回默认值
    pub async fn get(&self, chat_id: ChatId) -> ThresholdConfig {
        let thresholds = self.thresholds.read().await;
        thresholds
            .get(&chat_id)
            .copied()
            .unwrap_or(self.default_thresholds)
    }

    /// 整体替换订阅者的阈值配置
    pub async fn set(&self, chat_id: ChatId, config: ThresholdConfig) {
        let mut thresholds = self.thresholds.write().await;
        thresholds.insert(chat_id, config);
        info!(chat_id = %chat_id, "Thresholds updated");
    }

    /// 取订阅者的告警频率（分钟），未设置时返回默认值
    pub async fn frequency(&self, chat_id: ChatId) -> u32 {
        let frequencies = self.frequencies.read().await;
        frequencies
            .get(&chat_id)
            .copied()
            .unwrap_or(self.default_frequency)
    }

    /// 设置订阅者的告警频率（调用方负责校验 minutes >= 1）
    pub async fn set_frequency(&self, chat_id: ChatId, minutes: u32) {
        let mut frequencies = self.frequencies.write().await;
        frequencies.insert(chat_id, minutes);
        info!(chat_id = %chat_id, minutes = %minutes, "Alert frequency updated");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_types::MetricRange;

    #[tokio::test]
    async fn test_get_falls_back_to_defaults() {
        let store = ThresholdStore::new(ThresholdConfig::default(), 60);

        let config = store.get(1).await;
        assert_eq!(config, ThresholdConfig::default());
        assert_eq!(store.frequency(1).await, 60);
    }

    #[tokio::test]
    async fn test_set_replaces_wholesale() {
        let store = ThresholdStore::new(ThresholdConfig::default(), 60);

        let custom = ThresholdConfig {
            temperature: MetricRange::new(18.0, 24.0),
            humidity: MetricRange::new(0.4, 0.6),
            light: MetricRange::new(800.0, 2500.0),
        };
        store.set(1, custom).await;

        assert_eq!(store.get(1).await, custom);
        // 其他订阅者不受影响
        assert_eq!(store.get(2).await, ThresholdConfig::default());
    }

    #[tokio::test]
    async fn test_frequency_per_subscriber() {
        let store = ThresholdStore::new(ThresholdConfig::default(), 60);

        store.set_frequency(1, 5).await;
        assert_eq!(store.frequency(1).await, 5);
        assert_eq!(store.frequency(2).await, 60);
    }
}
