use crate::reading::SensorMetric;
use serde::{Deserialize, Serialize};

/// 单个指标的数值范围
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricRange {
    /// 下限
    pub min: f64,

    /// 上限
    pub max: f64,
}

impl MetricRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// 边界值视为范围内
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// 阈值配置：每个指标一个范围
///
/// 写入时整体替换，不做 min <= max 校验；倒置的区间会让
/// 所有值都被视为越界，这是沿用下来的已知输入校验缺口。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdConfig {
    /// 温度范围
    pub temperature: MetricRange,

    /// 湿度范围
    pub humidity: MetricRange,

    /// 光照范围
    pub light: MetricRange,
}

impl ThresholdConfig {
    /// 按指标取范围
    pub fn range(&self, metric: SensorMetric) -> MetricRange {
        match metric {
            SensorMetric::Temperature => self.temperature,
            SensorMetric::Humidity => self.humidity,
            SensorMetric::Light => self.light,
        }
    }
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            temperature: MetricRange::new(15.0, 30.0),
            humidity: MetricRange::new(0.3, 0.9),
            light: MetricRange::new(1000.0, 3000.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_is_boundary_inclusive() {
        let range = MetricRange::new(15.0, 30.0);
        assert!(range.contains(15.0));
        assert!(range.contains(30.0));
        assert!(range.contains(22.5));
        assert!(!range.contains(14.99));
        assert!(!range.contains(30.01));
    }

    #[test]
    fn test_default_thresholds() {
        let config = ThresholdConfig::default();
        assert_eq!(config.range(SensorMetric::Temperature).max, 30.0);
        assert_eq!(config.range(SensorMetric::Humidity).min, 0.3);
        assert_eq!(config.range(SensorMetric::Light).max, 3000.0);
    }

    #[test]
    fn test_inverted_range_rejects_everything() {
        // 不校验 min <= max：倒置区间导致所有值越界
        let range = MetricRange::new(30.0, 15.0);
        assert!(!range.contains(20.0));
        assert!(!range.contains(15.0));
    }

    #[test]
    fn test_config_serialization() {
        let config = ThresholdConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: ThresholdConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, back);
    }
}
