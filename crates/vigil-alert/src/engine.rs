use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::{debug, info};
use vigil_types::{ChatId, Reading, SensorMetric, ThresholdConfig};

use crate::directory::SubscriberDirectory;
use crate::store::ThresholdStore;

/// 一条待投递的告警
#[derive(Debug, Clone, PartialEq)]
pub struct Alert {
    pub subscriber: ChatId,
    pub message: String,
}

/// 阈值评估引擎
///
/// 对一个批次做范围检查，决定哪些订阅者收到什么消息，
/// 并按每个订阅者的最小告警间隔限流。除 last_alert_at 和
/// 懒惰过期外不修改任何状态，批次之间没有记忆：
/// 同一个越界值在后续批次中可以再次上报。
pub struct AlertEngine {
    thresholds: Arc<ThresholdStore>,
    directory: Arc<SubscriberDirectory>,
}

impl AlertEngine {
    pub fn new(thresholds: Arc<ThresholdStore>, directory: Arc<SubscriberDirectory>) -> Self {
        Self {
            thresholds,
            directory,
        }
    }

    /// 评估一个批次，返回通过限流的告警
    ///
    /// 可发送集合为空是正常结果，不是错误。被限流抑制的告警
    /// 直接丢弃，不排队也不延后，last_alert_at 保持不变。
    pub async fn evaluate(&self, batch: &[Reading], now: DateTime<Utc>) -> Vec<Alert> {
        let eligible = self.directory.list_eligible(now).await;
        if eligible.is_empty() {
            debug!("No eligible subscribers, skipping threshold checks");
            return Vec::new();
        }

        debug!(subscribers = eligible.len(), rows = batch.len(), "Evaluating batch");

        let mut alerts = Vec::new();
        for subscriber in eligible {
            let config = self.thresholds.get(subscriber).await;
            let lines = check_thresholds(batch, &config);
            if lines.is_empty() {
                debug!(chat_id = %subscriber, "No thresholds exceeded");
                continue;
            }

            let frequency = self.thresholds.frequency(subscriber).await;
            if !self.gate_open(subscriber, frequency, now).await {
                info!(chat_id = %subscriber, "Alert suppressed by rate gate");
                continue;
            }

            self.directory.record_alert(subscriber, now).await;
            alerts.push(Alert {
                subscriber,
                message: lines.join("\n"),
            });
        }

        alerts
    }

    /// 限流判断：从未告警过，或距上次告警已满一个频率间隔
    async fn gate_open(&self, subscriber: ChatId, frequency_minutes: u32, now: DateTime<Utc>) -> bool {
        match self.directory.last_alert_at(subscriber).await {
            None => true,
            Some(last) => now - last >= Duration::seconds(i64::from(frequency_minutes) * 60),
        }
    }
}

/// 扫描批次，为每个越界指标生成一行告警文本
///
/// 边界值视为范围内；缺失值（传感器错误）只跳过该指标的该行。
/// 每行列出批次中该指标的所有越界值，不只是第一个。
pub fn check_thresholds(batch: &[Reading], config: &ThresholdConfig) -> Vec<String> {
    let mut lines = Vec::new();

    for metric in SensorMetric::ALL {
        let range = config.range(metric);
        let out_of_range: Vec<f64> = batch
            .iter()
            .filter_map(|reading| reading.value(metric))
            .filter(|value| !range.contains(*value))
            .collect();

        if !out_of_range.is_empty() {
            let values = out_of_range
                .iter()
                .map(f64::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            lines.push(format!(
                "⚠️ {} out of range! Values: [{}]",
                metric.label(),
                values
            ));
        }
    }

    lines
}
