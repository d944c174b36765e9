use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tracing::{error, info};
use vigil_alert::{Alert, AlertEngine};
use vigil_ingest::parse_batch;
use vigil_notify::Notifier;

/// 批次分发器
///
/// 串行消费文件事件和 /setrange 触发的重评估请求：
/// 一次评估跑完才处理下一个触发，天然避免并发评估。
pub struct Dispatcher {
    engine: Arc<AlertEngine>,
    notifier: Arc<dyn Notifier>,
    latest_batch: Arc<RwLock<Option<PathBuf>>>,
}

impl Dispatcher {
    pub fn new(
        engine: Arc<AlertEngine>,
        notifier: Arc<dyn Notifier>,
        latest_batch: Arc<RwLock<Option<PathBuf>>>,
    ) -> Self {
        Self {
            engine,
            notifier,
            latest_batch,
        }
    }

    pub async fn run(self, mut rx: mpsc::Receiver<PathBuf>) {
        while let Some(path) = rx.recv().await {
            self.process(&path).await;
        }
    }

    /// 处理一个批次文件
    pub async fn process(&self, path: &Path) {
        let batch = match parse_batch(path) {
            Ok(batch) => batch,
            Err(e) => {
                // 畸形批次：中止本次评估，不通知任何人，无部分结果
                error!(path = ?path, error = %e, "Failed to parse batch");
                return;
            }
        };
        info!(path = ?path, rows = batch.len(), "Processing batch");

        *self.latest_batch.write().await = Some(path.to_path_buf());

        let alerts = self.engine.evaluate(&batch, Utc::now()).await;
        for alert in alerts {
            self.deliver(alert).await;
        }
    }

    /// 投递一条告警，失败只记日志（fire-and-forget）
    async fn deliver(&self, alert: Alert) {
        if !self.notifier.is_enabled() {
            return;
        }
        match self.notifier.send(alert.subscriber, &alert.message).await {
            Ok(result) if result.success => {
                info!(chat_id = %alert.subscriber, "Alert sent via {}", self.notifier.name());
            }
            Ok(result) => {
                error!(
                    chat_id = %alert.subscriber,
                    "Alert delivery failed via {}: {}",
                    self.notifier.name(),
                    result.message
                );
            }
            Err(e) => {
                error!(
                    chat_id = %alert.subscriber,
                    "Alert delivery error via {}: {}",
                    self.notifier.name(),
                    e
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use async_trait::async_trait;
    use tempfile::tempdir;
    use vigil_alert::{SubscriberDirectory, ThresholdStore};
    use vigil_notify::NotifyResult;
    use vigil_types::{ChatId, ThresholdConfig};

    /// 记录发送内容的测试通知器
    struct MemoryNotifier {
        sent: Arc<RwLock<Vec<(ChatId, String)>>>,
    }

    #[async_trait]
    impl Notifier for MemoryNotifier {
        async fn send(&self, chat_id: ChatId, text: &str) -> Result<NotifyResult> {
            self.sent.write().await.push((chat_id, text.to_string()));
            Ok(NotifyResult::success())
        }

        fn name(&self) -> &str {
            "memory"
        }
    }

    fn dispatcher() -> (Dispatcher, Arc<SubscriberDirectory>, Arc<RwLock<Vec<(ChatId, String)>>>) {
        let store = Arc::new(ThresholdStore::new(ThresholdConfig::default(), 60));
        let directory = Arc::new(SubscriberDirectory::new());
        let engine = Arc::new(AlertEngine::new(store, directory.clone()));
        let sent = Arc::new(RwLock::new(Vec::new()));
        let notifier = Arc::new(MemoryNotifier { sent: sent.clone() });
        let dispatcher = Dispatcher::new(engine, notifier, Arc::new(RwLock::new(None)));
        (dispatcher, directory, sent)
    }

    #[tokio::test]
    async fn test_out_of_range_batch_notifies_subscriber() {
        let (dispatcher, directory, sent) = dispatcher();
        directory.mark_authenticated(1, None).await;

        let dir = tempdir().unwrap();
        let path = dir.path().join("data.csv");
        std::fs::write(
            &path,
            "Time,Temperature,Humidity,Light\n2025-04-16 23:52:20,35,0.8,2000\n",
        )
        .unwrap();

        dispatcher.process(&path).await;

        let sent = sent.read().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, 1);
        assert_eq!(sent[0].1, "⚠️ Temperature out of range! Values: [35]");
        assert_eq!(dispatcher.latest_batch.read().await.as_deref(), Some(path.as_path()));
    }

    #[tokio::test]
    async fn test_malformed_batch_notifies_nobody() {
        let (dispatcher, directory, sent) = dispatcher();
        directory.mark_authenticated(1, None).await;

        let dir = tempdir().unwrap();
        let path = dir.path().join("data.csv");
        // 缺少 Humidity 列
        std::fs::write(&path, "Time,Temperature,Light\n2025-04-16 23:52:20,35,2000\n").unwrap();

        dispatcher.process(&path).await;

        assert!(sent.read().await.is_empty());
        // 畸形批次不会成为"最近批次"
        assert!(dispatcher.latest_batch.read().await.is_none());
    }

    #[tokio::test]
    async fn test_in_range_batch_sends_nothing() {
        let (dispatcher, directory, sent) = dispatcher();
        directory.mark_authenticated(1, None).await;

        let dir = tempdir().unwrap();
        let path = dir.path().join("data.csv");
        std::fs::write(
            &path,
            "Time,Temperature,Humidity,Light\n2025-04-16 23:52:20,22,0.5,2000\n",
        )
        .unwrap();

        dispatcher.process(&path).await;
        assert!(sent.read().await.is_empty());
    }
}
