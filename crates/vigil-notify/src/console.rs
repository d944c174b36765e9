use anyhow::Result;
use async_trait::async_trait;
use tracing::info;
use vigil_types::ChatId;

use crate::notifier::{Notifier, NotifyResult};

/// 控制台通知器
///
/// 不配置 bot token 时的干跑模式：告警只打到日志。
pub struct ConsoleNotifier;

#[async_trait]
impl Notifier for ConsoleNotifier {
    async fn send(&self, chat_id: ChatId, text: &str) -> Result<NotifyResult> {
        info!(chat_id = %chat_id, "ALERT:\n{}", text);
        Ok(NotifyResult::success())
    }

    fn name(&self) -> &str {
        "console"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_console_notifier_always_succeeds() {
        let notifier = ConsoleNotifier;
        let result = notifier.send(1, "⚠️ Temperature out of range!").await.unwrap();
        assert!(result.success);
        assert_eq!(notifier.name(), "console");
        assert!(notifier.is_enabled());
    }
}
