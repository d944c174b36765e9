use anyhow::Result;
use async_trait::async_trait;
use vigil_types::ChatId;

/// 通知结果
#[derive(Debug, Clone)]
pub struct NotifyResult {
    pub success: bool,
    pub message: String,
}

impl NotifyResult {
    pub fn success() -> Self {
        Self {
            success: true,
            message: "Notification sent successfully".to_string(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// 通知器 trait
///
/// 引擎侧的投递出口：一条文本消息发给一个订阅者。
/// 投递失败不重试也不回写引擎状态（fire-and-forget）。
#[async_trait]
pub trait Notifier: Send + Sync {
    /// 发送通知
    async fn send(&self, chat_id: ChatId, text: &str) -> Result<NotifyResult>;

    /// 通知器名称
    fn name(&self) -> &str;

    /// 是否启用
    fn is_enabled(&self) -> bool {
        true
    }
}
