use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use vigil_types::ChatId;

use crate::notifier::{Notifier, NotifyResult};

const API_BASE: &str = "https://api.telegram.org";

/// getUpdates 返回的一条更新
#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
}

/// 入站消息（只保留用到的字段）
#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub chat: Chat,
    pub from: Option<User>,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: ChatId,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: Option<String>,
    pub first_name: String,
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

/// Bot API 客户端（长轮询 + sendMessage）
pub struct TelegramClient {
    base_url: String,
    client: reqwest::Client,
}

impl TelegramClient {
    pub fn new(token: &str) -> Self {
        Self::with_base_url(API_BASE, token)
    }

    /// 测试时可以指向本地模拟服务
    pub fn with_base_url(base: &str, token: &str) -> Self {
        Self {
            base_url: format!("{}/bot{}", base, token),
            client: reqwest::Client::new(),
        }
    }

    /// 长轮询获取新消息
    pub async fn get_updates(&self, offset: i64, timeout_secs: u64) -> Result<Vec<Update>> {
        let url = format!("{}/getUpdates", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("offset", offset.to_string()),
                ("timeout", timeout_secs.to_string()),
            ])
            .send()
            .await?;

        let body: ApiResponse<Vec<Update>> = response.json().await?;
        if body.ok {
            Ok(body.result.unwrap_or_default())
        } else {
            Err(anyhow!(
                "getUpdates failed: {}",
                body.description.unwrap_or_default()
            ))
        }
    }

    /// 发送一条文本消息
    pub async fn send_message(&self, chat_id: ChatId, text: &str) -> Result<()> {
        let url = format!("{}/sendMessage", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({ "chat_id": chat_id, "text": text }))
            .send()
            .await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(anyhow!(
                "sendMessage failed with status: {}",
                response.status()
            ))
        }
    }
}

/// 走 Bot API 的通知器
pub struct TelegramNotifier {
    client: Arc<TelegramClient>,
    enabled: bool,
}

impl TelegramNotifier {
    pub fn new(client: Arc<TelegramClient>) -> Self {
        Self {
            client,
            enabled: true,
        }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, chat_id: ChatId, text: &str) -> Result<NotifyResult> {
        match self.client.send_message(chat_id, text).await {
            Ok(()) => Ok(NotifyResult::success()),
            Err(e) => Ok(NotifyResult::failure(format!("Telegram send failed: {}", e))),
        }
    }

    fn name(&self) -> &str {
        "telegram"
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_deserialization() {
        let json = r#"{
            "update_id": 42,
            "message": {
                "chat": { "id": 1001 },
                "from": { "id": 7, "username": "alice", "first_name": "Alice" },
                "text": "/start"
            }
        }"#;

        let update: Update = serde_json::from_str(json).unwrap();
        assert_eq!(update.update_id, 42);
        let message = update.message.unwrap();
        assert_eq!(message.chat.id, 1001);
        assert_eq!(message.from.unwrap().username.as_deref(), Some("alice"));
        assert_eq!(message.text.as_deref(), Some("/start"));
    }

    #[test]
    fn test_update_without_message() {
        // 其他类型的更新（编辑、回调等）没有 message 字段
        let update: Update = serde_json::from_str(r#"{ "update_id": 43 }"#).unwrap();
        assert!(update.message.is_none());
    }

    #[test]
    fn test_api_error_body() {
        let json = r#"{ "ok": false, "description": "Unauthorized" }"#;
        let body: ApiResponse<Vec<Update>> = serde_json::from_str(json).unwrap();
        assert!(!body.ok);
        assert_eq!(body.description.as_deref(), Some("Unauthorized"));
    }
}
