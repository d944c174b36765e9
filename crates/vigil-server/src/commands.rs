use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tracing::{info, warn};
use vigil_alert::{SubscriberDirectory, ThresholdStore};
use vigil_auth::{LoginGate, LoginOutcome, LoginPrompt};
use vigil_types::{ChatId, MetricRange, ThresholdConfig};

/// 聊天命令路由
///
/// 所有校验错误（未认证、参数个数、非数字）都在这里变成
/// 用户可见的回复文本，不修改任何状态，也不会穿透到引擎。
/// 返回 None 表示不回复（未知命令、空消息）。
pub struct CommandRouter {
    gate: Arc<LoginGate>,
    directory: Arc<SubscriberDirectory>,
    store: Arc<ThresholdStore>,
    latest_batch: Arc<RwLock<Option<PathBuf>>>,
    reeval_tx: mpsc::Sender<PathBuf>,
}

impl CommandRouter {
    pub fn new(
        gate: Arc<LoginGate>,
        directory: Arc<SubscriberDirectory>,
        store: Arc<ThresholdStore>,
        latest_batch: Arc<RwLock<Option<PathBuf>>>,
        reeval_tx: mpsc::Sender<PathBuf>,
    ) -> Self {
        Self {
            gate,
            directory,
            store,
            latest_batch,
            reeval_tx,
        }
    }

    /// 处理一条入站消息，返回要回复的文本
    pub async fn handle(
        &self,
        chat_id: ChatId,
        username: Option<&str>,
        first_name: &str,
        text: &str,
        now: DateTime<Utc>,
    ) -> Option<String> {
        let text = text.trim();
        if let Some(rest) = text.strip_prefix('/') {
            let mut parts = rest.split_whitespace();
            let command = parts.next().unwrap_or("");
            let args: Vec<&str> = parts.collect();

            match command {
                "start" => Some(self.start(chat_id, username, first_name).await),
                "help" => Some(help_text()),
                "login" => Some(self.login(chat_id, username).await),
                "setrange" => Some(self.set_range(chat_id, now, &args).await),
                "setalert" => Some(self.set_alert(chat_id, now, &args).await),
                "current" => Some(self.current(chat_id, now).await),
                _ => None,
            }
        } else if text.is_empty() {
            None
        } else {
            // 非命令文本按验证码提交处理
            Some(self.verify_code(chat_id, username, text, now).await)
        }
    }

    async fn start(&self, chat_id: ChatId, username: Option<&str>, first_name: &str) -> String {
        info!(chat_id = %chat_id, username = ?username, "Subscriber started the bot");
        self.directory.touch(chat_id).await;

        if self.gate.is_whitelisted(username) {
            // 白名单会话不过期
            self.directory.mark_authenticated(chat_id, None).await;
            format!(
                "Welcome {}! You are whitelisted and have full access.",
                first_name
            )
        } else {
            format!("Welcome {}! Please use /login to authenticate.", first_name)
        }
    }

    async fn login(&self, chat_id: ChatId, username: Option<&str>) -> String {
        if self.gate.is_whitelisted(username) {
            return "You are already whitelisted!".to_string();
        }

        match self.gate.begin(chat_id).await {
            LoginPrompt::Exhausted => {
                "Too many failed attempts. Please try again later.".to_string()
            }
            LoginPrompt::AwaitCode => format!(
                "Please enter the login code. You have {} attempts.\n\
                 The code will expire in {} minutes after successful login.",
                self.gate.max_attempts(),
                self.gate.expiration_minutes()
            ),
        }
    }

    async fn verify_code(
        &self,
        chat_id: ChatId,
        username: Option<&str>,
        submitted: &str,
        now: DateTime<Utc>,
    ) -> String {
        if self.gate.is_whitelisted(username) {
            return "You are already whitelisted!".to_string();
        }

        match self.gate.verify(chat_id, submitted, now).await {
            LoginOutcome::NotStarted => "Please use /login first.".to_string(),
            LoginOutcome::Accepted { expires_at } => {
                self.directory
                    .mark_authenticated(chat_id, Some(expires_at))
                    .await;
                format!(
                    "Login successful! Your session will expire in {} minutes.",
                    self.gate.expiration_minutes()
                )
            }
            LoginOutcome::Rejected { remaining } if remaining > 0 => {
                format!("Invalid code. {} attempts remaining.", remaining)
            }
            LoginOutcome::Rejected { .. } | LoginOutcome::Exhausted => {
                "Too many failed attempts. Please try again later.".to_string()
            }
        }
    }

    async fn set_range(&self, chat_id: ChatId, now: DateTime<Utc>, args: &[&str]) -> String {
        if !self.directory.is_eligible(chat_id, now).await {
            warn!(chat_id = %chat_id, "Unauthorized /setrange");
            return "Please authenticate first using /login".to_string();
        }

        if args.len() != 6 {
            return "Please provide all threshold values in the format:\n\
                    /setrange temp_min temp_max hum_min hum_max light_min light_max\n\
                    Example: /setrange 15 30 0.3 0.9 1000 3000"
                .to_string();
        }

        let mut values = [0f64; 6];
        for (slot, raw) in values.iter_mut().zip(args) {
            match raw.parse::<f64>() {
                Ok(value) => *slot = value,
                Err(_) => return "Please provide valid numbers for all thresholds.".to_string(),
            }
        }

        let config = ThresholdConfig {
            temperature: MetricRange::new(values[0], values[1]),
            humidity: MetricRange::new(values[2], values[3]),
            light: MetricRange::new(values[4], values[5]),
        };
        self.store.set(chat_id, config).await;

        // 用最近一个批次立即重新评估
        let latest = self.latest_batch.read().await.clone();
        if let Some(path) = latest {
            info!(chat_id = %chat_id, "Re-evaluating latest batch after threshold update");
            if self.reeval_tx.send(path).await.is_err() {
                warn!("Dispatcher channel closed, skipping re-evaluation");
            }
        }

        "Thresholds updated successfully!".to_string()
    }

    async fn set_alert(&self, chat_id: ChatId, now: DateTime<Utc>, args: &[&str]) -> String {
        if !self.directory.is_eligible(chat_id, now).await {
            warn!(chat_id = %chat_id, "Unauthorized /setalert");
            return "Please authenticate first using /login".to_string();
        }

        if args.len() != 1 {
            return "Please provide alert frequency in minutes: /setalert <minutes>".to_string();
        }

        // 直接按 u32 解析：负数和超出 u32 的值都按无效数字拒绝，
        // 不会截断出 0 频率把限流整个关掉
        match args[0].parse::<u32>() {
            Ok(minutes) if minutes >= 1 => {
                self.store.set_frequency(chat_id, minutes).await;
                format!("Alert frequency set to {} minutes.", minutes)
            }
            Ok(_) => "Alert frequency must be at least 1 minute.".to_string(),
            Err(_) => "Please provide a valid number of minutes.".to_string(),
        }
    }

    async fn current(&self, chat_id: ChatId, now: DateTime<Utc>) -> String {
        if !self.directory.is_eligible(chat_id, now).await {
            warn!(chat_id = %chat_id, "Unauthorized /current");
            return "Please authenticate first using /login".to_string();
        }

        let thresholds = self.store.get(chat_id).await;
        let frequency = self.store.frequency(chat_id).await;

        format!(
            "Current Settings:\n\n\
             Temperature Range: {} - {}°C\n\
             Humidity Range: {} - {}\n\
             Light Range: {} - {}\n\
             Alert Frequency: Every {} minutes",
            thresholds.temperature.min,
            thresholds.temperature.max,
            thresholds.humidity.min,
            thresholds.humidity.max,
            thresholds.light.min,
            thresholds.light.max,
            frequency
        )
    }
}

fn help_text() -> String {
    "I am a sensor monitoring bot. I can:\n\
     - Monitor sensor data from CSV files\n\
     - Alert you when values are out of range\n\
     - Let you set custom thresholds\n\
     - Adjust alert frequency\n\n\
     Available commands:\n\
     • /start - Start the bot and check authentication\n\
     • /help - Show this help message\n\
     • /login - Start the login process\n\
     • /setrange temp_min temp_max hum_min hum_max light_min light_max - Set custom thresholds\n\
     \u{20}  Example: /setrange 15 30 0.3 0.9 1000 3000\n\
     • /setalert minutes - Set alert frequency in minutes\n\
     \u{20}  Example: /setalert 60\n\n\
     CSV File Format:\n\
     The bot expects CSV files with columns: Time, Temperature, Humidity, Light\n\
     Example:\n\
     Time,Temperature,Humidity,Light\n\
     2025-04-16 23:52:20,19.15,0.8,2008.95"
        .to_string()
}
