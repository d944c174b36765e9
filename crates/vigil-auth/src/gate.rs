use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};
use vigil_types::ChatId;

/// /login 的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginPrompt {
    /// 可以提交验证码
    AwaitCode,

    /// 尝试次数已用尽
    Exhausted,
}

/// 验证码提交的结果
#[derive(Debug, Clone, PartialEq)]
pub enum LoginOutcome {
    /// 验证通过，会话在 expires_at 过期
    Accepted { expires_at: DateTime<Utc> },

    /// 验证码错误，还剩 remaining 次机会（0 表示这次用掉了最后一次）
    Rejected { remaining: u32 },

    /// 尝试次数已用尽，进程重启前拒绝后续提交
    Exhausted,

    /// 未先执行 /login
    NotStarted,
}

/// 登录门：白名单 + 一次性验证码 + 固定尝试次数上限
///
/// 白名单用户不走验证码流程。计数器只在验证成功时清零，
/// 没有自动冷却，用尽后保持拒绝直到进程重启。
pub struct LoginGate {
    whitelist: Vec<String>,
    code: String,
    expiration_minutes: i64,
    max_attempts: u32,
    attempts: Arc<RwLock<HashMap<ChatId, u32>>>,
}

impl LoginGate {
    pub fn new(
        whitelist: Vec<String>,
        code: impl Into<String>,
        expiration_minutes: i64,
        max_attempts: u32,
    ) -> Self {
        Self {
            whitelist,
            code: code.into(),
            expiration_minutes,
            max_attempts,
            attempts: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// 白名单检查，用户名前缀 @ 会被去掉
    pub fn is_whitelisted(&self, username: Option<&str>) -> bool {
        match username {
            Some(name) => {
                let name = name.trim_start_matches('@');
                !name.is_empty() && self.whitelist.iter().any(|w| w == name)
            }
            None => false,
        }
    }

    /// 会话有效期（分钟），用于提示文本
    pub fn expiration_minutes(&self) -> i64 {
        self.expiration_minutes
    }

    /// 最大尝试次数，用于提示文本
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// 开始登录流程，初始化该订阅者的计数器
    pub async fn begin(&self, chat_id: ChatId) -> LoginPrompt {
        let mut attempts = self.attempts.write().await;
        let count = attempts.entry(chat_id).or_insert(0);

        if *count >= self.max_attempts {
            warn!(chat_id = %chat_id, "Login attempts exhausted");
            LoginPrompt::Exhausted
        } else {
            info!(chat_id = %chat_id, "Login code requested");
            LoginPrompt::AwaitCode
        }
    }

    /// 记录一次验证码提交
    pub async fn verify(&self, chat_id: ChatId, submitted: &str, now: DateTime<Utc>) -> LoginOutcome {
        let mut attempts = self.attempts.write().await;
        let Some(count) = attempts.get_mut(&chat_id) else {
            warn!(chat_id = %chat_id, "Verification attempted without /login");
            return LoginOutcome::NotStarted;
        };

        if *count >= self.max_attempts {
            warn!(chat_id = %chat_id, "Login attempts exhausted");
            return LoginOutcome::Exhausted;
        }

        if submitted == self.code {
            *count = 0;
            let expires_at = now + Duration::minutes(self.expiration_minutes);
            info!(chat_id = %chat_id, "Login successful");
            LoginOutcome::Accepted { expires_at }
        } else {
            *count += 1;
            warn!(chat_id = %chat_id, attempt = %*count, "Invalid login code");
            LoginOutcome::Rejected {
                remaining: self.max_attempts - *count,
            }
        }
    }
}
