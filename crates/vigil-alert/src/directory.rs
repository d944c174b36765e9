use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;
use vigil_types::ChatId;

/// 订阅者会话状态
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    /// 是否已认证
    pub authenticated: bool,

    /// 会话过期时间，None 表示永不过期（白名单用户）
    pub expires_at: Option<DateTime<Utc>>,

    /// 上次成功发出告警的时间
    pub last_alert_at: Option<DateTime<Utc>>,
}

/// 订阅者目录
///
/// 引擎只修改 last_alert_at 和懒惰过期翻转的 authenticated 标志，
/// 登录成功由外部写入。所有读-改-写都在整表写锁下进行，
/// 两个写入方不会丢失彼此的更新。
pub struct SubscriberDirectory {
    sessions: Arc<RwLock<HashMap<ChatId, Session>>>,
}

impl SubscriberDirectory {
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// 首次接触时创建未认证会话，已存在则不变
    pub async fn touch(&self, chat_id: ChatId) {
        let mut sessions = self.sessions.write().await;
        sessions.entry(chat_id).or_default();
    }

    /// 标记为已认证
    ///
    /// expires_at 为 None 时会话永不过期（白名单用户），
    /// 否则到期后在下一次评估时被懒惰失效。
    pub async fn mark_authenticated(&self, chat_id: ChatId, expires_at: Option<DateTime<Utc>>) {
        let mut sessions = self.sessions.write().await;
        let session = sessions.entry(chat_id).or_default();
        session.authenticated = true;
        session.expires_at = expires_at;
        info!(chat_id = %chat_id, expires_at = ?expires_at, "Subscriber authenticated");
    }

    /// 懒惰过期检查：已过期的会话就地翻转 authenticated 标志
    pub async fn is_eligible(&self, chat_id: ChatId, now: DateTime<Utc>) -> bool {
        let mut sessions = self.sessions.write().await;
        match sessions.get_mut(&chat_id) {
            Some(session) => check_session(chat_id, session, now),
            None => false,
        }
    }

    /// 列出当前可接收告警的订阅者，同时翻转已过期的标志
    pub async fn list_eligible(&self, now: DateTime<Utc>) -> Vec<ChatId> {
        let mut sessions = self.sessions.write().await;
        sessions
            .iter_mut()
            .filter_map(|(id, session)| check_session(*id, session, now).then_some(*id))
            .collect()
    }

    /// 记录一次成功发出的告警
    pub async fn record_alert(&self, chat_id: ChatId, now: DateTime<Utc>) {
        let mut sessions = self.sessions.write().await;
        if let Some(session) = sessions.get_mut(&chat_id) {
            session.last_alert_at = Some(now);
        }
    }

    pub async fn last_alert_at(&self, chat_id: ChatId) -> Option<DateTime<Utc>> {
        let sessions = self.sessions.read().await;
        sessions.get(&chat_id).and_then(|s| s.last_alert_at)
    }

    pub async fn session(&self, chat_id: ChatId) -> Option<Session> {
        let sessions = self.sessions.read().await;
        sessions.get(&chat_id).cloned()
    }
}

impl Default for SubscriberDirectory {
    fn default() -> Self {
        Self::new()
    }
}

fn check_session(chat_id: ChatId, session: &mut Session, now: DateTime<Utc>) -> bool {
    if !session.authenticated {
        return false;
    }
    match session.expires_at {
        Some(expires) if now > expires => {
            session.authenticated = false;
            info!(chat_id = %chat_id, "Subscriber session expired");
            false
        }
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[tokio::test]
    async fn test_touch_creates_unauthenticated() {
        let directory = SubscriberDirectory::new();
        directory.touch(1).await;

        let session = directory.session(1).await.unwrap();
        assert!(!session.authenticated);
        assert!(directory.list_eligible(Utc::now()).await.is_empty());
    }

    #[tokio::test]
    async fn test_whitelisted_session_never_expires() {
        let directory = SubscriberDirectory::new();
        directory.mark_authenticated(1, None).await;

        let far_future = Utc::now() + Duration::days(365);
        assert!(directory.is_eligible(1, far_future).await);
    }

    #[tokio::test]
    async fn test_lazy_expiry_flips_flag() {
        let directory = SubscriberDirectory::new();
        let now = Utc::now();
        directory.mark_authenticated(1, Some(now + Duration::minutes(10))).await;

        assert!(directory.is_eligible(1, now).await);
        // 过期时刻本身仍然有效（now > expires 才失效）
        assert!(directory.is_eligible(1, now + Duration::minutes(10)).await);

        let later = now + Duration::minutes(11);
        assert!(!directory.is_eligible(1, later).await);
        // 标志已翻转：即使用更早的时间再查也不可用
        assert!(!directory.is_eligible(1, now).await);
    }

    #[tokio::test]
    async fn test_list_eligible_filters_expired() {
        let directory = SubscriberDirectory::new();
        let now = Utc::now();
        directory.mark_authenticated(1, None).await;
        directory.mark_authenticated(2, Some(now - Duration::minutes(1))).await;
        directory.touch(3).await;

        let eligible = directory.list_eligible(now).await;
        assert_eq!(eligible, vec![1]);
    }

    #[tokio::test]
    async fn test_reauthentication_restores_eligibility() {
        let directory = SubscriberDirectory::new();
        let now = Utc::now();
        directory.mark_authenticated(1, Some(now - Duration::minutes(1))).await;
        assert!(!directory.is_eligible(1, now).await);

        directory.mark_authenticated(1, Some(now + Duration::minutes(10))).await;
        assert!(directory.is_eligible(1, now).await);
    }

    #[tokio::test]
    async fn test_record_alert_keeps_timestamp() {
        let directory = SubscriberDirectory::new();
        let now = Utc::now();
        directory.mark_authenticated(1, None).await;

        assert_eq!(directory.last_alert_at(1).await, None);
        directory.record_alert(1, now).await;
        assert_eq!(directory.last_alert_at(1).await, Some(now));
    }
}
