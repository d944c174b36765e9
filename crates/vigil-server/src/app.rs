use anyhow::Result;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, RwLock};
use tracing::{error, info, warn};
use vigil_alert::{AlertEngine, SubscriberDirectory, ThresholdStore};
use vigil_auth::LoginGate;
use vigil_config::AppConfig;
use vigil_ingest::BatchWatcher;
use vigil_notify::{ConsoleNotifier, Notifier, TelegramClient, TelegramNotifier};

use crate::commands::CommandRouter;
use crate::dispatcher::Dispatcher;

/// 应用装配与主循环
pub struct App {
    config: AppConfig,
}

impl App {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    pub async fn run(self) -> Result<()> {
        std::fs::create_dir_all(&self.config.data.dir)?;
        info!("Data directory ready: {:?}", self.config.data.dir);

        let store = Arc::new(ThresholdStore::new(
            self.config.alerts.thresholds,
            self.config.alerts.default_frequency_minutes,
        ));
        let directory = Arc::new(SubscriberDirectory::new());
        let engine = Arc::new(AlertEngine::new(store.clone(), directory.clone()));
        let gate = Arc::new(LoginGate::new(
            self.config.auth.whitelist.clone(),
            self.config.auth.login_code.clone(),
            self.config.auth.login_expiration_minutes,
            self.config.auth.max_login_attempts,
        ));

        let client = Arc::new(TelegramClient::new(&self.config.bot.token));
        let notifier: Arc<dyn Notifier> = if self.config.bot.token.is_empty() {
            warn!("No bot token configured, alerts go to the console only");
            Arc::new(ConsoleNotifier)
        } else {
            Arc::new(TelegramNotifier::new(client.clone()))
        };

        let latest_batch = Arc::new(RwLock::new(None));
        let (batch_tx, batch_rx) = mpsc::channel(10);

        // 启动时处理已有的数据文件
        let data_file = self.config.data.dir.join(&self.config.data.file_name);
        if data_file.exists() {
            info!("Found existing data file: {:?}", data_file);
            let _ = batch_tx.send(data_file).await;
        }

        let mut watcher = BatchWatcher::start(&self.config.data.dir)?;
        let watcher_tx = batch_tx.clone();
        tokio::spawn(async move {
            while let Some(path) = watcher.recv().await {
                if watcher_tx.send(path).await.is_err() {
                    break;
                }
            }
        });

        let dispatcher = Dispatcher::new(engine, notifier, latest_batch.clone());
        tokio::spawn(dispatcher.run(batch_rx));

        if self.config.bot.token.is_empty() {
            // 没有 token 时只监视文件，等待 Ctrl-C 退出
            tokio::signal::ctrl_c().await?;
            return Ok(());
        }

        let router = CommandRouter::new(gate, directory, store, latest_batch, batch_tx);
        self.poll_updates(client, router).await
    }

    /// 长轮询循环：取消息、路由命令、回发回复
    async fn poll_updates(&self, client: Arc<TelegramClient>, router: CommandRouter) -> Result<()> {
        info!("Starting bot polling");
        let mut offset = 0i64;

        loop {
            let updates = match client
                .get_updates(offset, self.config.bot.poll_timeout_secs)
                .await
            {
                Ok(updates) => updates,
                Err(e) => {
                    error!("Failed to fetch updates: {}", e);
                    tokio::time::sleep(Duration::from_secs(3)).await;
                    continue;
                }
            };

            for update in updates {
                offset = offset.max(update.update_id + 1);
                let Some(message) = update.message else { continue };
                let Some(text) = message.text else { continue };
                let chat_id = message.chat.id;
                let username = message.from.as_ref().and_then(|u| u.username.as_deref());
                let first_name = message
                    .from
                    .as_ref()
                    .map(|u| u.first_name.as_str())
                    .unwrap_or("there");

                if let Some(reply) = router
                    .handle(chat_id, username, first_name, &text, Utc::now())
                    .await
                {
                    if let Err(e) = client.send_message(chat_id, &reply).await {
                        error!(chat_id = %chat_id, "Failed to send reply: {}", e);
                    }
                }
            }
        }
    }
}
