use anyhow::Result;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error};

/// 连续文件事件的合并窗口
///
/// 写入方常常对同一文件触发多个 create/modify 事件，
/// 窗口内的事件合并成一次评估信号。
const COALESCE_WINDOW: Duration = Duration::from_millis(500);

/// 数据目录监视器
///
/// 在独立线程中运行 notify 监视器，把 .csv 文件的创建/修改
/// 事件合并后转发到 tokio 通道。
pub struct BatchWatcher {
    rx: mpsc::Receiver<PathBuf>,
}

impl BatchWatcher {
    /// 开始监视目录（非递归），使用默认合并窗口
    pub fn start<P: AsRef<Path>>(dir: P) -> Result<Self> {
        Self::with_coalesce_window(dir, COALESCE_WINDOW)
    }

    /// 开始监视目录，使用指定的合并窗口
    ///
    /// 测试里可以放宽窗口，让零散到达的事件都落进同一次合并。
    pub fn with_coalesce_window<P: AsRef<Path>>(dir: P, window: Duration) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        let (tx, rx) = mpsc::channel(10);

        let (notify_tx, notify_rx) = std::sync::mpsc::channel();
        let mut watcher: RecommendedWatcher = Watcher::new(notify_tx, notify::Config::default())?;
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;

        std::thread::spawn(move || {
            // watcher 随线程存活
            let _watcher = watcher;
            debug!("CSV watcher started for: {:?}", dir);

            loop {
                let first = match notify_rx.recv() {
                    Ok(Ok(event)) => csv_path(&event),
                    Ok(Err(e)) => {
                        error!("Watch error: {}", e);
                        continue;
                    }
                    Err(_) => break,
                };
                let Some(mut latest) = first else { continue };

                // 合并窗口内的后续事件，只保留最后一个路径
                while let Ok(next) = notify_rx.recv_timeout(window) {
                    match next {
                        Ok(event) => {
                            if let Some(path) = csv_path(&event) {
                                latest = path;
                            }
                        }
                        Err(e) => error!("Watch error: {}", e),
                    }
                }

                debug!("CSV file changed: {:?}", latest);
                if tx.blocking_send(latest).is_err() {
                    break;
                }
            }
        });

        Ok(Self { rx })
    }

    /// 等待下一个合并后的文件事件
    pub async fn recv(&mut self) -> Option<PathBuf> {
        self.rx.recv().await
    }
}

fn csv_path(event: &Event) -> Option<PathBuf> {
    match event.kind {
        EventKind::Create(_) | EventKind::Modify(_) => event
            .paths
            .iter()
            .find(|p| p.extension().and_then(|s| s.to_str()) == Some("csv"))
            .cloned(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use tokio::time::timeout;

    #[tokio::test]
    async fn test_watcher_reports_csv_writes() {
        let dir = tempdir().unwrap();
        let mut watcher = BatchWatcher::start(dir.path()).unwrap();

        let path = dir.path().join("data.csv");
        std::fs::write(&path, "Time,Temperature,Humidity,Light\n").unwrap();

        let event = timeout(Duration::from_secs(5), watcher.recv())
            .await
            .expect("watcher did not report the write")
            .unwrap();
        assert_eq!(event.file_name(), path.file_name());
    }

    #[tokio::test]
    async fn test_non_csv_files_ignored() {
        let dir = tempdir().unwrap();
        let mut watcher = BatchWatcher::start(dir.path()).unwrap();

        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let result = timeout(Duration::from_secs(2), watcher.recv()).await;
        assert!(result.is_err(), "non-csv write should not produce an event");
    }

    #[tokio::test]
    async fn test_burst_of_writes_coalesces() {
        let dir = tempdir().unwrap();
        // 放宽窗口，保证负载高的机器上迟到的事件也落进同一次合并
        let mut watcher =
            BatchWatcher::with_coalesce_window(dir.path(), Duration::from_secs(2)).unwrap();

        let path = dir.path().join("data.csv");
        for i in 0..5 {
            std::fs::write(&path, format!("Time,Temperature,Humidity,Light\n# rev {i}\n"))
                .unwrap();
        }

        timeout(Duration::from_secs(10), watcher.recv())
            .await
            .expect("watcher did not report the burst")
            .unwrap();

        // 合并窗口结束后不应再有积压事件
        let extra = timeout(Duration::from_secs(1), watcher.recv()).await;
        assert!(extra.is_err(), "burst should coalesce into one event");
    }
}
