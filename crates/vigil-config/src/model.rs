use serde::Deserialize;
use std::path::PathBuf;
use vigil_types::ThresholdConfig;

/// 应用配置
#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub bot: BotConfig,
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub alerts: AlertConfig,
}

/// 机器人接入配置
#[derive(Debug, Deserialize, Clone)]
pub struct BotConfig {
    /// Bot API token（通常通过 VIGIL_BOT__TOKEN 环境变量注入）
    #[serde(default)]
    pub token: String,

    /// 长轮询等待时间（秒）
    #[serde(default = "default_poll_timeout")]
    pub poll_timeout_secs: u64,
}

/// 数据源配置
#[derive(Debug, Deserialize, Clone)]
pub struct DataConfig {
    /// 监视的数据目录
    #[serde(default = "default_data_dir")]
    pub dir: PathBuf,

    /// 启动时处理的数据文件名
    #[serde(default = "default_data_file")]
    pub file_name: String,
}

/// 登录与白名单配置
#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    /// 白名单用户名（无需验证码，会话不过期）
    #[serde(default)]
    pub whitelist: Vec<String>,

    /// 一次性登录验证码
    #[serde(default)]
    pub login_code: String,

    /// 验证码登录的会话有效期（分钟）
    #[serde(default = "default_login_expiration")]
    pub login_expiration_minutes: i64,

    /// 连续失败的最大尝试次数
    #[serde(default = "default_max_login_attempts")]
    pub max_login_attempts: u32,
}

/// 告警默认值配置
#[derive(Debug, Deserialize, Clone)]
pub struct AlertConfig {
    /// 默认告警频率（分钟）
    #[serde(default = "default_alert_frequency")]
    pub default_frequency_minutes: u32,

    /// 默认阈值
    #[serde(default)]
    pub thresholds: ThresholdConfig,
}

// 默认值函数
fn default_poll_timeout() -> u64 {
    30
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_data_file() -> String {
    "data.csv".to_string()
}

fn default_login_expiration() -> i64 {
    10
}

fn default_max_login_attempts() -> u32 {
    3
}

fn default_alert_frequency() -> u32 {
    60
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            poll_timeout_secs: default_poll_timeout(),
        }
    }
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            dir: default_data_dir(),
            file_name: default_data_file(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            whitelist: Vec::new(),
            login_code: String::new(),
            login_expiration_minutes: default_login_expiration(),
            max_login_attempts: default_max_login_attempts(),
        }
    }
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            default_frequency_minutes: default_alert_frequency(),
            thresholds: ThresholdConfig::default(),
        }
    }
}
