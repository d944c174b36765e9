use anyhow::{anyhow, Result};
use config::{Config, Environment, File, FileFormat};
use std::path::Path;
use tracing::debug;

use crate::model::AppConfig;

/// 加载应用配置
///
/// 可选的 TOML 文件在下层，`VIGIL_` 前缀的环境变量在上层覆盖
/// （分段用 `__`，例如 VIGIL_BOT__TOKEN）。文件不存在时
/// 使用默认值加环境变量。
pub fn load<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path = path.as_ref();
    let mut builder = Config::builder();

    if path.exists() {
        debug!("Loading config from file: {:?}", path);
        builder = builder.add_source(File::new(
            path.to_str().ok_or_else(|| anyhow!("Invalid config path"))?,
            FileFormat::Toml,
        ));
    } else {
        debug!("Config file {:?} not found, using defaults", path);
    }

    builder = builder.add_source(Environment::with_prefix("VIGIL").separator("__"));

    let config = builder.build()?;
    Ok(config.try_deserialize()?)
}
