use chrono::NaiveDateTime;
use std::path::Path;
use thiserror::Error;
use vigil_types::Reading;

/// 数据文件中的时间格式
const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// 必需的列，按 Reading 字段顺序
const REQUIRED_COLUMNS: [&str; 4] = ["Time", "Temperature", "Humidity", "Light"];

/// 批次解析错误
///
/// 任何一种错误都让整个批次失败：不产生部分结果，
/// 由调用方在触发边界记录日志，不通知任何订阅者。
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("failed to read batch file: {0}")]
    Io(#[from] std::io::Error),

    #[error("batch file has no header row")]
    MissingHeader,

    #[error("required column missing: {name}")]
    MissingColumn { name: String },

    #[error("invalid value '{value}' in column {column} at line {line}")]
    InvalidValue {
        line: usize,
        column: String,
        value: String,
    },
}

/// 解析一个 CSV 批次文件
pub fn parse_batch(path: &Path) -> Result<Vec<Reading>, BatchError> {
    let content = std::fs::read_to_string(path)?;
    parse_str(&content)
}

/// 解析 CSV 文本
///
/// 表头必须包含 Time、Temperature、Humidity、Light 列（顺序不限，
/// 允许多余的列）。数值字段为空表示该行传感器错误，解析为 None。
pub fn parse_str(content: &str) -> Result<Vec<Reading>, BatchError> {
    let mut lines = content.lines();
    let header = lines.next().ok_or(BatchError::MissingHeader)?;
    let columns: Vec<&str> = header.split(',').map(str::trim).collect();

    let mut index = [0usize; 4];
    for (i, name) in REQUIRED_COLUMNS.iter().enumerate() {
        index[i] = columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| BatchError::MissingColumn {
                name: name.to_string(),
            })?;
    }

    let mut readings = Vec::new();
    for (offset, row) in lines.enumerate() {
        if row.trim().is_empty() {
            continue;
        }
        // 1 起始行号，含表头行
        let lineno = offset + 2;
        let fields: Vec<&str> = row.split(',').map(str::trim).collect();
        let field = |i: usize| fields.get(index[i]).copied().unwrap_or("");

        let raw_time = field(0);
        let timestamp = NaiveDateTime::parse_from_str(raw_time, TIME_FORMAT).map_err(|_| {
            BatchError::InvalidValue {
                line: lineno,
                column: "Time".to_string(),
                value: raw_time.to_string(),
            }
        })?;

        readings.push(Reading {
            timestamp,
            temperature: parse_value(field(1), lineno, "Temperature")?,
            humidity: parse_value(field(2), lineno, "Humidity")?,
            light: parse_value(field(3), lineno, "Light")?,
        });
    }

    Ok(readings)
}

fn parse_value(raw: &str, lineno: usize, column: &str) -> Result<Option<f64>, BatchError> {
    if raw.is_empty() {
        // 传感器错误：该行该指标无读数
        return Ok(None);
    }
    raw.parse::<f64>()
        .map(Some)
        .map_err(|_| BatchError::InvalidValue {
            line: lineno,
            column: column.to_string(),
            value: raw.to_string(),
        })
}
