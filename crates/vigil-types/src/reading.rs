use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// 传感器指标类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorMetric {
    /// 温度
    Temperature,

    /// 湿度
    Humidity,

    /// 光照强度
    Light,
}

impl SensorMetric {
    /// 固定的评估顺序（同时也是告警消息中的行顺序）
    pub const ALL: [SensorMetric; 3] = [
        SensorMetric::Temperature,
        SensorMetric::Humidity,
        SensorMetric::Light,
    ];

    /// 告警消息中使用的指标名称
    pub fn label(&self) -> &'static str {
        match self {
            SensorMetric::Temperature => "Temperature",
            SensorMetric::Humidity => "Humidity",
            SensorMetric::Light => "Light intensity",
        }
    }

    /// 数据文件中的列名
    pub fn column(&self) -> &'static str {
        match self {
            SensorMetric::Temperature => "Temperature",
            SensorMetric::Humidity => "Humidity",
            SensorMetric::Light => "Light",
        }
    }
}

/// 单条传感器读数（数据文件中的一行）
///
/// 字段为 None 表示该行对应指标发生了传感器错误，
/// 范围检查时只跳过该指标的这一行，其余指标照常检查。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// 采样时间
    pub timestamp: NaiveDateTime,

    /// 温度（摄氏度）
    pub temperature: Option<f64>,

    /// 湿度（0.0 - 1.0）
    pub humidity: Option<f64>,

    /// 光照强度（lux）
    pub light: Option<f64>,
}

impl Reading {
    /// 按指标取值
    pub fn value(&self, metric: SensorMetric) -> Option<f64> {
        match metric {
            SensorMetric::Temperature => self.temperature,
            SensorMetric::Humidity => self.humidity,
            SensorMetric::Light => self.light,
        }
    }
}
