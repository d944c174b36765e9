use anyhow::{Context, Result};
use chrono::{Duration, Local, NaiveDateTime};
use clap::Parser;
use rand::Rng;
use serde::Deserialize;
use std::fmt::Write as _;
use std::path::PathBuf;
use tracing::info;

/// Generate synthetic sensor data and write it to a CSV file.
///
/// Example:
///   vigil-simulator '[{"time":30,"temperature":[19,21],"humidity":[0.8,0.8],"light":[2000,2010],"error":0.1}]' --output data.csv
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON string or path to a JSON file with period configuration
    config: String,

    /// Output CSV file name
    #[arg(long, default_value = "sensor_data.csv")]
    output: PathBuf,
}

/// 一个生成时段：每分钟一行，值在区间内均匀取样
#[derive(Debug, Deserialize)]
struct Period {
    /// 时长（分钟）
    #[serde(default)]
    time: u32,

    /// 温度区间 [lo, hi]
    #[serde(default)]
    temperature: (f64, f64),

    /// 湿度区间 [lo, hi]
    #[serde(default)]
    humidity: (f64, f64),

    /// 光照区间 [lo, hi]
    #[serde(default)]
    light: (f64, f64),

    /// 传感器错误概率（0.0-1.0），出错行的三个值字段为空
    #[serde(default)]
    error: f64,
}

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let periods = load_periods(&args.config)?;

    let start = Local::now().naive_local();
    let csv = generate(&periods, start, &mut rand::thread_rng());
    std::fs::write(&args.output, csv)
        .with_context(|| format!("failed to write {:?}", args.output))?;

    info!("Data written to {:?}", args.output);
    Ok(())
}

fn load_periods(config: &str) -> Result<Vec<Period>> {
    let content = if config.ends_with(".json") {
        std::fs::read_to_string(config).with_context(|| format!("failed to read {config}"))?
    } else {
        config.to_string()
    };
    serde_json::from_str(&content).context("invalid period configuration")
}

/// 生成 CSV 文本，表头与服务端解析器约定一致
fn generate<R: Rng>(periods: &[Period], start: NaiveDateTime, rng: &mut R) -> String {
    let mut out = String::from("Time,Temperature,Humidity,Light\n");
    let mut current = start;

    for period in periods {
        for _ in 0..period.time {
            let timestamp = current.format(TIME_FORMAT);
            if rng.gen::<f64>() < period.error {
                let _ = writeln!(out, "{},,,", timestamp);
            } else {
                let _ = writeln!(
                    out,
                    "{},{},{},{}",
                    timestamp,
                    sample(rng, period.temperature),
                    sample(rng, period.humidity),
                    sample(rng, period.light),
                );
            }
            current += Duration::minutes(1);
        }
    }

    out
}

/// 区间内均匀取样，保留两位小数
fn sample<R: Rng>(rng: &mut R, (lo, hi): (f64, f64)) -> f64 {
    let value = if lo < hi { rng.gen_range(lo..=hi) } else { lo };
    (value * 100.0).round() / 100.0
}
