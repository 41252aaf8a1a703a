//! 日志初始化
//!
//! 核心库走 log 门面，这里桥接到 tracing，同时写控制台和
//! 按日期命名的日志文件 (scanspot_YYYY-MM-DD.log，追加模式)。

use std::fs::OpenOptions;
use std::sync::Arc;

use anyhow::Result;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

pub fn init() -> Result<()> {
    // 桥接 log crate (scanspot-core 使用) 到 tracing
    let _ = tracing_log::LogTracer::init();

    let file_name = format!("scanspot_{}.log", chrono::Local::now().format("%Y-%m-%d"));
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&file_name)?;

    let _ = tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,scanspot_core=debug")),
        )
        .with(fmt::layer())
        .with(fmt::layer().with_ansi(false).with_writer(Arc::new(log_file)))
        .try_init();

    Ok(())
}
