//! # 日志初始化
//!
//! 控制台输出总是开启；文件日志可选，写入用户本地数据目录下的 `lyric_sync.log`。
//! `RUST_LOG` 环境变量存在时优先于设置中的控制台日志级别。

use std::{fs, path::PathBuf};

use directories::ProjectDirs;
use tracing::level_filters::LevelFilter;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LogSettings;

const LOG_FILE_NAME: &str = "lyric_sync.log";

/// 日志目录，不存在时会创建。
#[must_use]
pub fn log_dir() -> Option<PathBuf> {
    let proj_dirs = ProjectDirs::from("org", "LyricSync", "LyricSync")?;
    let dir = proj_dirs.data_local_dir();
    if !dir.exists()
        && let Err(e) = fs::create_dir_all(dir)
    {
        eprintln!("无法创建日志目录 {dir:?}: {e}");
        return None;
    }
    Some(dir.to_path_buf())
}

/// 按设置安装全局日志订阅器。
///
/// 返回的 [`WorkerGuard`] 需要一直持有，丢弃后文件日志不再写入。
/// 已经安装过订阅器时什么都不做并返回 `None`。
#[must_use]
pub fn init_tracing(settings: &LogSettings) -> Option<WorkerGuard> {
    let dir = if settings.enable_file_log {
        log_dir()
    } else {
        None
    };
    init_tracing_in(settings, dir)
}

/// 同 [`init_tracing`]，但文件日志写到指定目录。`dir` 为 `None` 时不写文件。
#[must_use]
pub fn init_tracing_in(settings: &LogSettings, dir: Option<PathBuf>) -> Option<WorkerGuard> {
    let console_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.console_log_level.as_directive()));
    let console_layer = fmt::layer().with_target(false).with_filter(console_filter);

    let (file_layer, guard) = match dir.filter(|_| settings.enable_file_log) {
        Some(dir) => {
            let appender = tracing_appender::rolling::never(dir, LOG_FILE_NAME);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(LevelFilter::from(settings.file_log_level));
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    if let Err(e) = tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init()
    {
        eprintln!("日志系统已经初始化过了: {e}");
        return None;
    }

    tracing::info!("[日志] 日志系统初始化完成");
    guard
}
