//! # 设置
//!
//! 解析选项、高亮选项与日志选项，以 JSON 形式保存在用户数据目录中。

use std::{fs, path::Path, path::PathBuf, time::Duration};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::level_filters::LevelFilter;

use crate::error::{LyricsError, Result};

const SETTINGS_FILE_NAME: &str = "lyric_sync.json";

/// 日志级别，序列化为小写字符串。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
    Off,
}

impl LogLevel {
    /// 作为 `EnvFilter` 指令使用的字符串。
    #[must_use]
    pub const fn as_directive(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
            Self::Off => "off",
        }
    }
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Self::TRACE,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Info => Self::INFO,
            LogLevel::Warn => Self::WARN,
            LogLevel::Error => Self::ERROR,
            LogLevel::Off => Self::OFF,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    pub enable_file_log: bool,
    pub file_log_level: LogLevel,
    pub console_log_level: LogLevel,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            enable_file_log: false,
            file_log_level: LogLevel::Info,
            console_log_level: LogLevel::Info,
        }
    }
}

/// LRC 解析选项
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LrcParsingOptions {
    /// 是否应用 `[offset:±毫秒]` 标签。正值表示歌词整体提前。
    pub apply_offset: bool,
}

impl Default for LrcParsingOptions {
    fn default() -> Self {
        Self { apply_offset: true }
    }
}

/// TTML 逐字单元之间空格的确定方式。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SpacingStrategy {
    /// 直接使用解析过程中在 `<span>` 之间和 `<span>` 边缘看到的空白。
    #[default]
    Streaming,
    /// 解析完一行后，用去掉标签的原始片段作为模板重建空格。
    Template,
}

/// TTML 解析选项
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TtmlParsingOptions {
    pub spacing: SpacingStrategy,
    /// 含换行的空白被视为文档的排版缩进，不计入空格数。
    pub ignore_line_break_whitespace: bool,
}

impl Default for TtmlParsingOptions {
    fn default() -> Self {
        Self {
            spacing: SpacingStrategy::Streaming,
            ignore_line_break_whitespace: true,
        }
    }
}

/// 统一管理所有格式的解析选项
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParsingOptions {
    pub lrc: LrcParsingOptions,
    pub ttml: TtmlParsingOptions,
}

/// 高亮查询选项
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HighlightOptions {
    /// 查询前加到播放时间上的偏移（毫秒），结果小于零时取零。
    pub time_offset_ms: i64,
}

impl HighlightOptions {
    /// 应用时间偏移。
    #[must_use]
    pub fn apply(&self, elapsed: Duration) -> Duration {
        let offset = Duration::from_millis(self.time_offset_ms.unsigned_abs());
        if self.time_offset_ms >= 0 {
            elapsed.saturating_add(offset)
        } else {
            elapsed.saturating_sub(offset)
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    pub log_settings: LogSettings,
    pub parsing: ParsingOptions,
    pub highlight: HighlightOptions,
}

impl EngineSettings {
    /// 用户数据目录，不存在时会创建。
    pub fn config_dir() -> Option<PathBuf> {
        if let Some(proj_dirs) = ProjectDirs::from("org", "LyricSync", "LyricSync") {
            let config_dir = proj_dirs.data_dir();
            if !config_dir.exists()
                && let Err(e) = fs::create_dir_all(config_dir)
            {
                tracing::error!("[设置] 无法创建配置目录 {config_dir:?}: {e}");
                return None;
            }
            Some(config_dir.to_path_buf())
        } else {
            tracing::error!("[设置] 无法获取项目配置目录路径。");
            None
        }
    }

    fn config_file_path() -> Option<PathBuf> {
        Self::config_dir().map(|dir| dir.join(SETTINGS_FILE_NAME))
    }

    /// 从用户数据目录加载设置；文件缺失或损坏时使用默认设置并写回。
    #[must_use]
    pub fn load() -> Self {
        if let Some(path) = Self::config_file_path() {
            if path.exists() {
                match Self::load_from_path(&path) {
                    Ok(settings) => return settings,
                    Err(e) => {
                        tracing::error!("[设置] 加载配置文件 {path:?} 失败: {e}。将使用默认配置。");
                    }
                }
            } else {
                tracing::info!("[设置] 配置文件 {path:?} 未找到。将创建并使用默认配置。");
            }
        }

        let default_settings = Self::default();
        if let Err(e) = default_settings.save() {
            tracing::error!("[设置] 无法保存初始默认配置文件: {e}");
        }
        default_settings
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_file_path().ok_or_else(|| {
            LyricsError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "无法确定配置文件路径",
            ))
        })?;
        self.save_to_path(&path)
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let settings = Self::from_json_str(&content)?;
        tracing::info!("[设置] 已从 {path:?} 加载配置。");
        Ok(settings)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_json_string()?)?;
        tracing::info!("[设置] 设置已保存到 {path:?}");
        Ok(())
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
