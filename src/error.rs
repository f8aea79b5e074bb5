use std::io;

use quick_xml::{
    Error as QuickXmlErrorMain, encoding::EncodingError,
    events::attributes::AttrError as QuickXmlAttrError,
};
use thiserror::Error;

/// 歌词解析、存储与设置读写过程中可能发生的错误。
///
/// 时间戳格式错误、LRC 标签行格式错误等可以就地恢复的问题不会走到这里，
/// 解析器会记录日志后直接跳过对应的行。
#[derive(Error, Debug)]
pub enum LyricsError {
    /// XML 解析错误，来自 `quick-xml` 库。
    #[error("XML 解析错误: {0}")]
    Xml(#[from] QuickXmlErrorMain),
    /// XML 属性解析错误。
    #[error("XML 属性错误: {0}")]
    Attribute(#[from] QuickXmlAttrError),
    /// XML 文本编码或解码错误。
    #[error("文本编码或解码错误: {0}")]
    Encoding(#[from] EncodingError),
    /// 无效的时间格式字符串。
    #[error("无效的时间格式: {0}")]
    InvalidTime(String),
    /// 文档结构不完整或不符合预期（如缺少根元素、标签未闭合）。
    #[error("文档结构错误: {0}")]
    MalformedDocument(String),
    /// 无效的歌词格式。
    #[error("无效的歌词格式: {0}")]
    InvalidLyricFormat(String),
    /// 内部逻辑错误。
    #[error("错误: {0}")]
    Internal(String),
    /// 文件读写错误。
    #[error("IO 错误: {0}")]
    Io(#[from] io::Error),
    /// 设置文件的 JSON 序列化/反序列化错误。
    #[error("JSON 序列化/反序列化错误: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<LyricsError> for io::Error {
    fn from(err: LyricsError) -> Self {
        Self::other(err)
    }
}

pub type Result<T> = std::result::Result<T, LyricsError>;
