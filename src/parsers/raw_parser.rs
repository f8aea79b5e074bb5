//! # 纯文本解析器
//!
//! 没有任何时间信息，仅作为其它格式都不适用时的显示兜底。

use crate::types::{LyricLine, RawLine};

/// 按换行拆分文本，每个非空片段成为一行。
#[must_use]
pub fn parse_raw(content: &str) -> Vec<LyricLine> {
    content
        .split(['\n', '\r'])
        .filter(|segment| !segment.trim().is_empty())
        .map(|segment| {
            LyricLine::Raw(RawLine {
                content: segment.to_string(),
            })
        })
        .collect()
}
