//! # TTML 解析器 - 工具函数

use std::{str, time::Duration};

use quick_xml::{
    Reader,
    events::{BytesRef, BytesStart},
};
use tracing::warn;

use crate::{error::Result, time::parse_clock_time};

/// 按顺序尝试多个属性名，返回第一个存在的属性值（已解码、反转义）。
pub(super) fn get_string_attribute(
    e: &BytesStart,
    reader: &Reader<&[u8]>,
    attr_names: &[&[u8]],
) -> Result<Option<String>> {
    for &attr_name in attr_names {
        if let Some(attr) = e.try_get_attribute(attr_name)? {
            let value = attr.decode_and_unescape_value(reader.decoder())?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

/// 读取时间属性，格式错误时返回错误。
pub(super) fn get_time_attribute(
    e: &BytesStart,
    reader: &Reader<&[u8]>,
    attr_names: &[&[u8]],
) -> Result<Option<Duration>> {
    get_string_attribute(e, reader, attr_names)?
        .map(|value| parse_clock_time(&value))
        .transpose()
}

/// 读取时间属性，格式错误时记录警告并当作缺失。
pub(super) fn get_time_attribute_lenient(
    e: &BytesStart,
    reader: &Reader<&[u8]>,
    attr_names: &[&[u8]],
) -> Result<Option<Duration>> {
    let Some(value) = get_string_attribute(e, reader, attr_names)? else {
        return Ok(None);
    };
    match parse_clock_time(&value) {
        Ok(time) => Ok(Some(time)),
        Err(err) => {
            warn!("[TTML 处理] 时间戳 '{value}' 无效，忽略该单元: {err}");
            Ok(None)
        }
    }
}

/// 解码 `&amp;`、`&#39;`、`&#x4E2D;` 这类实体引用。无法识别时返回原样文本。
pub(super) fn decode_entity(e: &BytesRef) -> String {
    let entity_name = str::from_utf8(e.as_ref()).unwrap_or_default();

    let decoded = if let Some(num_str) = entity_name.strip_prefix('#') {
        let parsed = if let Some(hex) = num_str.strip_prefix('x') {
            u32::from_str_radix(hex, 16)
        } else {
            num_str.parse::<u32>()
        };
        parsed.ok().and_then(char::from_u32)
    } else {
        match entity_name {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            _ => None,
        }
    };

    decoded.map_or_else(
        || {
            warn!("[TTML 处理] 无法识别的实体引用 '&{entity_name};'");
            format!("&{entity_name};")
        },
        String::from,
    )
}

/// 把连续空白折叠为一个空格并去掉首尾空白。
pub(super) fn normalize_text_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// 空白中含换行时视为排版缩进。
pub(super) fn contains_line_break(text: &str) -> bool {
    text.contains(['\n', '\r'])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_text_whitespace() {
        assert_eq!(normalize_text_whitespace("  a \n\t b  "), "a b");
        assert_eq!(normalize_text_whitespace(" \n "), "");
    }

    #[test]
    fn test_contains_line_break() {
        assert!(contains_line_break("\n  "));
        assert!(contains_line_break(" \r"));
        assert!(!contains_line_break("  \t"));
    }
}
