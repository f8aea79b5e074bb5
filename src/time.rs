//! # 时间戳解析
//!
//! LRC 使用 `mm:ss.xx` 形式的时间标签，TTML 的 `begin`/`end` 属性则允许
//! `12.345s`、`SS.mmm`、`MM:SS.mmm`、`HH:MM:SS.mmm` 等多种写法。

use std::time::Duration;

use crate::error::{LyricsError, Result};

const NANOS_PER_SEC_DIGITS: usize = 9;

/// 解析 `minutes:seconds.fraction` 形式的时间戳。
///
/// 分钟必须是无符号整数，`seconds.fraction` 必须恰好被 `.` 分成两个无符号整数部分，
/// 否则返回 `None`。小数部分按十进制小数解释（`.5` 为 500 毫秒，`.23` 为 230 毫秒），
/// 最多 9 位。
#[must_use]
pub fn parse_time(time_str: &str) -> Option<Duration> {
    let (minutes_str, rest) = time_str.trim().split_once(':')?;
    let minutes = parse_unsigned(minutes_str)?;

    let mut dot_parts = rest.split('.');
    let seconds_str = dot_parts.next()?;
    let fraction_str = dot_parts.next()?;
    if dot_parts.next().is_some() {
        return None;
    }

    let seconds = parse_unsigned(seconds_str)?;
    let nanos = parse_fraction_nanos(fraction_str)?;

    let total_secs = minutes.checked_mul(60)?.checked_add(seconds)?;
    Some(Duration::new(total_secs, nanos))
}

/// 把时长格式化为 `mm:ss.xx`（厘秒精度，分钟不回绕）。
#[must_use]
pub fn format_time(time: Duration) -> String {
    let total_centis = time.as_millis() / 10;
    let minutes = total_centis / 6000;
    let seconds = (total_centis / 100) % 60;
    let centis = total_centis % 100;
    format!("{minutes:02}:{seconds:02}.{centis:02}")
}

/// 只接受 ASCII 数字组成的无符号整数，拒绝 `+`/`-` 号和空串。
fn parse_unsigned(s: &str) -> Option<u64> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

fn parse_fraction_nanos(fraction_str: &str) -> Option<u32> {
    if fraction_str.is_empty()
        || fraction_str.len() > NANOS_PER_SEC_DIGITS
        || !fraction_str.bytes().all(|b| b.is_ascii_digit())
    {
        return None;
    }
    let value: u32 = fraction_str.parse().ok()?;
    let scale = 10u32.pow((NANOS_PER_SEC_DIGITS - fraction_str.len()) as u32);
    Some(value * scale)
}

/// 解析 TTML 时间属性。
pub fn parse_clock_time(time_str: &str) -> Result<Duration> {
    // 解析毫秒部分（.1, .12, .123）
    fn parse_decimal_ms_part(ms_str: &str, original_time_str: &str) -> Result<u64> {
        if ms_str.is_empty() || ms_str.len() > 3 || ms_str.chars().any(|c| !c.is_ascii_digit()) {
            return Err(LyricsError::InvalidTime(format!(
                "毫秒部分 '{ms_str}' 在时间戳 '{original_time_str}' 中无效 (只支持最多3位数字)"
            )));
        }
        let val = ms_str.parse::<u64>().map_err(|e| {
            LyricsError::InvalidTime(format!(
                "无法解析时间戳 '{original_time_str}' 中的毫秒部分 '{ms_str}': {e}"
            ))
        })?;
        Ok(val * 10u64.pow(3 - ms_str.len() as u32))
    }

    // 解析 "SS.mmm" 或 "SS"，返回秒和毫秒
    fn parse_seconds_part(part: &str, original_time_str: &str) -> Result<(u64, u64)> {
        let (seconds_str, ms_str) = match part.split_once('.') {
            Some((s, ms)) => (s, Some(ms)),
            None => (part, None),
        };
        if seconds_str.is_empty() || !seconds_str.bytes().all(|b| b.is_ascii_digit()) {
            return Err(LyricsError::InvalidTime(format!(
                "时间戳 '{original_time_str}' 的秒部分 '{seconds_str}' 无效"
            )));
        }
        let seconds = seconds_str.parse::<u64>().map_err(|e| {
            LyricsError::InvalidTime(format!(
                "在时间戳 '{original_time_str}' 中解析秒 '{seconds_str}' 失败: {e}"
            ))
        })?;
        let milliseconds = ms_str.map_or(Ok(0), |ms| parse_decimal_ms_part(ms, original_time_str))?;
        Ok((seconds, milliseconds))
    }

    fn parse_clock_field(field: &str, name: &str, original_time_str: &str) -> Result<u64> {
        parse_unsigned(field).ok_or_else(|| {
            LyricsError::InvalidTime(format!(
                "在 '{original_time_str}' 中解析{name} '{field}' 失败"
            ))
        })
    }

    fn to_ms(seconds: u64, milliseconds: u64, original_time_str: &str) -> Result<u64> {
        seconds
            .checked_mul(1000)
            .and_then(|ms| ms.checked_add(milliseconds))
            .ok_or_else(|| overflow_error(original_time_str))
    }

    fn overflow_error(original_time_str: &str) -> LyricsError {
        LyricsError::InvalidTime(format!("时间戳 '{original_time_str}' 超出范围"))
    }

    let time_str = time_str.trim();
    if time_str.starts_with('-') {
        return Err(LyricsError::InvalidTime(format!(
            "时间戳不能为负: '{time_str}'"
        )));
    }

    // 格式："12.345s"
    if let Some(stripped) = time_str.strip_suffix('s') {
        let (seconds, milliseconds) = parse_seconds_part(stripped, time_str)?;
        return Ok(Duration::from_millis(to_ms(seconds, milliseconds, time_str)?));
    }

    // 格式："HH:MM:SS.mmm", "MM:SS.mmm", "SS.mmm"，从后往前解析
    let mut parts_iter = time_str.rsplit(':');
    let seconds_part = parts_iter
        .next()
        .ok_or_else(|| LyricsError::InvalidTime(format!("时间格式 '{time_str}' 无效或为空")))?;
    let (seconds, milliseconds) = parse_seconds_part(seconds_part, time_str)?;
    let mut total_ms = to_ms(seconds, milliseconds, time_str)?;

    if let Some(minutes_str) = parts_iter.next() {
        if seconds >= 60 {
            return Err(LyricsError::InvalidTime(format!(
                "秒值 '{seconds}' (应 < 60) 在时间戳 '{time_str}' 中无效"
            )));
        }
        let minutes = parse_clock_field(minutes_str, "分钟", time_str)?;
        if minutes >= 60 {
            return Err(LyricsError::InvalidTime(format!(
                "分钟值 '{minutes}' (应 < 60) 在时间戳 '{time_str}' 中无效"
            )));
        }
        total_ms = minutes
            .checked_mul(60_000)
            .and_then(|ms| total_ms.checked_add(ms))
            .ok_or_else(|| overflow_error(time_str))?;
    }

    if let Some(hours_str) = parts_iter.next() {
        let hours = parse_clock_field(hours_str, "小时", time_str)?;
        total_ms = hours
            .checked_mul(3_600_000)
            .and_then(|ms| total_ms.checked_add(ms))
            .ok_or_else(|| overflow_error(time_str))?;
    }

    if parts_iter.next().is_some() {
        return Err(LyricsError::InvalidTime(format!(
            "时间格式 '{time_str}' 包含过多部分"
        )));
    }

    Ok(Duration::from_millis(total_ms))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_time() {
        assert_eq!(parse_time("00:01.23"), Some(Duration::from_millis(1230)));
        assert_eq!(parse_time("01:02.5"), Some(Duration::from_millis(62_500)));
        assert_eq!(parse_time("03:04.567"), Some(Duration::from_millis(184_567)));
        assert_eq!(parse_time("120:00.00"), Some(Duration::from_secs(7200)));
        assert_eq!(parse_time(" 00:10.00 "), Some(Duration::from_secs(10)));

        assert_eq!(parse_time("00:01"), None);
        assert_eq!(parse_time("aa:01.00"), None);
        assert_eq!(parse_time("00:01.2.3"), None);
        assert_eq!(parse_time("-1:01.00"), None);
        assert_eq!(parse_time("00:-1.00"), None);
        assert_eq!(parse_time("00:01."), None);
        assert_eq!(parse_time("00:.50"), None);
        assert_eq!(parse_time("ar:Someone"), None);
        assert_eq!(parse_time(""), None);
    }

    #[test]
    fn test_format_time_round_trip() {
        for centis in [0u64, 1, 99, 100, 123, 5_999, 6_000, 123_456, 600_000] {
            let t = Duration::from_millis(centis * 10);
            assert_eq!(parse_time(&format_time(t)), Some(t), "{}", format_time(t));
        }
        assert_eq!(format_time(Duration::from_millis(61_230)), "01:01.23");
        assert_eq!(format_time(Duration::from_secs(6000)), "100:00.00");
    }

    #[test]
    fn test_parse_clock_time() {
        let ms = |v| Ok::<_, ()>(Duration::from_millis(v));
        let parse = |s| parse_clock_time(s).map_err(|_| ());

        assert_eq!(parse("7.1s"), ms(7100));
        assert_eq!(parse("7.123s"), ms(7123));
        assert_eq!(parse("15s"), ms(15000));
        assert_eq!(parse("01:02:03.456"), ms(3_723_456));
        assert_eq!(parse("05:10.12"), ms(310_120));
        assert_eq!(parse("123.456"), ms(123_456));
        assert_eq!(parse("0"), ms(0));

        for bad in [
            "abc",
            "1:2:3:4",
            "01:60:00.000",
            "01:00:60.000",
            "-10s",
            "10.s",
            ".5s",
            "s",
            "10.1234",
            "01:00:.000",
            "",
            "100000000000000000s",
            "99999999999999999999s",
            "9999999999999999:00:00.000",
            "18446744073709551.999",
        ] {
            assert!(
                matches!(parse_clock_time(bad), Err(LyricsError::InvalidTime(_))),
                "'{bad}' 应当解析失败"
            );
        }
    }
}
