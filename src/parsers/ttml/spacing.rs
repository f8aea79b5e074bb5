//! # 基于模板的空格重建
//!
//! 输入是一行 `<p>` 去掉标签后的原文（模板）和按文档顺序排列的逐字单元。
//! 每个单元的文本在模板中按顺序定位，定位后的位置成为锚点；
//! 两个相邻锚点之间如果只有空白，这段空白的长度就是前一个单元的尾随空格数。
//!
//! 定位总是在尚未被占用的文本段中查找，所以重复出现的单词（"la la la"）
//! 会依次落在不同位置。找不到的单元不产生锚点，尾随空格数为零。

use tracing::trace;

use crate::types::TtmlLyric;

#[derive(Debug, Clone, Copy)]
enum Segment<'a> {
    Text(&'a str),
    Anchor(usize),
}

/// 用模板重建 `words` 的尾随空格数。
///
/// `ignore_line_breaks` 为真时，含换行的空白段不计数。
pub fn reconstruct_spacing(template: &str, words: &mut [TtmlLyric], ignore_line_breaks: bool) {
    for word in words.iter_mut() {
        word.trailing_space_count = 0;
    }

    // 文本段与锚点始终交替出现：Text, Anchor, Text, Anchor, ..., Text
    let mut segments = vec![Segment::Text(template)];
    for (index, word) in words.iter().enumerate() {
        if word.text.is_empty() {
            continue;
        }
        if !anchor_word(&mut segments, index, &word.text) {
            trace!("[TTML 空格重建] 单元 '{}' 未在模板中找到。", word.text);
        }
    }

    for window in segments.windows(3) {
        let &[Segment::Anchor(left), Segment::Text(gap), Segment::Anchor(right)] = window else {
            continue;
        };
        if gap.is_empty() || !gap.chars().all(char::is_whitespace) {
            continue;
        }
        if ignore_line_breaks && gap.contains(['\n', '\r']) {
            continue;
        }
        words[left.min(right)].trailing_space_count = gap.chars().count();
    }
}

/// 在第一个包含 `text` 的文本段中放下锚点。
fn anchor_word<'a>(segments: &mut Vec<Segment<'a>>, index: usize, text: &str) -> bool {
    let found = segments.iter().enumerate().find_map(|(pos, segment)| match *segment {
        Segment::Text(s) => s.find(text).map(|offset| (pos, s, offset)),
        Segment::Anchor(_) => None,
    });

    let Some((pos, s, offset)) = found else {
        return false;
    };
    let before = &s[..offset];
    let after = &s[offset + text.len()..];
    segments.splice(
        pos..=pos,
        [
            Segment::Text(before),
            Segment::Anchor(index),
            Segment::Text(after),
        ],
    );
    true
}
