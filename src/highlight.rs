//! # 高亮范围计算
//!
//! 给定播放进度，找出应当高亮的行（或逐字单元）的下标范围。
//!
//! 一个有时间的条目在 `begin <= t < end` 时处于激活状态，没有结束时间的条目一直激活。
//! 结果是 `[最小激活下标, 最大激活下标 + 1)`；LRC 的翻译行与主歌词行同时激活，
//! TTML 中时间重叠的行也会一起出现在范围里。
//!
//! 没有任何条目激活时（间隙、开头之前、末尾之后）退回到单个条目：
//! 开始时间不晚于 `t` 的条目中开始时间最大的那个（相同时取文件中靠前的），
//! 如果 `t` 早于所有条目，则取开始时间最小的那个。
//! 没有时间的条目永远不会被选中，没有可选条目时返回空范围 `0..0`。

use std::{ops::Range, time::Duration};

use crate::types::{LyricLine, TtmlLyric, TtmlLyrics};

/// 可以参与高亮判断的条目。
pub trait Timed {
    /// 用于高亮判断的 `(开始, 结束)`；`None` 表示没有时间信息。
    fn condensed_bounds(&self) -> Option<(Duration, Option<Duration>)>;
}

impl Timed for LyricLine {
    fn condensed_bounds(&self) -> Option<(Duration, Option<Duration>)> {
        self.condensed_begin_time()
            .map(|begin| (begin, self.condensed_end_time()))
    }
}

impl Timed for TtmlLyric {
    fn condensed_bounds(&self) -> Option<(Duration, Option<Duration>)> {
        Some((self.begin_time, Some(self.end_time)))
    }
}

fn is_active(begin: Duration, end: Option<Duration>, elapsed: Duration) -> bool {
    begin <= elapsed && end.is_none_or(|end| elapsed < end)
}

/// 线性扫描计算高亮范围。
#[must_use]
pub fn resolve_range<T: Timed>(items: &[T], elapsed: Duration) -> Range<usize> {
    let mut active: Option<(usize, usize)> = None;
    let mut latest_started: Option<(usize, Duration)> = None;
    let mut earliest: Option<(usize, Duration)> = None;

    for (index, item) in items.iter().enumerate() {
        let Some((begin, end)) = item.condensed_bounds() else {
            continue;
        };
        if is_active(begin, end, elapsed) {
            active = Some(active.map_or((index, index), |(first, _)| (first, index)));
        }
        if begin <= elapsed && latest_started.is_none_or(|(_, best)| begin > best) {
            latest_started = Some((index, begin));
        }
        if earliest.is_none_or(|(_, best)| begin < best) {
            earliest = Some((index, begin));
        }
    }

    if let Some((first, last)) = active {
        return first..last + 1;
    }
    latest_started
        .or(earliest)
        .map_or(0..0, |(index, _)| index..index + 1)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TimelineEntry {
    begin: Duration,
    /// 没有结束时间时为 `Duration::MAX`
    end: Duration,
    index: usize,
}

/// 预先按开始时间排序的索引，每次解析后构建一次，查询时二分查找。
///
/// 结果与 [`resolve_range`] 完全一致。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Timeline {
    /// 按 `(begin, index)` 排序
    entries: Vec<TimelineEntry>,
    /// `entries[..=i]` 中最大的结束时间
    prefix_max_end: Vec<Duration>,
}

impl Timeline {
    #[must_use]
    pub fn new<T: Timed>(items: &[T]) -> Self {
        let mut entries: Vec<TimelineEntry> = items
            .iter()
            .enumerate()
            .filter_map(|(index, item)| {
                item.condensed_bounds().map(|(begin, end)| TimelineEntry {
                    begin,
                    end: end.unwrap_or(Duration::MAX),
                    index,
                })
            })
            .collect();
        entries.sort_by_key(|e| (e.begin, e.index));

        let prefix_max_end = entries
            .iter()
            .scan(Duration::ZERO, |max_end, entry| {
                *max_end = (*max_end).max(entry.end);
                Some(*max_end)
            })
            .collect();

        Self {
            entries,
            prefix_max_end,
        }
    }

    /// 有时间信息的条目数量。
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 计算 `elapsed` 时的高亮范围。
    #[must_use]
    pub fn active_range(&self, elapsed: Duration) -> Range<usize> {
        let started = self.entries.partition_point(|e| e.begin <= elapsed);

        let mut active: Option<(usize, usize)> = None;
        for position in (0..started).rev() {
            if self.prefix_max_end[position] <= elapsed {
                break;
            }
            let entry = &self.entries[position];
            if elapsed < entry.end {
                active = Some(active.map_or((entry.index, entry.index), |(lo, hi)| {
                    (lo.min(entry.index), hi.max(entry.index))
                }));
            }
        }
        if let Some((first, last)) = active {
            return first..last + 1;
        }

        let fallback = if started == 0 {
            self.entries.first()
        } else {
            // 开始时间相同的条目中取文件里最靠前的
            let latest_begin = self.entries[started - 1].begin;
            let first_with_begin = self.entries.partition_point(|e| e.begin < latest_begin);
            self.entries.get(first_with_begin)
        };
        fallback.map_or(0..0, |entry| entry.index..entry.index + 1)
    }
}

impl TtmlLyrics {
    /// 当前应当高亮的逐字单元范围，规则与行高亮相同。
    #[must_use]
    pub fn active_word_range(&self, elapsed: Duration) -> Range<usize> {
        resolve_range(&self.children, elapsed)
    }
}
