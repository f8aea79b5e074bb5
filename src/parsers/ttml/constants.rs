//! # TTML 解析器 - 常量定义

pub(super) const TAG_TT: &[u8] = b"tt";
pub(super) const TAG_HEAD: &[u8] = b"head";
pub(super) const TAG_BODY: &[u8] = b"body";
pub(super) const TAG_DIV: &[u8] = b"div";
pub(super) const TAG_P: &[u8] = b"p";
pub(super) const TAG_SPAN: &[u8] = b"span";

pub(super) const TAG_META: &[u8] = b"meta";
pub(super) const TAG_TRANSLATION: &[u8] = b"translation";
pub(super) const TAG_TRANSLITERATION: &[u8] = b"transliteration";
pub(super) const TAG_TEXT: &[u8] = b"text";

pub(super) const ATTR_ITUNES_TIMING: &[u8] = b"itunes:timing";
pub(super) const ATTR_XML_LANG: &[u8] = b"xml:lang";
pub(super) const ATTR_ITUNES_SONG_PART: &[u8] = b"itunes:song-part";
pub(super) const ATTR_ITUNES_SONG_PART_NEW: &[u8] = b"itunes:songPart";
pub(super) const ATTR_BEGIN: &[u8] = b"begin";
pub(super) const ATTR_END: &[u8] = b"end";
pub(super) const ATTR_AGENT: &[u8] = b"ttm:agent";
pub(super) const ATTR_AGENT_ALIAS: &[u8] = b"agent";
pub(super) const ATTR_ITUNES_KEY: &[u8] = b"itunes:key";
pub(super) const ATTR_ROLE: &[u8] = b"ttm:role";
pub(super) const ATTR_ROLE_ALIAS: &[u8] = b"role";
pub(super) const ATTR_KEY: &[u8] = b"key";
pub(super) const ATTR_VALUE: &[u8] = b"value";
pub(super) const ATTR_FOR: &[u8] = b"for";

pub(super) const ROLE_TRANSLATION: &[u8] = b"x-translation";
pub(super) const ROLE_ROMANIZATION: &[u8] = b"x-roman";
pub(super) const ROLE_BACKGROUND: &[u8] = b"x-bg";

/// 主唱位的 agent，缺省 agent 的行也放在主唱位。
pub(super) const MAIN_AGENT_ID: &str = "v1";
