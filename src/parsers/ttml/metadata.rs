//! # TTML 解析器 - `<head>` 处理
//!
//! 收集 `<meta key value>`（含 `amll:meta`）作为标签，
//! 以及 Apple Music `<iTunesMetadata>` 中按 `itunes:key` 关联到行的翻译和音译。

use quick_xml::{
    Reader,
    events::{BytesStart, Event},
};
use tracing::trace;

use super::{
    constants::{
        ATTR_FOR, ATTR_KEY, ATTR_ROLE, ATTR_ROLE_ALIAS, ATTR_VALUE, ATTR_XML_LANG,
        ROLE_BACKGROUND, TAG_HEAD, TAG_META, TAG_SPAN, TAG_TEXT, TAG_TRANSLATION,
        TAG_TRANSLITERATION,
    },
    state::{AuxTrackType, LineAuxiliary, MetadataContext, TtmlParserState},
    utils::{decode_entity, get_string_attribute, normalize_text_whitespace},
};
use crate::error::Result;

pub(super) fn handle_head_event(
    event: &Event<'_>,
    state: &mut TtmlParserState,
    reader: &Reader<&[u8]>,
    tags: &mut Vec<(String, String)>,
) -> Result<()> {
    match event {
        Event::Start(e) => handle_head_start_tag(e, state, reader, tags)?,
        Event::Text(e) => push_metadata_text(state, &e.xml_content()?),
        Event::GeneralRef(e) => push_metadata_text(state, &decode_entity(e)),
        Event::CData(e) => push_metadata_text(state, &e.decode()?),
        Event::End(e) => handle_head_end_tag(e.local_name().as_ref(), state),
        _ => {}
    }
    Ok(())
}

fn handle_head_start_tag(
    e: &BytesStart,
    state: &mut TtmlParserState,
    reader: &Reader<&[u8]>,
    tags: &mut Vec<(String, String)>,
) -> Result<()> {
    let meta_state = &mut state.metadata_state;

    match e.local_name().as_ref() {
        TAG_META => {
            let key = get_string_attribute(e, reader, &[ATTR_KEY])?;
            let value = get_string_attribute(e, reader, &[ATTR_VALUE])?;
            if let (Some(key), Some(value)) = (key, value)
                && !key.trim().is_empty()
            {
                tags.push((key.trim().to_string(), value.trim().to_string()));
            }
        }
        TAG_TRANSLATION | TAG_TRANSLITERATION => {
            let aux_type = if e.local_name().as_ref() == TAG_TRANSLATION {
                AuxTrackType::Translation
            } else {
                AuxTrackType::Romanization
            };
            let lang = get_string_attribute(e, reader, &[ATTR_XML_LANG])?;
            meta_state.context = MetadataContext::InAuxiliaryEntry { aux_type, lang };
        }
        TAG_TEXT => {
            if let MetadataContext::InAuxiliaryEntry { aux_type, lang } = &meta_state.context {
                let key = get_string_attribute(e, reader, &[ATTR_FOR])?;
                meta_state.context = MetadataContext::InAuxiliaryText {
                    aux_type: *aux_type,
                    lang: lang.clone(),
                    key,
                };
                meta_state.main_text.clear();
                meta_state.background_text.clear();
                meta_state.span_backgrounds.clear();
            }
        }
        TAG_SPAN => {
            if matches!(meta_state.context, MetadataContext::InAuxiliaryText { .. }) {
                let role = get_string_attribute(e, reader, &[ATTR_ROLE, ATTR_ROLE_ALIAS])?;
                let is_background = role.as_deref().map(str::as_bytes) == Some(ROLE_BACKGROUND);
                meta_state.span_backgrounds.push(is_background);
            }
        }
        _ => {}
    }
    Ok(())
}

fn push_metadata_text(state: &mut TtmlParserState, text: &str) {
    let meta_state = &mut state.metadata_state;
    if !matches!(meta_state.context, MetadataContext::InAuxiliaryText { .. }) {
        return;
    }
    if meta_state.within_background() {
        meta_state.background_text.push_str(text);
    } else {
        meta_state.main_text.push_str(text);
    }
}

fn handle_head_end_tag(local_name: &[u8], state: &mut TtmlParserState) {
    let meta_state = &mut state.metadata_state;

    match local_name {
        TAG_HEAD => state.in_head = false,
        TAG_SPAN => {
            meta_state.span_backgrounds.pop();
        }
        TAG_TEXT => {
            let context = std::mem::take(&mut meta_state.context);
            let MetadataContext::InAuxiliaryText {
                aux_type,
                lang,
                key,
            } = context
            else {
                meta_state.context = context;
                return;
            };

            let main = non_empty(normalize_text_whitespace(&meta_state.main_text));
            let background = non_empty(normalize_text_whitespace(
                // 背景人声翻译常带有括号
                strip_outer_parens(&meta_state.background_text),
            ));
            if let Some(key) = key {
                trace!("[TTML 元数据] 行 {key} 的辅助文本: {main:?} / {background:?}");
                meta_state
                    .line_auxiliaries
                    .entry(key)
                    .or_default()
                    .push(LineAuxiliary {
                        aux_type,
                        lang: lang.clone(),
                        main,
                        background,
                    });
            }
            meta_state.context = MetadataContext::InAuxiliaryEntry { aux_type, lang };
        }
        TAG_TRANSLATION | TAG_TRANSLITERATION => {
            meta_state.context = MetadataContext::None;
        }
        _ => {}
    }
}

fn non_empty(text: String) -> Option<String> {
    (!text.is_empty()).then_some(text)
}

fn strip_outer_parens(text: &str) -> &str {
    let trimmed = text.trim();
    trimmed
        .strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
        .or_else(|| {
            trimmed
                .strip_prefix('（')
                .and_then(|s| s.strip_suffix('）'))
        })
        .unwrap_or(text)
}
