use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

use crate::color::{Rgb, BLACK};
use crate::error::DocumentError;

pub const GRID_WIDTH: usize = 40;
pub const GRID_HEIGHT: usize = 5;
pub const GRID_CELLS: usize = GRID_WIDTH * GRID_HEIGHT;

/// Device limit on frames per LED page.
pub const MAX_FRAMES: usize = 300;

/// Which content form a page carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    Word,
    Frames,
    Keyframes,
}

impl PageKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Word => "word_page",
            Self::Frames => "frames",
            Self::Keyframes => "keyframes",
        }
    }
}

/// Borrowed read-only view over one `page_data` entry. Pages stay raw JSON so
/// fields the tool does not interpret survive a save byte-for-byte; this view
/// reads the handful of fields preview and merge care about.
#[derive(Debug, Clone, Copy)]
pub struct PageView<'a> {
    value: &'a Value,
}

impl<'a> PageView<'a> {
    pub fn new(value: &'a Value) -> Self {
        Self { value }
    }

    pub fn page_index(&self) -> Option<u64> {
        self.value.get("page_index").and_then(Value::as_u64)
    }

    pub fn speed_ms(&self) -> Option<u64> {
        self.value.get("speed_ms").and_then(Value::as_u64)
    }

    /// The page's default color. Accepts both a single `#RRGGBB` string and a
    /// list of them (first entry wins); anything else falls back to black.
    pub fn default_color(&self) -> Rgb {
        let raw = match self.value.get("color") {
            Some(Value::String(color)) => Some(color.as_str()),
            Some(Value::Array(colors)) => colors.first().and_then(Value::as_str),
            _ => None,
        };
        raw.and_then(Rgb::parse).unwrap_or(BLACK)
    }

    pub fn has_word_page(&self) -> bool {
        self.value.get("word_page").is_some()
    }

    /// Whether the page carries any of the three content forms at all.
    pub fn has_content(&self) -> bool {
        self.has_word_page()
            || self.value.get("frames").is_some()
            || self.value.get("keyframes").is_some()
    }

    /// The frame set preview reads: `frames` when its valid flag is set,
    /// otherwise `keyframes` when present. An invalid `frames` object is
    /// never read for entries.
    pub fn active_frame_set(&self) -> Option<(PageKind, &'a Value)> {
        if let Some(frames) = self.value.get("frames") {
            if flag_is_set(frames, "valid") {
                return Some((PageKind::Frames, frames));
            }
        }
        self.value
            .get("keyframes")
            .map(|keyframes| (PageKind::Keyframes, keyframes))
    }

    /// Content form reported to the user: the active frame set if any,
    /// otherwise `word_page` when present.
    pub fn kind(&self) -> Option<PageKind> {
        if let Some((kind, _)) = self.active_frame_set() {
            return Some(kind);
        }
        self.has_word_page().then_some(PageKind::Word)
    }

    pub fn frame_entries(&self) -> &'a [Value] {
        self.active_frame_set()
            .and_then(|(_, set)| set.get("frame_data"))
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn frame_count(&self) -> usize {
        self.frame_entries().len()
    }
}

fn flag_is_set(value: &Value, key: &str) -> bool {
    value.get(key).and_then(Value::as_u64).unwrap_or(0) != 0
}

fn rgb_color_pattern() -> &'static Regex {
    static RGB_COLOR_RE: OnceLock<Regex> = OnceLock::new();
    RGB_COLOR_RE
        .get_or_init(|| Regex::new(r"^#[0-9A-Fa-f]{6}$").expect("color regex should compile"))
}

/// Advisory lint for a Custom LED page. Returns findings instead of failing;
/// none of these gate merge or preview.
pub fn lint_led_page(page: &Value, page_index: usize) -> Vec<String> {
    let view = PageView::new(page);
    let mut findings = Vec::new();

    let Some((kind, set)) = view.active_frame_set() else {
        findings.push(format!("page {page_index}: no valid frame data found"));
        return findings;
    };

    let entries = view.frame_entries();
    let declared = set.get("frame_num").and_then(Value::as_u64).unwrap_or(0);
    if declared as usize != entries.len() {
        findings.push(format!(
            "page {page_index} {}: frame_num declares {declared}, found {} entries",
            kind.as_str(),
            entries.len()
        ));
    }

    for (position, entry) in entries.iter().enumerate() {
        match entry.get("frame_index").and_then(Value::as_u64) {
            Some(actual) if actual == position as u64 => {}
            Some(actual) => findings.push(format!(
                "page {page_index} frame {position}: frame_index is {actual}, expected {position}"
            )),
            None => findings.push(format!(
                "page {page_index} frame {position}: missing frame_index"
            )),
        }

        let colors = entry
            .get("frame_RGB")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        if colors.len() != GRID_CELLS {
            findings.push(format!(
                "page {page_index} frame {position}: expected {GRID_CELLS} colors, got {}",
                colors.len()
            ));
        }

        // Sample the first few colors; one finding per frame is enough.
        for (cell, color) in colors.iter().take(10).enumerate() {
            let ok = color
                .as_str()
                .map(|raw| rgb_color_pattern().is_match(raw))
                .unwrap_or(false);
            if !ok {
                findings.push(format!(
                    "page {page_index} frame {position}: invalid color at cell {cell}: {color}"
                ));
                break;
            }
        }
    }

    findings
}

/// Concatenate the frame entries of `extras` onto `base`'s active frame set,
/// renumbering `frame_index` from zero and refreshing `frame_num`. The result
/// is a new page value; inputs are untouched. Refuses to exceed the device
/// frame limit.
pub fn combine_pages(base: &Value, extras: &[&Value]) -> Result<Value, DocumentError> {
    let base_view = PageView::new(base);
    let page_index = base_view.page_index().unwrap_or(0);

    let set_key = match base_view.active_frame_set() {
        Some((PageKind::Frames, _)) => "frames",
        Some((PageKind::Keyframes, _)) => "keyframes",
        _ => {
            return Err(DocumentError::malformed_page(
                page_index,
                "cannot combine: page has no frames or keyframes",
            ))
        }
    };

    let mut entries: Vec<Value> = base_view.frame_entries().to_vec();
    for extra in extras {
        entries.extend(PageView::new(extra).frame_entries().iter().cloned());
    }

    if entries.len() > MAX_FRAMES {
        return Err(DocumentError::incompatible(
            page_index as usize,
            format!(
                "combined page would have {} frames, device limit is {MAX_FRAMES}",
                entries.len()
            ),
        ));
    }

    for (position, entry) in entries.iter_mut().enumerate() {
        if let Some(object) = entry.as_object_mut() {
            object.insert("frame_index".to_owned(), Value::from(position));
        }
    }

    let mut combined = base.clone();
    let set = combined
        .get_mut(set_key)
        .and_then(Value::as_object_mut)
        .ok_or_else(|| {
            DocumentError::malformed_page(page_index, format!("{set_key} is not an object"))
        })?;
    set.insert("frame_num".to_owned(), Value::from(entries.len()));
    set.insert("frame_data".to_owned(), Value::Array(entries));

    Ok(combined)
}

#[cfg(test)]
mod tests {
    use super::{combine_pages, lint_led_page, PageKind, PageView, GRID_CELLS, MAX_FRAMES};
    use serde_json::{json, Value};

    fn frame_entry(index: usize, color: &str) -> Value {
        json!({ "frame_index": index, "frame_RGB": vec![color.to_owned(); GRID_CELLS] })
    }

    fn frames_page(page_index: usize, colors: &[&str]) -> Value {
        let entries = colors
            .iter()
            .enumerate()
            .map(|(index, color)| frame_entry(index, color))
            .collect::<Vec<_>>();
        json!({
            "valid": 1,
            "page_index": page_index,
            "speed_ms": 200,
            "color": "#FFFFFF",
            "frames": { "valid": 1, "frame_num": entries.len(), "frame_data": entries }
        })
    }

    #[test]
    fn active_set_prefers_valid_frames() {
        let page = json!({
            "page_index": 5,
            "frames": { "valid": 1, "frame_num": 0, "frame_data": [] },
            "keyframes": { "valid": 1, "frame_num": 0, "frame_data": [] }
        });
        let (kind, _) = PageView::new(&page)
            .active_frame_set()
            .expect("set should resolve");
        assert_eq!(kind, PageKind::Frames);
    }

    #[test]
    fn invalid_frames_fall_back_to_keyframes() {
        let page = json!({
            "page_index": 5,
            "frames": { "valid": 0, "frame_num": 2, "frame_data": [frame_entry(0, "#111111")] },
            "keyframes": { "valid": 1, "frame_num": 1, "frame_data": [frame_entry(0, "#222222")] }
        });
        let view = PageView::new(&page);
        let (kind, _) = view.active_frame_set().expect("set should resolve");
        assert_eq!(kind, PageKind::Keyframes);
        assert_eq!(view.frame_count(), 1);
    }

    #[test]
    fn word_page_reports_word_kind() {
        let page = json!({ "page_index": 2, "word_page": { "valid": 1 }, "color": "#00ff00" });
        let view = PageView::new(&page);
        assert_eq!(view.kind(), Some(PageKind::Word));
        assert_eq!(view.frame_count(), 0);
        assert_eq!(view.default_color().to_hex(), "#00FF00");
    }

    #[test]
    fn color_list_uses_first_entry() {
        let page = json!({ "page_index": 1, "color": ["#123456", "#654321"] });
        assert_eq!(PageView::new(&page).default_color().to_hex(), "#123456");
    }

    #[test]
    fn lint_flags_count_and_color_problems() {
        let mut page = frames_page(5, &["#00FF00", "#0000FF"]);
        page["frames"]["frame_num"] = json!(3);
        page["frames"]["frame_data"][1]["frame_RGB"][0] = json!("not-a-color");

        let findings = lint_led_page(&page, 5);
        assert!(findings.iter().any(|f| f.contains("frame_num declares 3")));
        assert!(findings.iter().any(|f| f.contains("invalid color")));
    }

    #[test]
    fn lint_accepts_well_formed_page() {
        let page = frames_page(6, &["#00FF00", "#0000FF"]);
        assert!(lint_led_page(&page, 6).is_empty());
    }

    #[test]
    fn combine_appends_and_renumbers() {
        let base = frames_page(5, &["#111111", "#222222"]);
        let extra = frames_page(6, &["#333333"]);

        let combined = combine_pages(&base, &[&extra]).expect("combine should succeed");
        let view = PageView::new(&combined);
        assert_eq!(view.frame_count(), 3);
        assert_eq!(combined["frames"]["frame_num"], json!(3));
        for (position, entry) in view.frame_entries().iter().enumerate() {
            assert_eq!(entry["frame_index"], json!(position));
        }
        // inputs untouched
        assert_eq!(PageView::new(&base).frame_count(), 2);
        assert_eq!(base["frames"]["frame_data"][1]["frame_index"], json!(1));
    }

    #[test]
    fn combine_rejects_over_limit() {
        let colors = vec!["#101010"; MAX_FRAMES];
        let base = frames_page(5, &colors);
        let extra = frames_page(6, &["#202020"]);

        let error = combine_pages(&base, &[&extra]).expect_err("combine should refuse");
        assert!(error.to_string().contains("device limit"));
    }

    #[test]
    fn combine_requires_frame_content() {
        let page = json!({ "page_index": 5, "word_page": { "valid": 1 } });
        assert!(combine_pages(&page, &[]).is_err());
    }
}
