use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde_json::Value;

use crate::error::DocumentError;
use crate::page::PageView;

pub const EXPECTED_PAGE_COUNT: usize = 8;

/// The three Custom LED slots eligible for merging.
pub const CUSTOM_LED_PAGES: [usize; 3] = [5, 6, 7];

/// A full CYBERBOARD configuration. The JSON is held raw, with key order
/// preserved, so every field the tool does not interpret survives a
/// load/save round trip untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    root: Value,
}

impl Document {
    pub fn from_value(root: Value) -> Self {
        Self { root }
    }

    pub fn as_value(&self) -> &Value {
        &self.root
    }

    pub fn product_info(&self) -> Option<&Value> {
        self.root.get("product_info")
    }

    pub fn page_num(&self) -> Option<u64> {
        self.root.get("page_num").and_then(Value::as_u64)
    }

    pub fn pages(&self) -> &[Value] {
        self.root
            .get("page_data")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn page(&self, index: usize) -> Option<&Value> {
        self.pages().get(index)
    }

    /// Replace the page at `index`. No-op when the document has no such slot;
    /// merge only calls this on documents that passed validation.
    pub fn set_page(&mut self, index: usize, page: Value) {
        if let Some(slot) = self
            .root
            .get_mut("page_data")
            .and_then(Value::as_array_mut)
            .and_then(|pages| pages.get_mut(index))
        {
            *slot = page;
        }
    }

    /// Structural gate run before merge or preview will operate on a
    /// document. Checks run in a fixed order and the first failure wins;
    /// unknown fields anywhere are deliberately left alone.
    pub fn validate(&self) -> Result<(), DocumentError> {
        if self.product_info().is_none() {
            return Err(DocumentError::schema("missing product_info"));
        }

        let page_num = match self.page_num() {
            Some(n) if n > 0 => n as usize,
            _ => {
                return Err(DocumentError::schema(
                    "page_num must be a positive integer",
                ))
            }
        };

        let pages = match self.root.get("page_data").and_then(Value::as_array) {
            Some(pages) => pages,
            None => return Err(DocumentError::schema("page_data must be an array")),
        };
        if pages.len() != page_num {
            return Err(DocumentError::schema(format!(
                "page_data has {} entries, expected {page_num}",
                pages.len()
            )));
        }

        for (position, page) in pages.iter().enumerate() {
            match PageView::new(page).page_index() {
                Some(actual) if actual == position as u64 => {}
                Some(actual) => {
                    return Err(DocumentError::schema(format!(
                        "page {position} has page_index {actual}, expected {position}"
                    )))
                }
                None => {
                    return Err(DocumentError::schema(format!(
                        "page {position} is missing an integer page_index"
                    )))
                }
            }
        }

        for (position, page) in pages.iter().enumerate() {
            if !PageView::new(page).has_content() {
                return Err(DocumentError::schema(format!(
                    "page {position} has no word_page, frames, or keyframes"
                )));
            }
        }

        Ok(())
    }
}

/// Parse a configuration file. Validation is separate; previewing a quirky
/// file is allowed, merging into it is not.
pub fn load_document(path: &Path) -> Result<Document> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read configuration {}", path.display()))?;
    let root: Value = serde_json::from_str(&contents)
        .with_context(|| format!("failed to parse JSON in {}", path.display()))?;
    Ok(Document::from_value(root))
}

pub fn save_document(path: &Path, document: &Document) -> Result<()> {
    let json = serde_json::to_string_pretty(document.as_value())
        .context("failed to serialize configuration JSON")?;
    fs::write(path, format!("{json}\n"))
        .with_context(|| format!("failed to write configuration {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{load_document, save_document, Document, EXPECTED_PAGE_COUNT};
    use serde_json::{json, Value};
    use tempfile::tempdir;

    fn word_page(index: usize) -> Value {
        json!({ "valid": 1, "page_index": index, "word_page": { "valid": 1 } })
    }

    fn led_page(index: usize) -> Value {
        json!({
            "valid": 1,
            "page_index": index,
            "speed_ms": 200,
            "frames": {
                "valid": 1,
                "frame_num": 1,
                "frame_data": [{ "frame_index": 0, "frame_RGB": ["#102030"] }]
            }
        })
    }

    fn valid_document() -> Document {
        let pages = (0..EXPECTED_PAGE_COUNT)
            .map(|index| if index < 5 { word_page(index) } else { led_page(index) })
            .collect::<Vec<_>>();
        Document::from_value(json!({
            "product_info": { "product_id": "CYBERBOARD_R4" },
            "page_num": EXPECTED_PAGE_COUNT,
            "page_data": pages,
            "vendor_extra": { "untouched": true }
        }))
    }

    #[test]
    fn valid_document_passes() {
        valid_document().validate().expect("document should validate");
    }

    #[test]
    fn missing_product_info_fails_first_check() {
        let mut doc = valid_document();
        doc.root.as_object_mut().expect("root").remove("product_info");
        let reason = doc.validate().expect_err("should fail").to_string();
        assert!(reason.contains("missing product_info"));
    }

    #[test]
    fn non_positive_page_num_fails_second_check() {
        for bad in [json!(0), json!(-3), json!("8"), json!(7.5), Value::Null] {
            let mut doc = valid_document();
            doc.root["page_num"] = bad;
            let reason = doc.validate().expect_err("should fail").to_string();
            assert!(reason.contains("page_num must be a positive integer"));
        }
    }

    #[test]
    fn page_count_mismatch_fails_third_check() {
        let mut doc = valid_document();
        doc.root["page_data"]
            .as_array_mut()
            .expect("page_data")
            .pop();
        let reason = doc.validate().expect_err("should fail").to_string();
        assert!(reason.contains("page_data has 7 entries, expected 8"));
    }

    #[test]
    fn page_index_mismatch_fails_fourth_check() {
        let mut doc = valid_document();
        doc.root["page_data"][3]["page_index"] = json!(6);
        let reason = doc.validate().expect_err("should fail").to_string();
        assert!(reason.contains("page 3 has page_index 6, expected 3"));
    }

    #[test]
    fn contentless_page_fails_fifth_check() {
        let mut doc = valid_document();
        doc.root["page_data"][2] = json!({ "valid": 1, "page_index": 2 });
        let reason = doc.validate().expect_err("should fail").to_string();
        assert!(reason.contains("page 2 has no word_page, frames, or keyframes"));
    }

    #[test]
    fn save_load_round_trip_preserves_unknown_fields() {
        let dir = tempdir().expect("tempdir should create");
        let path = dir.path().join("config.json");
        let doc = valid_document();

        save_document(&path, &doc).expect("document should save");
        let raw = std::fs::read_to_string(&path).expect("file should read");
        assert!(raw.ends_with('\n'), "saved file should end with a newline");

        let loaded = load_document(&path).expect("document should load");
        assert_eq!(loaded, doc);
        assert_eq!(loaded.as_value()["vendor_extra"]["untouched"], json!(true));
    }

    #[test]
    fn save_is_stable_across_round_trips() {
        let dir = tempdir().expect("tempdir should create");
        let path = dir.path().join("config.json");
        let doc = valid_document();

        save_document(&path, &doc).expect("first save should succeed");
        let first = std::fs::read_to_string(&path).expect("file should read");

        let reloaded = load_document(&path).expect("document should load");
        save_document(&path, &reloaded).expect("second save should succeed");
        let second = std::fs::read_to_string(&path).expect("file should read again");

        assert_eq!(first, second, "key order should survive a round trip");
    }
}
