use std::collections::BTreeMap;

use serde_json::Value;

use crate::document::{Document, CUSTOM_LED_PAGES};
use crate::error::DocumentError;
use crate::page::PageView;

/// How one Custom LED slot gets filled in a merge.
#[derive(Debug, Clone)]
pub enum PageSource {
    /// Leave the base document's page in place.
    KeepBase,
    /// Take a Custom LED page out of another document.
    Replace {
        document: Document,
        page_index: usize,
    },
    /// Use an already-materialized page, e.g. a combined animation.
    Prepared(Value),
}

/// Per-slot choices for the three Custom LED pages. Slots without an entry
/// keep the base page. Built up step by step by the wizard, consumed once.
#[derive(Debug, Clone, Default)]
pub struct MergeSelection {
    choices: BTreeMap<usize, PageSource>,
}

impl MergeSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, target_page: usize, source: PageSource) {
        self.choices.insert(target_page, source);
    }

    pub fn get(&self, target_page: usize) -> &PageSource {
        self.choices.get(&target_page).unwrap_or(&PageSource::KeepBase)
    }

    pub fn is_all_keep(&self) -> bool {
        self.choices
            .values()
            .all(|source| matches!(source, PageSource::KeepBase))
    }
}

/// Produce a new document from `base` with the selected Custom LED pages
/// swapped in. Pages 0-4 and every field outside `page_data[5..8]` come
/// through as an untouched deep copy; inputs are never mutated and nothing
/// is written to disk here.
pub fn merge(base: &Document, selections: &MergeSelection) -> Result<Document, DocumentError> {
    let mut merged = base.clone();

    for &target_page in &CUSTOM_LED_PAGES {
        match selections.get(target_page) {
            PageSource::KeepBase => {}
            PageSource::Replace {
                document,
                page_index,
            } => {
                let page = extract_led_page(document, *page_index, target_page)?;
                merged.set_page(target_page, reindexed(page, target_page));
            }
            PageSource::Prepared(page) => {
                if !PageView::new(page).has_content() {
                    return Err(DocumentError::incompatible(
                        target_page,
                        "prepared page has no word_page, frames, or keyframes",
                    ));
                }
                merged.set_page(target_page, reindexed(page.clone(), target_page));
            }
        }
    }

    Ok(merged)
}

/// Validate a source document and pull one of its Custom LED pages. Only
/// pages 5-7 may be read from an alternate document.
fn extract_led_page(
    document: &Document,
    page_index: usize,
    target_page: usize,
) -> Result<Value, DocumentError> {
    if !CUSTOM_LED_PAGES.contains(&page_index) {
        return Err(DocumentError::incompatible(
            target_page,
            format!("page {page_index} is not a Custom LED page"),
        ));
    }

    if let Err(error) = document.validate() {
        return Err(DocumentError::incompatible(
            target_page,
            format!("source document failed validation: {error}"),
        ));
    }

    let page = document.page(page_index).ok_or_else(|| {
        DocumentError::incompatible(target_page, format!("source document has no page {page_index}"))
    })?;

    if !PageView::new(page).has_content() {
        return Err(DocumentError::incompatible(
            target_page,
            format!("source page {page_index} has no word_page, frames, or keyframes"),
        ));
    }

    Ok(page.clone())
}

fn reindexed(mut page: Value, target_page: usize) -> Value {
    if let Some(object) = page.as_object_mut() {
        object.insert("page_index".to_owned(), Value::from(target_page as u64));
    }
    page
}

#[cfg(test)]
mod tests {
    use super::{merge, MergeSelection, PageSource};
    use crate::document::Document;
    use serde_json::{json, Value};

    fn led_page(page_index: usize, marker: &str) -> Value {
        json!({
            "page_index": page_index,
            "speed_ms": 100,
            "frames": {
                "valid": 1,
                "frame_num": 1,
                "frame_data": [{ "frame_index": 0, "frame_RGB": [marker] }]
            }
        })
    }

    fn document_with_marker(marker: &str) -> Document {
        let pages = (0..8)
            .map(|index| {
                if index >= 5 {
                    led_page(index, marker)
                } else {
                    json!({ "page_index": index, "word_page": { "valid": 1 } })
                }
            })
            .collect::<Vec<_>>();
        Document::from_value(json!({
            "product_info": { "product": "CYBERBOARD R4" },
            "page_num": 8,
            "page_data": pages
        }))
    }

    #[test]
    fn keeping_everything_reproduces_the_base() {
        let base = document_with_marker("#111111");
        let mut selections = MergeSelection::new();
        selections.set(5, PageSource::KeepBase);

        let merged = merge(&base, &selections).expect("merge should succeed");
        assert_eq!(merged, base);
        assert!(selections.is_all_keep());
    }

    #[test]
    fn replaced_page_matches_the_source_with_forced_index() {
        let base = document_with_marker("#111111");
        let other = document_with_marker("#222222");

        let mut selections = MergeSelection::new();
        selections.set(
            5,
            PageSource::Replace {
                document: other.clone(),
                page_index: 6,
            },
        );

        let merged = merge(&base, &selections).expect("merge should succeed");
        let mut expected = other.page(6).expect("source page").clone();
        expected["page_index"] = json!(5);
        assert_eq!(merged.page(5), Some(&expected));
        assert_eq!(merged.page(6), base.page(6));
        assert_eq!(merged.page(7), base.page(7));
    }

    #[test]
    fn system_pages_always_come_from_the_base() {
        let base = document_with_marker("#111111");
        let other = document_with_marker("#222222");

        let mut selections = MergeSelection::new();
        for target in [5, 6, 7] {
            selections.set(
                target,
                PageSource::Replace {
                    document: other.clone(),
                    page_index: target,
                },
            );
        }

        let merged = merge(&base, &selections).expect("merge should succeed");
        for index in 0..5 {
            assert_eq!(merged.page(index), base.page(index));
        }
        assert_eq!(merged.as_value()["product_info"], base.as_value()["product_info"]);
    }

    #[test]
    fn merge_leaves_its_inputs_untouched() {
        let base = document_with_marker("#111111");
        let other = document_with_marker("#222222");
        let base_before = base.clone();
        let other_before = other.clone();

        let mut selections = MergeSelection::new();
        selections.set(
            7,
            PageSource::Replace {
                document: other.clone(),
                page_index: 7,
            },
        );
        merge(&base, &selections).expect("merge should succeed");

        assert_eq!(base, base_before);
        assert_eq!(other, other_before);
    }

    #[test]
    fn invalid_source_document_is_incompatible() {
        let base = document_with_marker("#111111");
        let mut broken = document_with_marker("#222222").as_value().clone();
        broken["page_data"][3]["page_index"] = json!(9);

        let mut selections = MergeSelection::new();
        selections.set(
            6,
            PageSource::Replace {
                document: Document::from_value(broken),
                page_index: 6,
            },
        );

        let error = merge(&base, &selections).expect_err("merge should fail");
        let message = error.to_string();
        assert!(message.contains("cannot fill page 6"));
        assert!(message.contains("failed validation"));
    }

    #[test]
    fn non_led_source_page_is_refused() {
        let base = document_with_marker("#111111");
        let other = document_with_marker("#222222");

        let mut selections = MergeSelection::new();
        selections.set(
            5,
            PageSource::Replace {
                document: other,
                page_index: 2,
            },
        );

        let error = merge(&base, &selections).expect_err("merge should fail");
        assert!(error.to_string().contains("not a Custom LED page"));
    }

    #[test]
    fn contentless_prepared_page_is_refused() {
        let base = document_with_marker("#111111");
        let mut selections = MergeSelection::new();
        selections.set(5, PageSource::Prepared(json!({ "page_index": 5 })));

        let error = merge(&base, &selections).expect_err("merge should fail");
        assert!(error.to_string().contains("no word_page, frames, or keyframes"));
    }

    #[test]
    fn prepared_page_lands_with_the_target_index() {
        let base = document_with_marker("#111111");
        let mut selections = MergeSelection::new();
        selections.set(6, PageSource::Prepared(led_page(9, "#333333")));

        let merged = merge(&base, &selections).expect("merge should succeed");
        let page = merged.page(6).expect("page 6");
        assert_eq!(page["page_index"], json!(6));
        assert_eq!(
            page["frames"]["frame_data"][0]["frame_RGB"][0],
            json!("#333333")
        );
    }
}
