//! Local PDF property extraction - capability layer
//!
//! Computes size, page count, text presence and tag presence from raw bytes.
//! Every property is independent: one failing never blocks the others.

use crate::models::Property;
use crate::services::row_classifier::NeededChecks;
use lopdf::Document;
use tracing::warn;

/// Properties computed for one document. Properties that were not requested
/// stay [`Property::Unknown`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LocalProperties {
    pub size: Property<u64>,
    pub pages: Property<u32>,
    pub text_based: Property<bool>,
    pub tagged: Property<bool>,
    pub notes: Vec<String>,
}

/// Pure, synchronous extractor over document bytes
pub trait PropertyExtractor: Send + Sync {
    fn extract(&self, bytes: &[u8], needed: &NeededChecks) -> LocalProperties;
}

/// [`PropertyExtractor`] backed by `lopdf`
#[derive(Debug, Default, Clone, Copy)]
pub struct LopdfExtractor;

impl LopdfExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl PropertyExtractor for LopdfExtractor {
    fn extract(&self, bytes: &[u8], needed: &NeededChecks) -> LocalProperties {
        let _span = tracing::debug_span!("extractor.pdf", bytes = bytes.len()).entered();
        let mut props = LocalProperties::default();

        if needed.size {
            props.size = Property::Value(bytes.len() as u64);
        }

        if !(needed.pages || needed.text || needed.tagged) {
            return props;
        }

        let doc = match Document::load_mem(bytes) {
            Ok(doc) => Some(doc),
            Err(e) => {
                warn!("→ Unable to parse PDF: {}", e);
                if needed.pages {
                    props.pages = Property::Failed;
                    props.notes.push("Failed to read page count".to_string());
                }
                if needed.text {
                    props.text_based = Property::Failed;
                    props.notes.push("Failed to extract text".to_string());
                }
                if needed.tagged {
                    props.tagged = Property::Failed;
                    props.notes.push(format!("Tag check failed: {}", e));
                }
                None
            }
        };
        let Some(doc) = doc else {
            return props;
        };

        if needed.pages {
            props.pages = match u32::try_from(doc.get_pages().len()) {
                Ok(n) => Property::Value(n),
                Err(_) => {
                    props.notes.push("Failed to read page count".to_string());
                    Property::Failed
                }
            };
        }

        if needed.text {
            props.text_based = match has_text(&doc) {
                Some(found) => Property::Value(found),
                None => {
                    warn!("→ Failed to extract text");
                    props.notes.push("Failed to extract text".to_string());
                    Property::Failed
                }
            };
        }

        if needed.tagged {
            props.tagged = match has_struct_tree_root(&doc) {
                Ok(true) => {
                    props.notes.push("StructTreeRoot tag found".to_string());
                    Property::Value(true)
                }
                Ok(false) => {
                    props.notes.push("No StructTreeRoot tag".to_string());
                    Property::Value(false)
                }
                Err(e) => {
                    props.notes.push(format!("Tag check failed: {}", e));
                    Property::Failed
                }
            };
        }

        props
    }
}

/// `Some(true)` as soon as any page yields non-blank text; `None` when every
/// page failed to extract.
fn has_text(doc: &Document) -> Option<bool> {
    let pages = doc.get_pages();
    if pages.is_empty() {
        return Some(false);
    }

    let mut any_ok = false;
    for page_num in pages.keys() {
        if let Ok(text) = doc.extract_text(&[*page_num]) {
            any_ok = true;
            if !text.trim().is_empty() {
                return Some(true);
            }
        }
    }
    any_ok.then_some(false)
}

/// Looks for `/StructTreeRoot` in the document catalog
fn has_struct_tree_root(doc: &Document) -> Result<bool, lopdf::Error> {
    let root = doc.trailer.get(b"Root")?;
    let catalog = match root.as_reference() {
        Ok(id) => doc.get_dictionary(id)?,
        Err(_) => root.as_dict()?,
    };
    Ok(catalog.has(b"StructTreeRoot"))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Object, Stream};

    /// Builds a small PDF with `pages` pages, each optionally carrying text
    pub(crate) fn build_pdf(pages: usize, with_text: bool, tagged: bool) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
            "Encoding" => "WinAnsiEncoding",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut kids: Vec<Object> = Vec::new();
        for i in 0..pages {
            let operations = if with_text {
                vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 24.into()]),
                    Operation::new("Td", vec![72.into(), 700.into()]),
                    Operation::new("Tj", vec![Object::string_literal(format!("Page {}", i + 1))]),
                    Operation::new("ET", vec![]),
                ]
            } else {
                Vec::new()
            };
            let content = Content { operations };
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            });
            kids.push(page_id.into());
        }

        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => pages as i64,
            }),
        );

        let mut catalog = dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        };
        if tagged {
            let tree_id = doc.add_object(dictionary! { "Type" => "StructTreeRoot" });
            catalog.set("StructTreeRoot", tree_id);
        }
        let catalog_id = doc.add_object(catalog);
        doc.trailer.set("Root", catalog_id);

        let mut buf = Vec::new();
        doc.save_to(&mut buf).unwrap();
        buf
    }

    fn all_needed() -> NeededChecks {
        NeededChecks {
            size: true,
            pages: true,
            text: true,
            tagged: true,
            remote_scan: false,
        }
    }

    #[test]
    fn test_untagged_text_pdf() {
        let bytes = build_pdf(3, true, false);
        let props = LopdfExtractor::new().extract(&bytes, &all_needed());

        assert_eq!(props.size, Property::Value(bytes.len() as u64));
        assert_eq!(props.pages, Property::Value(3));
        assert_eq!(props.text_based, Property::Value(true));
        assert_eq!(props.tagged, Property::Value(false));
        assert_eq!(props.notes, vec!["No StructTreeRoot tag".to_string()]);
    }

    #[test]
    fn test_tagged_pdf_without_text() {
        let bytes = build_pdf(1, false, true);
        let props = LopdfExtractor::new().extract(&bytes, &all_needed());

        assert_eq!(props.pages, Property::Value(1));
        assert_eq!(props.text_based, Property::Value(false));
        assert_eq!(props.tagged, Property::Value(true));
        assert!(props.notes.contains(&"StructTreeRoot tag found".to_string()));
    }

    #[test]
    fn test_garbage_bytes_fail_each_property_independently() {
        let props = LopdfExtractor::new().extract(b"definitely not a pdf", &all_needed());

        assert_eq!(props.size, Property::Value(20));
        assert_eq!(props.pages, Property::Failed);
        assert_eq!(props.text_based, Property::Failed);
        assert_eq!(props.tagged, Property::Failed);
        assert_eq!(props.notes.len(), 3);
        assert_eq!(props.notes[0], "Failed to read page count");
    }

    #[test]
    fn test_only_requested_properties_are_computed() {
        let bytes = build_pdf(2, true, false);
        let needed = NeededChecks {
            pages: true,
            ..NeededChecks::default()
        };
        let props = LopdfExtractor::new().extract(&bytes, &needed);

        assert_eq!(props.size, Property::Unknown);
        assert_eq!(props.pages, Property::Value(2));
        assert_eq!(props.text_based, Property::Unknown);
        assert_eq!(props.tagged, Property::Unknown);
        assert!(props.notes.is_empty());
    }
}
