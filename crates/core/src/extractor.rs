use crate::error::IngestError;
use lopdf::Document;
use std::path::Path;
use std::thread;
use tracing::warn;

/// Below this page count the extractor stays sequential; thread setup
/// costs more than it saves on short documents.
pub const PARALLEL_PAGE_THRESHOLD: usize = 8;

#[derive(Debug, Clone)]
pub struct PageText {
    pub number: u32,
    pub text: String,
}

pub trait PdfExtractor: Send + Sync {
    /// Extract per-page text, ordered by page number. A page that fails
    /// to extract is dropped with a logged error; a result with no
    /// readable pages at all is an invalid document.
    fn extract_pages(&self, path: &Path, parallel: bool) -> Result<Vec<PageText>, IngestError>;
}

#[derive(Debug, Clone, Copy)]
pub struct LopdfExtractor {
    pub parallel_threshold: usize,
}

impl Default for LopdfExtractor {
    fn default() -> Self {
        Self {
            parallel_threshold: PARALLEL_PAGE_THRESHOLD,
        }
    }
}

impl PdfExtractor for LopdfExtractor {
    fn extract_pages(&self, path: &Path, parallel: bool) -> Result<Vec<PageText>, IngestError> {
        let document =
            Document::load(path).map_err(|error| IngestError::PdfParse(error.to_string()))?;

        let page_numbers: Vec<u32> = document.get_pages().keys().copied().collect();

        let mut pages = if parallel && page_numbers.len() >= self.parallel_threshold {
            extract_parallel(&document, &page_numbers)
        } else {
            extract_sequential(&document, &page_numbers)
        };

        // Parallel workers finish out of order; page order is restored here.
        pages.sort_by_key(|page| page.number);

        if pages.is_empty() {
            return Err(IngestError::InvalidDocument(format!(
                "pdf had no readable page text: {}",
                path.display()
            )));
        }

        Ok(pages)
    }
}

fn extract_one(document: &Document, page_no: u32) -> Option<PageText> {
    match document.extract_text(&[page_no]) {
        Ok(text) if !text.trim().is_empty() => Some(PageText {
            number: page_no,
            text,
        }),
        Ok(_) => None,
        Err(error) => {
            warn!(page = page_no, %error, "dropping page that failed to extract");
            None
        }
    }
}

fn extract_sequential(document: &Document, page_numbers: &[u32]) -> Vec<PageText> {
    page_numbers
        .iter()
        .filter_map(|page_no| extract_one(document, *page_no))
        .collect()
}

fn extract_parallel(document: &Document, page_numbers: &[u32]) -> Vec<PageText> {
    let workers = thread::available_parallelism()
        .map(|value| value.get())
        .unwrap_or(1)
        .min(page_numbers.len().max(1));
    let slice_len = page_numbers.len().div_ceil(workers);

    thread::scope(|scope| {
        let handles: Vec<_> = page_numbers
            .chunks(slice_len)
            .map(|slice| scope.spawn(move || extract_sequential(document, slice)))
            .collect();

        handles
            .into_iter()
            .flat_map(|handle| handle.join().unwrap_or_default())
            .collect()
    })
}

/// Minimal validity check used on the synchronous upload path: the file
/// must parse as a PDF and carry at least one page.
pub fn validate_pdf(path: &Path) -> Result<usize, IngestError> {
    let document =
        Document::load(path).map_err(|error| IngestError::PdfParse(error.to_string()))?;
    let page_count = document.get_pages().len();

    if page_count == 0 {
        return Err(IngestError::InvalidDocument(format!(
            "pdf has no pages: {}",
            path.display()
        )));
    }

    Ok(page_count)
}

/// Build a small real PDF for tests, one `Tj` text operation per page.
#[cfg(any(test, feature = "test-support"))]
pub fn write_test_pdf(path: &Path, page_texts: &[&str]) {
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Object, Stream};

    let mut document = Document::with_version("1.5");
    let pages_id = document.new_object_id();

    let font_id = document.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = document.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids = Vec::new();
    for text in page_texts {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![50.into(), 700.into()]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = document.add_object(Stream::new(
            dictionary! {},
            content.encode().expect("encode content"),
        ));
        let page_id = document.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let kid_count = kids.len() as i64;
    document.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => kid_count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        }),
    );
    let catalog_id = document.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    document.trailer.set("Root", catalog_id);

    document.save(path).expect("save pdf");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn pages_come_back_in_order() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("three.pdf");
        write_test_pdf(&path, &["alpha page", "bravo page", "charlie page"]);

        let pages = LopdfExtractor::default()
            .extract_pages(&path, false)
            .expect("extraction succeeds");

        assert_eq!(pages.len(), 3);
        assert_eq!(
            pages.iter().map(|page| page.number).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert!(pages[1].text.contains("bravo"));
    }

    #[test]
    fn parallel_extraction_matches_sequential() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("many.pdf");
        let texts: Vec<String> = (1..=12).map(|n| format!("page number {n}")).collect();
        let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
        write_test_pdf(&path, &refs);

        let extractor = LopdfExtractor {
            parallel_threshold: 2,
        };
        let sequential = extractor.extract_pages(&path, false).expect("sequential");
        let parallel = extractor.extract_pages(&path, true).expect("parallel");

        assert_eq!(sequential.len(), parallel.len());
        for (left, right) in sequential.iter().zip(parallel.iter()) {
            assert_eq!(left.number, right.number);
            assert_eq!(left.text, right.text);
        }
    }

    #[test]
    fn unreadable_pdf_is_a_parse_error() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("broken.pdf");
        fs::write(&path, b"%PDF-1.4\n%broken").expect("write file");

        let result = LopdfExtractor::default().extract_pages(&path, false);
        assert!(matches!(result, Err(IngestError::PdfParse(_))));
    }

    #[test]
    fn validate_rejects_garbage() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("nope.pdf");
        fs::write(&path, b"not a pdf at all").expect("write file");

        assert!(validate_pdf(&path).is_err());
    }

    #[test]
    fn validate_accepts_real_pdf() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("ok.pdf");
        write_test_pdf(&path, &["hello"]);

        assert_eq!(validate_pdf(&path).expect("valid"), 1);
    }
}
