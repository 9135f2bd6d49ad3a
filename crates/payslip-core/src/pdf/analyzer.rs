//! Page statistics from lopdf and text density from pdf-extract.

use std::path::Path;

use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::{debug, trace, warn};

use super::{DocumentAnalyzer, Result};
use crate::error::PdfError;
use crate::models::DocumentAnalysis;

const LARGE_PAGE_COUNT: usize = 50;
const LARGE_INPUT_BYTES: usize = 10 * 1024 * 1024;
const TEXT_HEAVY_CHARS_PER_PAGE: usize = 500;
const COMPLEX_LAYOUT_FRACTION: f32 = 0.2;
const MIN_COLUMN_GAPS: usize = 3;
/// A4 rendered at 150 dpi, RGBA.
const PAGE_RENDER_BYTES: u64 = 1240 * 1754 * 4;
/// Pages with an image and less text than this are treated as scanned.
const SCANNED_PAGE_TEXT_CHARS: usize = 50;
const VECTOR_HEAVY_OPS: usize = 500;

const PATH_OPERATORS: [&str; 7] = ["m", "l", "c", "v", "y", "re", "h"];

#[derive(Debug, Clone, Default)]
struct PageStats {
    images: usize,
    image_bytes: u64,
    path_ops: usize,
}

/// Analyzer over a loaded PDF.
pub struct PdfAnalyzer {
    document: Document,
    raw_data: Vec<u8>,
}

impl PdfAnalyzer {
    /// Load a PDF, decrypting it when it only has an empty user password.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let mut document = Document::load_mem(data).map_err(|e| PdfError::Unreadable(e.to_string()))?;

        let raw_data = if document.is_encrypted() {
            if document.decrypt("").is_err() {
                return Err(PdfError::PasswordProtected);
            }
            debug!("Decrypted PDF with empty password");

            // pdf-extract needs the decrypted bytes
            let mut decrypted = Vec::new();
            document
                .save_to(&mut decrypted)
                .map_err(|e| PdfError::Unreadable(format!("decrypted copy could not be saved: {}", e)))?;
            decrypted
        } else {
            data.to_vec()
        };

        if document.get_pages().is_empty() {
            return Err(PdfError::NoPages);
        }

        debug!("Loaded PDF with {} pages", document.get_pages().len());
        Ok(Self { document, raw_data })
    }

    pub fn open(path: &Path) -> Result<Self> {
        let data = std::fs::read(path).map_err(|source| PdfError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_bytes(&data)
    }

    pub fn page_count(&self) -> usize {
        self.document.get_pages().len()
    }

    /// Plain text of the whole document.
    pub fn text(&self) -> Result<String> {
        pdf_extract::extract_text_from_mem(&self.raw_data).map_err(|e| PdfError::NoTextLayer(e.to_string()))
    }

    /// Plain text per page, in page order.
    pub fn page_texts(&self) -> Result<Vec<String>> {
        pdf_extract::extract_text_from_mem_by_pages(&self.raw_data)
            .map_err(|e| PdfError::NoTextLayer(e.to_string()))
    }

    fn page_stats(&self, page_id: ObjectId) -> PageStats {
        let mut stats = PageStats::default();

        if let Some(resources) = self.page_resources(page_id) {
            if let Ok((_, Object::Dictionary(xobjects))) = resources
                .get(b"XObject")
                .and_then(|x| self.document.dereference(x))
            {
                for (_, reference) in xobjects.iter() {
                    if let Ok((_, obj)) = self.document.dereference(reference) {
                        if let Some(bytes) = image_bytes(obj) {
                            stats.images += 1;
                            stats.image_bytes += bytes;
                        }
                    }
                }
            }
        }

        match self.document.get_and_decode_page_content(page_id) {
            Ok(content) => {
                stats.path_ops = content
                    .operations
                    .iter()
                    .filter(|op| PATH_OPERATORS.contains(&op.operator.as_str()))
                    .count();
            }
            Err(e) => trace!("Could not decode content of page {:?}: {}", page_id, e),
        }

        stats
    }

    /// Resources of a page, inherited from the page tree when absent.
    fn page_resources(&self, page_id: ObjectId) -> Option<&Dictionary> {
        let mut node = self.document.get_dictionary(page_id).ok()?;
        loop {
            if let Ok(resources) = node.get(b"Resources") {
                if let Ok((_, Object::Dictionary(dict))) = self.document.dereference(resources) {
                    return Some(dict);
                }
            }
            let parent = node.get(b"Parent").and_then(Object::as_reference).ok()?;
            node = self.document.get_dictionary(parent).ok()?;
        }
    }
}

impl DocumentAnalyzer for PdfAnalyzer {
    fn analyze(&self) -> Result<DocumentAnalysis> {
        let pages = self.document.get_pages();
        if pages.is_empty() {
            return Err(PdfError::NoPages);
        }
        let stats: Vec<PageStats> = pages.values().map(|id| self.page_stats(*id)).collect();

        let texts = match self.page_texts() {
            Ok(texts) => texts,
            Err(e) => {
                warn!("No text layer could be read, assuming scanned pages: {}", e);
                vec![String::new(); stats.len()]
            }
        };

        let analysis = summarize(&stats, &texts, self.raw_data.len());
        debug!(
            "PDF analysis: {} pages, scanned={}, text_heavy={}, complex={}, {} bytes estimated",
            analysis.page_count,
            analysis.contains_scanned_content,
            analysis.is_text_heavy,
            analysis.has_complex_layout,
            analysis.estimated_memory_requirement
        );
        Ok(analysis)
    }
}

fn summarize(stats: &[PageStats], texts: &[String], input_bytes: usize) -> DocumentAnalysis {
    let page_count = stats.len();
    let chars_on = |page: usize| texts.get(page).map(|t| t.trim().chars().count()).unwrap_or(0);
    let total_chars: usize = (0..page_count).map(chars_on).sum();

    let contains_scanned_content = stats
        .iter()
        .enumerate()
        .any(|(page, s)| s.images > 0 && chars_on(page) < SCANNED_PAGE_TEXT_CHARS);
    let contains_graphics = stats
        .iter()
        .any(|s| s.images > 0 || s.path_ops >= VECTOR_HEAVY_OPS);

    let image_bytes: u64 = stats.iter().map(|s| s.image_bytes).sum();
    let estimated_memory_requirement = page_count as u64 * PAGE_RENDER_BYTES + image_bytes;

    DocumentAnalysis {
        page_count,
        is_large_document: page_count > LARGE_PAGE_COUNT || input_bytes > LARGE_INPUT_BYTES,
        estimated_memory_requirement,
        contains_scanned_content,
        is_text_heavy: page_count > 0 && total_chars / page_count >= TEXT_HEAVY_CHARS_PER_PAGE,
        has_complex_layout: layout_complexity(&texts.join("\n")) >= COMPLEX_LAYOUT_FRACTION,
        contains_graphics,
    }
}

/// Decoded size of an image XObject, `None` for anything else.
fn image_bytes(obj: &Object) -> Option<u64> {
    let Object::Stream(stream) = obj else {
        return None;
    };
    let dict = &stream.dict;
    if dict.get(b"Subtype").and_then(Object::as_name).ok()? != b"Image" {
        return None;
    }

    let width = dict.get(b"Width").and_then(Object::as_i64).ok()?.max(0) as u64;
    let height = dict.get(b"Height").and_then(Object::as_i64).ok()?.max(0) as u64;
    let bits = dict
        .get(b"BitsPerComponent")
        .and_then(Object::as_i64)
        .unwrap_or(8)
        .max(1) as u64;
    let components = match dict.get(b"ColorSpace").and_then(Object::as_name) {
        Ok(b"DeviceGray") | Ok(b"G") => 1,
        Ok(b"DeviceCMYK") | Ok(b"CMYK") => 4,
        _ => 3,
    };

    Some((width * height * components * bits).div_ceil(8))
}

/// Number of wide whitespace gaps between words of a line.
///
/// A gap is a run of two or more spaces, or any tab, between text.
pub fn column_gaps(line: &str) -> usize {
    line.trim()
        .split(|c: char| c != ' ' && c != '\t')
        .filter(|run| run.len() >= 2 || run.contains('\t'))
        .count()
}

/// Fraction of non-blank lines that look like multi-column rows.
pub fn layout_complexity(text: &str) -> f32 {
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    if lines.is_empty() {
        return 0.0;
    }
    let columnar = lines
        .iter()
        .filter(|l| column_gaps(l) >= MIN_COLUMN_GAPS)
        .count();
    columnar as f32 / lines.len() as f32
}
