//! PDF text extraction, one entry per page that yields text.

use std::path::Path;

use pdf_oxide::converters::ConversionOptions;
use tracing::{debug, info};

use crate::error::{RagError, RagResult};

#[derive(Debug, Clone)]
pub struct PdfPageText {
    pub page_number: u32,
    pub text: String,
}

fn conversion_options() -> ConversionOptions {
    ConversionOptions {
        include_images: false,
        ..ConversionOptions::default()
    }
}

pub fn load_pdf_pages(path: &Path) -> RagResult<Vec<PdfPageText>> {
    info!("Loading PDF: {}", path.display());

    if !path.exists() {
        return Err(RagError::SourceNotFound(path.to_path_buf()));
    }

    let path_str = path
        .to_str()
        .ok_or_else(|| RagError::Parse(format!("non UTF-8 path: {}", path.display())))?;
    let mut doc =
        pdf_oxide::PdfDocument::open(path_str).map_err(|e| RagError::Parse(e.to_string()))?;
    let page_count = doc.page_count().map_err(|e| RagError::Parse(e.to_string()))?;
    let options = conversion_options();
    let mut pages = Vec::new();

    for page_index in 0..page_count {
        let text = doc
            .to_markdown(page_index, &options)
            .map_err(|e| RagError::Parse(e.to_string()))?;
        if text.trim().is_empty() {
            debug!("page {} has no extractable text", page_index + 1);
            continue;
        }
        pages.push(PdfPageText {
            page_number: (page_index + 1) as u32,
            text,
        });
    }

    if pages.is_empty() {
        return Err(RagError::Parse(format!(
            "no extractable text in {}",
            path.display()
        )));
    }

    info!("PDF loaded with {} pages", pages.len());
    Ok(pages)
}
