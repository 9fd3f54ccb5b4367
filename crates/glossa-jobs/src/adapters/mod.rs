//! Document format adapters for the translation pipeline.
//!
//! Extraction shells out to the poppler tools; rendering builds the
//! translated artifact in-process with `lopdf`.

pub mod pdf_render;
pub mod pdf_text;

pub use pdf_render::PdfRenderer;
pub use pdf_text::PdfTextExtractor;
