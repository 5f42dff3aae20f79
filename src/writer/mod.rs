//! Lowering of a finished document model to `.docx` bytes.
//!
//! This is a convenience shim over the packaging library. Formatting the
//! library cannot express (comment anchors, sequence fields, per-section
//! column properties) stays in the model for richer packers and is
//! skipped here with a debug log.

mod docx;
mod styles;

pub use docx::DocxWriter;
pub use styles::DocxStyles;
