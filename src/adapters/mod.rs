//! Readers for input document formats.

pub mod docx;
