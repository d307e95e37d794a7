//! Conversion pipeline stages.
//!
//! ```text
//! source.md ─► input ─► lines ─┬─► classify ──► Block ─┐
//!                              │     ├ inline          │
//!                              │     └ image ◄─ assets │
//!                              └───────────────────────┴─► assemble ─► Document
//!                                                                          │
//!                                    exports/source.docx ◄─ export ◄─ docx ┘
//! ```
//!
//! Each stage is independently testable; [`crate::convert`] wires them
//! together.

pub mod assemble;
pub mod assets;
pub mod classify;
pub mod docx;
pub mod export;
pub mod image;
pub mod inline;
pub mod input;
