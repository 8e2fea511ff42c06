// SPDX-License-Identifier: MIT
//! # quill-doc: the document layer for quill
//!
//! - **[`document`]**: `Document`, rope text with a single char cursor
//! - **[`sink`]**: `DocumentSink`, the four operations generated text is written through
//! - **[`view`]**: `DocView`, soft-wrapped rendering that keeps the cursor on screen

pub mod document;
pub mod sink;
pub mod view;

pub use document::Document;
pub use sink::DocumentSink;
pub use view::{Area, DocView};
