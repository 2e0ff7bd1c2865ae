//! Pipeline stages for Markdown-to-HTML conversion of one stored object.
//!
//! Each submodule implements one step and maps its failures onto the
//! matching [`crate::error::Md2HtmlError`] variant.
//!
//! ## Data Flow
//!
//! ```text
//! inspect ──▶ fetch ──▶ render ──▶ publish
//! (HEAD size)  (GET)    (cmark)   (write + PUT)
//! ```
//!
//! 1. [`inspect`]: look up the object size and enforce the size limit
//!    before any bytes are transferred
//! 2. [`fetch`]: download the object into the record's
//!    [`workspace::WorkingDirectory`], mirroring the key's folders
//! 3. [`render`]: decode UTF-8 and render with pulldown-cmark
//! 4. [`publish`]: derive the `.html` key, write the file locally and
//!    upload it to the target bucket
//!
//! [`workspace`] owns the scratch directory all of the above write into and
//! removes it afterwards.

pub mod fetch;
pub mod inspect;
pub mod publish;
pub mod render;
pub mod workspace;
