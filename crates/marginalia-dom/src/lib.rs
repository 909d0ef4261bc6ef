//! # marginalia-dom
//!
//! An arena-backed, mutable document tree implementing
//! [`marginalia_core::DocumentTree`].
//!
//! It plays the host role wherever there is no browser: tests build fixtures
//! from HTML strings, and the CLI renders highlights into HTML files.
//!
//! ```
//! use marginalia_core::DocumentTree;
//! use marginalia_dom::Document;
//!
//! let doc = Document::parse_html("<article><p>Hello <b>world</b></p></article>");
//! let body = doc.body().unwrap();
//! assert_eq!(doc.text_content(body), "Hello world");
//! ```

mod document;
mod html;
mod selection;

pub use document::Document;
