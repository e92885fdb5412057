//! `stencil_core` turns `<<marker>>` placeholders in template documents into
//! things an editor can work with: editable units in flat markup, or typed
//! variable nodes in a structured document tree.
//!
//! ## Processing Pipeline
//!
//! ```text
//! Template markup
//!   → Scanner (finds non-overlapping marker occurrences)
//!   → Materializer (rewrites each occurrence into an editable unit)     flat path
//!   → EditableDocument + UpdateObserver (edits become update records)
//!
//! Document tree (ProseMirror JSON or markup)
//!   → Expander (splits text runs into text and variable nodes)         tree path
//!   → fill (replaces variables with their values)
//! ```
//!
//! ## Modules
//!
//! - [`config`] - The marker grammar and `stencil.toml` loading.
//! - [`scanner`] - Marker discovery with a non-greedy delimiter grammar.
//! - [`materializer`] - Editable unit generation with an explicit id
//!   generator.
//! - [`document`] - The typed document tree, its JSON form and a markup
//!   parser.
//! - [`expander`] - Marker expansion and value filling over document trees.
//! - [`observer`] - Change observation for editable units.
//!
//! ## Quick Start
//!
//! ```rust
//! use stencil_core::IdGenerator;
//! use stencil_core::MarkerGrammar;
//! use stencil_core::materialize;
//! use stencil_core::scan;
//!
//! let grammar = MarkerGrammar::default();
//! let markers = scan("Dear <<customer_name>>.", &grammar).unwrap();
//! assert_eq!(markers[0].raw_body, "customer_name");
//!
//! let output = materialize("<p>Hi &lt;&lt;name&gt;&gt;</p>", None, &grammar, IdGenerator::new(0)).unwrap();
//! assert!(output.html.contains("data-marker=\"name\""));
//! ```

pub use config::*;
pub use container::*;
pub use document::*;
pub use entities::*;
pub use error::*;
pub use expander::*;
pub use materializer::*;
pub use observer::*;
pub use scanner::*;
pub use session::*;

pub mod config;
mod container;
pub mod document;
mod entities;
#[allow(unused_assignments)]
mod error;
pub mod expander;
pub(crate) mod markup;
pub mod materializer;
pub mod observer;
pub mod scanner;
mod session;

#[cfg(test)]
mod __fixtures;
