//! Core types and traits for the book recommendation service.
//!
//! Graph vocabulary (users, books, `reviewed`, weighted book-to-book links)
//! follows the Amazon co-purchase dataset the graph is loaded from.

mod dto;
mod graph;
mod traits;

pub use dto::*;
pub use graph::*;
pub use traits::*;
