//! HTTP surface for the book recommender.

pub mod server;
