//! # system-finder
//!
//! Catalogs Bevy-style ECS systems in a Rust source tree by how their
//! parameters access named entities, then answers substring-and-category
//! queries over the catalog.
//!
//! ## Architecture
//!
//! - **scan**: Rust source file discovery under one or more roots
//! - **parse**: syn-based extraction of function declarations and spans
//! - **classify**: recursive access-category dispatch over parameter types
//! - **index**: per-category inverted maps plus the sigil query language
//! - **finder**: rebuild orchestration, source ownership and rendering lookups

pub mod classify;
pub mod cli;
pub mod finder;
pub mod index;
pub mod parse;
pub mod scan;
