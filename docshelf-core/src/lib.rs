//! Core types for docshelf, an embeddable store of named JSON document collections.
//!
//! This crate is the core of the docshelf project and provides:
//!
//! - **Documents** ([`document`]) - Ordered field maps and the identities that key them
//! - **Identity assignment** ([`identity`]) - Generating identities and creation stamps on insert
//! - **Predicates and results** ([`query`]) - Selectors, update options and operation outcomes
//! - **Persistence abstraction** ([`backend`]) - Traits for mirroring a collection to storage
//! - **Configuration** ([`config`]) - Per-collection settings
//! - **Error handling** ([`error`]) - Error types and result types
//!
//! The collection engine itself lives in `docshelf-memory`, and the JSON file
//! backend in `docshelf-file`.

#[allow(unused_extern_crates)]
extern crate self as docshelf_core;

pub mod backend;
pub mod config;
pub mod document;
pub mod error;
pub mod identity;
pub mod query;
