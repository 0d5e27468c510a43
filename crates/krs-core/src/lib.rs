//! Core types, rules and engine for course registration (KRS) and grade
//! finalization.
//!
//! This crate is deliberately free of HTTP and database dependencies. Engine
//! operations in [`engine`] run against a [`unit::UnitOfWork`]; backends
//! supply the transaction and the async [`store::AcademicStore`] facade.

pub mod catalog;
pub mod conflict;
pub mod engine;
pub mod error;
pub mod grade;
pub mod load;
pub mod quota;
pub mod registration;
pub mod store;
pub mod term;
pub mod transcript;
pub mod unit;

pub use error::{Categorize, Error, ErrorCategory, Result};
