//! Domains module containing business logic organized by bounded contexts.
//!
//! The gateway has a single domain: tools, which are stored definitions of
//! upstream HTTP operations.

pub mod tools;
