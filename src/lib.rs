// src/lib.rs
//
// Semantic analysis front end for the Sable scripting language.

pub mod errors;
pub mod frontend;
pub mod identity;
pub mod logging;
pub mod project;
pub mod sema;
