// statespace_core/src/lib.rs

// This file defines the public modules of the library.
pub mod data;
pub mod error;
pub mod estimation;
pub mod linalg;
pub mod model;
pub mod prelude;
pub mod simulate;
pub mod types;
