//! # Spectra Core
//!
//! Core types for per-year spectral index computation.
//!
//! This crate provides:
//! - `IndexRequest`: the JSON request (area of interest + years)
//! - `YearRange`, `IndexParams`: acquisition window and composite settings
//! - `SpectralIndex`, `Band`, `IndexBundle`: the index catalogue and results
//! - `Formula`: band-algebra parser and scalar evaluator
//!
//! Nothing here performs I/O; remote evaluation lives in `spectra-cloud`.

pub mod error;
pub mod formula;
pub mod index;
pub mod request;

pub use error::{Error, Result};
pub use formula::{BinOp, Expr, Formula};
pub use index::{Band, IndexBundle, IndexDefinition, SpectralIndex};
pub use request::{IndexParams, IndexRequest, YearRange};
