//! # Hearth Core
//!
//! Types shared by every Hearth crate.
//!
//! Currently this is the [`exception`] module: the framework-wide [`Error`]
//! enum and [`Result`] alias that handlers and middleware return.

pub mod exception;

pub use exception::{Error, Result};
