//! TJA to Fumen chart converter
//!
//! [`tja`] parses a TJA song into courses of measures, [`convert`] turns each
//! course into a [`fumen::FumenCourse`], and [`fumen`] reads and writes the
//! binary chart format.

pub mod branches;
pub mod constants;
pub mod convert;
pub mod error;
pub mod fumen;
pub mod tja;
pub mod warning;

pub use convert::{ConvertOptions, Converter};
pub use error::Error;
pub use warning::{Warning, Warnings};
