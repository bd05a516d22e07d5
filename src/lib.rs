#![allow(clippy::excessive_precision)]
#![allow(missing_docs)]

pub mod backend;
pub mod checkpoint;
pub mod encode;
pub mod error;
pub mod field;
pub mod function;
pub mod metric;
pub mod preset;
pub mod render;
