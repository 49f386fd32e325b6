//! Output side of `cx build`.
pub mod bin;
