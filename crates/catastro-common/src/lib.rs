//! Common types and utilities shared across the Catastro gateway crates.

pub mod bbox;
pub mod crs;
pub mod error;
pub mod names;
pub mod reference;

pub use bbox::BoundingBox;
pub use crs::{AxisOrder, SrsClass};
pub use error::{CatastroError, CatastroResult};
pub use names::name_matches;
pub use reference::{CadastralReference, ParcelKey, QueryShape};
