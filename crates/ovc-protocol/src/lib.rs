//! Client-side protocol support for the Catastro OVC JSON services.
//!
//! The OVC "Callejero" and "Coordenadas" services answer with loosely shaped
//! JSON: one item or an array depending on the match count, errors in an
//! `lerr` list, operation-specific wrappers. This crate builds the requests
//! and maps every answer into a closed set of typed results, keeping the raw
//! payload when it does not fit.

pub mod endpoints;
pub mod json;
pub mod records;
pub mod response;

pub use endpoints::{AddressQuery, OvcEndpoint, OvcQuery, OvcService};
pub use records::{CoordinateMatch, Municipality, PropertyRecord, Province, Street, StreetNumber};
pub use response::{parse_response, OvcError, OvcResult, PropertyLookup};
