//! Cadastral reference (Referencia Catastral) parsing.
//!
//! A reference is 14 characters for a parcel (finca), 18 when it names a
//! building unit (cargo) inside the parcel and 20 with the two control
//! characters appended. The first 14 characters are always the parcel key.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::error::{CatastroError, CatastroResult};

/// Length of the parcel part of every reference.
pub const PARCEL_ID_LEN: usize = 14;

/// Accepted total lengths.
pub const VALID_LENGTHS: [usize; 3] = [14, 18, 20];

/// How upstream lookups keyed on a reference must be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryShape {
    /// 14 characters: every unit whose parcel prefix matches.
    ParcelFanOut,
    /// 18 or 20 characters: exactly one unit.
    UnitLookup,
}

/// Decomposition of the 14-character parcel key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParcelKey {
    /// Urban parcel: 7-character plot followed by the 7-character map sheet.
    Urban { plot: String, map_sheet: String },
    /// Rural parcel: province, municipality, sector, polygon and parcel.
    Rural {
        province: String,
        municipality: String,
        sector: String,
        polygon: String,
        parcel: String,
    },
}

/// A validated cadastral reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct CadastralReference {
    raw: String,
    parcel_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    unit_suffix: Option<String>,
}

impl CadastralReference {
    /// Parse and validate a reference.
    ///
    /// Surrounding whitespace is ignored and letters are upper-cased before
    /// validation.
    pub fn parse(input: &str) -> CatastroResult<Self> {
        let raw = input.trim().to_uppercase();
        let invalid = |reason: String| CatastroError::InvalidReferenceFormat {
            reference: input.to_string(),
            reason,
        };

        if let Some(bad) = raw.chars().find(|c| !c.is_ascii_alphanumeric()) {
            return Err(invalid(format!("character '{}' is not allowed", bad)));
        }

        let len = raw.len();
        if !VALID_LENGTHS.contains(&len) {
            return Err(invalid(format!(
                "expected 14, 18 or 20 characters, got {}",
                len
            )));
        }

        let parcel_id = raw[..PARCEL_ID_LEN].to_string();
        let unit_suffix = (len > PARCEL_ID_LEN).then(|| raw[PARCEL_ID_LEN..].to_string());

        Ok(Self {
            raw,
            parcel_id,
            unit_suffix,
        })
    }

    /// The normalised full reference.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The 14-character parcel key.
    pub fn parcel_id(&self) -> &str {
        &self.parcel_id
    }

    /// Characters after the parcel key (4 or 6), if any.
    pub fn unit_suffix(&self) -> Option<&str> {
        self.unit_suffix.as_deref()
    }

    /// Building-unit number (positions 15 to 18).
    pub fn unit(&self) -> Option<&str> {
        self.unit_suffix.as_deref().map(|s| &s[..4])
    }

    /// Control characters (positions 19 and 20) of the 20-character form.
    pub fn control(&self) -> Option<&str> {
        self.unit_suffix
            .as_deref()
            .filter(|s| s.len() == 6)
            .map(|s| &s[4..])
    }

    /// Query shape implied by the reference length.
    pub fn query_shape(&self) -> QueryShape {
        if self.unit_suffix.is_some() {
            QueryShape::UnitLookup
        } else {
            QueryShape::ParcelFanOut
        }
    }

    /// Split the parcel key into its urban or rural components.
    pub fn parcel_key(&self) -> ParcelKey {
        let p = &self.parcel_id;
        let is_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
        let sector_is_letter = p.as_bytes()[5].is_ascii_alphabetic();

        if is_digits(&p[..5]) && sector_is_letter && is_digits(&p[6..]) {
            ParcelKey::Rural {
                province: p[..2].to_string(),
                municipality: p[2..5].to_string(),
                sector: p[5..6].to_string(),
                polygon: p[6..9].to_string(),
                parcel: p[9..].to_string(),
            }
        } else {
            ParcelKey::Urban {
                plot: p[..7].to_string(),
                map_sheet: p[7..].to_string(),
            }
        }
    }

    /// Whether a reference returned by an upstream query belongs to the set
    /// this reference asks for.
    ///
    /// A parcel key matches every unit of the parcel; a unit reference matches
    /// itself (an 18-character reference also matches its 20-character form).
    pub fn covers(&self, candidate: &str) -> bool {
        let candidate = candidate.trim().to_uppercase();
        match self.query_shape() {
            QueryShape::ParcelFanOut => candidate.starts_with(&self.parcel_id),
            QueryShape::UnitLookup => {
                candidate.starts_with(&self.raw) || self.raw.starts_with(&candidate)
            }
        }
    }
}

impl FromStr for CadastralReference {
    type Err = CatastroError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for CadastralReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}
