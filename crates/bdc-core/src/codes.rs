//! Code tables for the categorical columns of availability and challenge
//! records, plus the USPS/FIPS state crosswalk.
//!
//! The `*_CODES` slices are the declared domains the summary stages build
//! their column schemas from. Order matters: it fixes column order.

use serde::{Deserialize, Serialize};

/// Service tier codes in declaration order.
pub const STATUS_CODES: [i64; 3] = [0, 1, 2];

/// Access technology codes in declaration order (`0` is "other").
pub const TECHNOLOGY_CODES: [i64; 9] = [10, 40, 50, 60, 61, 70, 71, 72, 0];

/// Technologies that can deliver served or underserved service.
pub const RELIABLE_TECHNOLOGY_CODES: [i64; 5] = [10, 40, 50, 71, 72];

/// Challenge outcome codes in declaration order.
pub const OUTCOME_CODES: [i64; 3] = [0, 1, 2];

/// Challenge category codes in declaration order (7 is not assigned).
pub const CATEGORY_CODES: [i64; 8] = [1, 2, 3, 4, 5, 6, 8, 9];

/// Ordinal service tier derived from advertised capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum ServiceTier {
    Served = 0,
    Underserved = 1,
    Unserved = 2,
}

impl ServiceTier {
    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }
}

impl From<ServiceTier> for u8 {
    fn from(tier: ServiceTier) -> Self {
        tier.code()
    }
}

impl TryFrom<u8> for ServiceTier {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::Served),
            1 => Ok(Self::Underserved),
            2 => Ok(Self::Unserved),
            other => Err(format!("invalid service tier code {other}")),
        }
    }
}

/// Adjudicated outcome of a challenge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Upheld = 0,
    Overturned = 1,
    Withdrawn = 2,
}

impl Outcome {
    /// Map the published outcome text onto its code. Returns `None` for
    /// text outside the published vocabulary.
    #[must_use]
    pub fn from_text(text: &str) -> Option<Self> {
        match text.trim() {
            "Challenge Upheld - Provider Conceded"
            | "Challenge Upheld - Service Change"
            | "Challenge Upheld - Adjudicated by FCC" => Some(Self::Upheld),
            "Challenge Overturned" => Some(Self::Overturned),
            "Challenge Withdrawn" => Some(Self::Withdrawn),
            _ => None,
        }
    }

    #[must_use]
    pub const fn code(self) -> i64 {
        self as i64
    }
}

/// States, DC and inhabited territories as (USPS, FIPS).
const STATES: [(&str, &str); 56] = [
    ("AL", "01"),
    ("AK", "02"),
    ("AZ", "04"),
    ("AR", "05"),
    ("CA", "06"),
    ("CO", "08"),
    ("CT", "09"),
    ("DE", "10"),
    ("DC", "11"),
    ("FL", "12"),
    ("GA", "13"),
    ("HI", "15"),
    ("ID", "16"),
    ("IL", "17"),
    ("IN", "18"),
    ("IA", "19"),
    ("KS", "20"),
    ("KY", "21"),
    ("LA", "22"),
    ("ME", "23"),
    ("MD", "24"),
    ("MA", "25"),
    ("MI", "26"),
    ("MN", "27"),
    ("MS", "28"),
    ("MO", "29"),
    ("MT", "30"),
    ("NE", "31"),
    ("NV", "32"),
    ("NH", "33"),
    ("NJ", "34"),
    ("NM", "35"),
    ("NY", "36"),
    ("NC", "37"),
    ("ND", "38"),
    ("OH", "39"),
    ("OK", "40"),
    ("OR", "41"),
    ("PA", "42"),
    ("RI", "44"),
    ("SC", "45"),
    ("SD", "46"),
    ("TN", "47"),
    ("TX", "48"),
    ("UT", "49"),
    ("VT", "50"),
    ("VA", "51"),
    ("WA", "53"),
    ("WV", "54"),
    ("WI", "55"),
    ("WY", "56"),
    ("AS", "60"),
    ("GU", "66"),
    ("MP", "69"),
    ("PR", "72"),
    ("VI", "78"),
];

/// FIPS code for a USPS abbreviation.
#[must_use]
pub fn fips_for_abbr(abbr: &str) -> Option<&'static str> {
    let abbr = abbr.trim();
    STATES
        .iter()
        .find(|(usps, _)| usps.eq_ignore_ascii_case(abbr))
        .map(|(_, fips)| *fips)
}

/// USPS abbreviation for a FIPS code.
#[must_use]
pub fn abbr_for_fips(fips: &str) -> Option<&'static str> {
    STATES
        .iter()
        .find(|(_, code)| *code == fips.trim())
        .map(|(usps, _)| *usps)
}
