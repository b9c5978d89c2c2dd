//! Census geography levels and the containment chain of a location.

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

/// Census geography levels, coarsest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GeoLevel {
    State,
    County,
    Tract,
    BlockGroup,
    Block,
}

impl GeoLevel {
    pub const ALL: [Self; 5] = [
        Self::State,
        Self::County,
        Self::Tract,
        Self::BlockGroup,
        Self::Block,
    ];

    /// Length in characters of a geoid at this level.
    #[must_use]
    pub const fn geoid_len(self) -> usize {
        match self {
            Self::State => 2,
            Self::County => 5,
            Self::Tract => 11,
            Self::BlockGroup => 12,
            Self::Block => 15,
        }
    }

    /// Level name as used in file names (`<name>_summary.csv`).
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::State => "state",
            Self::County => "county",
            Self::Tract => "tract",
            Self::BlockGroup => "block_group",
            Self::Block => "block",
        }
    }

    /// Column holding this level's geoid in record tables.
    #[must_use]
    pub const fn column(self) -> &'static str {
        match self {
            Self::State => "state_geoid",
            Self::County => "county_geoid",
            Self::Tract => "tract_geoid",
            Self::BlockGroup => "block_group_geoid",
            Self::Block => "block_geoid",
        }
    }

    /// Prefix of `block_geoid` at this level. Shorter inputs are returned
    /// unchanged, empty input stays empty.
    #[must_use]
    pub fn truncate(self, block_geoid: &str) -> String {
        block_geoid.chars().take(self.geoid_len()).collect()
    }
}

/// Nested geoids of one location, state through block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GeoChain {
    #[serde(default)]
    pub state_geoid: String,
    #[serde(default)]
    pub county_geoid: String,
    #[serde(default)]
    pub tract_geoid: String,
    #[serde(default)]
    pub block_group_geoid: String,
    #[serde(default)]
    pub block_geoid: String,
}

impl GeoChain {
    /// Derive every level from a block geoid.
    #[must_use]
    pub fn from_block(block_geoid: &str) -> Self {
        Self {
            state_geoid: GeoLevel::State.truncate(block_geoid),
            county_geoid: GeoLevel::County.truncate(block_geoid),
            tract_geoid: GeoLevel::Tract.truncate(block_geoid),
            block_group_geoid: GeoLevel::BlockGroup.truncate(block_geoid),
            block_geoid: block_geoid.to_string(),
        }
    }

    #[must_use]
    pub fn geoid(&self, level: GeoLevel) -> &str {
        match level {
            GeoLevel::State => &self.state_geoid,
            GeoLevel::County => &self.county_geoid,
            GeoLevel::Tract => &self.tract_geoid,
            GeoLevel::BlockGroup => &self.block_group_geoid,
            GeoLevel::Block => &self.block_geoid,
        }
    }

    /// Check that every non-empty geoid has its level's length and is an
    /// exact prefix of the next finer non-empty geoid.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InconsistentChain`] naming the first
    /// offending level.
    pub fn validate(&self, location_id: &str) -> Result<()> {
        let mut coarser: Option<(GeoLevel, &str)> = None;
        for level in GeoLevel::ALL {
            let geoid = self.geoid(level);
            if geoid.is_empty() {
                continue;
            }
            if geoid.len() != level.geoid_len() {
                return Err(PipelineError::InconsistentChain {
                    location_id: location_id.to_string(),
                    detail: format!(
                        "{} '{geoid}' should have {} characters",
                        level.column(),
                        level.geoid_len()
                    ),
                });
            }
            if let Some((outer, outer_geoid)) = coarser
                && !geoid.starts_with(outer_geoid)
            {
                return Err(PipelineError::InconsistentChain {
                    location_id: location_id.to_string(),
                    detail: format!(
                        "{} '{outer_geoid}' is not a prefix of {} '{geoid}'",
                        outer.column(),
                        level.column()
                    ),
                });
            }
            coarser = Some((level, geoid));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLOCK: &str = "010010201001000";

    #[test]
    fn chain_from_block_has_prefix_lengths() {
        let chain = GeoChain::from_block(BLOCK);
        assert_eq!(chain.state_geoid, "01");
        assert_eq!(chain.county_geoid, "01001");
        assert_eq!(chain.tract_geoid, "01001020100");
        assert_eq!(chain.block_group_geoid, "010010201001");
        assert_eq!(chain.block_geoid, BLOCK);
        assert!(chain.validate("loc").is_ok());
    }

    #[test]
    fn empty_block_gives_empty_chain() {
        let chain = GeoChain::from_block("");
        assert!(chain.state_geoid.is_empty());
        assert!(chain.block_group_geoid.is_empty());
        assert!(chain.block_geoid.is_empty());
        assert!(chain.validate("loc").is_ok());
    }

    #[test]
    fn mismatched_prefix_is_rejected() {
        let mut chain = GeoChain::from_block(BLOCK);
        chain.county_geoid = "01003".into();
        let err = chain.validate("loc-7").expect_err("county does not contain tract");
        let text = err.to_string();
        assert!(text.contains("loc-7"));
        assert!(text.contains("county_geoid"));
    }

    #[test]
    fn wrong_length_is_rejected() {
        let mut chain = GeoChain::from_block(BLOCK);
        chain.state_geoid = "1".into();
        assert!(chain.validate("loc").is_err());
    }
}
