//! Row types of the record tables read and written by the pipeline.
//!
//! Identifier-like columns (location, provider, geoids) are always strings so
//! leading zeros survive a round trip.

use serde::{Deserialize, Serialize};

use crate::aggregate::Row;
use crate::codes::ServiceTier;
use crate::geo::{GeoChain, GeoLevel};

/// One (location, provider, technology) availability report.
///
/// Raw technology files carry only `block_geoid`; the coarser geoids and
/// `status` are filled in by consolidation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityRecord {
    #[serde(default)]
    pub frn: String,
    #[serde(default)]
    pub provider_id: String,
    #[serde(default)]
    pub brand_name: String,
    pub location_id: String,
    pub technology: i64,
    pub max_advertised_download_speed: u32,
    pub max_advertised_upload_speed: u32,
    pub low_latency: u8,
    #[serde(default)]
    pub business_residential_code: String,
    #[serde(default)]
    pub state_usps: String,
    #[serde(default)]
    pub block_geoid: String,
    #[serde(default)]
    pub h3_res8_id: String,
    #[serde(default)]
    pub state_geoid: String,
    #[serde(default)]
    pub county_geoid: String,
    #[serde(default)]
    pub tract_geoid: String,
    #[serde(default)]
    pub block_group_geoid: String,
    #[serde(default)]
    pub status: Option<ServiceTier>,
}

impl AvailabilityRecord {
    #[must_use]
    pub const fn is_low_latency(&self) -> bool {
        self.low_latency != 0
    }

    #[must_use]
    pub fn is_business_only(&self) -> bool {
        self.business_residential_code.trim() == "B"
    }

    /// Fill the coarser geoids from `block_geoid`.
    pub fn derive_geoids(&mut self) {
        let chain = GeoChain::from_block(&self.block_geoid);
        self.state_geoid = chain.state_geoid;
        self.county_geoid = chain.county_geoid;
        self.tract_geoid = chain.tract_geoid;
        self.block_group_geoid = chain.block_group_geoid;
    }

    #[must_use]
    pub fn chain(&self) -> GeoChain {
        GeoChain {
            state_geoid: self.state_geoid.clone(),
            county_geoid: self.county_geoid.clone(),
            tract_geoid: self.tract_geoid.clone(),
            block_group_geoid: self.block_group_geoid.clone(),
            block_geoid: self.block_geoid.clone(),
        }
    }
}

impl Row for AvailabilityRecord {
    fn entity(&self) -> &str {
        &self.location_id
    }

    fn text(&self, column: &str) -> Option<&str> {
        match column {
            "location_id" => Some(&self.location_id),
            "state_geoid" => Some(&self.state_geoid),
            "county_geoid" => Some(&self.county_geoid),
            "tract_geoid" => Some(&self.tract_geoid),
            "block_group_geoid" => Some(&self.block_group_geoid),
            "block_geoid" => Some(&self.block_geoid),
            _ => None,
        }
    }

    fn code(&self, column: &str) -> Option<i64> {
        match column {
            "technology" => Some(self.technology),
            "status" => self.status.map(|tier| i64::from(tier.code())),
            _ => None,
        }
    }
}

/// A location with its containment chain, as observed in one snapshot.
///
/// Rows of `bsl_geolocation.csv`; `as_of_date` is empty when read straight
/// from a consolidated availability table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BslLocation {
    pub location_id: String,
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
    #[serde(default)]
    pub as_of_date: String,
}

impl BslLocation {
    #[must_use]
    pub fn chain(&self) -> GeoChain {
        GeoChain {
            state_geoid: self.state_geoid.clone(),
            county_geoid: self.county_geoid.clone(),
            tract_geoid: self.tract_geoid.clone(),
            block_group_geoid: self.block_group_geoid.clone(),
            block_geoid: self.block_geoid.clone(),
        }
    }
}

/// One filed availability challenge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeRecord {
    pub challenge_id: String,
    pub location_id: String,
    #[serde(default)]
    pub location_state: String,
    #[serde(default)]
    pub data_vintage: String,
    #[serde(default)]
    pub frn: String,
    #[serde(default)]
    pub provider_id: String,
    #[serde(default)]
    pub provider_brand_name: String,
    #[serde(default)]
    pub holding_company_name: String,
    #[serde(default)]
    pub technology: Option<i64>,
    #[serde(default)]
    pub category_code: Option<i64>,
    #[serde(default)]
    pub category_code_desc: String,
    #[serde(default)]
    pub request_date: String,
    #[serde(default)]
    pub request_method_code_desc: String,
    #[serde(default)]
    pub date_received: String,
    #[serde(default)]
    pub withdraw_date: String,
    #[serde(default)]
    pub outcome: String,
    #[serde(default)]
    pub adjudication_date: String,
    #[serde(default)]
    pub adjudication_code: String,
    #[serde(default)]
    pub adjudication_code_desc: String,
    #[serde(default)]
    pub outcome_code: Option<i64>,
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
    #[serde(default)]
    pub as_of_date: String,
}

impl ChallengeRecord {
    /// Copy a resolved location's chain and snapshot onto this challenge.
    pub fn attach_location(&mut self, location: &BslLocation) {
        self.state_geoid.clone_from(&location.state_geoid);
        self.county_geoid.clone_from(&location.county_geoid);
        self.tract_geoid.clone_from(&location.tract_geoid);
        self.block_group_geoid.clone_from(&location.block_group_geoid);
        self.block_geoid.clone_from(&location.block_geoid);
        self.as_of_date.clone_from(&location.as_of_date);
    }

    /// Fill any missing coarser geoid from `block_geoid`.
    pub fn derive_missing_geoids(&mut self) {
        if self.block_geoid.is_empty() {
            return;
        }
        let block = &self.block_geoid;
        for (level, slot) in [
            (GeoLevel::State, &mut self.state_geoid),
            (GeoLevel::County, &mut self.county_geoid),
            (GeoLevel::Tract, &mut self.tract_geoid),
            (GeoLevel::BlockGroup, &mut self.block_group_geoid),
        ] {
            if slot.is_empty() {
                *slot = level.truncate(block);
            }
        }
    }
}

impl Row for ChallengeRecord {
    fn entity(&self) -> &str {
        &self.location_id
    }

    fn text(&self, column: &str) -> Option<&str> {
        match column {
            "challenge_id" => Some(&self.challenge_id),
            "location_id" => Some(&self.location_id),
            "state_geoid" => Some(&self.state_geoid),
            "county_geoid" => Some(&self.county_geoid),
            "tract_geoid" => Some(&self.tract_geoid),
            "block_group_geoid" => Some(&self.block_group_geoid),
            "block_geoid" => Some(&self.block_geoid),
            _ => None,
        }
    }

    fn code(&self, column: &str) -> Option<i64> {
        match column {
            "outcome_code" => self.outcome_code,
            "technology" => self.technology,
            "category_code" => self.category_code,
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn challenge(block: &str) -> ChallengeRecord {
        ChallengeRecord {
            challenge_id: "1".into(),
            location_id: "100".into(),
            location_state: "DE".into(),
            data_vintage: String::new(),
            frn: String::new(),
            provider_id: String::new(),
            provider_brand_name: String::new(),
            holding_company_name: String::new(),
            technology: Some(50),
            category_code: Some(4),
            category_code_desc: String::new(),
            request_date: String::new(),
            request_method_code_desc: String::new(),
            date_received: String::new(),
            withdraw_date: String::new(),
            outcome: "Challenge Overturned".into(),
            adjudication_date: "2023-05-01".into(),
            adjudication_code: String::new(),
            adjudication_code_desc: String::new(),
            outcome_code: Some(1),
            state_geoid: String::new(),
            county_geoid: String::new(),
            tract_geoid: String::new(),
            block_group_geoid: String::new(),
            block_geoid: block.into(),
            as_of_date: String::new(),
        }
    }

    #[test]
    fn missing_geoids_are_derived_from_block() {
        let mut record = challenge("100010401001000");
        record.derive_missing_geoids();
        assert_eq!(record.state_geoid, "10");
        assert_eq!(record.county_geoid, "10001");
        assert_eq!(record.tract_geoid, "10001040100");
        assert_eq!(record.block_group_geoid, "100010401001");
    }

    #[test]
    fn challenge_codes_are_exposed_by_column() {
        let record = challenge("");
        assert_eq!(record.code("outcome_code"), Some(1));
        assert_eq!(record.code("technology"), Some(50));
        assert_eq!(record.code("category_code"), Some(4));
        assert_eq!(record.code("status"), None);
        assert_eq!(record.text("location_id"), Some("100"));
    }
}
