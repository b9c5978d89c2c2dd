use bdc_core::aggregate::SummaryTable;
use bdc_core::classify::Capability;
use bdc_core::codes::{CATEGORY_CODES, OUTCOME_CODES, TECHNOLOGY_CODES};
use bdc_core::geo::GeoChain;
use bdc_core::record::{AvailabilityRecord, BslLocation, ChallengeRecord};
use proptest::prelude::*;
use std::collections::BTreeMap;

/// Blocks of two neighbouring states; several share a tract or block group.
pub const BLOCKS: [&str; 6] = [
    "100010401001000",
    "100010401001001",
    "100010401002000",
    "100030102003001",
    "240150301001002",
    "240150301002004",
];

pub const SNAPSHOTS: [&str; 4] = ["2022-06-30", "2022-12-31", "2023-06-30", "2023-12-31"];

pub fn arb_capability() -> impl Strategy<Value = Capability> + Clone {
    (
        prop::sample::select(vec![0i64, 10, 40, 50, 60, 61, 70, 71, 72, 99]),
        any::<bool>(),
        0u32..2000,
        0u32..500,
        any::<bool>(),
    )
        .prop_map(
            |(technology, business_only, download_mbps, upload_mbps, low_latency)| Capability {
                technology,
                business_only,
                download_mbps,
                upload_mbps,
                low_latency,
            },
        )
}

pub fn location(location_id: &str, block: &str) -> BslLocation {
    let chain = GeoChain::from_block(block);
    BslLocation {
        location_id: location_id.to_string(),
        state_geoid: chain.state_geoid,
        county_geoid: chain.county_geoid,
        tract_geoid: chain.tract_geoid,
        block_group_geoid: chain.block_group_geoid,
        block_geoid: chain.block_geoid,
        as_of_date: String::new(),
    }
}

/// One batch per snapshot: each location maps to one block, so batches
/// never carry two chains for a location.
pub fn arb_state_batches(
    blocks: &'static [&'static str],
) -> impl Strategy<Value = Vec<BTreeMap<u8, usize>>> + Clone {
    prop::collection::vec(
        prop::collection::btree_map(0u8..8, 0..blocks.len(), 0..8),
        1..=SNAPSHOTS.len(),
    )
}

pub fn arb_availability() -> impl Strategy<Value = AvailabilityRecord> + Clone {
    (
        0u8..12,
        prop::sample::select(BLOCKS.to_vec()),
        prop::sample::select(vec![10i64, 40, 50, 60, 71, 72, 0, 99]),
        0u32..400,
        0u32..100,
        0u8..2,
        prop::sample::select(vec!["R", "B", "X"]),
    )
        .prop_map(
            |(location, block, technology, download, upload, low_latency, business)| {
                let mut record = AvailabilityRecord {
                    frn: "0001".into(),
                    provider_id: "130077".into(),
                    brand_name: "Example".into(),
                    location_id: format!("{location:010}"),
                    technology,
                    max_advertised_download_speed: download,
                    max_advertised_upload_speed: upload,
                    low_latency,
                    business_residential_code: business.into(),
                    state_usps: String::new(),
                    block_geoid: block.into(),
                    h3_res8_id: String::new(),
                    state_geoid: String::new(),
                    county_geoid: String::new(),
                    tract_geoid: String::new(),
                    block_group_geoid: String::new(),
                    status: None,
                };
                record.derive_geoids();
                bdc_core::classify::attach_tier(&mut record);
                record
            },
        )
}

pub fn arb_challenge() -> impl Strategy<Value = ChallengeRecord> + Clone {
    (
        0u16..500,
        0u8..12,
        prop::sample::select(BLOCKS.to_vec()),
        prop::sample::select(OUTCOME_CODES.to_vec()),
        prop::sample::select(TECHNOLOGY_CODES.to_vec()),
        prop::sample::select(CATEGORY_CODES.to_vec()),
    )
        .prop_map(|(id, location, block, outcome, technology, category)| {
            let mut challenge = ChallengeRecord {
                challenge_id: id.to_string(),
                location_id: format!("{location:010}"),
                location_state: String::new(),
                data_vintage: String::new(),
                frn: String::new(),
                provider_id: String::new(),
                provider_brand_name: String::new(),
                holding_company_name: String::new(),
                technology: Some(technology),
                category_code: Some(category),
                category_code_desc: String::new(),
                request_date: String::new(),
                request_method_code_desc: String::new(),
                date_received: String::new(),
                withdraw_date: String::new(),
                outcome: String::new(),
                adjudication_date: String::new(),
                adjudication_code: String::new(),
                adjudication_code_desc: String::new(),
                outcome_code: Some(outcome),
                state_geoid: String::new(),
                county_geoid: String::new(),
                tract_geoid: String::new(),
                block_group_geoid: String::new(),
                block_geoid: block.into(),
                as_of_date: String::new(),
            };
            challenge.derive_missing_geoids();
            challenge
        })
}

/// A summary keyed on `geoid` with the given value columns.
pub fn arb_summary(columns: &'static [&'static str]) -> impl Strategy<Value = SummaryTable> + Clone {
    prop::collection::btree_map(
        prop::sample::select(vec!["01", "02", "10", "24", "51"]),
        prop::collection::vec(0u64..1000, columns.len()),
        0..5,
    )
    .prop_map(move |rows| {
        let mut table = SummaryTable::new(
            "geoid",
            columns.iter().map(ToString::to_string).collect(),
        );
        for (key, values) in rows {
            table.row_mut(key).copy_from_slice(&values);
        }
        table
    })
}
