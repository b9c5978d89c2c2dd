//! Identity resolution: one canonical record per location, one per challenge.
//!
//! Location precedence runs in three passes:
//!
//! 1. within a (snapshot, state) batch, exact duplicates collapse and any
//!    location left with two chains is a [`PipelineError::ConsistencyViolation`];
//! 2. within a state, batches concatenate in snapshot order, a chain repeated
//!    unchanged keeps its earliest snapshot, and the latest distinct chain wins;
//! 3. across states, rows sort by snapshot and the latest wins wherever the
//!    location was last seen.

use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use crate::codes::{Outcome, abbr_for_fips, fips_for_abbr};
use crate::error::{PipelineError, Result};
use crate::geo::GeoChain;
use crate::record::{BslLocation, ChallengeRecord};

/// What to do when a location's latest chain lies in another state than an
/// earlier one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CrossStateMoves {
    /// Keep the most recent chain and log how many locations moved.
    #[default]
    Allow,
    /// Fail the resolution on the first moved location.
    Reject,
}

/// Collapse one (snapshot, state) batch to one row per location and stamp
/// it with `snapshot`.
///
/// # Errors
///
/// Returns [`PipelineError::InconsistentChain`] if a row's geoids are not
/// prefix-consistent and [`PipelineError::ConsistencyViolation`] if a location
/// keeps more than one chain after exact duplicates are dropped.
pub fn collapse_batch(
    batch: impl IntoIterator<Item = BslLocation>,
    snapshot: &str,
    state: &str,
) -> Result<Vec<BslLocation>> {
    let mut seen: HashSet<(String, GeoChain)> = HashSet::new();
    let mut chains: HashMap<String, usize> = HashMap::new();
    let mut rows = Vec::new();

    for mut location in batch {
        let chain = location.chain();
        chain.validate(&location.location_id)?;
        if !seen.insert((location.location_id.clone(), chain)) {
            continue;
        }
        *chains.entry(location.location_id.clone()).or_insert(0) += 1;
        location.as_of_date = snapshot.to_string();
        rows.push(location);
    }

    if let Some((location_id, count)) = chains
        .into_iter()
        .filter(|(_, count)| *count > 1)
        .min_by(|a, b| a.0.cmp(&b.0))
    {
        return Err(PipelineError::ConsistencyViolation {
            location_id,
            snapshot: snapshot.to_string(),
            state: state.to_string(),
            chains: count,
        });
    }
    Ok(rows)
}

/// Resolve one state's collapsed batches, given in snapshot order.
#[must_use]
pub fn resolve_state(batches: impl IntoIterator<Item = Vec<BslLocation>>) -> Vec<BslLocation> {
    let mut seen: HashSet<(String, GeoChain)> = HashSet::new();
    let mut rows = Vec::new();
    for batch in batches {
        for location in batch {
            if seen.insert((location.location_id.clone(), location.chain())) {
                rows.push(location);
            }
        }
    }
    keep_last_by(rows, |location| location.location_id.as_str())
}

/// Resolve every state's rows into the canonical table.
///
/// # Errors
///
/// Under [`CrossStateMoves::Reject`], returns
/// [`PipelineError::InconsistentChain`] for the first location whose latest
/// state differs from an earlier one.
pub fn resolve_across_states(
    states: impl IntoIterator<Item = Vec<BslLocation>>,
    moves: CrossStateMoves,
) -> Result<Vec<BslLocation>> {
    let mut rows: Vec<BslLocation> = states.into_iter().flatten().collect();
    rows.sort_by(|a, b| a.as_of_date.cmp(&b.as_of_date));

    let mut latest_state: HashMap<&str, &str> = HashMap::new();
    for location in &rows {
        latest_state.insert(&location.location_id, &location.state_geoid);
    }
    let mut moved: Vec<(&str, &str, &str)> = Vec::new();
    let mut counted: HashSet<&str> = HashSet::new();
    for location in &rows {
        let latest = latest_state
            .get(location.location_id.as_str())
            .copied()
            .unwrap_or_default();
        if latest != location.state_geoid && counted.insert(location.location_id.as_str()) {
            moved.push((
                location.location_id.as_str(),
                location.state_geoid.as_str(),
                latest,
            ));
        }
    }

    if !moved.is_empty() {
        if moves == CrossStateMoves::Reject {
            moved.sort_unstable();
            let (location_id, from, to) = moved[0];
            return Err(PipelineError::InconsistentChain {
                location_id: location_id.to_string(),
                detail: format!("moved from state '{from}' to state '{to}'"),
            });
        }
        warn!(
            locations = moved.len(),
            "locations moved between states; keeping most recent geolocation"
        );
    }

    let resolved = keep_last_by(rows, |location| location.location_id.as_str());
    debug!(locations = resolved.len(), "resolved geolocations");
    Ok(resolved)
}

/// Keep the last challenge per `challenge_id`, ordered by adjudication date.
///
/// Rows sort stably by `adjudication_date` with undated rows last, so an
/// unadjudicated copy of a challenge wins over an adjudicated one only if it
/// came later in input order.
#[must_use]
pub fn dedup_challenges(mut challenges: Vec<ChallengeRecord>) -> Vec<ChallengeRecord> {
    challenges.sort_by(|a, b| {
        let a_date = a.adjudication_date.trim();
        let b_date = b.adjudication_date.trim();
        a_date
            .is_empty()
            .cmp(&b_date.is_empty())
            .then_with(|| a_date.cmp(b_date))
    });
    keep_last_by(challenges, |challenge| challenge.challenge_id.as_str())
}

/// Set `outcome_code` from the outcome text of every challenge.
///
/// # Errors
///
/// Returns [`PipelineError::UnknownOutcome`] for text outside the published
/// vocabulary.
pub fn code_outcomes(challenges: &mut [ChallengeRecord]) -> Result<()> {
    for challenge in challenges {
        let outcome =
            Outcome::from_text(&challenge.outcome).ok_or_else(|| PipelineError::UnknownOutcome {
                challenge_id: challenge.challenge_id.clone(),
                outcome: challenge.outcome.clone(),
            })?;
        challenge.outcome_code = Some(outcome.code());
    }
    Ok(())
}

/// Attach resolved geolocations to challenges.
///
/// Challenges whose location is unresolved keep whatever geoids they carry.
/// Any challenge still lacking a block, matched or not, takes its state from
/// `location_state`. Afterwards `location_state` is rewritten from
/// `state_geoid`, since the location may have moved. Returns the number of challenges matched to a location.
///
/// # Errors
///
/// Returns [`PipelineError::UnknownState`] for an unknown USPS abbreviation
/// or state FIPS code.
pub fn geolocate_challenges(
    challenges: &mut [ChallengeRecord],
    locations: &HashMap<String, BslLocation>,
) -> Result<usize> {
    let mut matched = 0;
    for challenge in challenges {
        if let Some(location) = locations.get(&challenge.location_id) {
            challenge.attach_location(location);
            matched += 1;
        } else {
            challenge.derive_missing_geoids();
        }
        if challenge.block_geoid.is_empty() {
            let fips = fips_for_abbr(&challenge.location_state)
                .ok_or_else(|| PipelineError::UnknownState(challenge.location_state.clone()))?;
            challenge.state_geoid = fips.to_string();
        }
        let abbr = abbr_for_fips(&challenge.state_geoid)
            .ok_or_else(|| PipelineError::UnknownState(challenge.state_geoid.clone()))?;
        challenge.location_state = abbr.to_string();
    }
    Ok(matched)
}

/// Keep the last row per key, preserving the relative order of kept rows.
fn keep_last_by<T>(rows: Vec<T>, key: impl Fn(&T) -> &str) -> Vec<T> {
    let mut last: HashMap<String, usize> = HashMap::with_capacity(rows.len());
    for (index, row) in rows.iter().enumerate() {
        last.insert(key(row).to_string(), index);
    }
    rows.into_iter()
        .enumerate()
        .filter(|(index, row)| last.get(key(row)) == Some(index))
        .map(|(_, row)| row)
        .collect()
}
