//! Service tier classification of availability records.

use crate::codes::{RELIABLE_TECHNOLOGY_CODES, ServiceTier};
use crate::record::AvailabilityRecord;

/// Minimum download speed (Mbps) for anything better than unserved.
pub const UNSERVED_DOWNLOAD_MBPS: u32 = 25;
/// Minimum upload speed (Mbps) for anything better than unserved.
pub const UNSERVED_UPLOAD_MBPS: u32 = 3;
/// Minimum download speed (Mbps) for served.
pub const SERVED_DOWNLOAD_MBPS: u32 = 100;
/// Minimum upload speed (Mbps) for served.
pub const SERVED_UPLOAD_MBPS: u32 = 20;

/// Capability fields the classifier looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capability {
    pub technology: i64,
    pub business_only: bool,
    pub download_mbps: u32,
    pub upload_mbps: u32,
    pub low_latency: bool,
}

impl From<&AvailabilityRecord> for Capability {
    fn from(record: &AvailabilityRecord) -> Self {
        Self {
            technology: record.technology,
            business_only: record.is_business_only(),
            download_mbps: record.max_advertised_download_speed,
            upload_mbps: record.max_advertised_upload_speed,
            low_latency: record.is_low_latency(),
        }
    }
}

/// Classify one availability report. The unserved test runs first and
/// excludes the other two; underserved excludes served.
#[must_use]
pub fn classify(capability: Capability) -> ServiceTier {
    let unserved = !RELIABLE_TECHNOLOGY_CODES.contains(&capability.technology)
        || capability.business_only
        || capability.download_mbps < UNSERVED_DOWNLOAD_MBPS
        || capability.upload_mbps < UNSERVED_UPLOAD_MBPS
        || !capability.low_latency;
    if unserved {
        return ServiceTier::Unserved;
    }

    let underserved = capability.download_mbps < SERVED_DOWNLOAD_MBPS
        || capability.upload_mbps < SERVED_UPLOAD_MBPS
        || !capability.low_latency;
    if underserved {
        ServiceTier::Underserved
    } else {
        ServiceTier::Served
    }
}

/// Classify a record and store the tier on it.
pub fn attach_tier(record: &mut AvailabilityRecord) -> ServiceTier {
    let tier = classify(Capability::from(&*record));
    record.status = Some(tier);
    tier
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fiber(download_mbps: u32, upload_mbps: u32, low_latency: bool) -> Capability {
        Capability {
            technology: 50,
            business_only: false,
            download_mbps,
            upload_mbps,
            low_latency,
        }
    }

    #[test]
    fn slow_high_latency_is_unserved() {
        assert_eq!(classify(fiber(10, 1, false)), ServiceTier::Unserved);
    }

    #[test]
    fn fast_low_latency_is_served() {
        assert_eq!(classify(fiber(150, 25, true)), ServiceTier::Served);
    }

    #[test]
    fn middle_band_is_underserved() {
        assert_eq!(classify(fiber(50, 25, true)), ServiceTier::Underserved);
        assert_eq!(classify(fiber(100, 10, true)), ServiceTier::Underserved);
    }

    #[test]
    fn thresholds_are_inclusive_lower_bounds() {
        assert_eq!(classify(fiber(25, 3, true)), ServiceTier::Underserved);
        assert_eq!(classify(fiber(100, 20, true)), ServiceTier::Served);
        assert_eq!(classify(fiber(24, 3, true)), ServiceTier::Unserved);
        assert_eq!(classify(fiber(25, 2, true)), ServiceTier::Unserved);
    }

    #[test]
    fn unreliable_technology_is_unserved_regardless_of_speed() {
        let satellite = Capability {
            technology: 60,
            ..fiber(1000, 1000, true)
        };
        assert_eq!(classify(satellite), ServiceTier::Unserved);
    }

    #[test]
    fn business_only_is_unserved() {
        let business = Capability {
            business_only: true,
            ..fiber(1000, 1000, true)
        };
        assert_eq!(classify(business), ServiceTier::Unserved);
    }
}
