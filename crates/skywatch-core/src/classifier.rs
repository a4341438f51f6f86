//! Coarse aircraft categorisation from kinematics.

use crate::models::Classification;

/// Below this altitude an unidentified slow mover does not fit any of the
/// speed bands cleanly and is left unclassified.
const LOW_ALTITUDE_CUTOFF_FT: f64 = 1000.0;

/// Assign a coarse category from altitude, speed, and transponder presence.
///
/// Speed bands are evaluated top to bottom, first match wins; each band is
/// inclusive of its lower bound. Inputs are validated at the ingest boundary,
/// so negative or NaN values never reach this function.
pub fn classify(altitude_ft: f64, groundspeed_kt: f64, identified: bool) -> Classification {
    if groundspeed_kt < 120.0 {
        if !identified && altitude_ft < LOW_ALTITUDE_CUTOFF_FT {
            return Classification::Unknown;
        }
        return Classification::SmallProp;
    }
    if groundspeed_kt < 350.0 {
        return Classification::Airliner;
    }
    if groundspeed_kt < 600.0 {
        return Classification::HighPerformance;
    }
    Classification::Fighter
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn speed_bands() {
        assert_eq!(classify(3500.0, 60.0, true), Classification::SmallProp);
        assert_eq!(classify(35000.0, 119.9, true), Classification::SmallProp);
        assert_eq!(classify(35000.0, 120.0, true), Classification::Airliner);
        assert_eq!(classify(35000.0, 349.9, true), Classification::Airliner);
        assert_eq!(classify(35000.0, 350.0, true), Classification::HighPerformance);
        assert_eq!(classify(35000.0, 599.9, true), Classification::HighPerformance);
        assert_eq!(classify(25000.0, 600.0, true), Classification::Fighter);
        assert_eq!(classify(25000.0, 780.0, false), Classification::Fighter);
    }

    #[test]
    fn unidentified_low_and_slow_is_unknown() {
        assert_eq!(classify(500.0, 40.0, false), Classification::Unknown);
        // Identified low and slow is still a small prop.
        assert_eq!(classify(500.0, 40.0, true), Classification::SmallProp);
        // Unidentified but above the cutoff fits the slow band cleanly.
        assert_eq!(classify(3500.0, 60.0, false), Classification::SmallProp);
    }
}
