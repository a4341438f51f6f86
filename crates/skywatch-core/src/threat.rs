//! Weighted threat scoring with human-readable reasons.
//!
//! The score is a plain sum of signal weights clamped to [0, 100]. The
//! function is deterministic for identical inputs; the alert deduper relies
//! on that.

use crate::models::{Classification, ThreatLevel};

pub const ZONE_INTRUSION_POINTS: u8 = 40;
pub const NO_TRANSPONDER_POINTS: u8 = 25;
pub const HIGH_SPEED_POINTS: u8 = 15;
pub const MILITARY_CLASS_POINTS: u8 = 10;
pub const LOW_ALTITUDE_POINTS: u8 = 10;

/// Intrusions below this altitude earn the low-altitude weight.
pub const LOW_ALTITUDE_CEILING_FT: f64 = 5000.0;

/// Operator-tunable scoring knobs.
#[derive(Debug, Clone, Copy)]
pub struct ThreatWeights {
    /// Speed above which the high-speed weight applies, in knots.
    pub high_speed_threshold_kt: f64,
}

impl Default for ThreatWeights {
    fn default() -> Self {
        Self {
            high_speed_threshold_kt: 400.0,
        }
    }
}

/// Signals feeding the analyzer, all derived earlier in the pipeline.
#[derive(Debug, Clone, Copy)]
pub struct ThreatInputs {
    pub in_restricted_area: bool,
    pub identified: bool,
    pub classification: Classification,
    pub groundspeed_kt: f64,
    pub altitude_ft: f64,
}

/// The explained verdict.
#[derive(Debug, Clone, PartialEq)]
pub struct ThreatAssessment {
    pub score: u8,
    pub level: ThreatLevel,
    pub reasons: Vec<String>,
    pub recommended_action: String,
}

/// Fixed action table keyed by severity.
pub fn recommended_action(level: ThreatLevel) -> &'static str {
    match level {
        ThreatLevel::Low => "continue routine surveillance",
        ThreatLevel::Medium => "monitor closely",
        ThreatLevel::High => "monitor and contact via radio",
        ThreatLevel::Critical => "activate response protocol",
    }
}

/// Compute the weighted score and its explanation.
pub fn assess(inputs: ThreatInputs, weights: ThreatWeights) -> ThreatAssessment {
    let mut total: u32 = 0;
    let mut reasons = Vec::new();

    if inputs.in_restricted_area {
        total += u32::from(ZONE_INTRUSION_POINTS);
        reasons.push("Inside restricted zone".to_string());
    }
    if !inputs.identified {
        total += u32::from(NO_TRANSPONDER_POINTS);
        reasons.push("No transponder signal".to_string());
    }
    if inputs.groundspeed_kt > weights.high_speed_threshold_kt {
        total += u32::from(HIGH_SPEED_POINTS);
        reasons.push(format!(
            "High speed ({} kt)",
            inputs.groundspeed_kt.round() as i64
        ));
    }
    // Fighter/high-performance profiles only read as military when nothing
    // cooperative identifies them; a squawking bizjet is not a threat signal.
    if !inputs.identified
        && matches!(
            inputs.classification,
            Classification::Fighter | Classification::HighPerformance
        )
    {
        total += u32::from(MILITARY_CLASS_POINTS);
        reasons.push("Military aircraft type".to_string());
    }
    if inputs.in_restricted_area && inputs.altitude_ft < LOW_ALTITUDE_CEILING_FT {
        total += u32::from(LOW_ALTITUDE_POINTS);
        reasons.push("Low altitude in zone".to_string());
    }

    let score = total.min(100) as u8;
    let level = ThreatLevel::from_score(score);
    ThreatAssessment {
        score,
        level,
        reasons,
        recommended_action: recommended_action(level).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs(
        in_zone: bool,
        identified: bool,
        classification: Classification,
        speed: f64,
        altitude: f64,
    ) -> ThreatInputs {
        ThreatInputs {
            in_restricted_area: in_zone,
            identified,
            classification,
            groundspeed_kt: speed,
            altitude_ft: altitude,
        }
    }

    #[test]
    fn benign_cruise_scores_zero() {
        // An identified 450 kt cruiser under a 500 kt threshold is clean.
        let verdict = assess(
            inputs(false, true, Classification::HighPerformance, 450.0, 35000.0),
            ThreatWeights {
                high_speed_threshold_kt: 500.0,
            },
        );
        assert_eq!(verdict.score, 0);
        assert_eq!(verdict.level, ThreatLevel::Low);
        assert!(verdict.reasons.is_empty());

        let verdict = assess(
            inputs(false, true, Classification::Airliner, 300.0, 35000.0),
            ThreatWeights::default(),
        );
        assert_eq!(verdict.score, 0);
        assert_eq!(verdict.level, ThreatLevel::Low);
        assert!(verdict.reasons.is_empty());
    }

    #[test]
    fn identified_military_profile_earns_no_class_weight() {
        let verdict = assess(
            inputs(false, true, Classification::Fighter, 380.0, 25000.0),
            ThreatWeights::default(),
        );
        assert_eq!(verdict.score, 0);

        let verdict = assess(
            inputs(false, false, Classification::Fighter, 380.0, 25000.0),
            ThreatWeights::default(),
        );
        assert_eq!(
            verdict.score,
            NO_TRANSPONDER_POINTS + MILITARY_CLASS_POINTS
        );
    }

    #[test]
    fn low_intrusion_scores_fifty() {
        let verdict = assess(
            inputs(true, true, Classification::SmallProp, 60.0, 3529.0),
            ThreatWeights::default(),
        );
        assert_eq!(verdict.score, 50);
        assert_eq!(verdict.level, ThreatLevel::High);
        assert!(verdict.reasons.contains(&"Inside restricted zone".to_string()));
        assert!(verdict.reasons.contains(&"Low altitude in zone".to_string()));
        assert_eq!(verdict.recommended_action, "monitor and contact via radio");
    }

    #[test]
    fn unidentified_fast_outside_zone() {
        let verdict = assess(
            inputs(false, false, Classification::Fighter, 780.0, 25000.0),
            ThreatWeights::default(),
        );
        assert_eq!(verdict.score, 50);
        assert_eq!(verdict.level, ThreatLevel::High);
        assert!(verdict.reasons.contains(&"No transponder signal".to_string()));
        assert!(verdict.reasons.contains(&"High speed (780 kt)".to_string()));
        assert!(verdict.reasons.contains(&"Military aircraft type".to_string()));
    }

    #[test]
    fn full_house_clamps_to_one_hundred() {
        let verdict = assess(
            inputs(true, false, Classification::Fighter, 780.0, 800.0),
            ThreatWeights::default(),
        );
        assert_eq!(verdict.score, 100);
        assert_eq!(verdict.level, ThreatLevel::Critical);
        assert_eq!(verdict.reasons.len(), 5);
        assert_eq!(verdict.recommended_action, "activate response protocol");
    }

    #[test]
    fn reasons_sum_matches_score() {
        let cases = [
            inputs(true, false, Classification::Fighter, 780.0, 800.0),
            inputs(true, true, Classification::SmallProp, 60.0, 3529.0),
            inputs(false, false, Classification::Fighter, 780.0, 25000.0),
            inputs(false, true, Classification::Airliner, 300.0, 35000.0),
            inputs(true, true, Classification::Airliner, 300.0, 20000.0),
        ];
        for case in cases {
            let verdict = assess(case, ThreatWeights::default());
            let sum: u32 = verdict
                .reasons
                .iter()
                .map(|reason| point_value(reason) as u32)
                .sum();
            assert_eq!(sum.min(100) as u8, verdict.score);
        }
    }

    #[test]
    fn deterministic_for_identical_inputs() {
        let case = inputs(true, false, Classification::Fighter, 612.0, 4200.0);
        assert_eq!(
            assess(case, ThreatWeights::default()),
            assess(case, ThreatWeights::default())
        );
    }

    #[test]
    fn threshold_is_exclusive() {
        let at = assess(
            inputs(false, true, Classification::HighPerformance, 400.0, 30000.0),
            ThreatWeights::default(),
        );
        let above = assess(
            inputs(false, true, Classification::HighPerformance, 400.1, 30000.0),
            ThreatWeights::default(),
        );
        assert_eq!(at.score, 0);
        assert_eq!(above.score, HIGH_SPEED_POINTS);
    }

    fn point_value(reason: &str) -> u8 {
        match reason {
            "Inside restricted zone" => ZONE_INTRUSION_POINTS,
            "No transponder signal" => NO_TRANSPONDER_POINTS,
            "Military aircraft type" => MILITARY_CLASS_POINTS,
            "Low altitude in zone" => LOW_ALTITUDE_POINTS,
            r if r.starts_with("High speed") => HIGH_SPEED_POINTS,
            other => panic!("unexpected reason: {other}"),
        }
    }
}
