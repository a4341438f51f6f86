//! Simulated sensor-quality enrichment.
//!
//! Detection confidence, signal strength, and the weather tag are
//! presentation fields attached at ingest. They are sampled per report and
//! never feed the threat score, which must stay deterministic.

use rand::Rng;

const WEATHER_CONDITIONS: [&str; 4] = ["clear", "partly cloudy", "overcast", "rain"];

/// Per-report sensor quality estimate.
#[derive(Debug, Clone)]
pub struct SensorEstimate {
    pub detection_confidence: u8,
    pub signal_strength: u8,
    pub weather_condition: &'static str,
}

/// Sample an estimate. Cooperative tracks read with higher confidence
/// than primary-only returns.
pub fn estimate(identified: bool) -> SensorEstimate {
    let mut rng = rand::rng();
    let detection_confidence = if identified {
        rng.random_range(88..=99)
    } else {
        rng.random_range(60..=85)
    };
    SensorEstimate {
        detection_confidence,
        signal_strength: rng.random_range(55..=100),
        weather_condition: WEATHER_CONDITIONS[rng.random_range(0..WEATHER_CONDITIONS.len())],
    }
}
