//! Short-horizon trajectory prediction.
//!
//! Constant-velocity extrapolation in equirectangular form. Anything richer
//! (turn rates, climb profiles, stateful filters) is out of scope.

use crate::models::TrajectoryPoint;

/// Knots to degrees of latitude per second at the equator.
/// 1 kt = 1 NM/h, 1 degree = 60 NM, so deg/s = kt / (60 * 3600).
const KT_TO_DEG_PER_SEC: f64 = 1.0 / 216_000.0;

/// Floor for cos(lat) so longitude displacement stays finite at the poles.
const MIN_COS_LAT: f64 = 1e-6;

/// Forecast horizon and sample stride.
#[derive(Debug, Clone, Copy)]
pub struct TrajectoryConfig {
    pub horizon_s: u32,
    pub stride_s: u32,
}

impl Default for TrajectoryConfig {
    fn default() -> Self {
        Self {
            horizon_s: 180,
            stride_s: 30,
        }
    }
}

impl TrajectoryConfig {
    pub fn sample_count(&self) -> usize {
        if self.stride_s == 0 {
            return 0;
        }
        (self.horizon_s / self.stride_s) as usize
    }
}

/// Extrapolate future positions from current kinematics.
///
/// Returns one sample per stride out to the horizon. Never fails; inputs
/// are validated upstream.
pub fn predict(
    lat: f64,
    lon: f64,
    groundspeed_kt: f64,
    track_deg: f64,
    config: TrajectoryConfig,
) -> Vec<TrajectoryPoint> {
    let heading = track_deg.to_radians();
    let v = groundspeed_kt * KT_TO_DEG_PER_SEC;
    let cos_lat = lat.to_radians().cos().max(MIN_COS_LAT);

    (1..=config.sample_count())
        .map(|i| {
            let t = (i as u32 * config.stride_s) as f64;
            TrajectoryPoint {
                lat: lat + heading.cos() * v * t,
                lon: lon + heading.sin() * v * t / cos_lat,
                offset_s: t,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_yields_six_samples() {
        let path = predict(11.45, 77.85, 450.0, 45.0, TrajectoryConfig::default());
        assert_eq!(path.len(), 6);
        assert_eq!(path[0].offset_s, 30.0);
        assert_eq!(path[5].offset_s, 180.0);
    }

    #[test]
    fn northbound_track_moves_latitude_only() {
        let path = predict(11.0, 78.0, 216.0, 0.0, TrajectoryConfig::default());
        // 216 kt = 0.001 deg/s; 30 s stride moves 0.03 deg north.
        assert!((path[0].lat - 11.03).abs() < 1e-9);
        assert!((path[0].lon - 78.0).abs() < 1e-9);
    }

    #[test]
    fn eastbound_track_scales_longitude_by_latitude() {
        let at_equator = predict(0.0, 78.0, 216.0, 90.0, TrajectoryConfig::default());
        let at_sixty = predict(60.0, 78.0, 216.0, 90.0, TrajectoryConfig::default());
        let dlon_equator = at_equator[0].lon - 78.0;
        let dlon_sixty = at_sixty[0].lon - 78.0;
        // cos(60) = 0.5: the same ground speed covers twice the longitude.
        assert!((dlon_sixty / dlon_equator - 2.0).abs() < 1e-6);
    }

    #[test]
    fn polar_singularity_is_clamped() {
        let path = predict(90.0, 0.0, 600.0, 90.0, TrajectoryConfig::default());
        assert!(path.iter().all(|p| p.lon.is_finite() && p.lat.is_finite()));
    }

    #[test]
    fn stationary_track_stays_put() {
        let path = predict(11.45, 77.85, 0.0, 45.0, TrajectoryConfig::default());
        assert!(path.iter().all(|p| p.lat == 11.45 && p.lon == 77.85));
    }
}
