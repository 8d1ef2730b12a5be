use serde::Serialize;

use crate::config::SignalConfig;
use crate::observer::error::GeometryError;

/// FSPL constant for distance in km and frequency in Hz:
/// 20 log10(4 pi / c) + 60 with c in m/s.
const FSPL_CONSTANT_DB: f64 = -87.55;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AntennaGains {
    pub tx_dbi: f64,
    pub rx_dbi: f64,
    pub elevation_db_per_deg: f64,
    pub max_elevation_gain_db: f64,
}

impl AntennaGains {
    pub fn elevation_gain_db(&self, elevation_deg: f64) -> f64 {
        (self.elevation_db_per_deg * elevation_deg.max(0.0)).min(self.max_elevation_gain_db)
    }
}

pub fn free_space_path_loss_db(range_km: f64, frequency_hz: f64) -> f64 {
    20.0 * range_km.log10() + 20.0 * frequency_hz.log10() + FSPL_CONSTANT_DB
}

pub fn estimate_signal(
    range_km: f64,
    elevation_deg: f64,
    frequency_hz: f64,
    tx_power_dbm: f64,
    gains: AntennaGains,
) -> Result<f64, GeometryError> {
    if !(range_km > 0.0) {
        return Err(GeometryError::Degenerate { range_km });
    }
    Ok(tx_power_dbm + gains.tx_dbi + gains.rx_dbi + gains.elevation_gain_db(elevation_deg)
        - free_space_path_loss_db(range_km, frequency_hz))
}

/// Link budget bound to one configuration.
#[derive(Debug, Clone, Copy)]
pub struct SignalModel {
    frequency_hz: f64,
    tx_power_dbm: f64,
    gains: AntennaGains,
    floor_dbm: f64,
    ceiling_dbm: f64,
}

impl From<&SignalConfig> for SignalModel {
    fn from(config: &SignalConfig) -> Self {
        Self {
            frequency_hz: config.frequency_hz,
            tx_power_dbm: config.tx_power_dbm,
            gains: AntennaGains {
                tx_dbi: config.tx_antenna_gain_dbi,
                rx_dbi: config.rx_antenna_gain_dbi,
                elevation_db_per_deg: config.elevation_gain_db_per_deg,
                max_elevation_gain_db: config.max_elevation_gain_db,
            },
            floor_dbm: config.quality_floor_dbm,
            ceiling_dbm: config.quality_ceiling_dbm,
        }
    }
}

impl Default for SignalModel {
    fn default() -> Self {
        Self::from(&SignalConfig::default())
    }
}

impl SignalModel {
    pub fn estimate(&self, range_km: f64, elevation_deg: f64) -> Result<f64, GeometryError> {
        estimate_signal(
            range_km,
            elevation_deg,
            self.frequency_hz,
            self.tx_power_dbm,
            self.gains,
        )
    }

    /// Maps a signal level onto [0, 1] between the configured floor and ceiling.
    pub fn quality(&self, signal_dbm: f64) -> f64 {
        ((signal_dbm - self.floor_dbm) / (self.ceiling_dbm - self.floor_dbm)).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn flat() -> AntennaGains {
        AntennaGains {
            tx_dbi: 0.0,
            rx_dbi: 0.0,
            elevation_db_per_deg: 0.0,
            max_elevation_gain_db: 0.0,
        }
    }

    #[test]
    fn path_loss_matches_reference_value() {
        // 1000 km at 12 GHz is about 174 dB
        assert_relative_eq!(free_space_path_loss_db(1000.0, 12e9), 174.03, epsilon = 0.01);
    }

    #[test]
    fn doubling_range_costs_six_db() {
        let near = estimate_signal(600.0, 45.0, 12e9, 30.0, flat()).unwrap();
        let far = estimate_signal(1200.0, 45.0, 12e9, 30.0, flat()).unwrap();
        assert_relative_eq!(near - far, 6.0206, epsilon = 1e-3);
    }

    #[test]
    fn elevation_gain_is_capped() {
        let gains = AntennaGains {
            elevation_db_per_deg: 0.05,
            max_elevation_gain_db: 4.0,
            ..flat()
        };
        assert_relative_eq!(gains.elevation_gain_db(20.0), 1.0, epsilon = 1e-12);
        assert_relative_eq!(gains.elevation_gain_db(85.0), 4.0, epsilon = 1e-12);
        assert_eq!(gains.elevation_gain_db(-5.0), 0.0);
    }

    #[test]
    fn non_positive_range_is_rejected() {
        assert!(estimate_signal(0.0, 10.0, 12e9, 30.0, flat()).is_err());
        assert!(estimate_signal(-3.0, 10.0, 12e9, 30.0, flat()).is_err());
    }

    #[test]
    fn default_budget_lands_in_the_quality_band() {
        let model = SignalModel::default();
        let zenith = model.estimate(550.0, 90.0).unwrap();
        let horizon = model.estimate(2000.0, 5.0).unwrap();
        assert!(zenith > horizon);
        assert!((-95.0..-85.0).contains(&zenith), "{zenith}");
        assert!((-110.0..-100.0).contains(&horizon), "{horizon}");
        assert!(model.quality(zenith) > model.quality(horizon));
        assert_eq!(model.quality(-200.0), 0.0);
        assert_eq!(model.quality(0.0), 1.0);
    }
}
