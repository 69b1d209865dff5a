use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Terrain/cost parameters of a `CostField`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostConfig {
    /// Ground distance of one cell edge, in map units. Must be > 0.
    pub cellsize: f64,
    /// 0 = terrain cost only, 1 = net cost only.
    pub weight: f64,
    /// Degree-4 slope → cost polynomial, highest power first.
    pub coef: [f64; 5],
    /// DEM value marking inactive cells.
    pub nodata: Option<f64>,
}

impl Default for CostConfig {
    fn default() -> Self {
        Self {
            cellsize: 1.0,
            weight: 0.0,
            coef: [0.0, 0.0, 0.0, 0.0, 1.0],
            nodata: None,
        }
    }
}

impl CostConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.cellsize.is_finite() && self.cellsize > 0.0) {
            return Err(ConfigError::Cellsize(self.cellsize));
        }
        if !(0.0..=1.0).contains(&self.weight) {
            return Err(ConfigError::Weight(self.weight));
        }
        if let Some(index) = self.coef.iter().position(|c| !c.is_finite()) {
            return Err(ConfigError::Coefficient { index });
        }
        Ok(())
    }
}

/// What the simulator does when one edge fails to produce a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeErrorPolicy {
    /// Stop the run; the failed record is the last one returned.
    #[default]
    Abort,
    /// Record the failure, leave all state untouched and go on.
    Skip,
}

/// Ground-potential dynamics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Potential added by one new path (`i`).
    #[serde(alias = "i")]
    pub intensity: f64,
    /// Saturation ceiling (`Gmax`).
    #[serde(alias = "Gmax", alias = "gmax")]
    pub g_max: f64,
    /// Decay time constant (`T`); potential forgets at rate 1/T per edge.
    #[serde(alias = "T")]
    pub decay: f64,
    /// Net-cost fall-off with distance from hot cells. Negative.
    pub alpha: f64,
    pub on_edge_error: EdgeErrorPolicy,
    /// Sweep-pair cap for every distance transform; None derives one from the
    /// grid size.
    pub max_sweep_pairs: Option<usize>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            intensity: 1.0,
            g_max: 100.0,
            decay: 50.0,
            alpha: Self::alpha_from_reference(1.0, 0.9),
            on_edge_error: EdgeErrorPolicy::Abort,
            max_sweep_pairs: None,
        }
    }
}

impl SimulationConfig {
    /// Alpha at which net cost reaches `nc0` at distance `d0`:
    /// `alpha = d0 / ln(1 − nc0)`.
    ///
    /// Expects `d0 > 0` and `0 < nc0 < 1`; the result is then negative.
    pub fn alpha_from_reference(d0: f64, nc0: f64) -> f64 {
        d0 / (1.0 - nc0).ln()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let bad = |name: &'static str, reason: String| ConfigError::Parameter { name, reason };

        if !(self.g_max.is_finite() && self.g_max > 0.0) {
            return Err(bad("g_max", format!("must be finite and > 0, got {}", self.g_max)));
        }
        if !(self.intensity.is_finite() && self.intensity > 0.0) {
            return Err(bad("intensity", format!("must be finite and > 0, got {}", self.intensity)));
        }
        if self.intensity > self.g_max {
            return Err(bad(
                "intensity",
                format!("{} exceeds g_max {}", self.intensity, self.g_max),
            ));
        }
        if !(self.decay.is_finite() && self.decay >= 1.0) {
            return Err(bad("decay", format!("must be finite and >= 1, got {}", self.decay)));
        }
        if !(self.alpha.is_finite() && self.alpha < 0.0) {
            return Err(bad("alpha", format!("must be finite and < 0, got {}", self.alpha)));
        }
        if self.max_sweep_pairs == Some(0) {
            return Err(bad("max_sweep_pairs", "must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Sweep-pair cap for a `rows × cols` grid.
    pub fn sweep_cap(&self, rows: usize, cols: usize) -> usize {
        self.max_sweep_pairs
            .unwrap_or_else(|| default_sweep_cap(rows, cols))
    }
}

/// Default sweep-pair cap, proportional to the grid diameter.
pub fn default_sweep_cap(rows: usize, cols: usize) -> usize {
    2 * (rows + cols) + 8
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn defaults_validate() {
        CostConfig::default().validate().unwrap();
        SimulationConfig::default().validate().unwrap();
    }

    #[test]
    fn alpha_reference_hits_target_net_cost() {
        let alpha = SimulationConfig::alpha_from_reference(30.0, 0.5);
        assert!(alpha < 0.0);
        assert_relative_eq!(1.0 - (30.0 / alpha).exp(), 0.5, epsilon = 1e-12);
    }

    #[test]
    fn rejects_out_of_range_parameters() {
        let mut c = CostConfig::default();
        c.cellsize = 0.0;
        assert_eq!(c.validate(), Err(ConfigError::Cellsize(0.0)));

        let mut c = CostConfig::default();
        c.weight = 1.5;
        assert_eq!(c.validate(), Err(ConfigError::Weight(1.5)));

        let mut c = CostConfig::default();
        c.coef[2] = f64::NAN;
        assert_eq!(c.validate(), Err(ConfigError::Coefficient { index: 2 }));

        let tweaks: [fn(&mut SimulationConfig); 5] = [
            |s| s.alpha = 2.0,
            |s| s.decay = 0.5,
            |s| s.intensity = 0.0,
            |s| s.intensity = s.g_max * 2.0,
            |s| s.max_sweep_pairs = Some(0),
        ];
        for tweak in tweaks {
            let mut s = SimulationConfig::default();
            tweak(&mut s);
            assert!(matches!(s.validate(), Err(ConfigError::Parameter { .. })), "{s:?}");
        }
    }

    #[test]
    fn short_keys_deserialize() {
        let json = r#"{"i": 2.0, "Gmax": 10.0, "T": 5.0, "alpha": -1.0, "on_edge_error": "skip"}"#;
        let s: SimulationConfig = serde_json::from_str(json).unwrap();
        assert_eq!(s.intensity, 2.0);
        assert_eq!(s.g_max, 10.0);
        assert_eq!(s.decay, 5.0);
        assert_eq!(s.on_edge_error, EdgeErrorPolicy::Skip);
        assert_eq!(s.max_sweep_pairs, None);
    }
}
