//! Scenario files.
//!
//! A scenario is a TOML description of a screening run: the dynamical
//! system, the particle population, the engine configuration, and how
//! many supersteps to take.
//!
//! ```toml
//! name = "head-on"
//! dynamics = "free"
//! steps = 1
//!
//! [config]
//! ct = 2.0
//! conj_thresh = 0.05
//!
//! [[particles]]
//! state = [-1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.01]
//!
//! [[particles]]
//! state = [1.0, 0.0, 0.0, -1.0, 0.0, 0.0, 0.01]
//! ```

use serde::Deserialize;

use kessler_dynamics::{Dynamics, FreeMotion, PointMassGravity};
use kessler_sim::{SimConfig, Simulation};
use kessler_types::{KesslerError, KesslerResult};

/// One particle row in a scenario file.
#[derive(Debug, Clone, Deserialize)]
pub struct ParticleRow {
    /// State: `[x, y, z, vx, vy, vz, r]`.
    pub state: [f64; 7],
    /// Per-particle parameters (width must match the dynamics).
    #[serde(default)]
    pub params: Vec<f64>,
}

/// A complete screening scenario.
#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    /// Display name.
    pub name: String,
    /// Dynamical system: `"free"` or `"kepler"`.
    #[serde(default = "default_dynamics")]
    pub dynamics: String,
    /// Gravitational parameter for `"kepler"`.
    #[serde(default = "default_mu")]
    pub mu: f64,
    /// Supersteps to run.
    #[serde(default = "default_steps")]
    pub steps: u32,
    /// Engine configuration.
    #[serde(default)]
    pub config: SimConfig,
    /// Particle population.
    #[serde(default)]
    pub particles: Vec<ParticleRow>,
}

fn default_dynamics() -> String {
    "kepler".into()
}

fn default_mu() -> f64 {
    1.0
}

fn default_steps() -> u32 {
    1
}

impl Scenario {
    /// Loads and parses a scenario file.
    pub fn load(path: &str) -> KesslerResult<Self> {
        let text = std::fs::read_to_string(path)?;
        toml::from_str(&text).map_err(|e| KesslerError::Scenario(format!("{path}: {e}")))
    }

    /// The dynamical system the scenario names.
    pub fn dynamics(&self) -> KesslerResult<Box<dyn Dynamics>> {
        match self.dynamics.as_str() {
            "free" => Ok(Box::new(FreeMotion)),
            "kepler" => Ok(Box::new(PointMassGravity::new(self.mu))),
            other => Err(KesslerError::Scenario(format!(
                "unknown dynamics '{other}' (expected 'free' or 'kepler')"
            ))),
        }
    }

    /// Builds the simulation this scenario describes.
    pub fn build(&self) -> KesslerResult<Simulation> {
        let mut state = Vec::with_capacity(self.particles.len() * 7);
        let mut pars = Vec::new();
        for row in &self.particles {
            state.extend_from_slice(&row.state);
            pars.extend_from_slice(&row.params);
        }
        Simulation::new(self.dynamics()?, state, pars, self.config.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_scenario_parses() {
        let text = r#"
            name = "pair"
            dynamics = "free"

            [config]
            ct = 2.0

            [[particles]]
            state = [-1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.01]

            [[particles]]
            state = [1.0, 0.0, 0.0, -1.0, 0.0, 0.0, 0.01]
        "#;
        let scenario: Scenario = toml::from_str(text).unwrap();
        assert_eq!(scenario.name, "pair");
        assert_eq!(scenario.steps, 1);
        assert_eq!(scenario.particles.len(), 2);
        let sim = scenario.build().unwrap();
        assert_eq!(sim.nparts(), 2);
        assert_eq!(sim.ct(), 2.0);
    }

    #[test]
    fn reentry_radius_accepts_scalar_and_triaxial() {
        let sphere: Scenario = toml::from_str(
            r#"
            name = "sphere"
            [config]
            reentry_radius = 1.0
        "#,
        )
        .unwrap();
        assert_eq!(
            sphere.config.reentry_radius.semiaxes(),
            Some([1.0, 1.0, 1.0])
        );

        let ellipsoid: Scenario = toml::from_str(
            r#"
            name = "ellipsoid"
            [config]
            reentry_radius = [1.0, 2.0, 3.0]
        "#,
        )
        .unwrap();
        assert_eq!(
            ellipsoid.config.reentry_radius.semiaxes(),
            Some([1.0, 2.0, 3.0])
        );
    }

    #[test]
    fn unknown_dynamics_is_rejected() {
        let scenario: Scenario = toml::from_str(
            r#"
            name = "bad"
            dynamics = "warp_drive"
        "#,
        )
        .unwrap();
        assert!(scenario.dynamics().is_err());
    }
}
