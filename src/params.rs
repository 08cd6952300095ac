// src/params.rs

use serde::{Deserialize, Serialize};

use crate::error::EvolutionError;

/// Default outer iterations (MaxFilterIteration).
pub const DEFAULT_MAX_FILTER_ITERATION: usize = 1000;
/// Default inner normal-diffusion iterations (MaxNormalIteration).
pub const DEFAULT_MAX_NORMAL_ITERATION: usize = 100;
/// Default NormalProcessConductance.
pub const DEFAULT_NORMAL_PROCESS_CONDUCTANCE: f64 = 0.2;
/// Default RMSChangeNormalProcessTrigger.
pub const DEFAULT_RMS_CHANGE_NORMAL_PROCESS_TRIGGER: f64 = 0.001;

/// Normal diffusion time step as a fraction of 1 / Σ_a (1/h_a²).
/// The explicit N-d heat equation with diffusivity ≤ 1 is stable up to 1/2 of that.
pub const NORMAL_DT_FACTOR: f64 = 0.25;

/// Safety factor applied to the propagation time-step bound.
pub const PROPAGATION_CFL: f64 = 0.9;

/// How the normal field is diffused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NormalProcessType {
    /// Plain vector Laplacian; smooths across features.
    Isotropic,
    /// Flux attenuated by exp(-(|Δn|/K)²); preserves sharp features.
    #[default]
    Anisotropic,
}

impl NormalProcessType {
    pub fn from_arg(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "iso" | "isotropic" => Some(Self::Isotropic),
            "aniso" | "anisotropic" => Some(Self::Anisotropic),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Isotropic => "isotropic",
            Self::Anisotropic => "anisotropic",
        }
    }
}

/// Parameters of one evolution run. Immutable once `run` starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvolutionParams {
    /// Outer iterations (normal diffusion + one propagation step each).
    pub max_filter_iteration: usize,
    /// Upper bound on inner normal-diffusion iterations per outer step.
    pub max_normal_iteration: usize,
    /// Diffusivity coefficient K of the normal diffusion.
    pub normal_process_conductance: f64,
    /// Inner loop stops once the RMS normal change drops below this.
    pub rms_change_normal_process_trigger: f64,
    pub normal_process_type: NormalProcessType,
    /// Run per-cell passes on the Rayon pool (see also `ANISO_LS_PAR`).
    pub parallel: bool,
}

impl Default for EvolutionParams {
    fn default() -> Self {
        Self {
            max_filter_iteration: DEFAULT_MAX_FILTER_ITERATION,
            max_normal_iteration: DEFAULT_MAX_NORMAL_ITERATION,
            normal_process_conductance: DEFAULT_NORMAL_PROCESS_CONDUCTANCE,
            rms_change_normal_process_trigger: DEFAULT_RMS_CHANGE_NORMAL_PROCESS_TRIGGER,
            normal_process_type: NormalProcessType::Anisotropic,
            parallel: false,
        }
    }
}

fn check_count(name: &'static str, v: i64) -> Result<usize, EvolutionError> {
    if v <= 0 {
        return Err(EvolutionError::InvalidParameter {
            name,
            value: v.to_string(),
        });
    }
    usize::try_from(v).map_err(|_| EvolutionError::InvalidParameter {
        name,
        value: v.to_string(),
    })
}

fn check_real(name: &'static str, v: f64) -> Result<f64, EvolutionError> {
    // NaN fails the comparison as well.
    if !(v >= 0.0) || !v.is_finite() {
        return Err(EvolutionError::InvalidParameter {
            name,
            value: v.to_string(),
        });
    }
    Ok(v)
}

impl EvolutionParams {
    /// Validate raw configuration values and build a parameter set.
    ///
    /// Iteration bounds must be ≥ 1; conductance and trigger must be finite and ≥ 0.
    pub fn new(
        max_filter_iteration: i64,
        max_normal_iteration: i64,
        conductance: f64,
        rms_trigger: f64,
    ) -> Result<Self, EvolutionError> {
        Ok(Self {
            max_filter_iteration: check_count("MaxFilterIteration", max_filter_iteration)?,
            max_normal_iteration: check_count("MaxNormalIteration", max_normal_iteration)?,
            normal_process_conductance: check_real("NormalProcessConductance", conductance)?,
            rms_change_normal_process_trigger: check_real(
                "RMSChangeNormalProcessTrigger",
                rms_trigger,
            )?,
            ..Self::default()
        })
    }

    /// Re-check an already-built parameter set (e.g. one read from JSON).
    pub fn validate(&self) -> Result<(), EvolutionError> {
        if self.max_filter_iteration == 0 {
            return Err(EvolutionError::InvalidParameter {
                name: "MaxFilterIteration",
                value: "0".to_string(),
            });
        }
        if self.max_normal_iteration == 0 {
            return Err(EvolutionError::InvalidParameter {
                name: "MaxNormalIteration",
                value: "0".to_string(),
            });
        }
        check_real("NormalProcessConductance", self.normal_process_conductance)?;
        check_real(
            "RMSChangeNormalProcessTrigger",
            self.rms_change_normal_process_trigger,
        )?;
        Ok(())
    }

    /// Parse a JSON parameter block; missing keys take their defaults.
    pub fn from_json_str(s: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let p: Self = serde_json::from_str(s)?;
        p.validate()?;
        Ok(p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(EvolutionParams::default().validate().is_ok());
    }

    #[test]
    fn new_rejects_out_of_domain_values() {
        assert!(matches!(
            EvolutionParams::new(0, 5, 0.5, 0.1),
            Err(EvolutionError::InvalidParameter { name: "MaxFilterIteration", .. })
        ));
        assert!(matches!(
            EvolutionParams::new(2, -1, 0.5, 0.1),
            Err(EvolutionError::InvalidParameter { name: "MaxNormalIteration", .. })
        ));
        assert!(matches!(
            EvolutionParams::new(2, 5, -1.0, 0.1),
            Err(EvolutionError::InvalidParameter { name: "NormalProcessConductance", .. })
        ));
        assert!(EvolutionParams::new(2, 5, 0.5, f64::NAN).is_err());
        assert!(EvolutionParams::new(2, 5, 0.0, 0.0).is_ok());
    }

    #[test]
    fn json_block_fills_missing_keys_with_defaults() {
        let p = EvolutionParams::from_json_str(
            r#"{ "max_filter_iteration": 2, "normal_process_type": "isotropic" }"#,
        )
        .unwrap();
        assert_eq!(p.max_filter_iteration, 2);
        assert_eq!(p.max_normal_iteration, DEFAULT_MAX_NORMAL_ITERATION);
        assert_eq!(p.normal_process_type, NormalProcessType::Isotropic);

        assert!(EvolutionParams::from_json_str(r#"{ "max_normal_iteration": 0 }"#).is_err());
    }
}
