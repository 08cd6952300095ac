// src/evolution.rs
//
// Outer loop of the anisotropic fourth-order level-set evolution:
//
//   for each of MaxFilterIteration outer steps:
//     1. diffuse the normals of φ (inner loop, may stop early on RMS change)
//     2. advance φ one step toward the curvature of the processed normals
//
// The outer loop never stops early. Any stage failure aborts the run and is
// returned unchanged; no partially evolved field is handed back.

use log::{debug, info};

use crate::error::EvolutionError;
use crate::normal_diffusion::{
    NormalDiffusionReport, NormalDiffusionSettings, NormalProcess, NormalVectorDiffusion,
};
use crate::params::EvolutionParams;
use crate::parallel::parallel_enabled;
use crate::propagation::{Propagation, PropagationReport, RefitPropagation};
use crate::scalar_field::ScalarField;

#[derive(Debug, Clone, Default)]
pub struct EvolutionReport {
    /// Outer iterations performed (always MaxFilterIteration on success).
    pub outer_iterations: usize,
    /// One entry per outer iteration.
    pub normal_reports: Vec<NormalDiffusionReport>,
    /// One entry per outer iteration.
    pub propagation_reports: Vec<PropagationReport>,
}

impl EvolutionReport {
    /// Inner normal-diffusion iterations summed over the run.
    pub fn total_normal_iterations(&self) -> usize {
        self.normal_reports.iter().map(|r| r.iterations).sum()
    }

    /// Physical time covered by the propagation steps.
    pub fn total_time(&self) -> f64 {
        self.propagation_reports.iter().map(|r| r.dt).sum()
    }
}

/// Evolution controller. Holds configuration and the two stages; each `run`
/// owns its working field exclusively, so one controller can serve
/// independent runs from several threads.
#[derive(Debug, Clone)]
pub struct LevelSetEvolution<N = NormalVectorDiffusion, P = RefitPropagation> {
    params: EvolutionParams,
    normal_stage: N,
    propagation: P,
}

impl Default for LevelSetEvolution {
    fn default() -> Self {
        Self::new()
    }
}

impl LevelSetEvolution {
    /// Controller with default parameters and the standard stages.
    pub fn new() -> Self {
        Self {
            params: EvolutionParams::default(),
            normal_stage: NormalVectorDiffusion,
            propagation: RefitPropagation,
        }
    }

    /// Controller with validated parameters and the standard stages.
    pub fn with_params(params: EvolutionParams) -> Result<Self, EvolutionError> {
        params.validate()?;
        Ok(Self {
            params,
            normal_stage: NormalVectorDiffusion,
            propagation: RefitPropagation,
        })
    }
}

impl<N: NormalProcess, P: Propagation> LevelSetEvolution<N, P> {
    /// Controller with custom stage implementations.
    pub fn with_stages(
        params: EvolutionParams,
        normal_stage: N,
        propagation: P,
    ) -> Result<Self, EvolutionError> {
        params.validate()?;
        Ok(Self {
            params,
            normal_stage,
            propagation,
        })
    }

    /// Set the four core tunables. On error nothing changes.
    pub fn configure(
        &mut self,
        max_filter_iteration: i64,
        max_normal_iteration: i64,
        conductance: f64,
        rms_trigger: f64,
    ) -> Result<(), EvolutionError> {
        let checked = EvolutionParams::new(
            max_filter_iteration,
            max_normal_iteration,
            conductance,
            rms_trigger,
        )?;
        self.params.max_filter_iteration = checked.max_filter_iteration;
        self.params.max_normal_iteration = checked.max_normal_iteration;
        self.params.normal_process_conductance = checked.normal_process_conductance;
        self.params.rms_change_normal_process_trigger = checked.rms_change_normal_process_trigger;
        Ok(())
    }

    /// Replace the whole parameter set. On error nothing changes.
    pub fn set_params(&mut self, params: EvolutionParams) -> Result<(), EvolutionError> {
        params.validate()?;
        self.params = params;
        Ok(())
    }

    pub fn params(&self) -> &EvolutionParams {
        &self.params
    }

    pub fn max_filter_iteration(&self) -> usize {
        self.params.max_filter_iteration
    }

    pub fn max_normal_iteration(&self) -> usize {
        self.params.max_normal_iteration
    }

    pub fn normal_process_conductance(&self) -> f64 {
        self.params.normal_process_conductance
    }

    pub fn rms_change_normal_process_trigger(&self) -> f64 {
        self.params.rms_change_normal_process_trigger
    }

    pub fn normal_stage(&self) -> &N {
        &self.normal_stage
    }

    pub fn propagation(&self) -> &P {
        &self.propagation
    }

    /// Evolve `input` and return the final field together with a per-step report.
    pub fn run_with_report(
        &self,
        input: ScalarField,
    ) -> Result<(ScalarField, EvolutionReport), EvolutionError> {
        if let Some(axis) = input.grid.first_empty_axis() {
            return Err(EvolutionError::EmptyInput { axis });
        }

        let settings = NormalDiffusionSettings::from_params(&self.params);
        let parallel = parallel_enabled(self.params.parallel);
        let outer = self.params.max_filter_iteration;

        let mut report = EvolutionReport {
            outer_iterations: 0,
            normal_reports: Vec::with_capacity(outer),
            propagation_reports: Vec::with_capacity(outer),
        };

        let mut phi = input;
        for it in 1..=outer {
            let (normals, nrep) = self.normal_stage.process(&phi, &settings)?;
            let (next, prep) = self.propagation.advance(&phi, &normals, parallel)?;
            phi = next;

            debug!(
                "[evolve] outer={}/{}  inner={}  rms={:.3e}  dt={:.3e}  max|dphi|={:.3e}",
                it, outer, nrep.iterations, nrep.final_rms, prep.dt, prep.max_change
            );
            report.normal_reports.push(nrep);
            report.propagation_reports.push(prep);
            report.outer_iterations = it;
        }

        info!(
            "level-set evolution finished: {} outer steps, {} normal iterations, t={:.4e}",
            report.outer_iterations,
            report.total_normal_iterations(),
            report.total_time()
        );
        Ok((phi, report))
    }

    /// Evolve `input` for exactly MaxFilterIteration outer steps.
    pub fn run(&self, input: ScalarField) -> Result<ScalarField, EvolutionError> {
        self.run_with_report(input).map(|(phi, _)| phi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Grid;
    use crate::initial_states::centered_square_step;

    #[test]
    fn configure_stores_values() {
        let mut ev = LevelSetEvolution::new();
        ev.configure(2, 5, 0.5, 0.1).unwrap();
        assert_eq!(ev.max_filter_iteration(), 2);
        assert_eq!(ev.max_normal_iteration(), 5);
        assert_eq!(ev.normal_process_conductance(), 0.5);
        assert_eq!(ev.rms_change_normal_process_trigger(), 0.1);
    }

    #[test]
    fn failed_configure_keeps_previous_values() {
        let mut ev = LevelSetEvolution::new();
        ev.configure(3, 4, 0.25, 0.01).unwrap();
        let before = ev.params().clone();

        assert!(ev.configure(0, 4, 0.25, 0.01).is_err());
        assert!(ev.configure(3, -1, 0.25, 0.01).is_err());
        assert!(ev.configure(3, 4, -1.0, 0.01).is_err());
        assert!(ev.configure(3, 4, 0.25, -0.5).is_err());
        assert_eq!(ev.params(), &before);
    }

    #[test]
    fn report_has_one_entry_per_outer_step() {
        let mut ev = LevelSetEvolution::new();
        ev.configure(3, 2, 0.5, 0.0).unwrap();
        let (out, report) = ev.run_with_report(centered_square_step(16, 2)).unwrap();
        assert_eq!(out.grid, Grid::unit(&[16, 16]));
        assert_eq!(report.outer_iterations, 3);
        assert_eq!(report.normal_reports.len(), 3);
        assert_eq!(report.propagation_reports.len(), 3);
        assert_eq!(report.total_normal_iterations(), 6);
    }
}
