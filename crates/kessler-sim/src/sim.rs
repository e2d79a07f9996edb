//! The simulation façade.
//!
//! [`Simulation`] owns the particle state (flat, seven doubles per
//! particle), the configuration, the integrator pool, and the
//! detection pipeline, and drives them through one superstep per
//! [`step()`](Simulation::step) call:
//!
//! ```text
//! propagate -> boxes -> sort -> BVH -> broad -> narrow -> aggregate
//! ```
//!
//! Terminal conditions are reported through event vectors, never as
//! errors; only boundary validation fails a call.

use std::collections::BTreeSet;
use std::time::Instant;

use tracing::debug;

use kessler_detect::{
    Collision, Conjunction, DetectionPipeline, DetectionSettings, TerminalEvent,
};
use kessler_dynamics::{Dynamics, IntegratorPool, StepData, TaylorIntegrator};
use kessler_math::DDouble;
use kessler_telemetry::{Phase, TelemetryRecorder};
use kessler_types::constants::NVARS;
use kessler_types::{KesslerError, KesslerResult, StepOutcome, TerminalCode};

use crate::config::{validate_ct, CollisionPolicy, SimConfig};
use crate::propagate::{propagate_superstep, Surfaces};

/// Collision screening simulation over a population of particles.
pub struct Simulation {
    dynamics: Box<dyn Dynamics>,
    /// Flat state, seven doubles per particle:
    /// `x, y, z, vx, vy, vz, r`.
    state: Vec<f64>,
    /// Flat per-particle parameters, `npars` doubles per particle.
    pars: Vec<f64>,
    config: SimConfig,
    time: DDouble,
    superstep_index: u64,

    pool: IntegratorPool,
    pipeline: DetectionPipeline,
    steps: Vec<StepData>,
    coll_active: Vec<bool>,
    conj_active: Vec<bool>,

    collisions: Vec<Collision>,
    conjunctions: Vec<Vec<Conjunction>>,
    terminals: Vec<TerminalEvent>,

    telemetry: Option<TelemetryRecorder>,
}

impl std::fmt::Debug for Simulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulation")
            .field("state", &self.state)
            .field("pars", &self.pars)
            .field("config", &self.config)
            .field("time", &self.time)
            .field("superstep_index", &self.superstep_index)
            .field("collisions", &self.collisions)
            .field("conjunctions", &self.conjunctions)
            .field("terminals", &self.terminals)
            .finish_non_exhaustive()
    }
}

impl Default for Simulation {
    /// An empty simulation with Keplerian dynamics (`mu = 1`) and
    /// default configuration.
    fn default() -> Self {
        Self::new(
            Box::new(kessler_dynamics::PointMassGravity::new(1.0)),
            Vec::new(),
            Vec::new(),
            SimConfig::default(),
        )
        .expect("default simulation is valid")
    }
}

impl Clone for Simulation {
    /// Clones every simulation ingredient. Telemetry observers are
    /// not cloned; the copy starts with no recorder.
    fn clone(&self) -> Self {
        Self {
            dynamics: self.dynamics.clone(),
            state: self.state.clone(),
            pars: self.pars.clone(),
            config: self.config.clone(),
            time: self.time,
            superstep_index: self.superstep_index,
            pool: self.pool.clone(),
            pipeline: DetectionPipeline::default(),
            steps: self.steps.clone(),
            coll_active: self.coll_active.clone(),
            conj_active: self.conj_active.clone(),
            collisions: self.collisions.clone(),
            conjunctions: self.conjunctions.clone(),
            terminals: self.terminals.clone(),
            telemetry: None,
        }
    }
}

impl Simulation {
    /// Builds a simulation from a dynamical system, a flat state
    /// vector, per-particle parameters, and a configuration.
    ///
    /// An empty `pars` vector with a parametrized system zero-fills
    /// the parameter table.
    pub fn new(
        dynamics: Box<dyn Dynamics>,
        state: Vec<f64>,
        pars: Vec<f64>,
        config: SimConfig,
    ) -> KesslerResult<Self> {
        validate_state(&state)?;
        config.validate()?;
        let nparts = state.len() / NVARS;
        config.validate_whitelists(nparts)?;
        let pars = validate_pars(pars, nparts, dynamics.npars())?;

        let template = TaylorIntegrator::new(dynamics.clone(), config.tol, config.high_accuracy);
        Ok(Self {
            pool: IntegratorPool::new(template),
            dynamics,
            state,
            pars,
            config,
            time: DDouble::ZERO,
            superstep_index: 0,
            pipeline: DetectionPipeline::default(),
            steps: Vec::new(),
            coll_active: Vec::new(),
            conj_active: Vec::new(),
            collisions: Vec::new(),
            conjunctions: Vec::new(),
            terminals: Vec::new(),
            telemetry: None,
        })
    }

    // ─── Accessors ────────────────────────────────────────────

    /// Flat state vector, seven doubles per particle.
    pub fn state(&self) -> &[f64] {
        &self.state
    }

    /// Flat parameter table, `npars()` doubles per particle.
    pub fn params(&self) -> &[f64] {
        &self.pars
    }

    /// Number of particles.
    pub fn nparts(&self) -> usize {
        self.state.len() / NVARS
    }

    /// Per-particle parameter row width.
    pub fn npars(&self) -> usize {
        self.dynamics.npars()
    }

    /// Current simulation time.
    pub fn time(&self) -> f64 {
        self.time.to_f64()
    }

    /// The active configuration.
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Collisional timestep width.
    pub fn ct(&self) -> f64 {
        self.config.ct
    }

    /// Name of the dynamical system.
    pub fn dynamics_name(&self) -> &str {
        self.dynamics.name()
    }

    /// Collisions from the last superstep, sorted by `(t, i, j)`.
    pub fn collisions(&self) -> &[Collision] {
        &self.collisions
    }

    /// Conjunctions from the last superstep, per chunk, each sorted
    /// by `(t, i, j)`.
    pub fn conjunctions(&self) -> &[Vec<Conjunction>] {
        &self.conjunctions
    }

    /// Terminal events from the last superstep, sorted by time.
    pub fn terminal_events(&self) -> &[TerminalEvent] {
        &self.terminals
    }

    // ─── Mutators ─────────────────────────────────────────────

    /// Sets the collisional timestep width.
    pub fn set_ct(&mut self, ct: f64) -> KesslerResult<()> {
        validate_ct(ct)?;
        self.config.ct = ct;
        Ok(())
    }

    /// Sets the number of collisional timesteps per `step()` call.
    pub fn set_n_par_ct(&mut self, n_par_ct: usize) -> KesslerResult<()> {
        if n_par_ct == 0 {
            return Err(KesslerError::InvalidArgument(
                "n_par_ct must be at least 1, got 0".into(),
            ));
        }
        self.config.n_par_ct = n_par_ct;
        Ok(())
    }

    /// Sets the conjunction threshold.
    pub fn set_conj_thresh(&mut self, thresh: f64) -> KesslerResult<()> {
        if !thresh.is_finite() || thresh < 0.0 {
            return Err(KesslerError::InvalidArgument(format!(
                "conjunction threshold must be finite and non-negative, got {thresh}"
            )));
        }
        self.config.conj_thresh = thresh;
        Ok(())
    }

    /// Sets the collision reporting policy.
    pub fn set_collision_policy(&mut self, policy: CollisionPolicy) {
        self.config.collision_policy = policy;
    }

    /// Attaches (or detaches) a telemetry recorder.
    pub fn set_telemetry(&mut self, recorder: Option<TelemetryRecorder>) {
        self.telemetry = recorder;
    }

    /// Replaces the particle population.
    ///
    /// `pars` may be `None` (or empty) with a parametrized system, in
    /// which case the parameter table is zero-filled.
    pub fn set_new_state_params(
        &mut self,
        state: Vec<f64>,
        pars: Option<Vec<f64>>,
    ) -> KesslerResult<()> {
        validate_state(&state)?;
        let nparts = state.len() / NVARS;
        self.config.validate_whitelists(nparts)?;
        let pars = validate_pars(pars.unwrap_or_default(), nparts, self.npars())?;

        self.state = state;
        self.pars = pars;
        self.clear_superstep_data();
        Ok(())
    }

    /// Removes the particles at the given indices (duplicates
    /// tolerated). Whitelist entries are dropped or shifted to keep
    /// pointing at the same particles.
    pub fn remove_particles(&mut self, indices: &[usize]) -> KesslerResult<()> {
        let unique: BTreeSet<usize> = indices.iter().copied().collect();
        let nparts = self.nparts();
        if unique.iter().any(|&idx| idx >= nparts) {
            let listed: Vec<usize> = unique.into_iter().collect();
            return Err(KesslerError::InvalidArgument(format!(
                "invalid particle indices for removal: {listed:?}"
            )));
        }
        if unique.is_empty() {
            return Ok(());
        }

        let npars = self.npars();
        let mut state = Vec::with_capacity(self.state.len() - unique.len() * NVARS);
        let mut pars = Vec::with_capacity(self.pars.len().saturating_sub(unique.len() * npars));
        for p in 0..nparts {
            if unique.contains(&p) {
                continue;
            }
            state.extend_from_slice(&self.state[p * NVARS..(p + 1) * NVARS]);
            pars.extend_from_slice(&self.pars[p * npars..(p + 1) * npars]);
        }
        self.state = state;
        self.pars = pars;

        for set in [&mut self.config.coll_whitelist, &mut self.config.conj_whitelist] {
            let remapped = set
                .iter()
                .copied()
                .filter(|idx| !unique.contains(idx))
                .map(|idx| idx - unique.iter().filter(|&&r| r < idx).count())
                .collect();
            *set = remapped;
        }
        self.clear_superstep_data();
        Ok(())
    }

    // ─── Superstep driver ─────────────────────────────────────

    /// Advances the simulation by one superstep
    /// (`ct * n_par_ct` time units).
    pub fn step(&mut self) -> KesslerResult<StepOutcome> {
        let wall = Instant::now();
        let nparts = self.nparts();
        let delta_t = self.config.ct * self.config.n_par_ct as f64;
        self.clear_superstep_data();

        let sim_time = self.time.to_f64();
        if let Some(rec) = self.telemetry.as_mut() {
            rec.superstep_begin(sim_time, nparts);
        }

        if nparts == 0 {
            self.time = self.time.add(delta_t);
            self.record_superstep_end(wall, 0);
            self.superstep_index += 1;
            return Ok(StepOutcome::Success);
        }

        // Activity masks are fixed for the whole superstep.
        self.coll_active = (0..nparts)
            .map(|p| {
                self.config.coll_whitelist.is_empty() || self.config.coll_whitelist.contains(&p)
            })
            .collect();
        self.conj_active = (0..nparts)
            .map(|p| {
                self.config.conj_thresh > 0.0
                    && (self.config.conj_whitelist.is_empty()
                        || self.config.conj_whitelist.contains(&p))
            })
            .collect();

        // Phase 1: propagation.
        let mark = Instant::now();
        let surfaces = Surfaces {
            reentry: self.config.reentry_radius,
            exit_radius: self.config.exit_radius,
        };
        let npars = self.npars();
        let propagation = propagate_superstep(
            &self.pool,
            &self.state,
            &self.pars,
            npars,
            delta_t,
            surfaces,
            &mut self.steps,
        );
        if let Some(rec) = self.telemetry.as_mut() {
            rec.phase_timing(Phase::Propagation, mark.elapsed().as_secs_f64());
        }
        self.terminals = propagation.terminals;

        // Phases 2-6: geometric detection.
        let report = self.pipeline.run(
            &self.steps,
            &self.coll_active,
            &self.conj_active,
            DetectionSettings {
                delta_t,
                nchunks: self.config.n_par_ct,
                conj_thresh: self.config.conj_thresh,
                min_coll_radius: self.config.min_coll_radius,
            },
        );
        if let Some(rec) = self.telemetry.as_mut() {
            for (phase, seconds) in [
                (Phase::Bboxes, report.timings.bboxes),
                (Phase::Sort, report.timings.sort),
                (Phase::Bvh, report.timings.bvh),
                (Phase::Broad, report.timings.broad),
                (Phase::Narrow, report.timings.narrow),
            ] {
                rec.phase_timing(phase, seconds);
            }
        }

        self.collisions = report.collisions;
        self.conjunctions = report.conjunctions;
        self.sort_events(delta_t);

        // Aggregate: apply the collision policy and commit state.
        let outcome = self.commit(delta_t, propagation.end_states);

        debug!(
            superstep = self.superstep_index,
            candidates = report.candidate_pairs,
            collisions = self.collisions.len(),
            terminals = self.terminals.len(),
            ?outcome,
            "superstep complete"
        );
        self.record_superstep_end(wall, report.candidate_pairs);
        self.superstep_index += 1;
        Ok(outcome)
    }

    /// Sorts and deduplicates the event vectors.
    fn sort_events(&mut self, delta_t: f64) {
        // Collisions: dedup pair-wise within tolerance (a root sitting
        // on a chunk boundary can surface in both chunks), then order
        // by time.
        let tol = delta_t * 1.0e-12;
        self.collisions
            .sort_by(|a, b| (a.i, a.j).cmp(&(b.i, b.j)).then(a.t.total_cmp(&b.t)));
        self.collisions
            .dedup_by(|a, b| a.i == b.i && a.j == b.j && (a.t - b.t).abs() <= tol);
        self.collisions
            .sort_by(|a, b| a.t.total_cmp(&b.t).then_with(|| (a.i, a.j).cmp(&(b.i, b.j))));

        for conj in &mut self.conjunctions {
            conj.sort_by(|a, b| a.t.total_cmp(&b.t).then_with(|| (a.i, a.j).cmp(&(b.i, b.j))));
        }
        self.terminals
            .sort_by(|a, b| a.t.total_cmp(&b.t).then(a.particle.cmp(&b.particle)));
    }

    /// Applies the collision policy, writes back the end-of-superstep
    /// state, and advances time.
    fn commit(&mut self, delta_t: f64, end_states: Vec<[f64; NVARS]>) -> StepOutcome {
        let stop_at = match self.config.collision_policy {
            CollisionPolicy::StopAtFirst => self.collisions.first().map(|c| c.t),
            CollisionPolicy::ReportAll => None,
        };

        match stop_at {
            Some(tc) => {
                self.collisions.retain(|c| c.t <= tc);
                for conj in &mut self.conjunctions {
                    conj.retain(|c| c.t <= tc);
                }
                self.terminals.retain(|e| e.t <= tc);

                // Dense-propagate everything to the collision time
                // (or to a particle's earlier terminal time).
                for (p, end_state) in end_states.iter().enumerate() {
                    let tp = tc.min(self.steps[p].valid_until);
                    let row = &mut self.state[p * NVARS..(p + 1) * NVARS];
                    let mut frozen = *end_state;
                    if self.steps[p].eval_state(tp, &mut frozen) {
                        row.copy_from_slice(&frozen);
                    } else {
                        row.copy_from_slice(end_state);
                    }
                }
                self.time = self.time.add(tc);
                StepOutcome::Collision
            }
            None => {
                for (p, end_state) in end_states.iter().enumerate() {
                    self.state[p * NVARS..(p + 1) * NVARS].copy_from_slice(end_state);
                }
                self.time = self.time.add(delta_t);

                if !self.collisions.is_empty() {
                    StepOutcome::Collision
                } else if let Some(code) = self.worst_terminal() {
                    code.outcome()
                } else {
                    StepOutcome::Success
                }
            }
        }
    }

    /// Highest-precedence terminal code of the superstep:
    /// `NonFinite > Reentry > Exit`.
    fn worst_terminal(&self) -> Option<TerminalCode> {
        [TerminalCode::NonFinite, TerminalCode::Reentry, TerminalCode::Exit]
            .into_iter()
            .find(|&code| self.terminals.iter().any(|e| e.code == code))
    }

    fn clear_superstep_data(&mut self) {
        self.collisions.clear();
        self.conjunctions.clear();
        self.terminals.clear();
    }

    fn record_superstep_end(&mut self, wall: Instant, candidates: usize) {
        let collisions = self.collisions.len();
        let conjunctions = self.conjunctions.iter().map(Vec::len).sum();
        let terminals = self.terminals.len();
        if let Some(rec) = self.telemetry.as_mut() {
            rec.superstep_end(
                candidates,
                collisions,
                conjunctions,
                terminals,
                wall.elapsed().as_secs_f64(),
            );
        }
    }
}

/// Validates a flat state vector: a multiple of seven finite doubles
/// with non-negative radii.
fn validate_state(state: &[f64]) -> KesslerResult<()> {
    if state.len() % NVARS != 0 {
        return Err(KesslerError::InvalidArgument(format!(
            "state vector length is {}, which is not a multiple of 7",
            state.len()
        )));
    }
    for (p, row) in state.chunks_exact(NVARS).enumerate() {
        if row.iter().any(|v| !v.is_finite()) {
            return Err(KesslerError::InvalidArgument(format!(
                "particle {p} has a non-finite state component"
            )));
        }
        if row[6] < 0.0 {
            return Err(KesslerError::InvalidArgument(format!(
                "particle {p} has negative radius {}",
                row[6]
            )));
        }
    }
    Ok(())
}

/// Validates the parameter table shape; an empty table with a
/// parametrized system zero-fills.
fn validate_pars(pars: Vec<f64>, nparts: usize, npars: usize) -> KesslerResult<Vec<f64>> {
    if npars == 0 {
        if !pars.is_empty() {
            return Err(KesslerError::InvalidArgument(
                "parameter values must be empty when the dynamics has no parameters".into(),
            ));
        }
        return Ok(pars);
    }
    if pars.is_empty() {
        return Ok(vec![0.0; nparts * npars]);
    }
    if pars.len() != nparts * npars {
        return Err(KesslerError::InvalidArgument(format!(
            "parameter table must have shape ({nparts}, {npars}), but its flattened size is {}",
            pars.len()
        )));
    }
    Ok(pars)
}
