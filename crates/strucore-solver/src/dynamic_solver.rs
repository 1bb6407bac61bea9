//! Transient dynamic analysis.
//!
//! Solves M·ü + C·u̇ + K·u = F(t) with Rayleigh damping C = α·M + β·K and
//! one of two integration schemes:
//!
//! - **Newmark-β** (implicit; default β = 1/4, γ = 1/2 average acceleration,
//!   unconditionally stable): the effective stiffness
//!   K* = K + a₀·M + a₁·C is factored once and reused every step.
//! - **Central difference** (explicit): the effective mass
//!   M* = M + (Δt/2)·C is diagonal when damping is mass-proportional — the
//!   solve degenerates to an elementwise division. Stability requires
//!   Δt ≤ 2/ω_max; the caller owns that choice.
//!
//! The external force history is sampled per step with clamp-to-last
//! indexing; a missing history means the model's assembled load vector is
//! held constant.

use nalgebra::DVector;
use nalgebra_sparse::CsrMatrix;
use serde::{Deserialize, Serialize};

use strucore_model::Model;

use crate::assembly::GlobalSystem;
use crate::control::CancelToken;
use crate::error::{Result, SolverError};
use crate::sparse::{self, SparseFactor};

/// Time integration scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegrationMethod {
    /// Implicit Newmark-β
    Newmark,
    /// Explicit central difference
    CentralDifference,
}

/// Dynamic analysis configuration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DynamicOptions {
    /// Time step Δt [s]
    pub time_step: f64,
    /// Total duration T [s]; the grid has ⌊T/Δt⌋ steps
    pub total_time: f64,
    /// Integration scheme
    pub method: IntegrationMethod,
    /// Newmark β parameter
    pub beta: f64,
    /// Newmark γ parameter
    pub gamma: f64,
    /// Rayleigh mass-proportional coefficient α
    pub alpha_damping: f64,
    /// Rayleigh stiffness-proportional coefficient β
    pub beta_damping: f64,
}

impl DynamicOptions {
    /// Newmark average-acceleration setup, undamped.
    pub fn newmark(time_step: f64, total_time: f64) -> Self {
        Self {
            time_step,
            total_time,
            method: IntegrationMethod::Newmark,
            beta: 0.25,
            gamma: 0.5,
            alpha_damping: 0.0,
            beta_damping: 0.0,
        }
    }

    /// Central-difference setup, undamped.
    pub fn central_difference(time_step: f64, total_time: f64) -> Self {
        Self {
            method: IntegrationMethod::CentralDifference,
            ..Self::newmark(time_step, total_time)
        }
    }

    /// Set the Rayleigh coefficients directly: C = α·M + β·K.
    pub fn with_rayleigh_damping(mut self, alpha: f64, beta: f64) -> Self {
        self.alpha_damping = alpha;
        self.beta_damping = beta;
        self
    }

    /// Derive the Rayleigh coefficients from a damping ratio ζ (a pure
    /// ratio: 0.05 = 5%) and two target angular frequencies [rad/s]:
    /// α = 2ζω₁ω₂/(ω₁+ω₂), β = 2ζ/(ω₁+ω₂).
    pub fn with_damping_ratio(self, zeta: f64, omega1: f64, omega2: f64) -> Self {
        let alpha = 2.0 * zeta * omega1 * omega2 / (omega1 + omega2);
        let beta = 2.0 * zeta / (omega1 + omega2);
        self.with_rayleigh_damping(alpha, beta)
    }

    /// Stiffness-only proportional fallback when no frequency pair is
    /// available: α = 0, β = 2ζ/ω_ref for a caller-supplied reference
    /// angular frequency.
    pub fn with_stiffness_damping(self, zeta: f64, omega_ref: f64) -> Self {
        self.with_rayleigh_damping(0.0, 2.0 * zeta / omega_ref)
    }
}

/// Terminal state of the time integration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntegrationStatus {
    /// The full time grid was integrated
    Completed,
    /// Cooperative cancellation truncated the run
    Cancelled,
}

/// Results of a transient analysis.
#[derive(Debug, Clone)]
pub struct DynamicResults {
    /// Time grid t_i = i·Δt
    pub time: Vec<f64>,
    /// Displacement history, one vector per grid point
    pub displacements: Vec<DVector<f64>>,
    /// Velocity history
    pub velocities: Vec<DVector<f64>>,
    /// Acceleration history
    pub accelerations: Vec<DVector<f64>>,
    /// max|u| across the run
    pub max_displacement: f64,
    /// max|v| across the run
    pub max_velocity: f64,
    /// max|a| across the run
    pub max_acceleration: f64,
    /// Terminal status
    pub status: IntegrationStatus,
}

/// Transient dynamics solver.
pub struct DynamicSolver<'a> {
    model: &'a Model,
    options: DynamicOptions,
}

struct Operators {
    system: GlobalSystem,
    mass: DVector<f64>,
    damping: Option<CsrMatrix<f64>>,
    penalty_force: DVector<f64>,
    num_steps: usize,
}

impl<'a> DynamicSolver<'a> {
    /// Create a solver over a model.
    pub fn new(model: &'a Model, options: DynamicOptions) -> Self {
        Self { model, options }
    }

    /// Integrate with the model's assembled load vector held constant.
    pub fn solve(&self) -> Result<DynamicResults> {
        self.solve_with_control(None, &CancelToken::new())
    }

    /// Integrate under an explicit force history; sample i applies at time
    /// t_i, indices past the end clamp to the last sample.
    pub fn solve_with_history(&self, forces: &[DVector<f64>]) -> Result<DynamicResults> {
        self.solve_with_control(Some(forces), &CancelToken::new())
    }

    /// Integrate with a cancellation token polled at each time step.
    pub fn solve_with_control(
        &self,
        forces: Option<&[DVector<f64>]>,
        control: &CancelToken,
    ) -> Result<DynamicResults> {
        let ops = self.setup()?;
        match self.options.method {
            IntegrationMethod::Newmark => self.newmark(&ops, forces, control),
            IntegrationMethod::CentralDifference => self.central_difference(&ops, forces, control),
        }
    }

    fn setup(&self) -> Result<Operators> {
        let dt = self.options.time_step;
        if !(dt > 0.0) {
            return Err(SolverError::NumericalInstability(
                "time step must be positive".into(),
            ));
        }
        if !(self.options.total_time > 0.0) {
            return Err(SolverError::NumericalInstability(
                "total time must be positive".into(),
            ));
        }

        let mut system = GlobalSystem::assemble(self.model)?;
        system.assemble_mass(self.model)?;
        let mass = system
            .mass
            .clone()
            .ok_or_else(|| SolverError::AssemblyFailed("mass matrix not assembled".into()))?;

        let alpha = self.options.alpha_damping;
        let beta = self.options.beta_damping;
        let damping = if alpha == 0.0 && beta == 0.0 {
            None
        } else {
            let stiffness_part = sparse::linear_combination(&[(beta, &system.stiffness)])?;
            Some(sparse::add_diagonal(&stiffness_part, &(alpha * &mass))?)
        };

        let num_steps = (self.options.total_time / dt).floor() as usize;
        let penalty_force = system.penalty_force();

        Ok(Operators {
            system,
            mass,
            damping,
            penalty_force,
            num_steps,
        })
    }

    /// Force sample at grid index i, clamped to the last available entry.
    fn force_at<'f>(
        &self,
        ops: &'f Operators,
        forces: Option<&'f [DVector<f64>]>,
        index: usize,
    ) -> &'f DVector<f64> {
        match forces {
            Some(history) if !history.is_empty() => &history[index.min(history.len() - 1)],
            _ => &ops.system.force,
        }
    }

    /// Initial acceleration from M·a₀ = F₀ - C·v₀ - K·u₀ with the diagonal
    /// lumped mass; massless DOFs start at rest.
    fn initial_acceleration(
        &self,
        ops: &Operators,
        f0: &DVector<f64>,
        u0: &DVector<f64>,
        v0: &DVector<f64>,
    ) -> DVector<f64> {
        let mut rhs = f0 - sparse::spmv(&ops.system.stiffness, u0);
        if let Some(c) = &ops.damping {
            rhs -= sparse::spmv(c, v0);
        }
        DVector::from_iterator(
            rhs.len(),
            rhs.iter()
                .zip(ops.mass.iter())
                .map(|(r, &m)| if m > 0.0 { r / m } else { 0.0 }),
        )
    }

    fn newmark(
        &self,
        ops: &Operators,
        forces: Option<&[DVector<f64>]>,
        control: &CancelToken,
    ) -> Result<DynamicResults> {
        let dt = self.options.time_step;
        let (beta, gamma) = (self.options.beta, self.options.gamma);

        let a0 = 1.0 / (beta * dt * dt);
        let a1 = gamma / (beta * dt);
        let a2 = 1.0 / (beta * dt);
        let a3 = 1.0 / (2.0 * beta) - 1.0;
        let a4 = gamma / beta - 1.0;
        let a5 = dt / 2.0 * (gamma / beta - 2.0);

        // K* = K_c + a0·M + a1·C, factored once for the constant step.
        let k_c = ops.system.constrained_stiffness()?;
        let k_star = {
            let with_mass = sparse::add_diagonal(&k_c, &(a0 * &ops.mass))?;
            match &ops.damping {
                Some(c) => sparse::linear_combination(&[(1.0, &with_mass), (a1, c)])?,
                None => with_mass,
            }
        };
        let factor = SparseFactor::factor(&k_star)?;

        let n = ops.num_steps;
        let mut history = History::new(n);

        let mut u = DVector::zeros(ops.system.num_dofs());
        let mut v = DVector::zeros(ops.system.num_dofs());
        let mut a = self.initial_acceleration(ops, self.force_at(ops, forces, 0), &u, &v);
        history.push(0.0, u.clone(), v.clone(), a.clone());

        for i in 0..n {
            if control.is_cancelled() {
                return Ok(history.finish(IntegrationStatus::Cancelled));
            }

            let f_next = self.force_at(ops, forces, i + 1);
            let m_term: DVector<f64> = &u * a0 + &v * a2 + &a * a3;
            let mut f_eff = f_next + &ops.penalty_force;
            f_eff += DVector::from_iterator(
                m_term.len(),
                m_term.iter().zip(ops.mass.iter()).map(|(t, &m)| t * m),
            );
            if let Some(c) = &ops.damping {
                f_eff += sparse::spmv(c, &(&u * a1 + &v * a4 + &a * a5));
            }

            let u_next = factor.solve(&f_eff);
            if !u_next.iter().all(|x| x.is_finite()) {
                return Err(SolverError::NumericalInstability(format!(
                    "non-finite displacement at step {}",
                    i + 1
                )));
            }

            let a_next = (&u_next - &u) * a0 - &v * a2 - &a * a3;
            let v_next = &v + (&a * (1.0 - gamma) + &a_next * gamma) * dt;

            u = u_next;
            v = v_next;
            a = a_next;
            history.push((i + 1) as f64 * dt, u.clone(), v.clone(), a.clone());
        }

        log::debug!("newmark integration: {} steps completed", n);
        Ok(history.finish(IntegrationStatus::Completed))
    }

    fn central_difference(
        &self,
        ops: &Operators,
        forces: Option<&[DVector<f64>]>,
        control: &CancelToken,
    ) -> Result<DynamicResults> {
        let dt = self.options.time_step;
        let n = ops.num_steps;
        let num_dofs = ops.system.num_dofs();

        // M* = M + (Δt/2)·C; diagonal unless stiffness-proportional damping
        // couples DOFs.
        let effective_mass = self.effective_mass(ops, dt)?;

        let mut history = History::new(n);
        let mut u = DVector::zeros(num_dofs);
        let mut v = DVector::zeros(num_dofs);

        for i in 0..=n {
            if control.is_cancelled() {
                return Ok(history.finish(IntegrationStatus::Cancelled));
            }

            let mut f_eff = self.force_at(ops, forces, i) + &ops.penalty_force
                - sparse::spmv(&ops.system.stiffness, &u);
            if let Some(c) = &ops.damping {
                f_eff -= sparse::spmv(c, &v);
            }

            let a = effective_mass.solve(&f_eff);
            if !a.iter().all(|x| x.is_finite()) {
                return Err(SolverError::NumericalInstability(format!(
                    "non-finite acceleration at step {i}"
                )));
            }
            history.push(i as f64 * dt, u.clone(), v.clone(), a.clone());

            if i == n {
                break;
            }
            v += &a * dt;
            u += &v * dt;
            if !u.iter().all(|x| x.is_finite()) {
                return Err(SolverError::NumericalInstability(format!(
                    "non-finite displacement at step {}",
                    i + 1
                )));
            }
        }

        log::debug!("central difference integration: {} steps completed", n);
        Ok(history.finish(IntegrationStatus::Completed))
    }

    fn effective_mass(&self, ops: &Operators, dt: f64) -> Result<EffectiveMass> {
        let penalized_diag = {
            let mut d = ops.mass.clone();
            for &(dof, _) in &ops.system.constrained {
                d[dof] += ops.system.penalty;
            }
            d
        };

        if self.options.beta_damping == 0.0 {
            // Mass-proportional damping keeps M* diagonal.
            let scale = 1.0 + dt / 2.0 * self.options.alpha_damping;
            let diag = penalized_diag * scale;
            if diag.iter().any(|&m| m <= 0.0) {
                return Err(SolverError::LinearSolveFailed(
                    "singular effective mass (massless unconstrained DOF)".into(),
                ));
            }
            Ok(EffectiveMass::Diagonal(diag))
        } else {
            let c = ops
                .damping
                .as_ref()
                .ok_or_else(|| SolverError::AssemblyFailed("damping matrix missing".into()))?;
            let scaled = sparse::linear_combination(&[(dt / 2.0, c)])?;
            let m_star = sparse::add_diagonal(&scaled, &penalized_diag)?;
            Ok(EffectiveMass::Factored(SparseFactor::factor(&m_star)?))
        }
    }
}

enum EffectiveMass {
    Diagonal(DVector<f64>),
    Factored(SparseFactor),
}

impl EffectiveMass {
    fn solve(&self, rhs: &DVector<f64>) -> DVector<f64> {
        match self {
            EffectiveMass::Diagonal(diag) => DVector::from_iterator(
                rhs.len(),
                rhs.iter().zip(diag.iter()).map(|(r, m)| r / m),
            ),
            EffectiveMass::Factored(factor) => factor.solve(rhs),
        }
    }
}

/// Response history accumulator with running maxima.
struct History {
    time: Vec<f64>,
    displacements: Vec<DVector<f64>>,
    velocities: Vec<DVector<f64>>,
    accelerations: Vec<DVector<f64>>,
}

impl History {
    fn new(steps: usize) -> Self {
        Self {
            time: Vec::with_capacity(steps + 1),
            displacements: Vec::with_capacity(steps + 1),
            velocities: Vec::with_capacity(steps + 1),
            accelerations: Vec::with_capacity(steps + 1),
        }
    }

    fn push(&mut self, t: f64, u: DVector<f64>, v: DVector<f64>, a: DVector<f64>) {
        self.time.push(t);
        self.displacements.push(u);
        self.velocities.push(v);
        self.accelerations.push(a);
    }

    fn finish(self, status: IntegrationStatus) -> DynamicResults {
        let max_of = |series: &[DVector<f64>]| {
            series
                .iter()
                .map(|x| x.amax())
                .fold(0.0_f64, f64::max)
        };
        let max_displacement = max_of(&self.displacements);
        let max_velocity = max_of(&self.velocities);
        let max_acceleration = max_of(&self.accelerations);
        DynamicResults {
            time: self.time,
            displacements: self.displacements,
            velocities: self.velocities,
            accelerations: self.accelerations,
            max_displacement,
            max_velocity,
            max_acceleration,
            status,
        }
    }
}
