//! End-to-end analytical validation scenarios, all in strict SI units.
//!
//! Each case builds a small model, runs a full analysis, and checks the
//! response against the closed-form solution from beam/bar theory.

use approx::assert_relative_eq;
use nalgebra::DVector;
use strucore_model::{Constraint, Element, ElementKind, Load, Material, Model, Node, Section};
use strucore_solver::{
    BucklingSolver, ConvergenceStatus, DynamicOptions, DynamicSolver, GlobalSystem, ModalSolver,
    NonlinearOptions, NonlinearSolver, StaticSolver,
};

const E: f64 = 2e11;
const RHO: f64 = 7850.0;

fn steel() -> Material {
    Material::new(1, "steel", E, 0.3, RHO)
}

/// Two-node axial truss: node 0 clamped, node 1 held laterally, F_x = 1e5.
fn axial_truss() -> Model {
    let mut model = Model::new();
    model.add_node(Node::new(0, 0.0, 0.0, 0.0));
    model.add_node(Node::new(1, 1.0, 0.0, 0.0));
    model.add_material(steel());
    model.add_section(Section::bar(1, "tie", 0.01));
    model.add_element(Element::new(1, ElementKind::Truss, vec![0, 1], 1, Some(1)));
    model.add_constraint(Constraint::clamp(1, 0));
    model.add_constraint(Constraint::fix(2, 1, [false, true, true, true, true, true]));
    model.add_load(Load::at_node(1, 1, [1e5, 0.0, 0.0, 0.0, 0.0, 0.0]));
    model
}

#[test]
fn axial_truss_deflection_and_reaction() {
    let model = axial_truss();
    let results = StaticSolver::new(&model).solve().unwrap();

    // δ = PL/(EA) = 1e5·1/(2e11·0.01) = 5e-5
    let system = GlobalSystem::assemble(&model).unwrap();
    let ux = system.dof_map.index(1, 0).unwrap();
    assert_relative_eq!(results.displacements[ux], 5e-5, epsilon = 1e-9);

    let rx = system.dof_map.index(0, 0).unwrap();
    assert_relative_eq!(results.reactions[rx], -1e5, max_relative = 1e-6);
}

/// Simply supported beam in planar bending: uy/rz active, ends pinned.
fn simply_supported_beam(node_xs: &[f64], load_node: i64) -> Model {
    let mut model = Model::new();
    let mask = [false, true, false, false, false, true];
    for (i, &x) in node_xs.iter().enumerate() {
        model.add_node(Node::with_dofs(i as i64, x, 0.0, 0.0, mask));
    }
    model.add_material(steel());
    model.add_section(Section::new(1, "beam", 0.01, 1e-6, 8.33e-6, 8.33e-6, 1e-6));
    for i in 0..node_xs.len() - 1 {
        model.add_element(Element::new(
            i as i64 + 1,
            ElementKind::Beam,
            vec![i as i64, i as i64 + 1],
            1,
            Some(1),
        ));
    }
    let last = node_xs.len() as i64 - 1;
    model.add_constraint(Constraint::fix(1, 0, [false, true, false, false, false, false]));
    model.add_constraint(Constraint::fix(2, last, [false, true, false, false, false, false]));
    model.add_load(Load::at_node(1, load_node, [0.0, -1e4, 0.0, 0.0, 0.0, 0.0]));
    model
}

#[test]
fn simply_supported_beam_midspan_deflection() {
    // Midspan node at x = 3 of a 6 m span: δ = PL³/(48·E·Iz).
    let model = simply_supported_beam(&[0.0, 3.0, 6.0], 1);
    let results = StaticSolver::new(&model).solve().unwrap();

    let expected = 1e4 * 6.0_f64.powi(3) / (48.0 * E * 8.33e-6);
    assert_relative_eq!(results.max_displacement, expected, max_relative = 1e-6);
    assert_relative_eq!(expected, 2.70e-2, max_relative = 0.01);
}

#[test]
fn offset_point_load_matches_closed_form() {
    // Nodes at x = 0, 2, 4, 6 with the load at x = 4: nodal point loads are
    // represented exactly, so the deflection under the load is
    // P·a²·b²/(3·E·I·L) with a = 4, b = 2.
    let model = simply_supported_beam(&[0.0, 2.0, 4.0, 6.0], 2);
    let results = StaticSolver::new(&model).solve().unwrap();

    let (a, b, l) = (4.0_f64, 2.0_f64, 6.0_f64);
    let expected = 1e4 * a.powi(2) * b.powi(2) / (3.0 * E * 8.33e-6 * l);
    assert_relative_eq!(results.max_displacement, expected, max_relative = 1e-6);
}

#[test]
fn simply_supported_beam_fundamental_frequency() {
    // f1 = (π²/2π)·sqrt(EI/(ρA·L⁴)) for the continuum beam; the lumped
    // 3-element discretization must land within 10%.
    let model = simply_supported_beam(&[0.0, 2.0, 4.0, 6.0], 2);
    let results = ModalSolver::new(&model).solve(1).unwrap();

    let l: f64 = 6.0;
    let expected = std::f64::consts::PI.powi(2) / (2.0 * std::f64::consts::PI)
        * (E * 8.33e-6 / (RHO * 0.01 * l.powi(4))).sqrt();
    assert_relative_eq!(results.frequencies_hz[0], expected, max_relative = 0.10);
}

#[test]
fn fixed_free_bar_frequency_within_one_percent() {
    // Fixed-free axial bar: f1 = (1/4L)·sqrt(E/ρ).
    let n = 10;
    let length = 1.0;
    let mut model = Model::new();
    model.add_node(Node::with_dofs(0, 0.0, 0.0, 0.0, [false; 6]));
    let mask = [true, false, false, false, false, false];
    for i in 1..=n {
        model.add_node(Node::with_dofs(
            i as i64,
            length * i as f64 / n as f64,
            0.0,
            0.0,
            mask,
        ));
    }
    model.add_material(steel());
    model.add_section(Section::bar(1, "bar", 0.01));
    for i in 0..n {
        model.add_element(Element::new(
            i as i64 + 1,
            ElementKind::Truss,
            vec![i as i64, i as i64 + 1],
            1,
            Some(1),
        ));
    }

    let results = ModalSolver::new(&model).solve(1).unwrap();
    let expected = (E / RHO).sqrt() / (4.0 * length);
    assert_relative_eq!(results.frequencies_hz[0], expected, max_relative = 0.01);
}

/// Pinned-pinned column under axial compression `p`, lateral bending in the
/// x-y plane.
fn pinned_column(elements: usize, p: f64) -> Model {
    let length = 2.0;
    let mut model = Model::new();
    let mask = [true, true, false, false, false, true];
    for i in 0..=elements {
        model.add_node(Node::with_dofs(
            i as i64,
            length * i as f64 / elements as f64,
            0.0,
            0.0,
            mask,
        ));
    }
    model.add_material(steel());
    model.add_section(Section::new(1, "strut", 1e-3, 1e-8, 1e-8, 1e-8, 1e-8));
    for i in 0..elements {
        model.add_element(Element::new(
            i as i64 + 1,
            ElementKind::Beam,
            vec![i as i64, i as i64 + 1],
            1,
            Some(1),
        ));
    }
    model.add_constraint(Constraint::fix(1, 0, [true, true, false, false, false, false]));
    model.add_constraint(Constraint::fix(
        2,
        elements as i64,
        [false, true, false, false, false, false],
    ));
    model.add_load(Load::at_node(
        1,
        elements as i64,
        [-p, 0.0, 0.0, 0.0, 0.0, 0.0],
    ));
    model
}

#[test]
fn column_buckling_converges_to_euler_load() {
    let p = 1e3;
    let ei = E * 1e-8;
    let euler = std::f64::consts::PI.powi(2) * ei / 4.0;

    let mut errors = Vec::new();
    for elements in [1, 2, 4] {
        let model = pinned_column(elements, p);
        let results = BucklingSolver::new(&model).solve(1).unwrap();
        let critical = results.first_critical_load.unwrap() * p;
        errors.push((critical - euler).abs() / euler);
    }

    // Monotone convergence toward the Euler load as the mesh refines.
    assert!(errors[0] > errors[1] && errors[1] > errors[2]);
    assert!(errors[2] < 0.01, "4-element error {} too large", errors[2]);
}

#[test]
fn nonlinear_with_linear_material_reproduces_linear_static() {
    let model = axial_truss();
    let linear = StaticSolver::new(&model).solve().unwrap();
    let nonlinear = NonlinearSolver::new(&model, NonlinearOptions::default())
        .solve()
        .unwrap();

    assert_eq!(nonlinear.status, ConvergenceStatus::Converged);
    assert_relative_eq!(nonlinear.load_factor, 1.0);
    for (a, b) in nonlinear
        .displacements
        .iter()
        .zip(linear.displacements.iter())
    {
        assert_relative_eq!(a, b, epsilon = 1e-12, max_relative = 1e-8);
    }

    // At most the predictor solve and the convergence check per step.
    assert!(nonlinear.num_iterations <= 2 * NonlinearOptions::default().load_steps);
}

/// Single-DOF oscillator with K = 1e6 N/m and M = 1e3 kg at the free node.
fn sdof() -> Model {
    let mut model = Model::new();
    model.add_node(Node::with_dofs(0, 0.0, 0.0, 0.0, [false; 6]));
    model.add_node(Node::with_dofs(
        1,
        1.0,
        0.0,
        0.0,
        [true, false, false, false, false, false],
    ));
    model.add_material(Material::new(1, "sdof", 1e8, 0.3, 2e5));
    model.add_section(Section::bar(1, "bar", 0.01));
    model.add_element(Element::new(1, ElementKind::Truss, vec![0, 1], 1, Some(1)));
    model
}

#[test]
fn newmark_energy_drift_under_one_percent_over_1000_steps() {
    let model = sdof();
    let omega_n = (1e6_f64 / 1e3).sqrt();
    let period = 2.0 * std::f64::consts::PI / omega_n;
    let dt = period / 20.0;
    let options = DynamicOptions::newmark(dt, 1000.5 * dt);

    // Impulse start, then free vibration.
    let history = vec![DVector::from_vec(vec![1e4]), DVector::zeros(1)];
    let results = DynamicSolver::new(&model, options)
        .solve_with_history(&history)
        .unwrap();
    assert!(results.time.len() >= 1000);

    let energy = |i: usize| {
        let u = results.displacements[i][0];
        let v = results.velocities[i][0];
        0.5 * 1e6 * u * u + 0.5 * 1e3 * v * v
    };
    let reference = energy(2);
    assert!(reference > 0.0);
    let last = results.time.len() - 1;
    assert_relative_eq!(energy(last), reference, max_relative = 0.01);
    for i in (2..=last).step_by(50) {
        assert_relative_eq!(energy(i), reference, max_relative = 0.01);
    }
}

#[test]
fn resonant_sdof_reaches_the_damped_steady_state_amplitude() {
    let model = sdof();
    let omega_n = (1e6_f64 / 1e3).sqrt();
    let period = 2.0 * std::f64::consts::PI / omega_n;
    let zeta = 0.05;
    let f0 = 1e3;

    let dt = period / 40.0;
    let cycles = 25.0;
    let options = DynamicOptions::newmark(dt, cycles * period)
        .with_damping_ratio(zeta, omega_n, omega_n);

    let n = (cycles * period / dt).floor() as usize;
    let history: Vec<DVector<f64>> = (0..=n)
        .map(|i| DVector::from_vec(vec![f0 * (omega_n * i as f64 * dt).sin()]))
        .collect();

    let results = DynamicSolver::new(&model, options)
        .solve_with_history(&history)
        .unwrap();

    // Steady-state amplitude at resonance: F0/(2ζK).
    let expected = f0 / (2.0 * zeta * 1e6);
    let tail_start = results.time.len() - 3 * 40;
    let tail_max = results.displacements[tail_start..]
        .iter()
        .map(|u| u[0].abs())
        .fold(0.0_f64, f64::max);
    assert_relative_eq!(tail_max, expected, max_relative = 0.05);
}
