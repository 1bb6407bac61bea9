//! 2-node Euler-Bernoulli beam element in 3D.
//!
//! The frame kind shares this kernel (axial, two bending planes, torsion).
//! Local DOF order per node is (ux, uy, uz, rx, ry, rz); local x runs along
//! the member, bending in the x-y plane engages I_z, bending in the x-z
//! plane engages I_y.
//!
//! Local stiffness blocks:
//!
//! ```text
//! axial:    EA/L  * [ 1 -1; -1 1 ]
//! torsion:  GJ/L  * [ 1 -1; -1 1 ]
//! bending:  EI/L³ * (12, 6L, 4L², 2L²) pattern per plane
//! ```
//!
//! The global matrix is Tᵀ·k_local·T with the orientation triad replicated
//! four times along the diagonal of T.

use nalgebra::{DMatrix, DVector};

use strucore_model::{Element, Material, Node, Section};

use super::{axial_force, orientation, transformation, LineGeometry, ELEMENT_DOFS};
use crate::error::Result;

/// Global stiffness matrix of a beam/frame member.
pub fn stiffness(
    element: &Element,
    nodes: (&Node, &Node),
    material: &Material,
    section: &Section,
) -> Result<DMatrix<f64>> {
    let geometry = LineGeometry::from_nodes(element.id, nodes.0, nodes.1)?;
    let k_local = local_stiffness(&geometry, material, section);

    let t = transformation(&orientation(&geometry.axis));
    Ok(t.transpose() * k_local * t)
}

/// Geometric stiffness of a beam/frame member under the axial force induced
/// by the reference displacement state `u_e` (tension positive).
pub fn geometric(
    element: &Element,
    nodes: (&Node, &Node),
    material: &Material,
    section: &Section,
    u_e: &DVector<f64>,
) -> Result<DMatrix<f64>> {
    let geometry = LineGeometry::from_nodes(element.id, nodes.0, nodes.1)?;
    let n = axial_force(&geometry, material, section, u_e);

    let t = transformation(&orientation(&geometry.axis));
    let kg_local = local_geometric(geometry.length, n);
    Ok(t.transpose() * kg_local * t)
}

fn local_stiffness(geometry: &LineGeometry, material: &Material, section: &Section) -> DMatrix<f64> {
    let l = geometry.length;
    let e = material.elastic_modulus;
    let g = material.shear_modulus();
    let a = section.area;
    let iy = section.iy;
    let iz = section.iz;
    let j = section.torsion_constant;

    let mut k = DMatrix::zeros(ELEMENT_DOFS, ELEMENT_DOFS);

    // Axial
    let ea_l = e * a / l;
    k[(0, 0)] = ea_l;
    k[(6, 6)] = ea_l;
    k[(0, 6)] = -ea_l;
    k[(6, 0)] = -ea_l;

    // Torsion
    let gj_l = g * j / l;
    k[(3, 3)] = gj_l;
    k[(9, 9)] = gj_l;
    k[(3, 9)] = -gj_l;
    k[(9, 3)] = -gj_l;

    // Bending in the x-y plane (v = uy, θz), I_z
    let eiz = e * iz;
    k[(1, 1)] = 12.0 * eiz / l.powi(3);
    k[(7, 7)] = 12.0 * eiz / l.powi(3);
    k[(1, 7)] = -12.0 * eiz / l.powi(3);
    k[(7, 1)] = -12.0 * eiz / l.powi(3);
    k[(5, 5)] = 4.0 * eiz / l;
    k[(11, 11)] = 4.0 * eiz / l;
    k[(5, 11)] = 2.0 * eiz / l;
    k[(11, 5)] = 2.0 * eiz / l;
    for rot in [5, 11] {
        k[(1, rot)] = 6.0 * eiz / l.powi(2);
        k[(rot, 1)] = 6.0 * eiz / l.powi(2);
        k[(7, rot)] = -6.0 * eiz / l.powi(2);
        k[(rot, 7)] = -6.0 * eiz / l.powi(2);
    }

    // Bending in the x-z plane (w = uz, θy), I_y; positive θy produces
    // negative dw/dx, which flips the 6L terms relative to the x-y plane.
    let eiy = e * iy;
    k[(2, 2)] = 12.0 * eiy / l.powi(3);
    k[(8, 8)] = 12.0 * eiy / l.powi(3);
    k[(2, 8)] = -12.0 * eiy / l.powi(3);
    k[(8, 2)] = -12.0 * eiy / l.powi(3);
    k[(4, 4)] = 4.0 * eiy / l;
    k[(10, 10)] = 4.0 * eiy / l;
    k[(4, 10)] = 2.0 * eiy / l;
    k[(10, 4)] = 2.0 * eiy / l;
    for rot in [4, 10] {
        k[(2, rot)] = -6.0 * eiy / l.powi(2);
        k[(rot, 2)] = -6.0 * eiy / l.powi(2);
        k[(8, rot)] = 6.0 * eiy / l.powi(2);
        k[(rot, 8)] = 6.0 * eiy / l.powi(2);
    }

    k
}

/// Consistent geometric stiffness of a beam-column under axial force `n`
/// in local coordinates. Bending planes only; the torsional prestress
/// coupling is neglected.
fn local_geometric(l: f64, n: f64) -> DMatrix<f64> {
    let mut kg = DMatrix::zeros(ELEMENT_DOFS, ELEMENT_DOFS);
    let c = n / l;

    // x-y plane (v1, θz1, v2, θz2) = (1, 5, 7, 11)
    let idx = [1, 5, 7, 11];
    let pattern = [
        [6.0 / 5.0, l / 10.0, -6.0 / 5.0, l / 10.0],
        [l / 10.0, 2.0 * l * l / 15.0, -l / 10.0, -l * l / 30.0],
        [-6.0 / 5.0, -l / 10.0, 6.0 / 5.0, -l / 10.0],
        [l / 10.0, -l * l / 30.0, -l / 10.0, 2.0 * l * l / 15.0],
    ];
    for (i, &gi) in idx.iter().enumerate() {
        for (j, &gj) in idx.iter().enumerate() {
            kg[(gi, gj)] += c * pattern[i][j];
        }
    }

    // x-z plane (w1, θy1, w2, θy2) = (2, 4, 8, 10) with the mirrored signs
    // on the L/10 terms, matching the elastic convention.
    let idx = [2, 4, 8, 10];
    let pattern = [
        [6.0 / 5.0, -l / 10.0, -6.0 / 5.0, -l / 10.0],
        [-l / 10.0, 2.0 * l * l / 15.0, l / 10.0, -l * l / 30.0],
        [-6.0 / 5.0, l / 10.0, 6.0 / 5.0, l / 10.0],
        [-l / 10.0, -l * l / 30.0, l / 10.0, 2.0 * l * l / 15.0],
    ];
    for (i, &gi) in idx.iter().enumerate() {
        for (j, &gj) in idx.iter().enumerate() {
            kg[(gi, gj)] += c * pattern[i][j];
        }
    }

    kg
}
