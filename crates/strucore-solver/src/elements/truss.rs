//! 2-node axial truss element in 3D.
//!
//! The truss resists only axial force. Local stiffness is the 2×2 block
//!
//! ```text
//! k_local = (E*A/L) * [ 1  -1]
//!                     [-1   1]
//! ```
//!
//! embedded at the translational DOFs of both nodes and rotated to global
//! coordinates; the rotational rows and columns of the 12×12 kernel matrix
//! stay zero.

use nalgebra::{DMatrix, DVector, Matrix3};

use strucore_model::{Element, Material, Node, Section};

use super::{axial_force, LineGeometry, ELEMENT_DOFS};
use crate::error::Result;

/// Global stiffness matrix of a truss member.
pub fn stiffness(
    element: &Element,
    nodes: (&Node, &Node),
    material: &Material,
    section: &Section,
) -> Result<DMatrix<f64>> {
    let geometry = LineGeometry::from_nodes(element.id, nodes.0, nodes.1)?;
    let k = material.elastic_modulus * section.area / geometry.length;

    // k * d*d^T couples the translational DOFs along the member axis;
    // rotating the 2x2 axial block to global collapses to this outer product.
    let d = geometry.axis;
    let block = Matrix3::from_fn(|i, j| k * d[i] * d[j]);

    Ok(scatter_translation_blocks(&block))
}

/// Geometric stiffness of a truss member under the axial force induced by
/// the reference displacement state `u_e` (tension positive).
///
/// Uses the transverse projector P = I - d*d^T, so prestress stiffens (or
/// softens, in compression) only the directions perpendicular to the axis.
pub fn geometric(
    element: &Element,
    nodes: (&Node, &Node),
    material: &Material,
    section: &Section,
    u_e: &DVector<f64>,
) -> Result<DMatrix<f64>> {
    let geometry = LineGeometry::from_nodes(element.id, nodes.0, nodes.1)?;
    let n = axial_force(&geometry, material, section, u_e);

    let d = geometry.axis;
    let coeff = n / geometry.length;
    let projector = Matrix3::from_fn(|i, j| {
        let delta = if i == j { 1.0 } else { 0.0 };
        coeff * (delta - d[i] * d[j])
    });

    Ok(scatter_translation_blocks(&projector))
}

/// Place a 3×3 block at the translational DOF pairs of both nodes with the
/// [[+B, -B], [-B, +B]] sign pattern.
fn scatter_translation_blocks(block: &Matrix3<f64>) -> DMatrix<f64> {
    let mut k = DMatrix::zeros(ELEMENT_DOFS, ELEMENT_DOFS);
    for i in 0..3 {
        for j in 0..3 {
            k[(i, j)] = block[(i, j)];
            k[(i + 6, j + 6)] = block[(i, j)];
            k[(i, j + 6)] = -block[(i, j)];
            k[(i + 6, j)] = -block[(i, j)];
        }
    }
    k
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use strucore_model::ElementKind;

    fn steel() -> Material {
        Material::new(1, "steel", 200e9, 0.3, 7850.0)
    }

    fn bar_element() -> Element {
        Element::new(1, ElementKind::Truss, vec![1, 2], 1, Some(1))
    }

    #[test]
    fn x_aligned_bar_has_axial_stiffness_only() {
        let a = Node::new(1, 0.0, 0.0, 0.0);
        let b = Node::new(2, 2.0, 0.0, 0.0);
        let section = Section::bar(1, "tie", 0.01);

        let k = stiffness(&bar_element(), (&a, &b), &steel(), &section).unwrap();
        let ea_l = 200e9 * 0.01 / 2.0;

        assert_relative_eq!(k[(0, 0)], ea_l);
        assert_relative_eq!(k[(0, 6)], -ea_l);
        assert_relative_eq!(k[(6, 6)], ea_l);
        // No transverse or rotational stiffness.
        assert_relative_eq!(k[(1, 1)], 0.0);
        assert_relative_eq!(k[(2, 2)], 0.0);
        for rot in [3, 4, 5, 9, 10, 11] {
            assert_relative_eq!(k[(rot, rot)], 0.0);
        }
    }

    #[test]
    fn diagonal_bar_stiffness_is_symmetric_with_zero_row_sums() {
        let a = Node::new(1, 0.0, 0.0, 0.0);
        let b = Node::new(2, 1.0, 2.0, 3.0);
        let section = Section::bar(1, "tie", 0.02);

        let k = stiffness(&bar_element(), (&a, &b), &steel(), &section).unwrap();

        for i in 0..12 {
            for j in 0..12 {
                assert_relative_eq!(k[(i, j)], k[(j, i)], epsilon = 1e-6);
            }
            let row_sum: f64 = (0..12).map(|j| k[(i, j)]).sum();
            assert_relative_eq!(row_sum, 0.0, epsilon = 1e-4);
        }
    }

    #[test]
    fn stiffness_matches_direction_cosine_products() {
        // 3-4-5 triangle in the x-y plane: cosines (0.6, 0.8, 0).
        let a = Node::new(1, 0.0, 0.0, 0.0);
        let b = Node::new(2, 3.0, 4.0, 0.0);
        let section = Section::bar(1, "tie", 0.01);

        let k = stiffness(&bar_element(), (&a, &b), &steel(), &section).unwrap();
        let ea_l = 200e9 * 0.01 / 5.0;

        assert_relative_eq!(k[(0, 0)], ea_l * 0.36, epsilon = 1e-3);
        assert_relative_eq!(k[(0, 1)], ea_l * 0.48, epsilon = 1e-3);
        assert_relative_eq!(k[(1, 1)], ea_l * 0.64, epsilon = 1e-3);
        assert_relative_eq!(k[(2, 2)], 0.0);
    }

    #[test]
    fn geometric_stiffness_is_transverse_only() {
        let a = Node::new(1, 0.0, 0.0, 0.0);
        let b = Node::new(2, 1.0, 0.0, 0.0);
        let section = Section::bar(1, "tie", 0.01);

        // Unit elongation along x: N = EA/L * 1.0
        let mut u_e = DVector::zeros(12);
        u_e[6] = 1.0;

        let kg = geometric(&bar_element(), (&a, &b), &steel(), &section, &u_e).unwrap();
        let n = 200e9 * 0.01;

        // No stiffness along the axis itself, n/L on the transverse DOFs.
        assert_relative_eq!(kg[(0, 0)], 0.0, epsilon = 1e-6);
        assert_relative_eq!(kg[(1, 1)], n / 1.0, epsilon = 1e-3);
        assert_relative_eq!(kg[(2, 2)], n / 1.0, epsilon = 1e-3);
        assert_relative_eq!(kg[(1, 7)], -n / 1.0, epsilon = 1e-3);
    }

    #[test]
    fn compression_softens_transverse_directions() {
        let a = Node::new(1, 0.0, 0.0, 0.0);
        let b = Node::new(2, 1.0, 0.0, 0.0);
        let section = Section::bar(1, "tie", 0.01);

        let mut u_e = DVector::zeros(12);
        u_e[6] = -1e-3;

        let kg = geometric(&bar_element(), (&a, &b), &steel(), &section, &u_e).unwrap();
        assert!(kg[(1, 1)] < 0.0);
        assert!(kg[(2, 2)] < 0.0);
    }
}
