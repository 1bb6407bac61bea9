//! Element kernels for 1D structural members.
//!
//! The kernel contract is uniform across kinds: given an element and the
//! model it lives in, produce a dense 12×12 matrix in global coordinates
//! together with the 12 global DOF indices its rows/columns map to (six per
//! node, `None` where the slot is masked off). Truss kernels leave the
//! rotational rows and columns zero; assembly is shape-agnostic.

use nalgebra::{DMatrix, DVector, Matrix3, Vector3};

use strucore_model::{DofMap, Element, ElementKind, Material, Model, ModelError, Node, Section};

use crate::error::{Result, SolverError};

pub mod beam;
pub mod truss;

/// Matrix size of every 1D element kernel (2 nodes × 6 DOF slots).
pub const ELEMENT_DOFS: usize = 12;

/// A dense element matrix plus the global DOF slots it scatters to.
#[derive(Debug, Clone)]
pub struct ElementMatrices {
    /// 12×12 matrix in global coordinates
    pub matrix: DMatrix<f64>,
    /// Global DOF index per row/column, `None` for masked slots
    pub dofs: Vec<Option<usize>>,
}

/// Straight-member geometry shared by the truss and beam kernels.
#[derive(Debug, Clone, Copy)]
pub struct LineGeometry {
    /// Member length [m]
    pub length: f64,
    /// Unit vector from node 1 to node 2
    pub axis: Vector3<f64>,
}

impl LineGeometry {
    /// Compute length and axis from the two end nodes.
    pub fn from_nodes(element_id: i64, a: &Node, b: &Node) -> Result<Self> {
        let axis = Vector3::new(b.x - a.x, b.y - a.y, b.z - a.z);
        let length = axis.norm();
        if length < 1e-10 {
            return Err(ModelError::ZeroLength {
                element: element_id,
            }
            .into());
        }
        Ok(Self {
            length,
            axis: axis / length,
        })
    }
}

/// Element orientation triad as a rotation matrix (rows ex, ey, ez).
///
/// The reference vector is global Y; when the member axis is nearly parallel
/// to Y (|cosine| > 0.999, i.e. vertical members in a Y-up convention) the
/// reference switches to global Z. Then ez = ex × ref and ey = ez × ex, so a
/// member along global X gets its local y aligned with global Y.
pub fn orientation(axis: &Vector3<f64>) -> Matrix3<f64> {
    let reference = if axis.dot(&Vector3::y()).abs() > 0.999 {
        Vector3::z()
    } else {
        Vector3::y()
    };
    let ez = axis.cross(&reference).normalize();
    let ey = ez.cross(axis);

    Matrix3::from_rows(&[axis.transpose(), ey.transpose(), ez.transpose()])
}

/// Expand the 3×3 orientation block into the 12×12 transformation matrix
/// (four copies along the diagonal: translations and rotations of each node).
pub fn transformation(rotation: &Matrix3<f64>) -> DMatrix<f64> {
    let mut t = DMatrix::zeros(ELEMENT_DOFS, ELEMENT_DOFS);
    for block in 0..4 {
        let offset = block * 3;
        for i in 0..3 {
            for j in 0..3 {
                t[(offset + i, offset + j)] = rotation[(i, j)];
            }
        }
    }
    t
}

/// Global DOF slots of a 2-node element, in kernel row order.
pub fn element_dofs(element: &Element, dof_map: &DofMap) -> Result<Vec<Option<usize>>> {
    let mut dofs = Vec::with_capacity(ELEMENT_DOFS);
    for &node_id in &element.nodes {
        let slots = dof_map.node_slots(node_id).ok_or(ModelError::UnknownNode {
            element: element.id,
            node: node_id,
        })?;
        dofs.extend_from_slice(slots);
    }
    Ok(dofs)
}

/// Gather the element displacement vector from the global solution,
/// zero-filling masked slots.
pub fn gather_displacements(dofs: &[Option<usize>], u: &DVector<f64>) -> DVector<f64> {
    DVector::from_iterator(
        dofs.len(),
        dofs.iter().map(|slot| slot.map_or(0.0, |d| u[d])),
    )
}

/// Resolve a 2-node element's nodes, material, and section from the model.
pub(crate) fn resolve<'a>(
    element: &Element,
    model: &'a Model,
) -> Result<((&'a Node, &'a Node), &'a Material, &'a Section)> {
    let a = model
        .node(element.nodes[0])
        .ok_or(ModelError::UnknownNode {
            element: element.id,
            node: element.nodes[0],
        })?;
    let b = model
        .node(element.nodes[1])
        .ok_or(ModelError::UnknownNode {
            element: element.id,
            node: element.nodes[1],
        })?;
    let material = model
        .material(element.material)
        .ok_or(ModelError::UnknownMaterial {
            element: element.id,
            material: element.material,
        })?;
    let section_id = element.section.ok_or(ModelError::MissingSection {
        element: element.id,
        kind: element.kind.as_str(),
    })?;
    let section = model
        .section(section_id)
        .ok_or(ModelError::UnknownSection {
            element: element.id,
            section: section_id,
        })?;
    Ok(((a, b), material, section))
}

/// Compute the element stiffness matrix and DOF slots for any kind.
pub fn stiffness(element: &Element, model: &Model, dof_map: &DofMap) -> Result<ElementMatrices> {
    let matrix = match element.kind {
        ElementKind::Truss => {
            let (nodes, material, section) = resolve(element, model)?;
            truss::stiffness(element, nodes, material, section)?
        }
        ElementKind::Beam | ElementKind::Frame => {
            let (nodes, material, section) = resolve(element, model)?;
            beam::stiffness(element, nodes, material, section)?
        }
        other => return Err(SolverError::ElementUnimplemented(other.as_str())),
    };
    Ok(ElementMatrices {
        matrix,
        dofs: element_dofs(element, dof_map)?,
    })
}

/// Compute the element geometric stiffness for the axial force induced by a
/// reference displacement state.
pub fn geometric_stiffness(
    element: &Element,
    model: &Model,
    dof_map: &DofMap,
    u: &DVector<f64>,
) -> Result<ElementMatrices> {
    let dofs = element_dofs(element, dof_map)?;
    let u_e = gather_displacements(&dofs, u);
    let matrix = match element.kind {
        ElementKind::Truss => {
            let (nodes, material, section) = resolve(element, model)?;
            truss::geometric(element, nodes, material, section, &u_e)?
        }
        ElementKind::Beam | ElementKind::Frame => {
            let (nodes, material, section) = resolve(element, model)?;
            beam::geometric(element, nodes, material, section, &u_e)?
        }
        other => return Err(SolverError::ElementUnimplemented(other.as_str())),
    };
    Ok(ElementMatrices { matrix, dofs })
}

/// Axial force in a member from its 12-slot global displacement vector
/// (tension positive).
pub fn axial_force(
    geometry: &LineGeometry,
    material: &Material,
    section: &Section,
    u_e: &DVector<f64>,
) -> f64 {
    let d = geometry.axis;
    let u1 = Vector3::new(u_e[0], u_e[1], u_e[2]);
    let u2 = Vector3::new(u_e[6], u_e[7], u_e[8]);
    let elongation = d.dot(&(u2 - u1));
    material.elastic_modulus * section.area / geometry.length * elongation
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use strucore_model::{Element, ElementKind, Node};

    #[test]
    fn orientation_of_x_aligned_member() {
        let r = orientation(&Vector3::x());
        // Local y follows global Y, local z follows global Z.
        assert_relative_eq!(r[(1, 1)], 1.0, epsilon = 1e-12);
        assert_relative_eq!(r[(2, 2)], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn orientation_of_vertical_member_uses_z_reference() {
        let r = orientation(&Vector3::y());
        // ez = Y × Z = X, ey = X × Y = Z
        assert_relative_eq!(r[(2, 0)], 1.0, epsilon = 1e-12);
        assert_relative_eq!(r[(1, 2)], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn orientation_is_orthonormal_for_skew_members() {
        let axis = Vector3::new(1.0, 2.0, 3.0).normalize();
        let r = orientation(&axis);
        let product = r * r.transpose();
        for i in 0..3 {
            for j in 0..3 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert_relative_eq!(product[(i, j)], expected, epsilon = 1e-12);
            }
        }
        assert_relative_eq!(r.determinant(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn line_geometry_rejects_coincident_nodes() {
        let a = Node::new(1, 1.0, 1.0, 1.0);
        let b = Node::new(2, 1.0, 1.0, 1.0);
        assert!(LineGeometry::from_nodes(7, &a, &b).is_err());
    }

    #[test]
    fn plate_kind_reports_unimplemented() {
        let mut model = Model::new();
        model.add_node(Node::new(1, 0.0, 0.0, 0.0));
        model.add_node(Node::new(2, 1.0, 0.0, 0.0));
        let dof_map = DofMap::build(&model);
        let element = Element::new(1, ElementKind::Plate, vec![1, 2, 1, 2], 1, None);

        let result = stiffness(&element, &model, &dof_map);
        assert!(matches!(
            result,
            Err(SolverError::ElementUnimplemented("plate"))
        ));
    }

    #[test]
    fn gather_zero_fills_masked_slots() {
        let dofs = vec![Some(0), None, Some(1)];
        let u = DVector::from_vec(vec![2.0, 3.0]);
        let gathered = gather_displacements(&dofs, &u);
        assert_eq!(gathered.as_slice(), &[2.0, 0.0, 3.0]);
    }
}
