//! Model entities: nodes, materials, sections, elements, loads, constraints.
//!
//! All entities are plain value types keyed by caller-supplied 64-bit ids.
//! Units are strict SI (m, N, Pa, kg, s, rad); no conversion happens anywhere
//! in the workspace.

/// A structural node with coordinates and an active-DOF mask.
///
/// The mask follows the fixed slot order (ux, uy, uz, rx, ry, rz). Slots
/// masked off never receive a global DOF index.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Node ID
    pub id: i64,
    /// X coordinate [m]
    pub x: f64,
    /// Y coordinate [m]
    pub y: f64,
    /// Z coordinate [m]
    pub z: f64,
    /// Active-DOF mask (ux, uy, uz, rx, ry, rz)
    pub dofs: [bool; 6],
}

impl Node {
    /// Create a node with all six DOFs active.
    pub fn new(id: i64, x: f64, y: f64, z: f64) -> Self {
        Self {
            id,
            x,
            y,
            z,
            dofs: [true; 6],
        }
    }

    /// Create a node with an explicit active-DOF mask.
    pub fn with_dofs(id: i64, x: f64, y: f64, z: f64, dofs: [bool; 6]) -> Self {
        Self { id, x, y, z, dofs }
    }

    /// Coordinates as an array.
    pub fn coords(&self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }
}

/// Linear elastic material.
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    /// Material ID
    pub id: i64,
    /// Material name
    pub name: String,
    /// Young's modulus (E) [Pa]
    pub elastic_modulus: f64,
    /// Poisson's ratio (ν) [-]
    pub poissons_ratio: f64,
    /// Density (ρ) [kg/m³]
    pub density: f64,
    /// Yield strength (f_y) [Pa]
    pub yield_strength: Option<f64>,
    /// Ultimate strength (f_u) [Pa]
    pub ultimate_strength: Option<f64>,
}

impl Material {
    /// Create a material from the required elastic properties.
    pub fn new(id: i64, name: impl Into<String>, e: f64, nu: f64, rho: f64) -> Self {
        Self {
            id,
            name: name.into(),
            elastic_modulus: e,
            poissons_ratio: nu,
            density: rho,
            yield_strength: None,
            ultimate_strength: None,
        }
    }

    /// Shear modulus G = E / (2(1+ν)).
    pub fn shear_modulus(&self) -> f64 {
        self.elastic_modulus / (2.0 * (1.0 + self.poissons_ratio))
    }
}

/// Cross-section properties for 1D members.
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    /// Section ID
    pub id: i64,
    /// Section name
    pub name: String,
    /// Cross-sectional area (A) [m²]
    pub area: f64,
    /// Second moment about the local x-axis [m⁴]
    pub ix: f64,
    /// Second moment about the local y-axis (I_y) [m⁴]
    pub iy: f64,
    /// Second moment about the local z-axis (I_z) [m⁴]
    pub iz: f64,
    /// St. Venant torsion constant (J) [m⁴]
    pub torsion_constant: f64,
    /// Section modulus about y (S_y) [m³]
    pub section_modulus_y: Option<f64>,
    /// Section modulus about z (S_z) [m³]
    pub section_modulus_z: Option<f64>,
}

impl Section {
    /// Create a section from area, second moments, and torsion constant.
    pub fn new(id: i64, name: impl Into<String>, area: f64, ix: f64, iy: f64, iz: f64, j: f64) -> Self {
        Self {
            id,
            name: name.into(),
            area,
            ix,
            iy,
            iz,
            torsion_constant: j,
            section_modulus_y: None,
            section_modulus_z: None,
        }
    }

    /// Axial-only section for truss members (all bending properties zero).
    pub fn bar(id: i64, name: impl Into<String>, area: f64) -> Self {
        Self::new(id, name, area, 0.0, 0.0, 0.0, 0.0)
    }
}

/// Element kind enumeration.
///
/// Only `Truss`, `Beam`, and `Frame` carry stiffness formulations; the
/// remaining kinds are representable but asking for their stiffness yields an
/// "element kind not implemented" error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    /// 2-node axial bar
    Truss,
    /// 2-node Euler-Bernoulli beam
    Beam,
    /// 2-node frame member (beam with axial-bending coupling)
    Frame,
    /// Plate element (no kernel)
    Plate,
    /// Shell element (no kernel)
    Shell,
    /// Solid element (no kernel)
    Solid,
}

impl ElementKind {
    /// Number of nodes this kind connects.
    pub fn num_nodes(&self) -> usize {
        match self {
            ElementKind::Truss | ElementKind::Beam | ElementKind::Frame => 2,
            ElementKind::Plate => 4,
            ElementKind::Shell => 4,
            ElementKind::Solid => 8,
        }
    }

    /// Whether a stiffness kernel exists for this kind.
    pub fn has_kernel(&self) -> bool {
        matches!(
            self,
            ElementKind::Truss | ElementKind::Beam | ElementKind::Frame
        )
    }

    /// Whether this kind requires a section reference.
    pub fn requires_section(&self) -> bool {
        self.has_kernel()
    }

    /// Lowercase kind string used by the transport schema.
    pub fn as_str(&self) -> &'static str {
        match self {
            ElementKind::Truss => "truss",
            ElementKind::Beam => "beam",
            ElementKind::Frame => "frame",
            ElementKind::Plate => "plate",
            ElementKind::Shell => "shell",
            ElementKind::Solid => "solid",
        }
    }

    /// Parse the lowercase kind string.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "truss" => Some(ElementKind::Truss),
            "beam" => Some(ElementKind::Beam),
            "frame" => Some(ElementKind::Frame),
            "plate" => Some(ElementKind::Plate),
            "shell" => Some(ElementKind::Shell),
            "solid" => Some(ElementKind::Solid),
            _ => None,
        }
    }
}

/// An element connecting nodes through a material and (for 1D kinds) a section.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    /// Element ID
    pub id: i64,
    /// Element kind
    pub kind: ElementKind,
    /// Node connectivity (node IDs)
    pub nodes: Vec<i64>,
    /// Material ID
    pub material: i64,
    /// Section ID (required for truss/beam/frame)
    pub section: Option<i64>,
}

impl Element {
    /// Create an element.
    pub fn new(id: i64, kind: ElementKind, nodes: Vec<i64>, material: i64, section: Option<i64>) -> Self {
        Self {
            id,
            kind,
            nodes,
            material,
            section,
        }
    }
}

/// What a load acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadTarget {
    /// Nodal load
    Node(i64),
    /// Element load (pressure/distributed carriers)
    Element(i64),
}

/// Load kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadKind {
    /// Concentrated force
    #[default]
    Force,
    /// Concentrated moment
    Moment,
    /// Surface pressure (element target)
    Pressure,
    /// Distributed line load (element target)
    Distributed,
}

impl LoadKind {
    /// Lowercase kind string used by the transport schema.
    pub fn as_str(&self) -> &'static str {
        match self {
            LoadKind::Force => "force",
            LoadKind::Moment => "moment",
            LoadKind::Pressure => "pressure",
            LoadKind::Distributed => "distributed",
        }
    }

    /// Parse the lowercase kind string.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "force" => Some(LoadKind::Force),
            "moment" => Some(LoadKind::Moment),
            "pressure" => Some(LoadKind::Pressure),
            "distributed" => Some(LoadKind::Distributed),
            _ => None,
        }
    }
}

/// Reference frame for load components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadFrame {
    /// Global axes
    #[default]
    Global,
    /// Element-local axes
    Local,
}

impl LoadFrame {
    /// Lowercase frame string used by the transport schema.
    pub fn as_str(&self) -> &'static str {
        match self {
            LoadFrame::Global => "global",
            LoadFrame::Local => "local",
        }
    }

    /// Parse the lowercase frame string.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "global" => Some(LoadFrame::Global),
            "local" => Some(LoadFrame::Local),
            _ => None,
        }
    }
}

/// An applied load: a 6-vector of components on a node or element.
#[derive(Debug, Clone, PartialEq)]
pub struct Load {
    /// Load ID
    pub id: i64,
    /// Node or element target
    pub target: LoadTarget,
    /// Load kind
    pub kind: LoadKind,
    /// Component reference frame
    pub frame: LoadFrame,
    /// Components (Fx, Fy, Fz, Mx, My, Mz) [N, N·m]
    pub components: [f64; 6],
}

impl Load {
    /// Concentrated nodal force/moment in global axes.
    pub fn at_node(id: i64, node: i64, components: [f64; 6]) -> Self {
        Self {
            id,
            target: LoadTarget::Node(node),
            kind: LoadKind::Force,
            frame: LoadFrame::Global,
            components,
        }
    }
}

/// An essential boundary condition: fixed DOFs with prescribed values.
#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    /// Constraint ID
    pub id: i64,
    /// Node ID
    pub node: i64,
    /// Fixed-DOF mask (ux, uy, uz, rx, ry, rz); true = prescribed
    pub fixed: [bool; 6],
    /// Prescribed values, aligned with the mask
    pub values: [f64; 6],
}

impl Constraint {
    /// Fix the given DOFs of a node to zero.
    pub fn fix(id: i64, node: i64, fixed: [bool; 6]) -> Self {
        Self {
            id,
            node,
            fixed,
            values: [0.0; 6],
        }
    }

    /// Fully clamp a node (all six DOFs to zero).
    pub fn clamp(id: i64, node: i64) -> Self {
        Self::fix(id, node, [true; 6])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shear_modulus_from_elastic_constants() {
        let steel = Material::new(1, "steel", 200e9, 0.3, 7850.0);
        let g = steel.shear_modulus();
        assert!((g - 200e9 / 2.6).abs() < 1.0);
    }

    #[test]
    fn node_defaults_to_all_active_dofs() {
        let node = Node::new(1, 0.0, 0.0, 0.0);
        assert_eq!(node.dofs, [true; 6]);
    }

    #[test]
    fn kind_strings_round_trip() {
        for kind in [
            ElementKind::Truss,
            ElementKind::Beam,
            ElementKind::Frame,
            ElementKind::Plate,
            ElementKind::Shell,
            ElementKind::Solid,
        ] {
            assert_eq!(ElementKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(ElementKind::parse("membrane"), None);
    }

    #[test]
    fn only_line_elements_have_kernels() {
        assert!(ElementKind::Truss.has_kernel());
        assert!(ElementKind::Frame.has_kernel());
        assert!(!ElementKind::Shell.has_kernel());
    }

    #[test]
    fn bar_section_has_no_bending_properties() {
        let s = Section::bar(1, "tie", 0.01);
        assert_eq!(s.area, 0.01);
        assert_eq!(s.iy, 0.0);
        assert_eq!(s.iz, 0.0);
        assert_eq!(s.torsion_constant, 0.0);
    }

    #[test]
    fn clamp_fixes_all_dofs_to_zero() {
        let c = Constraint::clamp(1, 4);
        assert_eq!(c.node, 4);
        assert_eq!(c.fixed, [true; 6]);
        assert_eq!(c.values, [0.0; 6]);
    }
}
