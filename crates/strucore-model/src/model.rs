//! The model store: an id-keyed aggregate with insertion-ordered iteration.
//!
//! Nodes and elements are looked up by id but iterated in insertion order —
//! the DOF numbering and the assembly order both hang off that ordering, so
//! it is preserved explicitly rather than left to a hash table.

use std::collections::HashMap;

use thiserror::Error;

use crate::entities::{Constraint, Element, Load, Material, Node, Section};

/// Model construction and validation errors.
///
/// Validation runs during assembly (via [`Model::validate`]), not at
/// add-time, so bulk construction stays cheap.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("model has no nodes")]
    NoNodes,

    #[error("model has no elements")]
    NoElements,

    #[error("duplicate {kind} id {id}")]
    DuplicateId { kind: &'static str, id: i64 },

    #[error("element {element} references unknown node {node}")]
    UnknownNode { element: i64, node: i64 },

    #[error("element {element} references unknown material {material}")]
    UnknownMaterial { element: i64, material: i64 },

    #[error("element {element} references unknown section {section}")]
    UnknownSection { element: i64, section: i64 },

    #[error("element {element} of kind {kind} requires a section")]
    MissingSection { element: i64, kind: &'static str },

    #[error("element {element} has {actual} nodes but kind {kind} requires {expected}")]
    WrongConnectivity {
        element: i64,
        kind: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("element {element} has zero or near-zero length")]
    ZeroLength { element: i64 },

    #[error("material {material}: {message}")]
    BadMaterial { material: i64, message: String },

    #[error("section {section}: {message}")]
    BadSection { section: i64, message: String },

    #[error("load {load} references unknown {kind} {id}")]
    UnknownLoadTarget {
        load: i64,
        kind: &'static str,
        id: i64,
    },

    #[error("constraint {constraint} references unknown node {node}")]
    UnknownConstraintNode { constraint: i64, node: i64 },
}

/// In-memory structural model.
#[derive(Debug, Clone, Default)]
pub struct Model {
    nodes: Vec<Node>,
    node_index: HashMap<i64, usize>,
    materials: Vec<Material>,
    material_index: HashMap<i64, usize>,
    sections: Vec<Section>,
    section_index: HashMap<i64, usize>,
    elements: Vec<Element>,
    element_index: HashMap<i64, usize>,
    loads: Vec<Load>,
    constraints: Vec<Constraint>,
}

impl Model {
    /// Create an empty model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node. Duplicate ids are reported at validation time.
    pub fn add_node(&mut self, node: Node) {
        self.node_index.insert(node.id, self.nodes.len());
        self.nodes.push(node);
    }

    /// Add a material.
    pub fn add_material(&mut self, material: Material) {
        self.material_index.insert(material.id, self.materials.len());
        self.materials.push(material);
    }

    /// Add a section.
    pub fn add_section(&mut self, section: Section) {
        self.section_index.insert(section.id, self.sections.len());
        self.sections.push(section);
    }

    /// Add an element.
    pub fn add_element(&mut self, element: Element) {
        self.element_index.insert(element.id, self.elements.len());
        self.elements.push(element);
    }

    /// Add a load.
    pub fn add_load(&mut self, load: Load) {
        self.loads.push(load);
    }

    /// Add a constraint.
    pub fn add_constraint(&mut self, constraint: Constraint) {
        self.constraints.push(constraint);
    }

    /// Get a node by id.
    pub fn node(&self, id: i64) -> Option<&Node> {
        self.node_index.get(&id).map(|&i| &self.nodes[i])
    }

    /// Get a material by id.
    pub fn material(&self, id: i64) -> Option<&Material> {
        self.material_index.get(&id).map(|&i| &self.materials[i])
    }

    /// Get a section by id.
    pub fn section(&self, id: i64) -> Option<&Section> {
        self.section_index.get(&id).map(|&i| &self.sections[i])
    }

    /// Get an element by id.
    pub fn element(&self, id: i64) -> Option<&Element> {
        self.element_index.get(&id).map(|&i| &self.elements[i])
    }

    /// Nodes in insertion order.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Materials in insertion order.
    pub fn materials(&self) -> &[Material] {
        &self.materials
    }

    /// Sections in insertion order.
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// Elements in insertion order.
    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    /// Loads in insertion order.
    pub fn loads(&self) -> &[Load] {
        &self.loads
    }

    /// Constraints in insertion order.
    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// Enumerate active DOFs into a fresh [`crate::dof::DofMap`].
    pub fn build_dof_map(&self) -> crate::dof::DofMap {
        crate::dof::DofMap::build(self)
    }

    /// Validate the model prior to assembly.
    ///
    /// Checks referential integrity (every id an element, load, or constraint
    /// names must exist), connectivity arity, section presence for 1D kinds,
    /// physical bounds on material and section properties, and element
    /// geometry. Returns the first violation found.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.nodes.is_empty() {
            return Err(ModelError::NoNodes);
        }
        if self.elements.is_empty() {
            return Err(ModelError::NoElements);
        }

        self.check_unique_ids()?;

        for material in &self.materials {
            if !(material.elastic_modulus > 0.0) {
                return Err(ModelError::BadMaterial {
                    material: material.id,
                    message: format!("elastic modulus must be positive, got {}", material.elastic_modulus),
                });
            }
            let nu = material.poissons_ratio;
            if !(nu > -1.0 && nu < 0.5) {
                return Err(ModelError::BadMaterial {
                    material: material.id,
                    message: format!("Poisson's ratio must lie in (-1, 0.5), got {nu}"),
                });
            }
            if material.density < 0.0 {
                return Err(ModelError::BadMaterial {
                    material: material.id,
                    message: format!("density must be non-negative, got {}", material.density),
                });
            }
        }

        for section in &self.sections {
            if !(section.area > 0.0) {
                return Err(ModelError::BadSection {
                    section: section.id,
                    message: format!("area must be positive, got {}", section.area),
                });
            }
            for (label, value) in [
                ("Ix", section.ix),
                ("Iy", section.iy),
                ("Iz", section.iz),
                ("J", section.torsion_constant),
            ] {
                if value < 0.0 {
                    return Err(ModelError::BadSection {
                        section: section.id,
                        message: format!("{label} must be non-negative, got {value}"),
                    });
                }
            }
        }

        for element in &self.elements {
            let expected = element.kind.num_nodes();
            if element.nodes.len() != expected {
                return Err(ModelError::WrongConnectivity {
                    element: element.id,
                    kind: element.kind.as_str(),
                    expected,
                    actual: element.nodes.len(),
                });
            }
            for &node_id in &element.nodes {
                if self.node(node_id).is_none() {
                    return Err(ModelError::UnknownNode {
                        element: element.id,
                        node: node_id,
                    });
                }
            }
            if self.material(element.material).is_none() {
                return Err(ModelError::UnknownMaterial {
                    element: element.id,
                    material: element.material,
                });
            }
            match element.section {
                Some(section_id) => {
                    if self.section(section_id).is_none() {
                        return Err(ModelError::UnknownSection {
                            element: element.id,
                            section: section_id,
                        });
                    }
                }
                None => {
                    if element.kind.requires_section() {
                        return Err(ModelError::MissingSection {
                            element: element.id,
                            kind: element.kind.as_str(),
                        });
                    }
                }
            }
            if element.kind.has_kernel() {
                let a = &self.nodes[self.node_index[&element.nodes[0]]];
                let b = &self.nodes[self.node_index[&element.nodes[1]]];
                let (dx, dy, dz) = (b.x - a.x, b.y - a.y, b.z - a.z);
                if (dx * dx + dy * dy + dz * dz).sqrt() < 1e-10 {
                    return Err(ModelError::ZeroLength {
                        element: element.id,
                    });
                }
            }
        }

        for load in &self.loads {
            match load.target {
                crate::entities::LoadTarget::Node(id) => {
                    if self.node(id).is_none() {
                        return Err(ModelError::UnknownLoadTarget {
                            load: load.id,
                            kind: "node",
                            id,
                        });
                    }
                }
                crate::entities::LoadTarget::Element(id) => {
                    if self.element(id).is_none() {
                        return Err(ModelError::UnknownLoadTarget {
                            load: load.id,
                            kind: "element",
                            id,
                        });
                    }
                }
            }
        }

        for constraint in &self.constraints {
            if self.node(constraint.node).is_none() {
                return Err(ModelError::UnknownConstraintNode {
                    constraint: constraint.id,
                    node: constraint.node,
                });
            }
        }

        Ok(())
    }

    fn check_unique_ids(&self) -> Result<(), ModelError> {
        // The index maps keep the last slot per id, so a length mismatch
        // means some id was inserted twice.
        for (kind, stored, indexed) in [
            ("node", self.nodes.len(), self.node_index.len()),
            ("material", self.materials.len(), self.material_index.len()),
            ("section", self.sections.len(), self.section_index.len()),
            ("element", self.elements.len(), self.element_index.len()),
        ] {
            if stored != indexed {
                let id = self.find_duplicate(kind);
                return Err(ModelError::DuplicateId { kind, id });
            }
        }
        Ok(())
    }

    fn find_duplicate(&self, kind: &'static str) -> i64 {
        let ids: Vec<i64> = match kind {
            "node" => self.nodes.iter().map(|n| n.id).collect(),
            "material" => self.materials.iter().map(|m| m.id).collect(),
            "section" => self.sections.iter().map(|s| s.id).collect(),
            _ => self.elements.iter().map(|e| e.id).collect(),
        };
        let mut seen = HashMap::new();
        for id in ids {
            if seen.insert(id, ()).is_some() {
                return id;
            }
        }
        0
    }
}
