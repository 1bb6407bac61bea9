//! Model document schema and conversion to/from the model store.
//!
//! Field names follow the original transport convention: material `E`, `nu`,
//! `rho`, `fy`, `fu`; section `A`, `Ix`, `Iy`, `Iz`, `J`, `Sy`, `Sz`;
//! element `type` as a lowercase kind string; load `type`/`direction`
//! strings with "force"/"global" defaults; node DOF masks defaulting to
//! all-active.

use serde::{Deserialize, Serialize};

use strucore_model::{
    Constraint, Element, ElementKind, Load, LoadFrame, LoadKind, LoadTarget, Material, Model, Node,
    Section,
};
use strucore_solver::{DynamicOptions, NonlinearOptions};

use crate::error::{IoError, Result};

fn all_true() -> [bool; 6] {
    [true; 6]
}

fn zeros6() -> [f64; 6] {
    [0.0; 6]
}

fn force_kind() -> String {
    "force".to_string()
}

fn global_frame() -> String {
    "global".to_string()
}

/// Node document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NodeDoc {
    pub id: i64,
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub z: f64,
    /// Active-DOF mask; defaults to all-active
    #[serde(default = "all_true")]
    pub dofs: [bool; 6],
}

/// Material document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MaterialDoc {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    /// Young's modulus [Pa]
    #[serde(rename = "E")]
    pub elastic_modulus: f64,
    /// Poisson's ratio
    pub nu: f64,
    /// Density [kg/m³]
    #[serde(default)]
    pub rho: f64,
    /// Yield strength [Pa]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fy: Option<f64>,
    /// Ultimate strength [Pa]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fu: Option<f64>,
}

/// Section document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SectionDoc {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    /// Area [m²]
    #[serde(rename = "A")]
    pub area: f64,
    #[serde(rename = "Ix", default)]
    pub ix: f64,
    #[serde(rename = "Iy", default)]
    pub iy: f64,
    #[serde(rename = "Iz", default)]
    pub iz: f64,
    #[serde(rename = "J", default)]
    pub j: f64,
    #[serde(rename = "Sy", default, skip_serializing_if = "Option::is_none")]
    pub sy: Option<f64>,
    #[serde(rename = "Sz", default, skip_serializing_if = "Option::is_none")]
    pub sz: Option<f64>,
}

/// Element document; `type` is the lowercase kind string.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ElementDoc {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: String,
    pub nodes: Vec<i64>,
    pub material_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_id: Option<i64>,
}

/// Load document; exactly one of `node_id`/`element_id` must be set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoadDoc {
    pub id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element_id: Option<i64>,
    #[serde(rename = "type", default = "force_kind")]
    pub kind: String,
    #[serde(default = "global_frame")]
    pub direction: String,
    /// Components (Fx, Fy, Fz, Mx, My, Mz)
    #[serde(default = "zeros6")]
    pub values: [f64; 6],
}

/// Constraint document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConstraintDoc {
    pub id: i64,
    pub node_id: i64,
    /// Fixed-DOF mask; true = prescribed
    pub dofs: [bool; 6],
    #[serde(default = "zeros6")]
    pub values: [f64; 6],
}

/// Complete model document.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ModelDoc {
    #[serde(default)]
    pub nodes: Vec<NodeDoc>,
    #[serde(default)]
    pub materials: Vec<MaterialDoc>,
    #[serde(default)]
    pub sections: Vec<SectionDoc>,
    #[serde(default)]
    pub elements: Vec<ElementDoc>,
    #[serde(default)]
    pub loads: Vec<LoadDoc>,
    #[serde(default)]
    pub constraints: Vec<ConstraintDoc>,
}

impl ModelDoc {
    /// Parse a document from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize the document to pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Convert into a model store.
    ///
    /// Kind/direction strings are resolved here; referential and physical
    /// validation stays with the model (run during assembly).
    pub fn into_model(self) -> Result<Model> {
        let mut model = Model::new();

        for node in self.nodes {
            model.add_node(Node::with_dofs(node.id, node.x, node.y, node.z, node.dofs));
        }
        for material in self.materials {
            model.add_material(Material {
                id: material.id,
                name: material.name,
                elastic_modulus: material.elastic_modulus,
                poissons_ratio: material.nu,
                density: material.rho,
                yield_strength: material.fy,
                ultimate_strength: material.fu,
            });
        }
        for section in self.sections {
            model.add_section(Section {
                id: section.id,
                name: section.name,
                area: section.area,
                ix: section.ix,
                iy: section.iy,
                iz: section.iz,
                torsion_constant: section.j,
                section_modulus_y: section.sy,
                section_modulus_z: section.sz,
            });
        }
        for element in self.elements {
            let kind = ElementKind::parse(&element.kind).ok_or_else(|| {
                IoError::UnknownElementKind {
                    element: element.id,
                    kind: element.kind.clone(),
                }
            })?;
            model.add_element(Element::new(
                element.id,
                kind,
                element.nodes,
                element.material_id,
                element.section_id,
            ));
        }
        for load in self.loads {
            let target = match (load.node_id, load.element_id) {
                (Some(node), None) => LoadTarget::Node(node),
                (None, Some(element)) => LoadTarget::Element(element),
                _ => return Err(IoError::AmbiguousLoadTarget { load: load.id }),
            };
            let kind = LoadKind::parse(&load.kind).ok_or_else(|| IoError::UnknownLoadKind {
                load: load.id,
                kind: load.kind.clone(),
            })?;
            let frame =
                LoadFrame::parse(&load.direction).ok_or_else(|| IoError::UnknownLoadDirection {
                    load: load.id,
                    direction: load.direction.clone(),
                })?;
            model.add_load(Load {
                id: load.id,
                target,
                kind,
                frame,
                components: load.values,
            });
        }
        for constraint in self.constraints {
            model.add_constraint(Constraint {
                id: constraint.id,
                node: constraint.node_id,
                fixed: constraint.dofs,
                values: constraint.values,
            });
        }

        Ok(model)
    }

    /// Build a document from a model store.
    pub fn from_model(model: &Model) -> Self {
        Self {
            nodes: model
                .nodes()
                .iter()
                .map(|n| NodeDoc {
                    id: n.id,
                    x: n.x,
                    y: n.y,
                    z: n.z,
                    dofs: n.dofs,
                })
                .collect(),
            materials: model
                .materials()
                .iter()
                .map(|m| MaterialDoc {
                    id: m.id,
                    name: m.name.clone(),
                    elastic_modulus: m.elastic_modulus,
                    nu: m.poissons_ratio,
                    rho: m.density,
                    fy: m.yield_strength,
                    fu: m.ultimate_strength,
                })
                .collect(),
            sections: model
                .sections()
                .iter()
                .map(|s| SectionDoc {
                    id: s.id,
                    name: s.name.clone(),
                    area: s.area,
                    ix: s.ix,
                    iy: s.iy,
                    iz: s.iz,
                    j: s.torsion_constant,
                    sy: s.section_modulus_y,
                    sz: s.section_modulus_z,
                })
                .collect(),
            elements: model
                .elements()
                .iter()
                .map(|e| ElementDoc {
                    id: e.id,
                    kind: e.kind.as_str().to_string(),
                    nodes: e.nodes.clone(),
                    material_id: e.material,
                    section_id: e.section,
                })
                .collect(),
            loads: model
                .loads()
                .iter()
                .map(|l| {
                    let (node_id, element_id) = match l.target {
                        LoadTarget::Node(id) => (Some(id), None),
                        LoadTarget::Element(id) => (None, Some(id)),
                    };
                    LoadDoc {
                        id: l.id,
                        node_id,
                        element_id,
                        kind: l.kind.as_str().to_string(),
                        direction: l.frame.as_str().to_string(),
                        values: l.components,
                    }
                })
                .collect(),
            constraints: model
                .constraints()
                .iter()
                .map(|c| ConstraintDoc {
                    id: c.id,
                    node_id: c.node,
                    dofs: c.fixed,
                    values: c.values,
                })
                .collect(),
        }
    }
}

/// Analysis type selector for requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisKind {
    Static,
    Modal,
    Buckling,
    Nonlinear,
    Dynamic,
}

/// A complete analysis request: a model plus solver parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub model: ModelDoc,
    pub analysis: AnalysisKind,
    /// Modes for modal/buckling analyses
    #[serde(default = "default_num_modes")]
    pub num_modes: usize,
    /// Newton driver options for nonlinear analyses
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonlinear: Option<NonlinearOptions>,
    /// Time integration options for dynamic analyses
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dynamic: Option<DynamicOptions>,
}

fn default_num_modes() -> usize {
    10
}
