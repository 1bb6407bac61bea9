//! In-memory structural model for finite element analysis.
//!
//! This crate owns the model aggregate — nodes, materials, cross-sections,
//! elements, loads, and kinematic constraints — together with the DOF
//! numbering derived from it. It carries no numerics; the solver crate
//! consumes a [`Model`] and writes owned result records.

pub mod dof;
pub mod entities;
pub mod model;

pub use dof::DofMap;
pub use entities::{
    Constraint, Element, ElementKind, Load, LoadFrame, LoadKind, LoadTarget, Material, Node,
    Section,
};
pub use model::{Model, ModelError};
