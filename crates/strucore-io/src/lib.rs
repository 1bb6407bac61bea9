//! JSON transport schemas for models and analysis results.
//!
//! This crate owns the bit-exact surface of the request/response documents:
//! entity fields follow the model schema (`E`, `nu`, `rho`, `A`, `Ix`, …),
//! element kinds are lowercase strings, ids are 64-bit signed integers, and
//! all numerics are IEEE-754 doubles. Unknown fields are ignored on input;
//! missing optional fields take the documented defaults.

pub mod error;
pub mod model_doc;
pub mod result_doc;

pub use error::IoError;
pub use model_doc::{
    AnalysisKind, AnalysisRequest, ConstraintDoc, ElementDoc, LoadDoc, MaterialDoc, ModelDoc,
    NodeDoc, SectionDoc,
};
pub use result_doc::{
    BucklingResultDoc, DynamicResultDoc, ElementForcesDoc, ErrorDoc, ModalResultDoc,
    NonlinearResultDoc, StaticResultDoc,
};
