//! `diarium-domain` — the record graph.
//!
//! A [`Root`] owns every entity of the closed set (Register, Case, Action,
//! Document, Unit, User) through identity-keyed tables. Ownership is
//! strictly tree-shaped from the root downward; Unit and User references
//! from Cases/Actions are non-owning identity associations, with
//! bidirectional navigability provided by lookup indices that the root
//! maintains on every mutation.
//!
//! Cross-cutting algorithms (indexing, facet gathering, facet matching)
//! operate over the graph through [`EntityVisitor`] double dispatch instead
//! of type inspection.

pub mod action;
pub mod case;
pub mod document;
pub mod register;
pub mod root;
pub mod unit;
pub mod user;
pub mod visitor;

pub use action::Action;
pub use case::{Case, CasePatch};
pub use document::Document;
pub use register::Register;
pub use root::Root;
pub use unit::Unit;
pub use user::User;
pub use visitor::{EntityKind, EntityRef, EntityVisitor};
