//! Double dispatch over the closed entity set.
//!
//! Cross-cutting algorithms (index field computation, facet gathering, facet
//! matching) implement [`EntityVisitor`] instead of growing type-check
//! chains inside each entity. The set is closed: adding a variant to
//! [`EntityRef`] breaks the exhaustive `accept` match and every visitor that
//! matches on kind, so an unhandled variant is a compile-time omission, not
//! a runtime surprise.

use core::str::FromStr;

use diarium_core::{DomainError, Entity, Identity};
use serde::{Deserialize, Serialize};

use crate::{Action, Case, Document, Register, Unit, User};

/// Discriminant of the closed entity set.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Register,
    Case,
    Action,
    Document,
    Unit,
    User,
}

impl EntityKind {
    /// Stable name, used as the `kind` term in the index.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Register => "register",
            EntityKind::Case => "case",
            EntityKind::Action => "action",
            EntityKind::Document => "document",
            EntityKind::Unit => "unit",
            EntityKind::User => "user",
        }
    }
}

impl core::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "register" => Ok(EntityKind::Register),
            "case" => Ok(EntityKind::Case),
            "action" => Ok(EntityKind::Action),
            "document" => Ok(EntityKind::Document),
            "unit" => Ok(EntityKind::Unit),
            "user" => Ok(EntityKind::User),
            other => Err(DomainError::validation(format!("unknown entity kind: {other}"))),
        }
    }
}

/// A borrowed reference to any entity in the graph.
#[derive(Debug, Copy, Clone)]
pub enum EntityRef<'a> {
    Register(&'a Register),
    Case(&'a Case),
    Action(&'a Action),
    Document(&'a Document),
    Unit(&'a Unit),
    User(&'a User),
}

impl<'a> EntityRef<'a> {
    pub fn kind(&self) -> EntityKind {
        match self {
            EntityRef::Register(_) => EntityKind::Register,
            EntityRef::Case(_) => EntityKind::Case,
            EntityRef::Action(_) => EntityKind::Action,
            EntityRef::Document(_) => EntityKind::Document,
            EntityRef::Unit(_) => EntityKind::Unit,
            EntityRef::User(_) => EntityKind::User,
        }
    }

    pub fn identity(&self) -> Identity {
        match self {
            EntityRef::Register(e) => e.identity(),
            EntityRef::Case(e) => e.identity(),
            EntityRef::Action(e) => e.identity(),
            EntityRef::Document(e) => e.identity(),
            EntityRef::Unit(e) => e.identity(),
            EntityRef::User(e) => e.identity(),
        }
    }

    /// Dispatch to the visitor's handler for this variant.
    pub fn accept<V: EntityVisitor>(&self, visitor: &mut V) -> V::Output {
        match self {
            EntityRef::Register(e) => visitor.visit_register(e),
            EntityRef::Case(e) => visitor.visit_case(e),
            EntityRef::Action(e) => visitor.visit_action(e),
            EntityRef::Document(e) => visitor.visit_document(e),
            EntityRef::Unit(e) => visitor.visit_unit(e),
            EntityRef::User(e) => visitor.visit_user(e),
        }
    }
}

/// Typed double dispatch over [`EntityRef`].
///
/// Implementations supply only the handlers they need; everything else
/// routes to the required [`fallback`](EntityVisitor::fallback).
pub trait EntityVisitor {
    type Output;

    /// Handler for every variant the visitor does not override.
    fn fallback(&mut self, entity: EntityRef<'_>) -> Self::Output;

    fn visit_register(&mut self, register: &Register) -> Self::Output {
        self.fallback(EntityRef::Register(register))
    }

    fn visit_case(&mut self, case: &Case) -> Self::Output {
        self.fallback(EntityRef::Case(case))
    }

    fn visit_action(&mut self, action: &Action) -> Self::Output {
        self.fallback(EntityRef::Action(action))
    }

    fn visit_document(&mut self, document: &Document) -> Self::Output {
        self.fallback(EntityRef::Document(document))
    }

    fn visit_unit(&mut self, unit: &Unit) -> Self::Output {
        self.fallback(EntityRef::Unit(unit))
    }

    fn visit_user(&mut self, user: &User) -> Self::Output {
        self.fallback(EntityRef::User(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct KindCounter {
        cases: usize,
        other: usize,
    }

    impl EntityVisitor for KindCounter {
        type Output = ();

        fn fallback(&mut self, _entity: EntityRef<'_>) {
            self.other += 1;
        }

        fn visit_case(&mut self, _case: &Case) {
            self.cases += 1;
        }
    }

    #[test]
    fn accept_dispatches_to_overridden_handler_or_fallback() {
        let case = Case::new(Identity::new(2), Identity::new(1), "2024/1");
        let unit = Unit::new(Identity::new(3), "KSF", None);

        let mut counter = KindCounter { cases: 0, other: 0 };
        EntityRef::Case(&case).accept(&mut counter);
        EntityRef::Unit(&unit).accept(&mut counter);

        assert_eq!(counter.cases, 1);
        assert_eq!(counter.other, 1);
    }

    #[test]
    fn kind_round_trips_through_its_stable_name() {
        for kind in [
            EntityKind::Register,
            EntityKind::Case,
            EntityKind::Action,
            EntityKind::Document,
            EntityKind::Unit,
            EntityKind::User,
        ] {
            assert_eq!(kind.as_str().parse::<EntityKind>().unwrap(), kind);
        }
    }
}
