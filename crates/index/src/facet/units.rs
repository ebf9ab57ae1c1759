//! The units facet: groups results by organizational unit.

use std::collections::BTreeSet;

use diarium_core::Identity;
use diarium_domain::{Action, Case, Document, EntityRef, EntityVisitor, Root};

use crate::facet::{Facet, FacetDefinition, FacetValue};
use crate::schema::FIELD_FACET_UNIT;
use crate::search::SearchResult;

/// Facet over the units referenced by cases and actions.
///
/// Contribution rules: a case contributes its unit's display value if
/// present; an action contributes its own unit's value and always walks up
/// to its owning case's contribution; a document walks to its owning
/// action. Grouping identity is the display string (name, falling back to
/// code), not unit identity: two units with the same display value fall
/// into the same group.
#[derive(Debug, Default)]
pub struct UnitsFacet;

impl UnitsFacet {
    pub fn new() -> Self {
        Self
    }

    fn display<'a>(root: &'a Root, unit: Option<Identity>) -> Option<&'a str> {
        unit.and_then(|unit| root.unit(unit)).map(|unit| unit.display_value())
    }
}

impl FacetDefinition for UnitsFacet {
    fn field(&self) -> &'static str {
        FIELD_FACET_UNIT
    }

    fn title(&self) -> &'static str {
        "Units"
    }

    fn index_terms(&self, entity: EntityRef<'_>, root: &Root) -> Vec<String> {
        let mut gather = GatherUnits {
            root,
            units: BTreeSet::new(),
        };
        entity.accept(&mut gather);
        gather
            .units
            .iter()
            .filter_map(|unit| Self::display(root, Some(*unit)))
            .map(str::to_owned)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    fn facet(&self, results: &[SearchResult], root: &Root) -> Facet {
        let mut gather = GatherUnits {
            root,
            units: BTreeSet::new(),
        };
        for result in results {
            if let Some(entity) = result.resolve(root) {
                entity.accept(&mut gather);
            }
        }

        let values: BTreeSet<String> = gather
            .units
            .iter()
            .filter_map(|unit| Self::display(root, Some(*unit)))
            .map(str::to_owned)
            .collect();

        Facet {
            title: self.title(),
            values: values
                .into_iter()
                .map(|value| FacetValue {
                    field: self.field(),
                    value,
                })
                .collect(),
        }
    }

    fn matches(&self, entity: EntityRef<'_>, root: &Root, value: &str) -> bool {
        let mut matcher = MatchesUnit { root, value };
        entity.accept(&mut matcher)
    }
}

/// Collects the unit identities an entity contributes to the facet.
struct GatherUnits<'a> {
    root: &'a Root,
    units: BTreeSet<Identity>,
}

impl EntityVisitor for GatherUnits<'_> {
    type Output = ();

    fn fallback(&mut self, _entity: EntityRef<'_>) {}

    fn visit_case(&mut self, case: &Case) {
        if let Some(unit) = case.unit() {
            self.units.insert(unit);
        }
    }

    fn visit_action(&mut self, action: &Action) {
        if let Some(unit) = action.unit() {
            self.units.insert(unit);
        }
        // An action also contributes its owning case's unit; both are
        // independently meaningful to the facet.
        if let Some(case) = self.root.case(action.case()) {
            self.visit_case(case);
        }
    }

    fn visit_document(&mut self, document: &Document) {
        if let Some(action) = self.root.action(document.action()) {
            self.visit_action(action);
        }
    }
}

/// Tests whether an entity resolves to one fixed facet value, running the
/// same per-type lookup as [`GatherUnits`] but comparing instead of
/// collecting.
struct MatchesUnit<'a> {
    root: &'a Root,
    value: &'a str,
}

impl EntityVisitor for MatchesUnit<'_> {
    type Output = bool;

    fn fallback(&mut self, _entity: EntityRef<'_>) -> bool {
        false
    }

    fn visit_case(&mut self, case: &Case) -> bool {
        UnitsFacet::display(self.root, case.unit()) == Some(self.value)
    }

    fn visit_action(&mut self, action: &Action) -> bool {
        if UnitsFacet::display(self.root, action.unit()) == Some(self.value) {
            return true;
        }
        self.root
            .case(action.case())
            .is_some_and(|case| self.visit_case(case))
    }

    fn visit_document(&mut self, document: &Document) -> bool {
        self.root
            .action(document.action())
            .is_some_and(|action| self.visit_action(action))
    }
}
