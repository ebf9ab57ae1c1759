//! Register: a named collection of cases tied to one external source.

use diarium_core::{Entity, Identity};
use serde::{Deserialize, Serialize};

/// A named collection of cases, backed by one external data source.
///
/// Name and source locator are immutable after creation. The case list is
/// maintained by [`Root`](crate::Root) when cases are inserted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Register {
    identity: Identity,
    name: String,
    source_url: String,
    cases: Vec<Identity>,
}

impl Register {
    /// Construct a register record. Invoked by command application only;
    /// never insert entities into the graph ad hoc.
    pub fn new(identity: Identity, name: impl Into<String>, source_url: impl Into<String>) -> Self {
        Self {
            identity,
            name: name.into(),
            source_url: source_url.into(),
            cases: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source_url(&self) -> &str {
        &self.source_url
    }

    /// Identities of the cases this register owns, in insertion order.
    pub fn cases(&self) -> &[Identity] {
        &self.cases
    }

    pub(crate) fn attach_case(&mut self, case: Identity) {
        self.cases.push(case);
    }
}

impl Entity for Register {
    fn identity(&self) -> Identity {
        self.identity
    }
}
