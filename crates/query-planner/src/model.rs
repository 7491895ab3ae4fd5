//! This is the object model for a Plan.
//! It can be used by an executor to issue per-service sub-requests and graft their results back
//! into one response.
//!
//! A Plan tree is built once per operation. Each Plan's dependents (`after`) can only run once the
//! Plan itself has returned, since they need the federation key it selected; dependents of the
//! same Plan are independent of each other and can run in parallel.

use std::fmt;

use indexmap::IndexSet;
use serde::Deserialize;
use serde::Serialize;
use strum_macros::EnumString;

use crate::selection::SelectionSet;

/// The service name of the root Plan. No schema may declare a service under this name, so every
/// top-level field is treated as remote from the root.
pub const ROOT_SERVICE_NAME: &str = "<root>";

/// GraphQL operation type.
#[derive(
    Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Deserialize, Serialize, EnumString,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "lowercase")]
pub enum OperationKind {
    #[default]
    Query,
    Mutation,
}

impl OperationKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Query => "query",
            Self::Mutation => "mutation",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An operation to plan, as handed over by operation intake.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    /// `"query"` or `"mutation"`.
    pub kind: String,

    /// The selection set, before flattening.
    pub selection_set: SelectionSet,
}

impl Operation {
    pub fn new(kind: impl Into<String>, selection_set: SelectionSet) -> Self {
        Self {
            kind: kind.into(),
            selection_set,
        }
    }

    pub fn query(selection_set: SelectionSet) -> Self {
        Self::new(OperationKind::Query.as_str(), selection_set)
    }

    pub fn mutation(selection_set: SelectionSet) -> Self {
        Self::new(OperationKind::Mutation.as_str(), selection_set)
    }
}

/// One step of the route from a parent Plan's result to where a dependent Plan's data merges.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "name")]
pub enum PathStep {
    /// Descend into the value under this response key. Lists are descended element-wise.
    Field(String),
    /// Only continue for values whose runtime type is this type.
    TypeCondition(String),
}

/// A sub-request against one service, plus the sub-requests depending on its result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    /// Where, within the parent Plan's result, this Plan's data merges. Root-to-leaf order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub path: Vec<PathStep>,

    /// The service the sub-request is sent to.
    pub service: String,

    pub kind: OperationKind,

    /// The object type the selection set applies to. Dependents use it to re-resolve the entity
    /// from the federation key.
    #[serde(rename = "type")]
    pub type_name: String,

    pub selection_set: SelectionSet,

    /// Plans to run once this one has returned, ordered by service.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub after: Vec<Plan>,
}

impl Plan {
    pub fn is_root(&self) -> bool {
        self.service == ROOT_SERVICE_NAME
    }

    /// Reverses the path of this Plan and of every Plan below it, flipping between root-to-leaf
    /// and leaf-to-root order. Applying it twice restores the tree.
    pub fn reverse_paths(&mut self) {
        self.path.reverse();
        for dependent in &mut self.after {
            dependent.reverse_paths();
        }
    }

    /// Walks this Plan and every Plan below it, depth-first, parents before dependents.
    pub fn iter(&self) -> PlanIter<'_> {
        PlanIter { stack: vec![self] }
    }

    /// Distinct services the tree sends sub-requests to, in walk order. The root is excluded.
    pub fn services(&self) -> IndexSet<&str> {
        self.iter()
            .filter(|plan| !plan.is_root())
            .map(|plan| plan.service.as_str())
            .collect()
    }
}

/// Depth-first pre-order iterator over a Plan tree.
pub struct PlanIter<'a> {
    stack: Vec<&'a Plan>,
}

impl<'a> Iterator for PlanIter<'a> {
    type Item = &'a Plan;

    fn next(&mut self) -> Option<Self::Item> {
        let plan = self.stack.pop()?;
        self.stack.extend(plan.after.iter().rev());
        Some(plan)
    }
}
