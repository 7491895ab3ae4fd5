//! Structural checks on a finished plan tree.
//!
//! These do not re-plan anything. They only verify the properties an executor depends on when it
//! runs dependents and grafts their results back: where each dependent attaches, that a key is
//! there to resolve it from, and that the tree's ordering is deterministic.

use std::fmt;

use indexmap::IndexSet;
use itertools::Itertools;

use crate::display::DisplayPath;
use crate::error::PlanningError;
use crate::error::SinglePlanningError;
use crate::model::OperationKind;
use crate::model::PathStep;
use crate::model::Plan;
use crate::model::ROOT_SERVICE_NAME;
use crate::selection::SelectionSet;

struct ValidationError {
    message: String,
    context: Vec<String>,
}

impl ValidationError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            context: Vec::new(),
        }
    }

    fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context.push(context.into());
        self
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Context is pushed innermost first.
        for context in self.context.iter().rev() {
            write!(f, "{context}: ")?;
        }
        write!(f, "{}", self.message)
    }
}

impl From<ValidationError> for PlanningError {
    fn from(error: ValidationError) -> Self {
        SinglePlanningError::InvalidPlan {
            message: error.to_string(),
        }
        .into()
    }
}

/// Checks a plan tree produced by [`QueryPlanner::plan_root`](crate::QueryPlanner::plan_root).
///
/// Fails with [`InvalidPlan`](SinglePlanningError::InvalidPlan) when:
/// - a dependent uses the root service name, or the tree's root does not,
/// - dependents are not ordered by service,
/// - two dependents of one Plan share both service and path,
/// - a dependent of a non-root Plan attaches at the top of its parent's result,
/// - a Plan below the root's direct dependents is a mutation,
/// - the parent does not select exactly one federation key where a dependent attaches.
pub fn validate_plan(plan: &Plan) -> Result<(), PlanningError> {
    if !plan.is_root() {
        return Err(ValidationError::new(format!(
            "top-level plan is for service \"{}\" instead of the root",
            plan.service
        ))
        .into());
    }
    validate_dependents(plan, 0).map_err(|error| {
        error
            .with_context(format!("plan for \"{}\"", plan.service))
            .into()
    })
}

fn validate_dependents(parent: &Plan, level: usize) -> Result<(), ValidationError> {
    if let Some((previous, next)) = parent
        .after
        .iter()
        .tuple_windows()
        .find(|(previous, next)| previous.service > next.service)
    {
        return Err(ValidationError::new(format!(
            "dependent \"{}\" is ordered before \"{}\"",
            previous.service, next.service
        )));
    }

    let mut attachments = IndexSet::new();
    for dependent in &parent.after {
        let position = DisplayPath(&dependent.path);
        if dependent.service == ROOT_SERVICE_NAME {
            return Err(ValidationError::new(format!(
                "dependent at \"{position}\" uses the root service name"
            )));
        }
        if !attachments.insert((dependent.service.as_str(), &dependent.path)) {
            return Err(ValidationError::new(format!(
                "more than one dependent for \"{}\" at \"{position}\"",
                dependent.service
            )));
        }
        if !parent.is_root() && dependent.path.is_empty() {
            return Err(ValidationError::new(format!(
                "dependent \"{}\" attaches at the top of a non-root plan",
                dependent.service
            )));
        }
        if level > 0 && dependent.kind == OperationKind::Mutation {
            return Err(ValidationError::new(format!(
                "nested dependent \"{}\" at \"{position}\" is a mutation",
                dependent.service
            )));
        }

        let keys = key_selections_at(&parent.selection_set, &dependent.path)
            .map_err(|error| error.with_context(format!("dependent \"{}\"", dependent.service)))?;
        if keys != 1 {
            return Err(ValidationError::new(format!(
                "parent selects {keys} federation keys at \"{position}\" for dependent \"{}\"",
                dependent.service
            )));
        }

        validate_dependents(dependent, level + 1).map_err(|error| {
            error.with_context(format!(
                "plan for \"{}\" at \"{position}\"",
                dependent.service
            ))
        })?;
    }
    Ok(())
}

/// Counts the federation key selections in the selection set reached by following `path`.
fn key_selections_at(
    selection_set: &SelectionSet,
    path: &[PathStep],
) -> Result<usize, ValidationError> {
    let mut current = selection_set;
    for (i, step) in path.iter().enumerate() {
        let next = match step {
            PathStep::Field(response_key) => current
                .selection(response_key)
                .and_then(|selection| selection.selection_set.as_ref()),
            PathStep::TypeCondition(type_name) => current
                .fragment(type_name)
                .map(|fragment| &fragment.selection_set),
        };
        current = next.ok_or_else(|| {
            ValidationError::new(format!(
                "path \"{}\" leaves the parent's selection set at \"{step}\"",
                DisplayPath(&path[..=i])
            ))
        })?;
    }
    if let Some(shadow) = current
        .selections
        .iter()
        .find(|selection| selection.shadows_federation_key())
    {
        return Err(ValidationError::new(format!(
            "selection {} at \"{}\" reuses the federation key's response key",
            shadow.name,
            DisplayPath(path)
        )));
    }
    Ok(current
        .selections
        .iter()
        .filter(|selection| selection.is_federation_key())
        .count())
}
