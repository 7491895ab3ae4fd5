//! Splits an operation into a tree of per-service Plans.
//!
//! Planning walks the flattened selection set once. At every object level, each selection is
//! either resolvable by the service currently being planned, or moved into a bucket for the
//! field's home service. Each bucket becomes a dependent Plan that runs once the current one has
//! returned, re-resolving the object from the `__federation` key the current service is asked to
//! select at that level.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use itertools::Itertools;
use tracing::debug;
use tracing::trace;

use crate::config::QueryPlannerConfig;
use crate::correctness::validate_plan;
use crate::error::PlanningContext;
use crate::error::PlanningError;
use crate::error::SinglePlanningError;
use crate::flatten::AlreadyFlattened;
use crate::flatten::Flatten;
use crate::model::Operation;
use crate::model::OperationKind;
use crate::model::PathStep;
use crate::model::Plan;
use crate::model::ROOT_SERVICE_NAME;
use crate::schema::ExtendedType;
use crate::schema::FieldType;
use crate::schema::ObjectType;
use crate::schema::Schema;
use crate::schema::UnionType;
use crate::selection::Selection;
use crate::selection::SelectionSet;
use crate::utils::logging::snapshot;

/// Plans operations against one federated schema.
///
/// The planner holds no per-operation state: it can be shared between threads and used for any
/// number of operations concurrently.
#[derive(Clone)]
pub struct QueryPlanner {
    config: QueryPlannerConfig,
    schema: Arc<Schema>,
    flattener: Arc<dyn Flatten>,
}

impl fmt::Debug for QueryPlanner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryPlanner")
            .field("config", &self.config)
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

/// A planned selection set, with the dependents collected while planning it.
struct PlannedSelectionSet {
    selection_set: SelectionSet,
    after: Vec<Plan>,
}

impl QueryPlanner {
    /// Creates a planner for operations that arrive already flattened.
    pub fn new(schema: impl Into<Arc<Schema>>, config: QueryPlannerConfig) -> Self {
        Self {
            config,
            schema: schema.into(),
            flattener: Arc::new(AlreadyFlattened),
        }
    }

    /// Replaces the flattener run on every operation before planning.
    pub fn with_flattener(mut self, flattener: impl Flatten + 'static) -> Self {
        self.flattener = Arc::new(flattener);
        self
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn config(&self) -> &QueryPlannerConfig {
        &self.config
    }

    /// Plans an operation.
    ///
    /// The returned tree is rooted at a Plan for the `<root>` pseudo-service, which selects only
    /// the federation key, so every top-level field is sent to its home service by a direct
    /// dependent of the root.
    #[cfg_attr(
        feature = "snapshot_tracing",
        tracing::instrument(level = "trace", skip_all, name = "QueryPlanner::plan_root")
    )]
    pub fn plan_root(&self, operation: &Operation) -> Result<Plan, PlanningError> {
        let kind: OperationKind = operation
            .kind
            .parse()
            .map_err(|_| SinglePlanningError::UnknownOperationKind(operation.kind.clone()))?;
        let root_type = self
            .schema
            .root_type(kind)
            .and_then(|name| self.schema.object_type(name))
            .ok_or(SinglePlanningError::MissingRootType { kind })?;

        let selection_set = self
            .flattener
            .flatten(&operation.selection_set, root_type)?;
        snapshot!(selection_set, "flattened operation");

        let PlannedSelectionSet {
            selection_set,
            mut after,
        } = self.plan_object(root_type, &selection_set, ROOT_SERVICE_NAME, &[], 0)?;

        if kind == OperationKind::Mutation {
            // Mutation fields run in request order, which only a single service can guarantee.
            if after.len() > 1 {
                return Err(SinglePlanningError::MutationFanout {
                    services: after.into_iter().map(|plan| plan.service).collect(),
                }
                .into());
            }
            for plan in &mut after {
                plan.kind = OperationKind::Mutation;
            }
        }

        let plan = Plan {
            path: Vec::new(),
            service: ROOT_SERVICE_NAME.to_owned(),
            kind,
            type_name: root_type.name.clone(),
            selection_set,
            after,
        };

        if self.config.debug.validate_plans {
            validate_plan(&plan)?;
        }
        snapshot!(plan, "planned operation");
        debug!(
            %kind,
            services = plan.services().len(),
            plans = plan.iter().count(),
            "planned operation"
        );
        Ok(plan)
    }

    /// Plans `selection_set`, which selects from a value of type `ty`, as if sent to `service`.
    ///
    /// List and non-null wrappers are looked through. The returned Plan is for `service`, on the
    /// type's named type, with an empty path; selections `service` cannot resolve are moved to
    /// its dependents.
    pub fn plan_from_service(
        &self,
        ty: &FieldType,
        selection_set: &SelectionSet,
        service: &str,
    ) -> Result<Plan, PlanningError> {
        let PlannedSelectionSet {
            selection_set,
            after,
        } = self.plan_type(ty, selection_set, service, &[], 0)?;
        Ok(Plan {
            path: Vec::new(),
            service: service.to_owned(),
            kind: OperationKind::Query,
            type_name: ty.inner_named_type().to_owned(),
            selection_set,
            after,
        })
    }

    fn plan_type(
        &self,
        ty: &FieldType,
        selection_set: &SelectionSet,
        service: &str,
        path: &[PathStep],
        depth: usize,
    ) -> Result<PlannedSelectionSet, PlanningError> {
        match ty {
            FieldType::List(inner) | FieldType::NonNull(inner) => {
                self.plan_type(inner, selection_set, service, path, depth)
            }
            FieldType::Named(name) => match self.schema.type_definition(name) {
                Some(ExtendedType::Object(object)) => {
                    self.plan_object(object, selection_set, service, path, depth)
                }
                Some(ExtendedType::Union(union_)) => {
                    self.plan_union(union_, selection_set, service, path, depth)
                }
                Some(other) => Err(SinglePlanningError::UnsupportedType {
                    type_name: name.clone(),
                    kind: other.kind(),
                }
                .into()),
                None => Err(SinglePlanningError::UnknownType {
                    type_name: name.clone(),
                }
                .into()),
            },
        }
    }

    fn plan_object(
        &self,
        object: &ObjectType,
        selection_set: &SelectionSet,
        service: &str,
        path: &[PathStep],
        depth: usize,
    ) -> Result<PlannedSelectionSet, PlanningError> {
        if depth > self.config.max_depth {
            return Err(SinglePlanningError::RecursionLimitExceeded {
                limit: self.config.max_depth,
            }
            .into());
        }
        if selection_set.has_fragments() {
            return Err(SinglePlanningError::UnflattenedQuery {
                type_name: object.name.clone(),
            }
            .into());
        }

        let mut local = Vec::with_capacity(selection_set.selections.len());
        let mut buckets: IndexMap<&str, SelectionSet> = IndexMap::new();
        for selection in &selection_set.selections {
            if selection.shadows_federation_key() {
                return Err(SinglePlanningError::ReservedAlias {
                    type_name: object.name.clone(),
                    field_name: selection.name.clone(),
                }
                .into());
            }
            // Every service answers the typename meta-field.
            if selection.is_typename() || selection.is_federation_key() {
                local.push(selection);
                continue;
            }
            if !object.fields.contains_key(&selection.name) {
                return Err(SinglePlanningError::UnknownField {
                    type_name: object.name.clone(),
                    field_name: selection.name.clone(),
                }
                .into());
            }
            let ownership = self
                .schema
                .field_ownership(&object.name, &selection.name)
                .ok_or_else(|| SinglePlanningError::UnownedField {
                    type_name: object.name.clone(),
                    field_name: selection.name.clone(),
                })?;
            if ownership.is_resolvable_by(service) {
                local.push(selection);
            } else {
                trace!(
                    type_name = %object.name,
                    field = %selection.name,
                    from = service,
                    to = %ownership.home_service,
                    "moving selection to home service"
                );
                buckets
                    .entry(ownership.home_service.as_str())
                    .or_default()
                    .selections
                    .push(selection.clone());
            }
        }

        let mut planned = PlannedSelectionSet {
            selection_set: SelectionSet::new(),
            after: Vec::new(),
        };
        for selection in local {
            // Leaves and meta-fields are sent as they are.
            let (Some(sub_selection), Some(field)) =
                (&selection.selection_set, object.fields.get(&selection.name))
            else {
                planned.selection_set.selections.push(selection.clone());
                continue;
            };
            let mut child_path = path.to_vec();
            child_path.push(PathStep::Field(selection.response_key().to_owned()));
            let child = self
                .plan_type(&field.ty, sub_selection, service, &child_path, depth + 1)
                .map_err(|error| {
                    error.context(PlanningContext::Field(selection.response_key().to_owned()))
                })?;
            planned.selection_set.selections.push(Selection {
                selection_set: Some(child.selection_set),
                ..selection.clone()
            });
            planned.after.extend(child.after);
        }

        let needs_key = !buckets.is_empty();
        for (other, bucket) in buckets
            .into_iter()
            .sorted_by(|(left, _), (right, _)| left.cmp(right))
        {
            // The dependent's own selections start at the object it re-resolves, so its
            // dependents' paths are relative to it.
            let remote = self
                .plan_object(object, &bucket, other, &[], depth)
                .map_err(|error| error.context(PlanningContext::Service(other.to_owned())))?;
            planned.after.push(Plan {
                path: path.to_vec(),
                service: other.to_owned(),
                kind: OperationKind::Query,
                type_name: object.name.clone(),
                selection_set: remote.selection_set,
                after: remote.after,
            });
        }
        if needs_key
            && !planned
                .selection_set
                .selections
                .iter()
                .any(Selection::is_federation_key)
        {
            planned
                .selection_set
                .selections
                .push(Selection::federation_key());
        }

        planned
            .after
            .sort_by(|left, right| left.service.cmp(&right.service));
        Ok(planned)
    }

    fn plan_union(
        &self,
        union_: &UnionType,
        selection_set: &SelectionSet,
        service: &str,
        path: &[PathStep],
        depth: usize,
    ) -> Result<PlannedSelectionSet, PlanningError> {
        let mut planned = PlannedSelectionSet {
            // Results are only attributable to a fragment once the runtime type is known.
            selection_set: SelectionSet::new().with_selection(Selection::typename()),
            after: Vec::new(),
        };

        for selection in &selection_set.selections {
            if selection.shadows_federation_key() {
                return Err(SinglePlanningError::ReservedAlias {
                    type_name: union_.name.clone(),
                    field_name: selection.name.clone(),
                }
                .into());
            }
            if !selection.is_typename() {
                return Err(SinglePlanningError::UnionSelection {
                    union_name: union_.name.clone(),
                    selection: selection.response_key().to_owned(),
                }
                .into());
            }
            if !planned.selection_set.selections.contains(selection) {
                planned.selection_set.selections.push(selection.clone());
            }
        }

        for (i, fragment) in selection_set.fragments.iter().enumerate() {
            if selection_set.fragments[..i]
                .iter()
                .any(|previous| previous.on == fragment.on)
            {
                return Err(SinglePlanningError::DuplicateFragment {
                    union_name: union_.name.clone(),
                    type_condition: fragment.on.clone(),
                }
                .into());
            }
            if !union_.members.contains(&fragment.on) {
                return Err(SinglePlanningError::UnknownFragmentTarget {
                    union_name: union_.name.clone(),
                    type_condition: fragment.on.clone(),
                }
                .into());
            }
            let object = self.schema.object_type(&fragment.on).ok_or_else(|| {
                SinglePlanningError::UnknownType {
                    type_name: fragment.on.clone(),
                }
            })?;

            let mut fragment_path = path.to_vec();
            fragment_path.push(PathStep::TypeCondition(fragment.on.clone()));
            let child = self
                .plan_object(object, &fragment.selection_set, service, &fragment_path, depth)
                .map_err(|error| error.context(PlanningContext::Fragment(fragment.on.clone())))?;
            planned.selection_set = planned
                .selection_set
                .with_fragment(fragment.on.clone(), child.selection_set);
            planned.after.extend(child.after);
        }

        planned
            .after
            .sort_by(|left, right| left.service.cmp(&right.service));
        Ok(planned)
    }
}
