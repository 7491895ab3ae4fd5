use serde::Deserialize;
use serde::Serialize;

/// The default cap on how deeply field selections may nest.
pub const DEFAULT_MAX_DEPTH: usize = 128;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default, rename_all = "snake_case")]
pub struct QueryPlannerConfig {
    /// How deeply field selections may nest before planning gives up with
    /// [`RecursionLimitExceeded`](crate::SinglePlanningError::RecursionLimitExceeded).
    ///
    /// Planning recurses once per level of field nesting, so this bounds the stack used on
    /// adversarial operations. Operations that made it through validation upstream rarely come
    /// close.
    ///
    /// Defaults to 128.
    pub max_depth: usize,

    /// A sub-set of configurations that are meant for debugging or testing. They are provided
    /// without guarantees of stability and may be removed without warning.
    pub debug: QueryPlannerDebugConfig,
}

impl Default for QueryPlannerConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            debug: Default::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default, rename_all = "snake_case")]
pub struct QueryPlannerDebugConfig {
    /// Checks every plan against the plan invariants before returning it, failing with
    /// [`InvalidPlan`](crate::SinglePlanningError::InvalidPlan) when one does not hold. Meant for
    /// tests and for debugging the planner itself.
    ///
    /// Defaults to false.
    pub validate_plans: bool,
}
