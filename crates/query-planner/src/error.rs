//! Planning and schema errors.

use std::fmt;

use thiserror::Error;

use crate::model::OperationKind;
use crate::schema::TypeKind;

/// The reason planning an operation failed.
///
/// Every variant is a structural problem with the operation or the schema. None is retryable,
/// and no partial plan exists once one is raised.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum SinglePlanningError {
    #[error("type {type_name} has no field {field_name}")]
    UnknownField {
        type_name: String,
        field_name: String,
    },

    #[error("selection set on {type_name} has fragments, expected flattened query")]
    UnflattenedQuery { type_name: String },

    #[error("unexpected selection {selection} on union {union_name}")]
    UnionSelection {
        union_name: String,
        selection: String,
    },

    #[error("reused fragment on {type_condition} in union {union_name}, expected flattened query")]
    DuplicateFragment {
        union_name: String,
        type_condition: String,
    },

    #[error("unexpected fragment on {type_condition} for union {union_name}")]
    UnknownFragmentTarget {
        union_name: String,
        type_condition: String,
    },

    #[error("cannot plan a selection set on {kind} type {type_name}")]
    UnsupportedType { type_name: String, kind: TypeKind },

    #[error("type {type_name} is not defined in the schema")]
    UnknownType { type_name: String },

    #[error("field {type_name}.{field_name} is not resolved by any service")]
    UnownedField {
        type_name: String,
        field_name: String,
    },

    #[error(
        "selection {field_name} on {type_name} uses the response key reserved for the federation key"
    )]
    ReservedAlias {
        type_name: String,
        field_name: String,
    },

    #[error("unknown operation kind {0}")]
    UnknownOperationKind(String),

    #[error("schema has no {kind} root type")]
    MissingRootType { kind: OperationKind },

    #[error(
        "only support 1 mutation step to maintain ordering, mutation fields are resolved by {}",
        .services.join(", ")
    )]
    MutationFanout { services: Vec<String> },

    #[error("selection sets nest deeper than the limit of {limit}")]
    RecursionLimitExceeded { limit: usize },

    #[error("flattening the operation failed: {0}")]
    Flatten(#[from] FlattenError),

    #[error("invalid plan: {message}")]
    InvalidPlan { message: String },
}

/// Where in the operation a nested error was raised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanningContext {
    /// Planning the sub-selection of the field with this response key.
    Field(String),
    /// Planning the selections moved to this service.
    Service(String),
    /// Planning the fragment on this type.
    Fragment(String),
}

impl fmt::Display for PlanningContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field(response_key) => write!(f, "field \"{response_key}\""),
            Self::Service(service) => write!(f, "service \"{service}\""),
            Self::Fragment(type_condition) => write!(f, "fragment on \"{type_condition}\""),
        }
    }
}

/// A planning failure, with the frames it propagated through.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanningError {
    #[error(transparent)]
    Single(#[from] SinglePlanningError),

    #[error("planning for {context}: {source}")]
    Context {
        context: PlanningContext,
        source: Box<PlanningError>,
    },
}

impl PlanningError {
    /// Wraps the error in one more frame of context.
    pub fn context(self, context: PlanningContext) -> Self {
        Self::Context {
            context,
            source: Box::new(self),
        }
    }

    /// The error as originally raised, without context frames.
    pub fn root_cause(&self) -> &SinglePlanningError {
        let mut error = self;
        loop {
            match error {
                Self::Single(single) => return single,
                Self::Context { source, .. } => error = &**source,
            }
        }
    }

    /// The context frames, outermost first.
    pub fn contexts(&self) -> Vec<&PlanningContext> {
        let mut contexts = Vec::new();
        let mut error = self;
        while let Self::Context { context, source } = error {
            contexts.push(context);
            error = &**source;
        }
        contexts
    }
}

impl From<FlattenError> for PlanningError {
    fn from(error: FlattenError) -> Self {
        SinglePlanningError::from(error).into()
    }
}

/// Raised by a [`Flatten`](crate::Flatten) implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct FlattenError {
    pub message: String,
}

impl FlattenError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Raised when a schema is built from inconsistent definitions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum SchemaError {
    #[error("type {0} is defined more than once")]
    DuplicateType(String),

    #[error("schema has no query root type")]
    MissingQueryType,

    #[error("root type {0} is not a defined object type")]
    RootTypeNotObject(String),

    #[error("field {type_name}.{field_name} references undefined type {referenced}")]
    UndefinedType {
        type_name: String,
        field_name: String,
        referenced: String,
    },

    #[error("member {member} of union {union_name} is not an object type")]
    InvalidUnionMember { union_name: String, member: String },

    #[error("services declared for undefined field {type_name}.{field_name}")]
    UndefinedField {
        type_name: String,
        field_name: String,
    },

    #[error("service name {0} is reserved for the root plan")]
    ReservedServiceName(String),
}
