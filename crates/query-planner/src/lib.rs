//! Plans GraphQL operations against a federated schema.
//!
//! A federated schema stitches together the types of several services, each resolving some of the
//! fields. [`QueryPlanner::plan_root`] splits an operation into a tree of [`Plan`]s: one
//! sub-request per service, with the sub-requests that depend on a result nested under it as
//! `after`. Dependents find the object they extend through the `__federation` key their parent
//! selected, at the position their `path` designates.
//!
//! ```
//! use federation_query_planner::*;
//!
//! let schema = Schema::builder()
//!     .query_type("Query")
//!     .scalar("String")
//!     .object(ObjectType::new("Query").field("me", FieldType::named("User")))
//!     .object(ObjectType::new("User").field("name", FieldType::named("String")))
//!     .resolve("Query", "me", FieldOwnership::new("users"))
//!     .resolve("User", "name", FieldOwnership::new("users"))
//!     .build()?;
//! let planner = QueryPlanner::new(schema, QueryPlannerConfig::default());
//!
//! let operation = Operation::query(SelectionSet::new().with_selection(
//!     Selection::field("me").with_selection_set(SelectionSet::new().with_field("name")),
//! ));
//! let plan = planner.plan_root(&operation)?;
//! assert_eq!(plan.after[0].service, "users");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! Parsing and validating operation text, flattening named fragments, and executing plans all
//! happen outside this crate.

#![warn(
    rustdoc::broken_intra_doc_links,
    unreachable_pub,
    unreachable_patterns,
    unused,
    unused_qualifications,
    dead_code,
    while_true,
    unconditional_panic,
    clippy::all
)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

pub mod config;
pub mod correctness;
mod display;
pub mod error;
pub mod flatten;
pub mod model;
mod planner;
pub mod schema;
pub mod selection;
mod utils;

pub use crate::config::QueryPlannerConfig;
pub use crate::config::QueryPlannerDebugConfig;
pub use crate::error::FlattenError;
pub use crate::error::PlanningContext;
pub use crate::error::PlanningError;
pub use crate::error::SchemaError;
pub use crate::error::SinglePlanningError;
pub use crate::flatten::flatten_fn;
pub use crate::flatten::AlreadyFlattened;
pub use crate::flatten::Flatten;
pub use crate::model::Operation;
pub use crate::model::OperationKind;
pub use crate::model::PathStep;
pub use crate::model::Plan;
pub use crate::model::ROOT_SERVICE_NAME;
pub use crate::planner::QueryPlanner;
pub use crate::schema::ExtendedType;
pub use crate::schema::FieldOwnership;
pub use crate::schema::FieldType;
pub use crate::schema::ObjectType;
pub use crate::schema::Schema;
pub use crate::schema::SchemaBuilder;
pub use crate::schema::TypeKind;
pub use crate::schema::UnionType;
pub use crate::selection::Fragment;
pub use crate::selection::Selection;
pub use crate::selection::SelectionSet;
