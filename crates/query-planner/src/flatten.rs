//! The seam through which operations are flattened before planning.
//!
//! Planning only accepts selection sets where object-typed levels carry no fragments and union
//! levels carry at most one fragment per member. Expanding named fragment spreads and merging
//! inline fragments into that shape happens outside this crate, behind [`Flatten`].

#[cfg(test)]
use mockall::automock;

use crate::error::FlattenError;
use crate::schema::ObjectType;
use crate::selection::SelectionSet;

/// Rewrites an operation's selection set into the flattened form planning expects.
#[cfg_attr(test, automock)]
pub trait Flatten: Send + Sync {
    /// Flattens `selection_set`, which is rooted at `root_type`.
    fn flatten(
        &self,
        selection_set: &SelectionSet,
        root_type: &ObjectType,
    ) -> Result<SelectionSet, FlattenError>;
}

/// Passes selection sets through unchanged, for callers whose operations already arrive flat.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlreadyFlattened;

impl Flatten for AlreadyFlattened {
    fn flatten(
        &self,
        selection_set: &SelectionSet,
        _root_type: &ObjectType,
    ) -> Result<SelectionSet, FlattenError> {
        Ok(selection_set.clone())
    }
}

/// A [`Flatten`] backed by a function. Built with [`flatten_fn`].
#[derive(Clone, Copy)]
pub struct FlattenFn<F>(F);

/// Wraps a function as a [`Flatten`] implementation.
pub fn flatten_fn<F>(f: F) -> FlattenFn<F>
where
    F: Fn(&SelectionSet, &ObjectType) -> Result<SelectionSet, FlattenError> + Send + Sync,
{
    FlattenFn(f)
}

impl<F> Flatten for FlattenFn<F>
where
    F: Fn(&SelectionSet, &ObjectType) -> Result<SelectionSet, FlattenError> + Send + Sync,
{
    fn flatten(
        &self,
        selection_set: &SelectionSet,
        root_type: &ObjectType,
    ) -> Result<SelectionSet, FlattenError> {
        (self.0)(selection_set, root_type)
    }
}

impl<F> std::fmt::Debug for FlattenFn<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("FlattenFn").finish_non_exhaustive()
    }
}
