//! The selection sets planned by this crate and sent to services.
//!
//! Parsing operation text into this form and resolving named fragment spreads happen upstream;
//! the planner only consumes and produces these types.

use indexmap::IndexMap;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

/// The meta-field every type answers with its runtime type name.
pub const TYPENAME_FIELD: &str = "__typename";

/// The synthetic field through which a service emits the entity reference another service uses
/// to resolve the same entity.
pub const FEDERATION_KEY_FIELD: &str = "__federation";

/// An ordered list of field selections plus the fragments applying to concrete types.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionSet {
    /// The field selections, in request order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub selections: Vec<Selection>,

    /// The fragments, each applying to one concrete type.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fragments: Vec<Fragment>,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a leaf field selection.
    pub fn with_field(self, name: impl Into<String>) -> Self {
        self.with_selection(Selection::field(name))
    }

    pub fn with_selection(mut self, selection: Selection) -> Self {
        self.selections.push(selection);
        self
    }

    pub fn with_fragment(mut self, on: impl Into<String>, selection_set: SelectionSet) -> Self {
        self.fragments.push(Fragment {
            on: on.into(),
            selection_set,
        });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.selections.is_empty() && self.fragments.is_empty()
    }

    pub fn has_fragments(&self) -> bool {
        !self.fragments.is_empty()
    }

    /// Returns the selection answering under the given response key, if any.
    pub fn selection(&self, response_key: &str) -> Option<&Selection> {
        self.selections
            .iter()
            .find(|selection| selection.response_key() == response_key)
    }

    /// Returns the fragment applying to the given concrete type, if any.
    pub fn fragment(&self, on: &str) -> Option<&Fragment> {
        self.fragments.iter().find(|fragment| fragment.on == on)
    }
}

/// A single field selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Selection {
    /// An optional alias for the field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,

    /// The name of the field.
    pub name: String,

    /// The arguments, in request order.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub arguments: IndexMap<String, Value>,

    /// The sub-selection, for fields of composite type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection_set: Option<SelectionSet>,
}

impl Selection {
    pub fn field(name: impl Into<String>) -> Self {
        Self {
            alias: None,
            name: name.into(),
            arguments: IndexMap::new(),
            selection_set: None,
        }
    }

    pub fn typename() -> Self {
        Self::field(TYPENAME_FIELD)
    }

    pub fn federation_key() -> Self {
        Self::field(FEDERATION_KEY_FIELD)
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn with_argument(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.arguments.insert(name.into(), value.into());
        self
    }

    pub fn with_selection_set(mut self, selection_set: SelectionSet) -> Self {
        self.selection_set = Some(selection_set);
        self
    }

    /// The key this selection's value is stored under in a response: the alias, or the field
    /// name when there is none.
    pub fn response_key(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }

    pub fn is_typename(&self) -> bool {
        self.name == TYPENAME_FIELD
    }

    /// Whether this is the federation key selection: the key field as a leaf, under its own name,
    /// with no arguments.
    pub fn is_federation_key(&self) -> bool {
        self.name == FEDERATION_KEY_FIELD
            && self.response_key() == FEDERATION_KEY_FIELD
            && self.arguments.is_empty()
            && self.selection_set.is_none()
    }

    /// Whether this selection claims the key's response key without being the plain key.
    pub(crate) fn shadows_federation_key(&self) -> bool {
        self.response_key() == FEDERATION_KEY_FIELD && !self.is_federation_key()
    }
}

/// A selection set applying only when the runtime type is `on`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fragment {
    /// The concrete type the fragment applies to.
    pub on: String,

    pub selection_set: SelectionSet,
}
