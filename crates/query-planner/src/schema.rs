//! The stitched schema the planner reads: the type graph and the table of which services resolve
//! each field.

use std::fmt;

use indexmap::IndexMap;
use indexmap::IndexSet;
use serde::Deserialize;
use serde::Serialize;
use strum_macros::Display;
use tracing::debug;

use crate::error::SchemaError;
use crate::model::OperationKind;
use crate::model::ROOT_SERVICE_NAME;

/// The type of a field's result, with its list and non-null wrappers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldType {
    Named(String),
    List(Box<FieldType>),
    NonNull(Box<FieldType>),
}

impl FieldType {
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    pub fn list(inner: FieldType) -> Self {
        Self::List(Box::new(inner))
    }

    pub fn non_null(inner: FieldType) -> Self {
        Self::NonNull(Box::new(inner))
    }

    /// The named type at the core of the wrappers.
    pub fn inner_named_type(&self) -> &str {
        match self {
            Self::Named(name) => name,
            Self::List(inner) | Self::NonNull(inner) => inner.inner_named_type(),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(name) => write!(f, "{name}"),
            Self::List(inner) => write!(f, "[{inner}]"),
            Self::NonNull(inner) => write!(f, "{inner}!"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDefinition {
    pub name: String,
    pub ty: FieldType,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectType {
    pub name: String,
    pub fields: IndexMap<String, FieldDefinition>,
}

impl ObjectType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: IndexMap::new(),
        }
    }

    pub fn field(mut self, name: impl Into<String>, ty: FieldType) -> Self {
        let name = name.into();
        self.fields.insert(name.clone(), FieldDefinition { name, ty });
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnionType {
    pub name: String,
    /// The names of the concrete object types in the union.
    pub members: IndexSet<String>,
}

impl UnionType {
    pub fn new<I, S>(name: impl Into<String>, members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            members: members.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScalarType {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumType {
    pub name: String,
    pub values: IndexSet<String>,
}

/// The kind of a named type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "lowercase")]
pub enum TypeKind {
    Scalar,
    Enum,
    Object,
    Union,
}

/// A named type definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtendedType {
    Scalar(ScalarType),
    Enum(EnumType),
    Object(ObjectType),
    Union(UnionType),
}

impl ExtendedType {
    pub fn name(&self) -> &str {
        match self {
            Self::Scalar(scalar) => &scalar.name,
            Self::Enum(enum_) => &enum_.name,
            Self::Object(object) => &object.name,
            Self::Union(union_) => &union_.name,
        }
    }

    pub const fn kind(&self) -> TypeKind {
        match self {
            Self::Scalar(_) => TypeKind::Scalar,
            Self::Enum(_) => TypeKind::Enum,
            Self::Object(_) => TypeKind::Object,
            Self::Union(_) => TypeKind::Union,
        }
    }
}

/// Which services can resolve a field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldOwnership {
    /// The service selections move to when the current service cannot resolve the field.
    pub home_service: String,
    /// Every service able to resolve the field. Always contains the home service.
    pub eligible_services: IndexSet<String>,
}

impl FieldOwnership {
    pub fn new(home_service: impl Into<String>) -> Self {
        let home_service = home_service.into();
        Self {
            eligible_services: IndexSet::from([home_service.clone()]),
            home_service,
        }
    }

    /// Adds services that can resolve the field besides the home service.
    pub fn also_resolvable_by<I, S>(mut self, services: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.eligible_services
            .extend(services.into_iter().map(Into::into));
        self
    }

    pub fn is_resolvable_by(&self, service: &str) -> bool {
        self.eligible_services.contains(service)
    }
}

/// A validated, read-only federated schema.
///
/// Built through [`SchemaBuilder`], which guarantees every referenced type exists, every union
/// member is an object type, and no service uses the name reserved for the root plan.
#[derive(Debug, Clone)]
pub struct Schema {
    types: IndexMap<String, ExtendedType>,
    query_type: String,
    mutation_type: Option<String>,
    /// Ownership keyed by declaring type, then field name.
    ownership: IndexMap<String, IndexMap<String, FieldOwnership>>,
}

impl Schema {
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    pub fn type_definition(&self, name: &str) -> Option<&ExtendedType> {
        self.types.get(name)
    }

    pub fn object_type(&self, name: &str) -> Option<&ObjectType> {
        match self.types.get(name)? {
            ExtendedType::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn types(&self) -> impl Iterator<Item = &ExtendedType> {
        self.types.values()
    }

    /// The name of the root type operations of the given kind start from.
    pub fn root_type(&self, kind: OperationKind) -> Option<&str> {
        match kind {
            OperationKind::Query => Some(&self.query_type),
            OperationKind::Mutation => self.mutation_type.as_deref(),
        }
    }

    pub fn field_ownership(&self, type_name: &str, field_name: &str) -> Option<&FieldOwnership> {
        self.ownership.get(type_name)?.get(field_name)
    }

    /// Every service resolving at least one field, in declaration order.
    pub fn services(&self) -> IndexSet<&str> {
        self.ownership
            .values()
            .flat_map(IndexMap::values)
            .flat_map(|ownership| ownership.eligible_services.iter())
            .map(String::as_str)
            .collect()
    }
}

/// Assembles a [`Schema`] and validates it on [`SchemaBuilder::build`].
#[derive(Debug, Clone, Default)]
pub struct SchemaBuilder {
    types: Vec<ExtendedType>,
    query_type: Option<String>,
    mutation_type: Option<String>,
    ownership: Vec<(String, String, FieldOwnership)>,
}

impl SchemaBuilder {
    pub fn query_type(mut self, name: impl Into<String>) -> Self {
        self.query_type = Some(name.into());
        self
    }

    pub fn mutation_type(mut self, name: impl Into<String>) -> Self {
        self.mutation_type = Some(name.into());
        self
    }

    pub fn scalar(mut self, name: impl Into<String>) -> Self {
        self.types
            .push(ExtendedType::Scalar(ScalarType { name: name.into() }));
        self
    }

    pub fn enum_type<I, S>(mut self, name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.types.push(ExtendedType::Enum(EnumType {
            name: name.into(),
            values: values.into_iter().map(Into::into).collect(),
        }));
        self
    }

    pub fn object(mut self, object: ObjectType) -> Self {
        self.types.push(ExtendedType::Object(object));
        self
    }

    pub fn union_type(mut self, union_: UnionType) -> Self {
        self.types.push(ExtendedType::Union(union_));
        self
    }

    /// Declares which services resolve `type_name.field_name`.
    pub fn resolve(
        mut self,
        type_name: impl Into<String>,
        field_name: impl Into<String>,
        ownership: FieldOwnership,
    ) -> Self {
        self.ownership
            .push((type_name.into(), field_name.into(), ownership));
        self
    }

    /// Declares the same ownership for several fields of one type.
    pub fn resolve_fields<I, S>(
        mut self,
        type_name: impl Into<String>,
        field_names: I,
        ownership: FieldOwnership,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let type_name = type_name.into();
        for field_name in field_names {
            self.ownership
                .push((type_name.clone(), field_name.into(), ownership.clone()));
        }
        self
    }

    pub fn build(self) -> Result<Schema, SchemaError> {
        let mut types = IndexMap::with_capacity(self.types.len());
        for ty in self.types {
            let name = ty.name().to_owned();
            if types.insert(name.clone(), ty).is_some() {
                return Err(SchemaError::DuplicateType(name));
            }
        }

        for ty in types.values() {
            match ty {
                ExtendedType::Object(object) => {
                    for field in object.fields.values() {
                        let referenced = field.ty.inner_named_type();
                        if !types.contains_key(referenced) {
                            return Err(SchemaError::UndefinedType {
                                type_name: object.name.clone(),
                                field_name: field.name.clone(),
                                referenced: referenced.to_owned(),
                            });
                        }
                    }
                }
                ExtendedType::Union(union_) => {
                    for member in &union_.members {
                        if !matches!(types.get(member), Some(ExtendedType::Object(_))) {
                            return Err(SchemaError::InvalidUnionMember {
                                union_name: union_.name.clone(),
                                member: member.clone(),
                            });
                        }
                    }
                }
                ExtendedType::Scalar(_) | ExtendedType::Enum(_) => {}
            }
        }

        let query_type = self.query_type.ok_or(SchemaError::MissingQueryType)?;
        for root in std::iter::once(&query_type).chain(self.mutation_type.as_ref()) {
            if !matches!(types.get(root), Some(ExtendedType::Object(_))) {
                return Err(SchemaError::RootTypeNotObject(root.clone()));
            }
        }

        let mut ownership: IndexMap<String, IndexMap<String, FieldOwnership>> = IndexMap::new();
        for (type_name, field_name, mut field_ownership) in self.ownership {
            let declared = match types.get(&type_name) {
                Some(ExtendedType::Object(object)) => object.fields.contains_key(&field_name),
                _ => false,
            };
            if !declared {
                return Err(SchemaError::UndefinedField {
                    type_name,
                    field_name,
                });
            }
            if let Some(reserved) = field_ownership
                .eligible_services
                .iter()
                .chain(std::iter::once(&field_ownership.home_service))
                .find(|service| service.as_str() == ROOT_SERVICE_NAME)
            {
                return Err(SchemaError::ReservedServiceName(reserved.clone()));
            }
            // The home service is where unresolvable selections move, so it must resolve them.
            let home_service = field_ownership.home_service.clone();
            field_ownership.eligible_services.insert(home_service);
            ownership
                .entry(type_name)
                .or_default()
                .insert(field_name, field_ownership);
        }

        debug!(
            types = types.len(),
            owned_types = ownership.len(),
            "built federated schema"
        );
        Ok(Schema {
            types,
            query_type,
            mutation_type: self.mutation_type,
            ownership,
        })
    }
}
