//! Read-only type metadata consumed by the skip token codec and predicate builder.
//!
//! The model maps runtime (Rust) type names to EDM types and answers three questions:
//! - which EDM type does a runtime type correspond to (`resolve_edm_type`)
//! - what is the declared type of one of its properties (`resolve_property_type`)
//! - which properties form its key (`EntityType::key_properties`)
//!
//! A model is built once and shared across requests behind an `Arc`.

use std::collections::HashMap;
use std::fmt;

/// Logical primitive types of structural properties.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldKind {
    String,
    I64,
    F64,
    Bool,
    Uuid,
    DateTimeUtc,
    Date,
    Time,
    Decimal,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::String => write!(f, "String"),
            FieldKind::I64 => write!(f, "I64"),
            FieldKind::F64 => write!(f, "F64"),
            FieldKind::Bool => write!(f, "Bool"),
            FieldKind::Uuid => write!(f, "Uuid"),
            FieldKind::DateTimeUtc => write!(f, "DateTimeUtc"),
            FieldKind::Date => write!(f, "Date"),
            FieldKind::Time => write!(f, "Time"),
            FieldKind::Decimal => write!(f, "Decimal"),
        }
    }
}

/// Declared type of a structural property.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EdmTypeRef {
    Primitive(FieldKind),
    /// Qualified name of an enum type in the same model.
    Enum(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PropertyDef {
    pub name: String,
    pub ty: EdmTypeRef,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[must_use]
pub struct EntityType {
    namespace: String,
    name: String,
    key: Vec<String>,
    properties: Vec<PropertyDef>,
    open: bool,
}

impl EntityType {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            key: Vec::new(),
            properties: Vec::new(),
            open: false,
        }
    }

    /// Declare a key property. Key order follows declaration order.
    pub fn key(mut self, name: impl Into<String>, kind: FieldKind) -> Self {
        let name = name.into();
        self.key.push(name.clone());
        self.push_property(name, EdmTypeRef::Primitive(kind));
        self
    }

    pub fn property(mut self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.push_property(name.into(), EdmTypeRef::Primitive(kind));
        self
    }

    pub fn enum_property(mut self, name: impl Into<String>, enum_type: impl Into<String>) -> Self {
        self.push_property(name.into(), EdmTypeRef::Enum(enum_type.into()));
        self
    }

    /// Allow dynamic properties beyond the declared ones.
    pub fn open(mut self) -> Self {
        self.open = true;
        self
    }

    fn push_property(&mut self, name: String, ty: EdmTypeRef) {
        if let Some(existing) = self.properties.iter_mut().find(|p| p.name == name) {
            existing.ty = ty;
        } else {
            self.properties.push(PropertyDef { name, ty });
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{}.{}", self.namespace, self.name)
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Key properties in declaration order.
    pub fn key_properties(&self) -> impl Iterator<Item = &PropertyDef> + '_ {
        self.key.iter().filter_map(|k| self.property_def(k))
    }

    #[must_use]
    pub fn property_def(&self, name: &str) -> Option<&PropertyDef> {
        self.properties.iter().find(|p| p.name == name)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnumMember {
    pub name: String,
    pub value: i64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[must_use]
pub struct EnumType {
    namespace: String,
    name: String,
    members: Vec<EnumMember>,
}

impl EnumType {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            members: Vec::new(),
        }
    }

    pub fn member(mut self, name: impl Into<String>, value: i64) -> Self {
        self.members.push(EnumMember {
            name: name.into(),
            value,
        });
        self
    }

    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{}.{}", self.namespace, self.name)
    }

    #[must_use]
    pub fn find_member(&self, name: &str) -> Option<&EnumMember> {
        self.members.iter().find(|m| m.name == name)
    }

    #[must_use]
    pub fn find_value(&self, value: i64) -> Option<&EnumMember> {
        self.members.iter().find(|m| m.value == value)
    }
}

/// Structured type without a key.
#[derive(Clone, Debug, PartialEq, Eq)]
#[must_use]
pub struct ComplexType {
    namespace: String,
    name: String,
    properties: Vec<PropertyDef>,
}

impl ComplexType {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            properties: Vec::new(),
        }
    }

    pub fn property(mut self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.properties.push(PropertyDef {
            name: name.into(),
            ty: EdmTypeRef::Primitive(kind),
        });
        self
    }

    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{}.{}", self.namespace, self.name)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EdmType {
    Entity(EntityType),
    Complex(ComplexType),
    Enum(EnumType),
}

impl EdmType {
    #[must_use]
    pub fn as_entity(&self) -> Option<&EntityType> {
        match self {
            EdmType::Entity(e) => Some(e),
            _ => None,
        }
    }

    #[must_use]
    pub fn full_name(&self) -> String {
        match self {
            EdmType::Entity(t) => t.full_name(),
            EdmType::Complex(t) => t.full_name(),
            EdmType::Enum(t) => t.full_name(),
        }
    }

    fn property_def(&self, name: &str) -> Option<&PropertyDef> {
        match self {
            EdmType::Entity(t) => t.property_def(name),
            EdmType::Complex(t) => t.properties.iter().find(|p| p.name == name),
            EdmType::Enum(_) => None,
        }
    }
}

/// Type metadata: EDM types by qualified name plus runtime type bindings.
#[derive(Clone, Debug, Default)]
#[must_use]
pub struct EdmModel {
    types: HashMap<String, EdmType>,
    runtime_bindings: HashMap<String, String>,
}

impl EdmModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entity(self, entity: EntityType) -> Self {
        self.with_type(EdmType::Entity(entity))
    }

    pub fn complex(self, complex: ComplexType) -> Self {
        self.with_type(EdmType::Complex(complex))
    }

    pub fn enumeration(self, enum_type: EnumType) -> Self {
        self.with_type(EdmType::Enum(enum_type))
    }

    fn with_type(mut self, ty: EdmType) -> Self {
        self.types.insert(ty.full_name(), ty);
        self
    }

    /// Bind the runtime type `T` to a qualified EDM type name.
    pub fn bind<T: ?Sized>(mut self, edm_type: impl Into<String>) -> Self {
        self.runtime_bindings
            .insert(std::any::type_name::<T>().to_owned(), edm_type.into());
        self
    }

    /// Resolve a runtime type name, or a qualified EDM name, to its EDM type.
    #[must_use]
    pub fn resolve_edm_type(&self, type_name: &str) -> Option<&EdmType> {
        let edm_name = self
            .runtime_bindings
            .get(type_name)
            .map_or(type_name, String::as_str);
        self.types.get(edm_name)
    }

    #[must_use]
    pub fn resolve_entity_type(&self, type_name: &str) -> Option<&EntityType> {
        self.resolve_edm_type(type_name).and_then(EdmType::as_entity)
    }

    /// Declared type of `property` on the type resolved from `type_name`.
    #[must_use]
    pub fn resolve_property_type(&self, type_name: &str, property: &str) -> Option<&EdmTypeRef> {
        self.resolve_edm_type(type_name)
            .and_then(|t| t.property_def(property))
            .map(|p| &p.ty)
    }

    #[must_use]
    pub fn enum_type(&self, full_name: &str) -> Option<&EnumType> {
        match self.types.get(full_name) {
            Some(EdmType::Enum(e)) => Some(e),
            _ => None,
        }
    }
}
