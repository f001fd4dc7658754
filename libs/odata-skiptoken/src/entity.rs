//! Entity access for token generation.
//!
//! The last entity of a page reaches the generator in one of two shapes:
//! - a structured object (projection or open-type wrapper) that names its own EDM type and
//!   answers property lookups by name
//! - a statically typed entity whose runtime type is bound in the model
//!
//! `EntityInstance` is the sum over both; callers pick the variant once per encode.

use indexmap::IndexMap;

use crate::ast::Value;

/// Statically typed entity with compile-time-known accessors.
pub trait ODataEntity {
    /// Runtime type name used to resolve the EDM type through `EdmModel::bind`.
    fn clr_type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Value of a declared property, `None` when the entity has no such property.
    fn property_value(&self, name: &str) -> Option<Value>;
}

/// Property bag that carries its EDM type name, used for projections and open types.
#[derive(Clone, Debug, Default, PartialEq)]
#[must_use]
pub struct StructuredObject {
    edm_type: String,
    properties: IndexMap<String, Value>,
}

impl StructuredObject {
    pub fn new(edm_type: impl Into<String>) -> Self {
        Self {
            edm_type: edm_type.into(),
            properties: IndexMap::new(),
        }
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn edm_type(&self) -> &str {
        &self.edm_type
    }

    #[must_use]
    pub fn try_get_property_value(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }
}

/// The last entity of a page, in either representation.
#[derive(Clone, Copy)]
pub enum EntityInstance<'a> {
    Structured(&'a StructuredObject),
    Typed(&'a dyn ODataEntity),
}

impl<'a> EntityInstance<'a> {
    pub fn typed<T: ODataEntity>(entity: &'a T) -> Self {
        EntityInstance::Typed(entity)
    }

    /// Name to resolve in the model: an EDM name or a bound runtime type name.
    #[must_use]
    pub fn type_name(&self) -> &str {
        match self {
            EntityInstance::Structured(obj) => obj.edm_type(),
            EntityInstance::Typed(entity) => entity.clr_type_name(),
        }
    }

    /// Property value; absent properties read as `Value::Null`.
    #[must_use]
    pub fn property_value(&self, name: &str) -> Value {
        let value = match self {
            EntityInstance::Structured(obj) => obj.try_get_property_value(name).cloned(),
            EntityInstance::Typed(entity) => entity.property_value(name),
        };
        value.unwrap_or(Value::Null)
    }
}

impl<'a> From<&'a StructuredObject> for EntityInstance<'a> {
    fn from(obj: &'a StructuredObject) -> Self {
        EntityInstance::Structured(obj)
    }
}

impl std::fmt::Debug for EntityInstance<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityInstance::Structured(obj) => f.debug_tuple("Structured").field(obj).finish(),
            EntityInstance::Typed(entity) => f
                .debug_tuple("Typed")
                .field(&entity.clr_type_name())
                .finish(),
        }
    }
}
