//! Skip token wire codec.
//!
//! Grammar (default delimiters):
//!
//! ```text
//! token        := field (',' field)*
//! field        := propertyName ':' valueLiteral
//! valueLiteral := ["'enumType'"] uriLiteral
//! ```
//!
//! Literals are not escaped, so a string value containing the field delimiter does not
//! survive a round trip. Decoding is lenient about malformed fields: a field without a
//! value, with a blank value, or with a blank name is dropped.

use std::sync::Arc;

use indexmap::IndexMap;

use crate::ast::Value;
use crate::config::SkipTokenConfig;
use crate::entity::EntityInstance;
use crate::literal::{from_uri_literal, from_uri_literal_typed, to_uri_literal, ENUM_TYPE_TAG};
use crate::model::{EdmModel, EdmTypeRef};
use crate::Error;

/// Decoded token: property name to value, in token order.
pub type PropertyValueMap = IndexMap<String, Value>;

/// Model and element type a token is decoded against.
#[derive(Clone, Debug)]
pub struct QueryContext {
    model: Arc<EdmModel>,
    element_type: Option<String>,
}

impl QueryContext {
    pub fn new(model: Arc<EdmModel>, element_type: impl Into<String>) -> Self {
        Self {
            model,
            element_type: Some(element_type.into()),
        }
    }

    /// Context of a query whose element type is not statically known.
    pub fn untyped(model: Arc<EdmModel>) -> Self {
        Self {
            model,
            element_type: None,
        }
    }

    #[must_use]
    pub fn model(&self) -> &EdmModel {
        &self.model
    }

    #[must_use]
    pub fn element_type(&self) -> Option<&str> {
        self.element_type.as_deref()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SkipTokenCodec {
    config: SkipTokenConfig,
}

impl SkipTokenCodec {
    /// # Errors
    /// Returns `Error::InvalidConfig` if the delimiters do not validate.
    pub fn new(config: SkipTokenConfig) -> Result<Self, Error> {
        config.validate()?;
        Ok(Self { config })
    }

    #[must_use]
    pub fn config(&self) -> &SkipTokenConfig {
        &self.config
    }

    /// Render `properties` of `entity` as a token. No trailing delimiter.
    #[must_use]
    pub fn encode(&self, entity: &EntityInstance<'_>, properties: &[&str]) -> String {
        let mut out = String::new();
        for (i, name) in properties.iter().enumerate() {
            if i > 0 {
                out.push(self.config.field_delimiter);
            }
            out.push_str(name);
            out.push(self.config.property_delimiter);
            out.push_str(&render_token_value(&entity.property_value(name)));
        }
        out
    }

    /// Parse a raw token into its property/value mapping.
    ///
    /// # Errors
    /// - `Error::ContextUnbound` if the context has no element type
    /// - `Error::UnknownProperty` / `Error::NotAnEnum` for an enum-tagged field that does
    ///   not name an enum property of the element type
    /// - literal errors from the URI literal parsers
    pub fn decode(&self, raw: &str, ctx: &QueryContext) -> Result<PropertyValueMap, Error> {
        let element_type = ctx.element_type().ok_or(Error::ContextUnbound)?;

        let mut values = PropertyValueMap::new();
        for piece in raw.split(self.config.field_delimiter) {
            let Some((name, literal)) = piece.split_once(self.config.property_delimiter) else {
                tracing::debug!(field = piece, "Dropping skip token field without a value");
                continue;
            };
            if literal.trim().is_empty() || name.trim().is_empty() {
                tracing::debug!(field = piece, "Dropping blank skip token field");
                continue;
            }

            let value = match literal.strip_prefix(ENUM_TYPE_TAG) {
                Some(enum_literal) => {
                    parse_enum_field(ctx.model(), element_type, name, enum_literal)?
                }
                None => from_uri_literal(literal)?,
            };
            values.insert(name.to_owned(), value);
        }
        Ok(values)
    }
}

/// Literal of one token field, tagged when the value is an enum member.
#[must_use]
pub fn render_token_value(value: &Value) -> String {
    let literal = to_uri_literal(value);
    if matches!(value, Value::Enum(_)) {
        format!("{ENUM_TYPE_TAG}{literal}")
    } else {
        literal
    }
}

fn parse_enum_field(
    model: &EdmModel,
    element_type: &str,
    property: &str,
    literal: &str,
) -> Result<Value, Error> {
    let ty = model
        .resolve_property_type(element_type, property)
        .ok_or_else(|| Error::UnknownProperty {
            type_name: element_type.to_owned(),
            property: property.to_owned(),
        })?;
    if !matches!(ty, EdmTypeRef::Enum(_)) {
        return Err(Error::NotAnEnum(property.to_owned()));
    }
    from_uri_literal_typed(literal, model, ty)
}
