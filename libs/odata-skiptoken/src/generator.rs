//! Skip token value generator strategies.
//!
//! A generator decides which properties of the last entity go into the token and how the
//! token looks. The handler holds one behind an `Arc<dyn SkipTokenValueGenerator>`, so a
//! service can replace the policy without touching decoding or predicate construction.
//!
//! A generator that emits tokens outside the default grammar must also recognise them on
//! the way back in `decode_opaque`; the handler consults it before the generic decoder.
//! A generator that emits the default grammar reports its delimiters through `config` so
//! the handler can refuse to decode with different ones.

use bigdecimal::ToPrimitive;

use crate::ast::Value;
use crate::codec::{PropertyValueMap, QueryContext, SkipTokenCodec};
use crate::config::SkipTokenConfig;
use crate::entity::EntityInstance;
use crate::model::{EdmModel, EntityType};
use crate::order::OrderByNode;
use crate::Error;

pub trait SkipTokenValueGenerator: Send + Sync {
    /// Token for the page ending at `last`. Empty when the page is not resumable.
    fn generate_skip_token_value(
        &self,
        last: &EntityInstance<'_>,
        model: &EdmModel,
        order_by: Option<&[OrderByNode]>,
    ) -> String;

    /// Decode a raw token of a generator-specific shape. `None` falls back to the grammar.
    fn decode_opaque(&self, _raw: &str, _ctx: &QueryContext) -> Option<PropertyValueMap> {
        None
    }

    /// Delimiters of the grammar tokens are written in, if the generator uses it.
    fn config(&self) -> Option<&SkipTokenConfig> {
        None
    }
}

/// Order-by properties followed by key properties, in the default grammar.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultSkipTokenValueGenerator {
    codec: SkipTokenCodec,
}

impl DefaultSkipTokenValueGenerator {
    /// # Errors
    /// Returns `Error::InvalidConfig` if the delimiters do not validate.
    pub fn new(config: SkipTokenConfig) -> Result<Self, Error> {
        Ok(Self {
            codec: SkipTokenCodec::new(config)?,
        })
    }

    #[must_use]
    pub fn codec(&self) -> &SkipTokenCodec {
        &self.codec
    }

    /// Properties recorded in the token, or `None` if ordering targets a dynamic property.
    ///
    /// Order-by properties come first (duplicates dropped), then every key property not
    /// already listed, so the selection always identifies a single entity.
    #[must_use]
    pub fn properties_for_skip_token<'a>(
        entity: &'a EntityType,
        order_by: Option<&'a [OrderByNode]>,
    ) -> Option<Vec<&'a str>> {
        let order_by = order_by.unwrap_or_default();
        if order_by.iter().any(OrderByNode::is_open) {
            return None;
        }

        let mut names: Vec<&str> = Vec::with_capacity(order_by.len() + 1);
        let keys = entity.key_properties().map(|p| p.name.as_str());
        for name in order_by.iter().map(OrderByNode::name).chain(keys) {
            if !names.contains(&name) {
                names.push(name);
            }
        }
        Some(names)
    }
}

impl SkipTokenValueGenerator for DefaultSkipTokenValueGenerator {
    fn generate_skip_token_value(
        &self,
        last: &EntityInstance<'_>,
        model: &EdmModel,
        order_by: Option<&[OrderByNode]>,
    ) -> String {
        let Some(entity_type) = model.resolve_entity_type(last.type_name()) else {
            tracing::debug!(
                type_name = last.type_name(),
                "No entity type for last entity; skip token not generated"
            );
            return String::new();
        };
        let Some(properties) = Self::properties_for_skip_token(entity_type, order_by) else {
            tracing::debug!(
                entity = %entity_type.full_name(),
                "Ordering on a dynamic property; skip token not generated"
            );
            return String::new();
        };
        self.codec.encode(last, &properties)
    }

    fn config(&self) -> Option<&SkipTokenConfig> {
        Some(self.codec().config())
    }
}

/// Replaces the token of one entity type with a bare integer surrogate key.
///
/// The token for that type is just the surrogate value (`42`); decoding recognises an
/// all-integer token for the same element type and yields `{surrogate: 42}`, which the
/// predicate builder turns into `surrogate gt 42`. Every other entity type goes through the
/// fallback generator, which must share the handler's delimiters.
#[derive(Clone, Debug)]
pub struct SurrogateKeyValueGenerator {
    entity_type: String,
    property: String,
    fallback: DefaultSkipTokenValueGenerator,
}

impl SurrogateKeyValueGenerator {
    pub fn new(entity_type: impl Into<String>, property: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            property: property.into(),
            fallback: DefaultSkipTokenValueGenerator::default(),
        }
    }

    /// Fallback for non-target types, typically built from the handler's configuration.
    #[must_use]
    pub fn with_fallback(mut self, fallback: DefaultSkipTokenValueGenerator) -> Self {
        self.fallback = fallback;
        self
    }

    fn targets(&self, model: &EdmModel, type_name: &str) -> bool {
        model
            .resolve_edm_type(type_name)
            .is_some_and(|t| t.full_name() == self.entity_type)
    }

    fn surrogate_of(&self, last: &EntityInstance<'_>) -> Option<i64> {
        match last.property_value(&self.property) {
            Value::Number(n) if n.is_integer() => n.to_i64(),
            _ => None,
        }
    }
}

impl SkipTokenValueGenerator for SurrogateKeyValueGenerator {
    fn generate_skip_token_value(
        &self,
        last: &EntityInstance<'_>,
        model: &EdmModel,
        order_by: Option<&[OrderByNode]>,
    ) -> String {
        if self.targets(model, last.type_name()) {
            if let Some(id) = self.surrogate_of(last) {
                return id.to_string();
            }
            tracing::debug!(
                property = %self.property,
                "Surrogate key missing or not an integer; using default skip token"
            );
        }
        self.fallback.generate_skip_token_value(last, model, order_by)
    }

    fn decode_opaque(&self, raw: &str, ctx: &QueryContext) -> Option<PropertyValueMap> {
        let element_type = ctx.element_type()?;
        if !self.targets(ctx.model(), element_type) {
            return None;
        }
        let id = raw.parse::<i64>().ok()?;
        let mut values = PropertyValueMap::new();
        values.insert(self.property.clone(), Value::from(id));
        Some(values)
    }

    fn config(&self) -> Option<&SkipTokenConfig> {
        self.fallback.config()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::entity::{ODataEntity, StructuredObject};
    use crate::model::{EnumType, FieldKind};
    use crate::order::SortDir;
    use std::sync::Arc;

    struct Movie {
        id: i64,
        hidden_id: i64,
        title: &'static str,
    }

    impl ODataEntity for Movie {
        fn property_value(&self, name: &str) -> Option<Value> {
            match name {
                "id" => Some(self.id.into()),
                "hidden_id" => Some(self.hidden_id.into()),
                "title" => Some(self.title.into()),
                _ => None,
            }
        }
    }

    fn model() -> EdmModel {
        EdmModel::new()
            .enumeration(EnumType::new("Media", "Genre").member("Drama", 1))
            .entity(
                EntityType::new("Media", "Movie")
                    .key("id", FieldKind::I64)
                    .property("hidden_id", FieldKind::I64)
                    .property("title", FieldKind::String),
            )
            .entity(
                EntityType::new("Media", "Rating")
                    .key("movie", FieldKind::I64)
                    .key("user", FieldKind::I64)
                    .property("stars", FieldKind::I64),
            )
            .bind::<Movie>("Media.Movie")
    }

    fn movie() -> Movie {
        Movie {
            id: 3,
            hidden_id: 300,
            title: "Heat",
        }
    }

    #[test]
    fn test_key_only_without_ordering() {
        let model = model();
        let m = movie();
        let token = DefaultSkipTokenValueGenerator::default().generate_skip_token_value(
            &EntityInstance::typed(&m),
            &model,
            None,
        );
        assert_eq!(token, "id:3");
    }

    #[test]
    fn test_order_by_then_missing_keys() {
        let model = model();
        let rating = StructuredObject::new("Media.Rating")
            .with("movie", 1)
            .with("user", 9)
            .with("stars", 4);
        let order = vec![OrderByNode::desc("stars"), OrderByNode::asc("user")];

        let token = DefaultSkipTokenValueGenerator::default().generate_skip_token_value(
            &EntityInstance::from(&rating),
            &model,
            Some(&order),
        );

        assert_eq!(token, "stars:4,user:9,movie:1");
    }

    #[test]
    fn test_duplicate_order_by_listed_once() {
        let entity = EntityType::new("Media", "Movie").key("id", FieldKind::I64);
        let order = vec![
            OrderByNode::asc("title"),
            OrderByNode::desc("title"),
            OrderByNode::asc("id"),
        ];

        let names =
            DefaultSkipTokenValueGenerator::properties_for_skip_token(&entity, Some(&order))
                .unwrap();

        assert_eq!(names, vec!["title", "id"]);
    }

    #[test]
    fn test_open_property_ordering_not_resumable() {
        let model = model();
        let m = movie();
        let order = vec![OrderByNode::OpenProperty {
            name: "mood".to_owned(),
            dir: SortDir::Asc,
        }];

        let token = DefaultSkipTokenValueGenerator::default().generate_skip_token_value(
            &EntityInstance::typed(&m),
            &model,
            Some(&order),
        );

        assert!(token.is_empty());
    }

    #[test]
    fn test_unknown_type_not_resumable() {
        let obj = StructuredObject::new("Media.Unknown").with("id", 1);
        let token = DefaultSkipTokenValueGenerator::default().generate_skip_token_value(
            &EntityInstance::from(&obj),
            &model(),
            None,
        );
        assert!(token.is_empty());
    }

    #[test]
    fn test_surrogate_replaces_token_for_target_type() {
        let model = model();
        let m = movie();
        let generator = SurrogateKeyValueGenerator::new("Media.Movie", "hidden_id");

        let token =
            generator.generate_skip_token_value(&EntityInstance::typed(&m), &model, None);

        assert_eq!(token, "300");
    }

    #[test]
    fn test_surrogate_falls_back_for_other_types() {
        let model = model();
        let rating = StructuredObject::new("Media.Rating")
            .with("movie", 1)
            .with("user", 2);
        let generator = SurrogateKeyValueGenerator::new("Media.Movie", "hidden_id");

        let token =
            generator.generate_skip_token_value(&EntityInstance::from(&rating), &model, None);

        assert_eq!(token, "movie:1,user:2");
    }

    #[test]
    fn test_surrogate_fallback_uses_configured_delimiters() {
        let model = model();
        let rating = StructuredObject::new("Media.Rating")
            .with("movie", 1)
            .with("user", 2);
        let config = SkipTokenConfig::new(';', '=').unwrap();
        let fallback = DefaultSkipTokenValueGenerator::new(config).unwrap();
        let generator =
            SurrogateKeyValueGenerator::new("Media.Movie", "hidden_id").with_fallback(fallback);

        let token =
            generator.generate_skip_token_value(&EntityInstance::from(&rating), &model, None);

        assert_eq!(token, "movie=1;user=2");
        assert_eq!(generator.config(), Some(&config));
        assert_eq!(fallback.codec().config(), &config);
    }

    #[test]
    fn test_surrogate_decode_only_for_target_element_type() {
        let model = Arc::new(model());
        let generator = SurrogateKeyValueGenerator::new("Media.Movie", "hidden_id");

        let movies = QueryContext::new(model.clone(), "Media.Movie");
        let values = generator.decode_opaque("300", &movies).unwrap();
        assert_eq!(values["hidden_id"], Value::from(300));

        assert!(generator.decode_opaque("id:3", &movies).is_none());

        let ratings = QueryContext::new(model, "Media.Rating");
        assert!(generator.decode_opaque("300", &ratings).is_none());
    }
}
