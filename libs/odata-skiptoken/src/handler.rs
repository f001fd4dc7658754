//! Per-request skip token handler.
//!
//! A handler is created fresh for each request (or taken from a pool and `reset`). The
//! incoming `$skiptoken` is decoded once with `set_token`; afterwards the handler is
//! read-only and can filter any number of queries with `apply_to`. On the way out,
//! `generate_next_page_link` asks the value generator for the token of the last entity of
//! the page and rewrites the request URI around it.

use std::sync::Arc;

use url::Url;

use crate::codec::{PropertyValueMap, QueryContext, SkipTokenCodec};
use crate::config::{QuerySettings, SkipTokenConfig};
use crate::entity::EntityInstance;
use crate::generator::{DefaultSkipTokenValueGenerator, SkipTokenValueGenerator};
use crate::model::EdmModel;
use crate::next_link::next_page_link;
use crate::order::OrderByNode;
use crate::predicate::apply_skip_token;
use crate::query::Queryable;
use crate::Error;

/// Ordering of an expanded navigation property being serialized.
#[derive(Clone, Debug, Default)]
pub struct ExpandedNavigation {
    pub order_by: Option<Vec<OrderByNode>>,
}

/// What the serializer knows about the page being written.
#[derive(Clone, Debug)]
pub struct SerializerContext {
    model: Arc<EdmModel>,
    order_by: Option<Vec<OrderByNode>>,
    expanded: Option<ExpandedNavigation>,
}

impl SerializerContext {
    pub fn new(model: Arc<EdmModel>) -> Self {
        Self {
            model,
            order_by: None,
            expanded: None,
        }
    }

    #[must_use]
    pub fn with_order_by(mut self, order_by: Vec<OrderByNode>) -> Self {
        self.order_by = Some(order_by);
        self
    }

    /// Serialize an expanded item; its ordering replaces the top-level one.
    #[must_use]
    pub fn expanded(mut self, navigation: ExpandedNavigation) -> Self {
        self.expanded = Some(navigation);
        self
    }

    #[must_use]
    pub fn model(&self) -> &EdmModel {
        &self.model
    }

    /// Ordering that applies to the page being written.
    #[must_use]
    pub fn effective_order_by(&self) -> Option<&[OrderByNode]> {
        match &self.expanded {
            Some(nav) => nav.order_by.as_deref(),
            None => self.order_by.as_deref(),
        }
    }
}

#[derive(Clone, Debug, Default)]
enum TokenState {
    #[default]
    Fresh,
    Seeded {
        raw: String,
        values: PropertyValueMap,
    },
}

pub struct SkipTokenHandler {
    codec: SkipTokenCodec,
    generator: Arc<dyn SkipTokenValueGenerator>,
    state: TokenState,
}

impl SkipTokenHandler {
    /// Handler with default delimiters and the default value generator.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self {
            codec: SkipTokenCodec::default(),
            generator: Arc::new(DefaultSkipTokenValueGenerator::default()),
            state: TokenState::Fresh,
        }
    }

    /// # Errors
    /// Returns `Error::InvalidConfig` if the delimiters do not validate.
    pub fn new(config: SkipTokenConfig) -> Result<Self, Error> {
        let generator = Arc::new(DefaultSkipTokenValueGenerator::new(config)?);
        Self::with_generator(config, generator)
    }

    /// Handler using a custom value generator.
    ///
    /// # Errors
    /// Returns `Error::InvalidConfig` if the delimiters do not validate, or if the generator
    /// writes tokens with different delimiters than `config`.
    pub fn with_generator(
        config: SkipTokenConfig,
        generator: Arc<dyn SkipTokenValueGenerator>,
    ) -> Result<Self, Error> {
        if let Some(written) = generator.config().filter(|c| **c != config) {
            return Err(Error::InvalidConfig(format!(
                "generator writes '{}'/'{}' delimited tokens, handler decodes '{}'/'{}'",
                written.field_delimiter,
                written.property_delimiter,
                config.field_delimiter,
                config.property_delimiter
            )));
        }
        Ok(Self {
            codec: SkipTokenCodec::new(config)?,
            generator,
            state: TokenState::Fresh,
        })
    }

    /// Decode `raw` without changing the handler state.
    ///
    /// The generator gets the first look so that it can recognise its own token shapes.
    ///
    /// # Errors
    /// Same as `SkipTokenCodec::decode`.
    pub fn decode(&self, raw: &str, ctx: &QueryContext) -> Result<PropertyValueMap, Error> {
        if ctx.element_type().is_none() {
            return Err(Error::ContextUnbound);
        }
        match self.generator.decode_opaque(raw, ctx) {
            Some(values) => Ok(values),
            None => self.codec.decode(raw, ctx),
        }
    }

    /// Seed the handler from the request's `$skiptoken`.
    ///
    /// A token that decodes to no fields leaves the handler fresh, so `apply_to` is a no-op.
    ///
    /// # Errors
    /// - `Error::TokenAlreadySet` if the handler was already seeded
    /// - any decoding error, in which case the handler stays fresh
    pub fn set_token(&mut self, raw: &str, ctx: &QueryContext) -> Result<(), Error> {
        if self.is_seeded() {
            return Err(Error::TokenAlreadySet);
        }

        let values = self.decode(raw, ctx)?;
        if values.is_empty() {
            tracing::warn!(token = raw, "Skip token has no usable fields; ignoring it");
            return Ok(());
        }

        tracing::debug!(
            token = raw,
            fields = values.len(),
            element_type = ctx.element_type().unwrap_or_default(),
            "Skip token decoded"
        );
        self.state = TokenState::Seeded {
            raw: raw.to_owned(),
            values,
        };
        Ok(())
    }

    /// Raw token text, if seeded.
    #[must_use]
    pub fn value(&self) -> Option<&str> {
        match &self.state {
            TokenState::Seeded { raw, .. } => Some(raw),
            TokenState::Fresh => None,
        }
    }

    /// Decoded mapping, if seeded.
    #[must_use]
    pub fn property_values(&self) -> Option<&PropertyValueMap> {
        match &self.state {
            TokenState::Seeded { values, .. } => Some(values),
            TokenState::Fresh => None,
        }
    }

    #[must_use]
    pub fn is_seeded(&self) -> bool {
        matches!(self.state, TokenState::Seeded { .. })
    }

    /// Return the handler to its fresh state for reuse on another request.
    pub fn reset(&mut self) {
        self.state = TokenState::Fresh;
    }

    /// Restrict `query` to entities after the token position.
    ///
    /// A fresh handler returns the query unchanged.
    ///
    /// # Errors
    /// - `Error::NotSupported` if the query has no static element type
    /// - any error the query reports while installing the filter
    pub fn apply_to<Q: Queryable>(
        &self,
        query: Q,
        order_by: &[OrderByNode],
        settings: &QuerySettings,
    ) -> Result<Q, Error> {
        if query.element_type().is_none() {
            return Err(Error::NotSupported {
                operation: "apply_to",
            });
        }
        match &self.state {
            TokenState::Seeded { values, .. } => {
                apply_skip_token(query, values, order_by, settings)
            }
            TokenState::Fresh => Ok(query),
        }
    }

    /// Link to the page after the one ending at `last`.
    ///
    /// `None` when there is no last entity, the page came back short, `$top` is used up,
    /// or the generator produced no token for the entity.
    #[must_use]
    pub fn generate_next_page_link(
        &self,
        base_uri: &Url,
        page_size: usize,
        page_len: usize,
        last: Option<&EntityInstance<'_>>,
        ctx: &SerializerContext,
    ) -> Option<Url> {
        let last = last?;
        if page_len < page_size {
            return None;
        }

        let token = self.generator.generate_skip_token_value(
            last,
            ctx.model(),
            ctx.effective_order_by(),
        );
        if token.is_empty() {
            tracing::debug!(entity = ?last, "No skip token for last entity; no next page");
            return None;
        }

        next_page_link(base_uri, page_size, &token)
    }
}

impl Default for SkipTokenHandler {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl std::fmt::Debug for SkipTokenHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SkipTokenHandler")
            .field("codec", &self.codec)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
