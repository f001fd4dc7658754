#![allow(clippy::unwrap_used, clippy::expect_used)]
#![allow(dead_code)]

use std::sync::Arc;

use odata_skiptoken::ast::{EnumValue, Value};
use odata_skiptoken::{
    EdmModel, EntityInstance, EntityType, EnumType, FieldKind, MemoryQuery, ODataEntity,
    OrderByNode, QueryContext, QuerySettings, SerializerContext, SkipTokenHandler,
};
use url::Url;

pub const PERSON: &str = "Default.Person";
pub const MOVIE: &str = "Media.Movie";
pub const PLAYER: &str = "Default.Player";

#[derive(Clone, Debug)]
pub struct Person {
    pub id: i64,
    pub name: &'static str,
    pub age: i64,
}

impl ODataEntity for Person {
    fn property_value(&self, name: &str) -> Option<Value> {
        match name {
            "id" => Some(self.id.into()),
            "name" => Some(self.name.into()),
            "age" => Some(self.age.into()),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub enum Genre {
    Drama = 1,
    Comedy = 2,
}

#[derive(Clone, Debug)]
pub struct Movie {
    pub id: i64,
    pub genre: Genre,
}

impl ODataEntity for Movie {
    fn property_value(&self, name: &str) -> Option<Value> {
        match name {
            "id" => Some(self.id.into()),
            "genre" => {
                let member = match self.genre {
                    Genre::Drama => "Drama",
                    Genre::Comedy => "Comedy",
                };
                Some(EnumValue::new("Media.Genre", member, self.genre as i64).into())
            }
            _ => None,
        }
    }
}

/// Entity with a nullable ordering column.
#[derive(Clone, Debug)]
pub struct Player {
    pub id: i64,
    pub score: Option<i64>,
}

impl ODataEntity for Player {
    fn property_value(&self, name: &str) -> Option<Value> {
        match name {
            "id" => Some(self.id.into()),
            "score" => Some(self.score.into()),
            _ => None,
        }
    }
}

pub fn model() -> Arc<EdmModel> {
    Arc::new(
        EdmModel::new()
            .entity(
                EntityType::new("Default", "Person")
                    .key("id", FieldKind::I64)
                    .property("name", FieldKind::String)
                    .property("age", FieldKind::I64),
            )
            .enumeration(
                EnumType::new("Media", "Genre")
                    .member("Drama", 1)
                    .member("Comedy", 2),
            )
            .entity(
                EntityType::new("Media", "Movie")
                    .key("id", FieldKind::I64)
                    .enum_property("genre", "Media.Genre"),
            )
            .entity(
                EntityType::new("Default", "Player")
                    .key("id", FieldKind::I64)
                    .property("score", FieldKind::I64),
            )
            .bind::<Person>(PERSON)
            .bind::<Movie>(MOVIE)
            .bind::<Player>(PLAYER),
    )
}

pub fn person(id: i64, name: &'static str, age: i64) -> Person {
    Person { id, name, age }
}

/// `$skiptoken` of a request URI, decoded.
pub fn skip_token(url: &Url) -> Option<String> {
    url.query_pairs()
        .find(|(k, _)| k == "$skiptoken")
        .map(|(_, v)| v.into_owned())
}

/// One paged collection endpoint.
pub struct Endpoint {
    pub model: Arc<EdmModel>,
    pub element_type: &'static str,
    pub order: Vec<OrderByNode>,
    pub page_size: usize,
    pub settings: QuerySettings,
}

impl Endpoint {
    pub fn new(element_type: &'static str, order: Vec<OrderByNode>, page_size: usize) -> Self {
        Self {
            model: model(),
            element_type,
            order,
            page_size,
            settings: QuerySettings::default(),
        }
    }

    /// Serve one request: seed the handler from the URI, filter, page, and link onward.
    pub fn serve<T: ODataEntity>(
        &self,
        handler: &mut SkipTokenHandler,
        rows: Vec<T>,
        request: &Url,
        id_of: fn(&T) -> i64,
    ) -> (Vec<i64>, Option<Url>) {
        let ctx = QueryContext::new(self.model.clone(), self.element_type);
        if let Some(token) = skip_token(request) {
            handler.set_token(&token, &ctx).unwrap();
        }

        let query = handler
            .apply_to(
                MemoryQuery::new(rows).order_by(&self.order),
                &self.order,
                &self.settings,
            )
            .unwrap();
        let page = query.page(self.page_size).unwrap();

        let ids = page.iter().map(|row| id_of(row)).collect();
        let last = page.last().map(|row| EntityInstance::typed(*row));
        let serializer =
            SerializerContext::new(self.model.clone()).with_order_by(self.order.clone());
        let next = handler.generate_next_page_link(
            request,
            self.page_size,
            page.len(),
            last.as_ref(),
            &serializer,
        );
        (ids, next)
    }

    /// Follow next links from `first` until none is returned.
    pub fn walk<T: ODataEntity + Clone>(
        &self,
        handler: &mut SkipTokenHandler,
        rows: &[T],
        first: &Url,
        id_of: fn(&T) -> i64,
    ) -> Vec<Vec<i64>> {
        let mut pages = Vec::new();
        let mut request = Some(first.clone());
        while let Some(url) = request.take() {
            assert!(pages.len() < 32, "pagination did not terminate");
            handler.reset();
            let (ids, next) = self.serve(handler, rows.to_vec(), &url, id_of);
            pages.push(ids);
            request = next;
        }
        pages
    }
}
