#![allow(dead_code)]

use std::{convert::Infallible, sync::Arc};

use recipe_api::{
    form::RecipeChanges,
    jwt::{generate_jwt_session, SessionKeys},
    media::MediaStorage,
    memory::MemoryStore,
    routes::{routes, AppState},
    schema::{AssociationKind, NamedEntity, NewUser, RecipeDetail, RecipeFilter, User, Uuid},
    store::Store,
};
use bytes::Bytes;
use serde_json::Value;
use tempfile::TempDir;
use warp::{http::Response, test::RequestBuilder, Filter, Reply};

pub const PASSWORD: &str = "testpass123";

/// A full API over a fresh in-memory store and a throwaway media root.
pub struct TestApp {
    pub store: Arc<MemoryStore>,
    pub keys: SessionKeys,
    pub media: TempDir,
    state: AppState,
}

impl TestApp {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let keys = SessionKeys::new(b"test-secret", 1).unwrap();
        let media = tempfile::tempdir().unwrap();
        let state = AppState::new(store.clone(), keys.clone(), MediaStorage::new(media.path()));

        Self {
            store,
            keys,
            media,
            state,
        }
    }

    pub fn api(&self) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone + 'static {
        routes(self.state.clone())
    }

    /// Inserts a user directly; the password hash is a placeholder, use the
    /// user API when a login is needed.
    pub async fn user(&self, email: &str) -> (User, String) {
        let user = self
            .store
            .create_user(NewUser {
                email: email.to_string(),
                name: String::from("Test User"),
                password: String::from("unusable"),
                is_staff: false,
            })
            .await
            .unwrap()
            .unwrap();
        let token = generate_jwt_session(&user, &self.keys).unwrap();

        (user, token)
    }

    pub async fn named(&self, user: &User, kind: AssociationKind, name: &str) -> NamedEntity {
        self.store.create_named(user.id, kind, name).await.unwrap()
    }

    pub async fn recipe(&self, user: &User, title: &str) -> RecipeDetail {
        self.recipe_with(user, title, &[], &[]).await
    }

    pub async fn recipe_with(
        &self,
        user: &User,
        title: &str,
        tags: &[&str],
        ingredients: &[&str],
    ) -> RecipeDetail {
        let changes = RecipeChanges {
            title: Some(title.to_string()),
            time_minutes: Some(22),
            price: Some(5.25),
            description: Some(String::from("Sample recipe description.")),
            link: Some(String::from("http://example.com/recipe.pdf")),
            tags: Some(tags.iter().map(|t| t.to_string()).collect()),
            ingredients: Some(ingredients.iter().map(|i| i.to_string()).collect()),
        };

        self.store.create_recipe(user.id, changes).await.unwrap()
    }

    pub async fn store_recipe(&self, owner: Uuid, id: Uuid) -> RecipeDetail {
        self.store.get_recipe(owner, id).await.unwrap().unwrap()
    }

    pub async fn list(&self, owner: Uuid) -> Vec<RecipeDetail> {
        self.store
            .list_recipes(owner, &RecipeFilter::default())
            .await
            .unwrap()
    }

    pub async fn named_list(&self, owner: Uuid, kind: AssociationKind) -> Vec<NamedEntity> {
        self.store.list_named(owner, kind, false).await.unwrap()
    }

    pub async fn send(&self, request: RequestBuilder) -> Response<Bytes> {
        request.reply(&self.api()).await
    }
}

pub fn authed(method: &str, path: &str, token: &str) -> RequestBuilder {
    warp::test::request()
        .method(method)
        .path(path)
        .header("authorization", format!("Bearer {token}"))
}

pub fn json(res: &Response<Bytes>) -> Value {
    serde_json::from_slice(res.body()).unwrap()
}

pub fn names(value: &Value) -> Vec<String> {
    let mut names: Vec<String> = value
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v["name"].as_str().unwrap().to_string())
        .collect();
    names.sort();
    names
}
