pub mod named;
pub mod recipes;
pub mod rejection;
pub mod users;

use std::{convert::Infallible, sync::Arc};

use serde::de::DeserializeOwned;
use serde_json::json;
use warp::{Filter, Rejection, Reply};

use crate::{
    authentication::jwt::SessionKeys,
    constants::MAX_BODY_BYTES,
    database::{schema::AssociationKind, store::Store},
    media::MediaStorage,
};

/// Shared handles every handler receives.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub keys: Arc<SessionKeys>,
    pub media: Arc<MediaStorage>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, keys: SessionKeys, media: MediaStorage) -> Self {
        Self {
            store,
            keys: Arc::new(keys),
            media: Arc::new(media),
        }
    }
}

pub fn with_state(state: AppState) -> impl Filter<Extract = (AppState,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

/// Size-limited body, JSON or urlencoded form.
pub fn request_body<T>() -> impl Filter<Extract = (T,), Error = Rejection> + Clone
where
    T: DeserializeOwned + Send,
{
    warp::body::content_length_limit(MAX_BODY_BYTES)
        .and(warp::body::json().or(warp::body::form()).unify())
}

pub fn health_check() -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    warp::path!("api" / "health-check")
        .and(warp::get())
        .map(|| warp::reply::json(&json!({ "healthy": true })))
}

/// Uploaded files, public.
pub fn static_media(
    media: &MediaStorage,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    warp::path("static")
        .and(warp::path("media"))
        .and(warp::get())
        .and(warp::fs::dir(media.root().to_path_buf()))
}

/// The whole API, rejections rendered as JSON.
pub fn routes(state: AppState) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    health_check()
        .or(users::routes(state.clone()))
        .or(recipes::routes(state.clone()))
        .or(named::routes(state.clone(), AssociationKind::Tag))
        .or(named::routes(state.clone(), AssociationKind::Ingredient))
        .or(static_media(&state.media))
        .recover(rejection::handle_rejection)
}
