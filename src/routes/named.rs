use std::convert::Infallible;

use warp::{http::StatusCode, Filter, Rejection, Reply};

use super::{request_body, with_state, AppState};
use crate::{
    authentication::{jwt::SessionData, middleware::with_session},
    database::{
        error::HtmlError,
        form::{NameWrite, NamedQuery},
        schema::{AssociationKind, Uuid},
    },
};

fn with_kind(kind: AssociationKind) -> impl Filter<Extract = (AssociationKind,), Error = Infallible> + Clone {
    warp::any().map(move || kind)
}

/// CRUD for one association kind under `/api/recipe/<table>/`.
pub fn routes(
    state: AppState,
    kind: AssociationKind,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let base = warp::path("api")
        .and(warp::path("recipe"))
        .and(warp::path(kind.table()));
    let collection = base.clone().and(warp::path::end());
    let detail = base.and(warp::path::param::<Uuid>()).and(warp::path::end());

    let list = collection
        .clone()
        .and(warp::get())
        .and(with_session(state.keys.clone()))
        .and(warp::query::<NamedQuery>())
        .and(with_kind(kind))
        .and(with_state(state.clone()))
        .and_then(list_named);

    let create = collection
        .clone()
        .and(warp::post())
        .and(with_session(state.keys.clone()))
        .and(request_body())
        .and(with_kind(kind))
        .and(with_state(state.clone()))
        .and_then(create_named);

    let get = detail
        .clone()
        .and(warp::get())
        .and(with_session(state.keys.clone()))
        .and(with_kind(kind))
        .and(with_state(state.clone()))
        .and_then(get_named);

    let put = detail
        .clone()
        .and(warp::put())
        .and(with_session(state.keys.clone()))
        .and(request_body())
        .and(with_kind(kind))
        .and(with_state(state.clone()))
        .and_then(
            |id: Uuid, session: SessionData, body: NameWrite, kind: AssociationKind, state: AppState| {
                update_named(id, session, body, kind, state, false)
            },
        );

    let patch = detail
        .clone()
        .and(warp::patch())
        .and(with_session(state.keys.clone()))
        .and(request_body())
        .and(with_kind(kind))
        .and(with_state(state.clone()))
        .and_then(
            |id: Uuid, session: SessionData, body: NameWrite, kind: AssociationKind, state: AppState| {
                update_named(id, session, body, kind, state, true)
            },
        );

    let delete = detail
        .clone()
        .and(warp::delete())
        .and(with_session(state.keys.clone()))
        .and(with_kind(kind))
        .and(with_state(state))
        .and_then(delete_named);

    list.or(create).or(get).or(put).or(patch).or(delete)
}

async fn list_named(
    session: SessionData,
    query: NamedQuery,
    kind: AssociationKind,
    state: AppState,
) -> Result<impl Reply, Rejection> {
    let list = state
        .store
        .list_named(session.user_id, kind, query.assigned_only())
        .await?;

    Ok(warp::reply::json(&list))
}

async fn create_named(
    session: SessionData,
    body: NameWrite,
    kind: AssociationKind,
    state: AppState,
) -> Result<impl Reply, Rejection> {
    let name = body
        .validate(false)?
        .ok_or_else(|| HtmlError::InvalidRequest.default())?;
    let entity = state.store.create_named(session.user_id, kind, &name).await?;

    Ok(warp::reply::with_status(
        warp::reply::json(&entity),
        StatusCode::CREATED,
    ))
}

async fn get_named(
    id: Uuid,
    session: SessionData,
    kind: AssociationKind,
    state: AppState,
) -> Result<impl Reply, Rejection> {
    let entity = state
        .store
        .get_named(session.user_id, kind, id)
        .await?
        .ok_or_else(|| HtmlError::NotFound.default())?;

    Ok(warp::reply::json(&entity))
}

async fn update_named(
    id: Uuid,
    session: SessionData,
    body: NameWrite,
    kind: AssociationKind,
    state: AppState,
    partial: bool,
) -> Result<impl Reply, Rejection> {
    let entity = match body.validate(partial)? {
        Some(name) => {
            state
                .store
                .rename_named(session.user_id, kind, id, &name)
                .await?
        }
        None => state.store.get_named(session.user_id, kind, id).await?,
    }
    .ok_or_else(|| HtmlError::NotFound.default())?;

    Ok(warp::reply::json(&entity))
}

async fn delete_named(
    id: Uuid,
    session: SessionData,
    kind: AssociationKind,
    state: AppState,
) -> Result<impl Reply, Rejection> {
    if !state.store.delete_named(session.user_id, kind, id).await? {
        return Err(HtmlError::NotFound.default().into());
    }

    log::info!("User {} deleted {} {id}", session.user_id, kind.label());
    Ok(warp::reply::with_status(
        warp::reply(),
        StatusCode::NO_CONTENT,
    ))
}
