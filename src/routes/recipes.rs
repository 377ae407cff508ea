use bytes::BufMut;
use futures_util::TryStreamExt;
use warp::{
    http::StatusCode,
    multipart::FormData,
    Filter, Rejection, Reply,
};

use super::{request_body, with_state, AppState};
use crate::{
    authentication::{jwt::SessionData, middleware::with_session},
    constants::MAX_IMAGE_BYTES,
    database::{
        error::{Error, HtmlError, TypeError},
        form::{RecipeQuery, RecipeWrite},
        schema::{RecipeImage, RecipeSummary, Uuid},
    },
};

pub fn routes(state: AppState) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let collection = warp::path!("api" / "recipe" / "recipes");
    let detail = warp::path!("api" / "recipe" / "recipes" / Uuid);

    let list = collection
        .clone()
        .and(warp::get())
        .and(with_session(state.keys.clone()))
        .and(warp::query::<RecipeQuery>())
        .and(with_state(state.clone()))
        .and_then(list_recipes);

    let create = collection
        .clone()
        .and(warp::post())
        .and(with_session(state.keys.clone()))
        .and(request_body())
        .and(with_state(state.clone()))
        .and_then(create_recipe);

    let get = detail
        .clone()
        .and(warp::get())
        .and(with_session(state.keys.clone()))
        .and(with_state(state.clone()))
        .and_then(get_recipe);

    let put = detail
        .clone()
        .and(warp::put())
        .and(with_session(state.keys.clone()))
        .and(request_body())
        .and(with_state(state.clone()))
        .and_then(
            |id: Uuid, session: SessionData, body: RecipeWrite, state: AppState| {
                update_recipe(id, session, body, state, false)
            },
        );

    let patch = detail
        .clone()
        .and(warp::patch())
        .and(with_session(state.keys.clone()))
        .and(request_body())
        .and(with_state(state.clone()))
        .and_then(
            |id: Uuid, session: SessionData, body: RecipeWrite, state: AppState| {
                update_recipe(id, session, body, state, true)
            },
        );

    let delete = detail
        .clone()
        .and(warp::delete())
        .and(with_session(state.keys.clone()))
        .and(with_state(state.clone()))
        .and_then(delete_recipe);

    let upload = warp::path!("api" / "recipe" / "recipes" / Uuid / "upload-image")
        .and(warp::post())
        .and(with_session(state.keys.clone()))
        .and(warp::multipart::form().max_length(MAX_IMAGE_BYTES))
        .and(with_state(state))
        .and_then(upload_image);

    list.or(create)
        .or(get)
        .or(put)
        .or(patch)
        .or(delete)
        .or(upload)
}

async fn list_recipes(
    session: SessionData,
    query: RecipeQuery,
    state: AppState,
) -> Result<impl Reply, Rejection> {
    let filter = query.into_filter()?;

    let list: Vec<RecipeSummary> = state
        .store
        .list_recipes(session.user_id, &filter)
        .await?
        .into_iter()
        .map(RecipeSummary::from)
        .collect();

    Ok(warp::reply::json(&list))
}

async fn create_recipe(
    session: SessionData,
    body: RecipeWrite,
    state: AppState,
) -> Result<impl Reply, Rejection> {
    let changes = body.validate(false)?;
    let detail = state.store.create_recipe(session.user_id, changes).await?;

    Ok(warp::reply::with_status(
        warp::reply::json(&detail),
        StatusCode::CREATED,
    ))
}

async fn get_recipe(id: Uuid, session: SessionData, state: AppState) -> Result<impl Reply, Rejection> {
    let detail = state
        .store
        .get_recipe(session.user_id, id)
        .await?
        .ok_or_else(|| HtmlError::NotFound.default())?;

    Ok(warp::reply::json(&detail))
}

async fn update_recipe(
    id: Uuid,
    session: SessionData,
    body: RecipeWrite,
    state: AppState,
    partial: bool,
) -> Result<impl Reply, Rejection> {
    let changes = body.validate(partial)?;
    let detail = state
        .store
        .update_recipe(session.user_id, id, changes)
        .await?
        .ok_or_else(|| HtmlError::NotFound.default())?;

    Ok(warp::reply::json(&detail))
}

async fn delete_recipe(
    id: Uuid,
    session: SessionData,
    state: AppState,
) -> Result<impl Reply, Rejection> {
    let recipe = state
        .store
        .delete_recipe(session.user_id, id)
        .await?
        .ok_or_else(|| HtmlError::NotFound.default())?;

    if let Some(image) = recipe.image.as_deref() {
        state.media.remove(image).await;
    }

    log::info!("User {} deleted recipe {id}", session.user_id);
    Ok(warp::reply::with_status(
        warp::reply(),
        StatusCode::NO_CONTENT,
    ))
}

/// Reads the `image` part into memory. The form is already capped at
/// [`MAX_IMAGE_BYTES`].
async fn read_image_part(mut form: FormData) -> Result<Vec<u8>, Error> {
    let malformed = |e: warp::Error| {
        log::debug!("Malformed multipart body: {e}");
        HtmlError::InvalidRequest.new("image: Malformed multipart body.")
    };

    while let Some(part) = form.try_next().await.map_err(malformed)? {
        if part.name() != "image" {
            continue;
        }

        let bytes = part
            .stream()
            .try_fold(Vec::new(), |mut acc, buf| async move {
                acc.put(buf);
                Ok(acc)
            })
            .await
            .map_err(malformed)?;

        if bytes.is_empty() {
            return Err(TypeError::field("image", "The submitted file is empty.").into());
        }
        return Ok(bytes);
    }

    Err(TypeError::field("image", "No file was submitted.").into())
}

async fn upload_image(
    id: Uuid,
    session: SessionData,
    form: FormData,
    state: AppState,
) -> Result<impl Reply, Rejection> {
    let previous = state
        .store
        .get_recipe(session.user_id, id)
        .await?
        .ok_or_else(|| HtmlError::NotFound.default())?;

    let bytes = read_image_part(form).await?;
    let url = state.media.save_recipe_image(bytes).await?;

    let recipe = match state
        .store
        .set_recipe_image(session.user_id, id, Some(url.clone()))
        .await
    {
        Ok(Some(r)) => r,
        Ok(None) => {
            state.media.remove(&url).await;
            return Err(HtmlError::NotFound.default().into());
        }
        Err(e) => {
            state.media.remove(&url).await;
            return Err(e.into());
        }
    };

    if let Some(old) = previous.recipe.image.as_deref() {
        state.media.remove(old).await;
    }

    log::info!("Stored image {url} for recipe {id}");
    Ok(warp::reply::json(&RecipeImage::from(recipe)))
}
