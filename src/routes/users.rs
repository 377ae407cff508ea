use serde::Serialize;
use warp::{
    http::{header::SET_COOKIE, StatusCode},
    Filter, Rejection, Reply,
};

use super::{request_body, with_state, AppState};
use crate::{
    authentication::{
        cryptography::{hash_password, verify_password},
        jwt::{generate_jwt_session, SessionData},
        middleware::with_session,
    },
    constants::SESSION_COOKIE,
    database::{
        error::{HtmlError, TypeError},
        form::{normalize_email, Credentials, UserCreate, UserUpdate},
        schema::{NewUser, UserProfile},
    },
};

#[derive(Serialize)]
struct TokenResponse {
    token: String,
}

pub fn routes(state: AppState) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let create = warp::path!("api" / "user" / "create")
        .and(warp::post())
        .and(request_body())
        .and(with_state(state.clone()))
        .and_then(create_user);

    let token = warp::path!("api" / "user" / "token")
        .and(warp::post())
        .and(request_body())
        .and(with_state(state.clone()))
        .and_then(create_token);

    let me = warp::path!("api" / "user" / "me");

    let get_me = me
        .clone()
        .and(warp::get())
        .and(with_session(state.keys.clone()))
        .and(with_state(state.clone()))
        .and_then(get_profile);

    let put_me = me
        .clone()
        .and(warp::put())
        .and(with_session(state.keys.clone()))
        .and(request_body())
        .and(with_state(state.clone()))
        .and_then(|session: SessionData, body: UserUpdate, state: AppState| {
            update_profile(session, body, state, false)
        });

    let patch_me = me
        .clone()
        .and(warp::patch())
        .and(with_session(state.keys.clone()))
        .and(request_body())
        .and(with_state(state))
        .and_then(|session: SessionData, body: UserUpdate, state: AppState| {
            update_profile(session, body, state, true)
        });

    create.or(token).or(get_me).or(put_me).or(patch_me)
}

async fn create_user(body: UserCreate, state: AppState) -> Result<impl Reply, Rejection> {
    let body = body.validate()?;
    let user = NewUser {
        password: hash_password(&body.password)?,
        email: body.email,
        name: body.name,
        is_staff: false,
    };

    let user = state.store.create_user(user).await?.ok_or_else(|| {
        TypeError::field("email", "user with this email already exists.")
    })?;

    log::info!("Registered user {}", user.id);
    Ok(warp::reply::with_status(
        warp::reply::json(&UserProfile::from(user)),
        StatusCode::CREATED,
    ))
}

async fn create_token(body: Credentials, state: AppState) -> Result<impl Reply, Rejection> {
    let invalid = || HtmlError::InvalidRequest.new("Unable to authenticate with provided credentials.");

    let email = normalize_email(&body.email).map_err(|_| invalid())?;
    let user = match state.store.get_user(&email).await? {
        Some(u) if u.is_active && verify_password(&body.password, &u.password) => u,
        _ => return Err(invalid().into()),
    };

    let token = generate_jwt_session(&user, &state.keys)?;
    let cookie = format!(
        "{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        state.keys.lifetime_hours() * 3600
    );

    Ok(warp::reply::with_header(
        warp::reply::json(&TokenResponse { token }),
        SET_COOKIE,
        cookie,
    ))
}

async fn get_profile(session: SessionData, state: AppState) -> Result<impl Reply, Rejection> {
    let user = state
        .store
        .get_user_by_id(session.user_id)
        .await?
        .ok_or_else(|| HtmlError::InvalidSession.default())?;

    Ok(warp::reply::json(&UserProfile::from(user)))
}

async fn update_profile(
    session: SessionData,
    body: UserUpdate,
    state: AppState,
    partial: bool,
) -> Result<impl Reply, Rejection> {
    let mut changes = body.validate(partial)?;
    if let Some(password) = changes.password.take() {
        changes.password = Some(hash_password(&password)?);
    }

    let user = state
        .store
        .update_user(session.user_id, changes)
        .await?
        .ok_or_else(|| HtmlError::InvalidSession.default())?;

    Ok(warp::reply::json(&UserProfile::from(user)))
}
