// Route definitions

use std::convert::Infallible;
use warp::Filter;

use crate::handlers::{self, SocketParams};
use crate::models::CredentialsRequest;
use crate::state::AppState;

/// Largest accepted JSON request body
const MAX_BODY_BYTES: u64 = 16 * 1024;

pub fn configure_routes(
    state: AppState,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    let api = warp::path("api");

    // POST /api/register
    let register = api
        .and(warp::path("register"))
        .and(warp::path::end())
        .and(warp::post())
        .and(credentials_body())
        .and(with_state(state.clone()))
        .and_then(handlers::register_handler);

    // POST /api/login
    let login = api
        .and(warp::path("login"))
        .and(warp::path::end())
        .and(warp::post())
        .and(credentials_body())
        .and(with_state(state.clone()))
        .and_then(handlers::login_handler);

    // GET /api/history
    let history = api
        .and(warp::path("history"))
        .and(warp::path::end())
        .and(warp::get())
        .and(warp::header::optional::<String>("authorization"))
        .and(with_state(state.clone()))
        .and_then(handlers::history_handler);

    // GET /health
    let health = warp::path("health")
        .and(warp::path::end())
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(handlers::health_handler);

    // GET /ws?token=...
    let socket = warp::path("ws")
        .and(warp::path::end())
        .and(warp::ws())
        .and(warp::query::<SocketParams>())
        .and(with_state(state))
        .map(|ws: warp::ws::Ws, params: SocketParams, state: AppState| {
            let handler = state.connections.clone();
            ws.on_upgrade(move |socket| handlers::socket_session(socket, params.token, handler))
        });

    let cors = warp::cors()
        .allow_any_origin()
        .allow_methods(["GET", "POST"])
        .allow_headers(["content-type", "authorization"]);

    register
        .or(login)
        .or(history)
        .with(cors)
        .or(health)
        .or(socket)
}

fn with_state(state: AppState) -> impl Filter<Extract = (AppState,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

fn credentials_body() -> impl Filter<Extract = (CredentialsRequest,), Error = warp::Rejection> + Clone
{
    warp::body::content_length_limit(MAX_BODY_BYTES).and(warp::body::json())
}
