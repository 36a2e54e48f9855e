//! Single binary web server: JSON API over the tournament coordinator.
//! Run with: cargo run --bin web
//! Listens on 0.0.0.0:8080 by default.
//! Override with env: HOST, PORT, LOCK_TIMEOUT_MS.

use actix_web::{
    delete, get, post,
    web::{Data, Json, Path},
    App, HttpResponse, HttpServer, Responder,
};
use kendo_tournament::{
    config::ServerConfig, roster, ErrorKind, MatchId, MatchSpec, PlayerColor, PlayerId,
    PointType, TournamentCoordinator, TournamentError, TournamentId, TournamentResult,
    TournamentSpec,
};
use serde::{Deserialize, Serialize};

type AppState = Data<TournamentCoordinator>;

#[derive(Serialize)]
struct HealthResponse {
    ok: bool,
    service: &'static str,
}

#[derive(Deserialize)]
struct AddPointBody {
    #[serde(rename = "type")]
    point_type: PointType,
    color: PlayerColor,
}

#[derive(Deserialize)]
struct AddPlayerBody {
    player_id: PlayerId,
}

/// Path segment: match id (e.g. /api/matches/{id})
#[derive(Deserialize)]
struct MatchPath {
    id: MatchId,
}

/// Path segment: tournament id (e.g. /api/tournaments/{id})
#[derive(Deserialize)]
struct TournamentPath {
    id: TournamentId,
}

fn error_response(e: &TournamentError) -> HttpResponse {
    let body = serde_json::json!({ "error": e.to_string(), "kind": e.kind() });
    match e.kind() {
        ErrorKind::NotFound => HttpResponse::NotFound().json(body),
        ErrorKind::BadRequest => HttpResponse::BadRequest().json(body),
        ErrorKind::Unavailable => HttpResponse::ServiceUnavailable().json(body),
        ErrorKind::BrokenInvariant | ErrorKind::Internal => {
            log::error!("{}", e);
            HttpResponse::InternalServerError().json(body)
        }
    }
}

fn respond<T: Serialize>(result: TournamentResult<T>) -> HttpResponse {
    match result {
        Ok(value) => HttpResponse::Ok().json(value),
        Err(e) => error_response(&e),
    }
}

#[get("/api/health")]
async fn api_health() -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        ok: true,
        service: "kendo-tournament",
    })
}

/// Create a match (standalone, or appended to a tournament's schedule).
#[post("/api/matches")]
async fn api_create_match(state: AppState, body: Json<MatchSpec>) -> HttpResponse {
    respond(state.create_match(body.into_inner()).await)
}

#[get("/api/matches/{id}")]
async fn api_get_match(state: AppState, path: Path<MatchPath>) -> HttpResponse {
    respond(state.get_match(path.id).await)
}

#[delete("/api/matches/{id}")]
async fn api_delete_match(state: AppState, path: Path<MatchPath>) -> HttpResponse {
    match state.delete_match(path.id).await {
        Ok(()) => HttpResponse::NoContent().finish(),
        Err(e) => error_response(&e),
    }
}

/// Record a point for the player in the given color.
#[post("/api/matches/{id}/points")]
async fn api_add_point(state: AppState, path: Path<MatchPath>, body: Json<AddPointBody>) -> HttpResponse {
    respond(state.add_point(path.id, body.point_type, body.color).await)
}

#[post("/api/matches/{id}/timer/start")]
async fn api_start_timer(state: AppState, path: Path<MatchPath>) -> HttpResponse {
    respond(state.start_timer(path.id).await)
}

#[post("/api/matches/{id}/timer/stop")]
async fn api_stop_timer(state: AppState, path: Path<MatchPath>) -> HttpResponse {
    respond(state.stop_timer(path.id).await)
}

/// Administrative restart of a match.
#[post("/api/matches/{id}/reset")]
async fn api_reset_match(state: AppState, path: Path<MatchPath>) -> HttpResponse {
    respond(state.reset_match(path.id).await)
}

/// Re-run progression for a finished match (after a logged failure).
#[post("/api/matches/{id}/progress")]
async fn api_retry_progression(state: AppState, path: Path<MatchPath>) -> HttpResponse {
    respond(state.retry_progression(path.id).await)
}

#[post("/api/tournaments")]
async fn api_create_tournament(state: AppState, body: Json<TournamentSpec>) -> HttpResponse {
    respond(state.create_tournament(body.into_inner()).await)
}

#[get("/api/tournaments/{id}")]
async fn api_get_tournament(state: AppState, path: Path<TournamentPath>) -> HttpResponse {
    respond(state.get_tournament(path.id).await)
}

/// Sign up a player (tournament must be in Registration).
#[post("/api/tournaments/{id}/players")]
async fn api_add_player(state: AppState, path: Path<TournamentPath>, body: Json<AddPlayerBody>) -> HttpResponse {
    respond(state.add_player_to_tournament(path.id, body.player_id).await)
}

/// Sign up every player of a CSV roster (`player_id` column).
#[post("/api/tournaments/{id}/players/import")]
async fn api_import_players(state: AppState, path: Path<TournamentPath>, body: String) -> HttpResponse {
    let player_ids = match roster::read_player_ids(body.as_bytes()) {
        Ok(ids) => ids,
        Err(e) => return error_response(&e),
    };
    respond(state.add_players_to_tournament(path.id, &player_ids).await)
}

/// Close registration and schedule the first stage.
#[post("/api/tournaments/{id}/start")]
async fn api_start_tournament(state: AppState, path: Path<TournamentPath>) -> HttpResponse {
    respond(state.start_tournament(path.id).await)
}

#[get("/api/tournaments/{id}/standings")]
async fn api_standings(state: AppState, path: Path<TournamentPath>) -> HttpResponse {
    respond(state.standings(path.id).await)
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = ServerConfig::from_env();
    log::info!("Starting server at http://{}:{}", config.host, config.port);

    let state = Data::new(TournamentCoordinator::with_system_clock(config.coordinator.clone()));

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .service(api_health)
            .service(api_create_match)
            .service(api_get_match)
            .service(api_delete_match)
            .service(api_add_point)
            .service(api_start_timer)
            .service(api_stop_timer)
            .service(api_reset_match)
            .service(api_retry_progression)
            .service(api_create_tournament)
            .service(api_get_tournament)
            .service(api_add_player)
            .service(api_import_players)
            .service(api_start_tournament)
            .service(api_standings)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}
