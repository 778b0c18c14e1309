use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Wisdom Warfare Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::sse::public_stream,
        crate::routes::websocket::ws_handler,
        crate::routes::public::get_session,
        crate::routes::public::list_questions,
        crate::routes::public::submit_answer,
        crate::routes::public::upsert_user,
        crate::routes::game::join_game,
        crate::routes::game::get_game_by_code,
        crate::routes::leaderboard::global,
        crate::routes::leaderboard::by_session,
        crate::routes::leaderboard::by_name,
        crate::routes::admin::add_question,
        crate::routes::admin::import_questions,
        crate::routes::admin::reload_catalog,
        crate::routes::admin::create_game,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::sse::Handshake,
            crate::dto::sse::NewQuestionEvent,
            crate::dto::sse::GameOverEvent,
            crate::dto::ws::ClientInboundMessage,
            crate::dto::ws::SubmitAnswerMessage,
            crate::dto::ws::IdentityInput,
            crate::dto::ws::AnswerResult,
            crate::dto::ws::AnswerOutcome,
            crate::dto::leaderboard::LeaderboardEntry,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "sse", description = "Server-sent events streams"),
        (name = "realtime", description = "WebSocket channel for live answers and broadcasts"),
        (name = "public", description = "Student-facing session, catalog and answer endpoints"),
        (name = "game", description = "Game session lookup and participation"),
        (name = "leaderboard", description = "Global and per-game rankings"),
        (name = "admin", description = "Catalog and game session management"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_route() {
        let doc = ApiDoc::openapi();
        for path in [
            "/healthcheck",
            "/sse/public",
            "/ws",
            "/session",
            "/questions",
            "/answers",
            "/users",
            "/games/join",
            "/games/by-code/{code}",
            "/leaderboard/global",
            "/leaderboard/games/{id}",
            "/leaderboard/games/by-name/{name}",
            "/admin/questions",
            "/admin/questions/bulk",
            "/admin/catalog/reload",
            "/admin/games",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
