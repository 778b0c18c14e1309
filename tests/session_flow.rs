use std::{sync::Arc, time::Duration};

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode},
};
use serde_json::{Value, json};
use tower::ServiceExt;

use wisdom_warfare_back::{
    config::AppConfig,
    dao::quiz_store::memory::InMemoryQuizStore,
    dto::ws::{AnswerOutcome, IdentityInput, SubmitAnswerMessage},
    routes::router,
    services::{answer_service, sequencer},
    state::{AppState, SharedState},
};

async fn app_state() -> SharedState {
    let state = AppState::new(AppConfig::default());
    state
        .install_quiz_store(Arc::new(InMemoryQuizStore::new()))
        .await;
    state
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(value) => {
            request = request.header("content-type", "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(request.body(body).expect("request build should succeed"))
        .await
        .expect("router should respond");

    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body should be readable");
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

fn question(text: &str, correct: &str) -> Value {
    json!({
        "question": text,
        "option_a": "Berlin",
        "option_b": "Paris",
        "option_c": "Rome",
        "option_d": "Madrid",
        "correct": correct,
    })
}

async fn register(app: &Router, uid: &str, name: &str) -> u64 {
    let (status, user) = send(
        app,
        Method::POST,
        "/users",
        Some(json!({ "uid": uid, "display_name": name })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    user["id"].as_u64().expect("user id")
}

#[tokio::test]
async fn healthcheck_reports_store_state() {
    let state = app_state().await;
    let app = router(state.clone());

    let (status, body) = send(&app, Method::GET, "/healthcheck", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["connected_clients"], 0);

    state.clear_quiz_store().await;
    let (_, body) = send(&app, Method::GET, "/healthcheck", None).await;
    assert_eq!(body["status"], "degraded");

    let (status, _) = send(&app, Method::GET, "/questions", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn user_upsert_keeps_the_same_id_for_a_uid() {
    let app = router(app_state().await);

    let first = register(&app, "firebase-42", "Ada").await;
    let again = register(&app, "firebase-42", "Ada L.").await;
    assert_eq!(first, again);

    let (status, _) = send(&app, Method::POST, "/users", Some(json!({ "uid": "   " }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn catalog_administration_and_student_view() {
    let app = router(app_state().await);

    let (status, created) = send(
        &app,
        Method::POST,
        "/admin/questions",
        Some(question("Capital of France?", "B")),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["correct"], "Paris");
    assert_eq!(created["difficulty"], "Medium");

    let (status, _) = send(
        &app,
        Method::POST,
        "/admin/questions",
        Some(question("Capital of France?", "Lyon")),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, report) = send(
        &app,
        Method::POST,
        "/admin/questions/bulk",
        Some(json!({
            "rows": [
                question("Q1", "Paris"),
                question("Q2", "Rome"),
                { "question": "Q3", "option_a": "x" },
                question("Q4", "Berlin"),
                question("Q5", "d"),
            ]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["parsed_rows"], 5);
    assert_eq!(report["inserted"], 4);
    assert_eq!(report["skipped"], 1);
    assert_eq!(report["errors"][0]["row"], 3);

    let (status, _) = send(
        &app,
        Method::POST,
        "/admin/questions/bulk",
        Some(json!({ "rows": [] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, reload) = send(&app, Method::POST, "/admin/catalog/reload", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reload["questions"], 5);

    let (status, questions) = send(&app, Method::GET, "/questions", None).await;
    assert_eq!(status, StatusCode::OK);
    let questions = questions.as_array().expect("question list");
    assert_eq!(questions.len(), 5);
    assert!(questions.iter().all(|q| q.get("correct").is_none()));
    assert_eq!(questions[0]["options"]["B"], "Paris");
}

#[tokio::test]
async fn rest_answers_score_once_per_question() {
    let app = router(app_state().await);
    let user_id = register(&app, "student-1", "Grace").await;
    let (_, created) = send(
        &app,
        Method::POST,
        "/admin/questions",
        Some(question("Capital of Italy?", "Rome")),
    )
    .await;
    let question_id = created["id"].as_u64().expect("question id");

    let answer = json!({ "user_id": user_id, "question_id": question_id, "selected": "Rome" });
    let (status, body) = send(&app, Method::POST, "/answers", Some(answer.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_correct"], true);
    assert_eq!(body["points"], 10);
    assert_eq!(body["performance"]["score"], 10);

    let (status, _) = send(&app, Method::POST, "/answers", Some(answer)).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(
        &app,
        Method::POST,
        "/answers",
        Some(json!({ "user_id": 999, "question_id": question_id, "selected": "Rome" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, board) = send(&app, Method::GET, "/leaderboard/global?limit=5", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(board["players"][0]["user_id"], user_id);
    assert_eq!(board["players"][0]["display_name"], "Grace");
    assert_eq!(board["players"][0]["rank"], 1);
}

#[tokio::test]
async fn games_are_created_looked_up_and_joined() {
    let app = router(app_state().await);
    let teacher = register(&app, "teacher-1", "Mr. T").await;
    let student = register(&app, "student-2", "Linus").await;

    let (status, game) = send(
        &app,
        Method::POST,
        "/admin/games",
        Some(json!({ "name": "Geography", "teacher_id": teacher })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let code = game["code"].as_str().expect("game code").to_string();
    assert_eq!(code.len(), 6);
    let game_id = game["id"].as_u64().expect("game id");

    let (status, found) = send(
        &app,
        Method::GET,
        &format!("/games/by-code/{}", code.to_ascii_lowercase()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(found["id"], game_id);

    let (status, _) = send(&app, Method::GET, "/games/by-code/ZZZZZZ", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, joined) = send(
        &app,
        Method::POST,
        "/games/join",
        Some(json!({ "user_id": student, "code": code })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(joined["participants"], 1);

    let (status, _) = send(
        &app,
        Method::POST,
        "/games/join",
        Some(json!({ "user_id": 4242, "code": code })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, board) = send(
        &app,
        Method::GET,
        &format!("/leaderboard/games/{game_id}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(board["game_name"], "Geography");

    let (status, _) = send(&app, Method::GET, "/leaderboard/games/9999", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn rest_endpoints_accept_external_uids() {
    let app = router(app_state().await);
    let teacher = register(&app, "teacher-uid", "Ms. F").await;
    let student = register(&app, "student-uid", "Alan").await;
    let (_, created) = send(
        &app,
        Method::POST,
        "/admin/questions",
        Some(question("Capital of Portugal?", "Lisbon")),
    )
    .await;
    let question_id = created["id"].as_u64().expect("question id");

    let (status, game) = send(
        &app,
        Method::POST,
        "/admin/games",
        Some(json!({ "name": "Iberia", "teacher_id": "teacher-uid" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(game["teacher_id"], teacher);
    let code = game["code"].as_str().expect("game code").to_string();

    let (status, _) = send(
        &app,
        Method::POST,
        "/admin/games",
        Some(json!({ "name": "Orphan", "teacher_id": "nobody" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, joined) = send(
        &app,
        Method::POST,
        "/games/join",
        Some(json!({ "user_id": "student-uid", "code": code })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(joined["user_id"], student);

    let (status, body) = send(
        &app,
        Method::POST,
        "/answers",
        Some(json!({ "user_id": "student-uid", "question_id": question_id, "selected": "Lisbon" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_correct"], true);
    assert_eq!(body["performance"]["score"], 10);

    let (status, _) = send(
        &app,
        Method::POST,
        "/answers",
        Some(json!({ "user_id": "ghost", "question_id": question_id, "selected": "Lisbon" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        Method::POST,
        "/answers",
        Some(json!({ "user_id": "  ", "question_id": question_id, "selected": "Lisbon" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn live_answers_award_the_first_correct_bonus() {
    let state = app_state().await;
    let app = router(state.clone());
    let ada = register(&app, "uid-ada", "Ada").await;
    let bob = register(&app, "uid-bob", "Bob").await;
    send(
        &app,
        Method::POST,
        "/admin/questions",
        Some(question("Capital of Spain?", "Madrid")),
    )
    .await;
    send(&app, Method::POST, "/admin/catalog/reload", None).await;

    let (_, idle) = send(&app, Method::GET, "/session", None).await;
    assert_eq!(idle["phase"], "idle");
    assert_eq!(idle["accepting_answers"], false);

    sequencer::advance(&state).await.expect("advance");

    let (_, live) = send(&app, Method::GET, "/session", None).await;
    assert_eq!(live["phase"], "question_live");
    assert_eq!(live["question_number"], 1);
    assert!(live["question"].get("correct").is_none());

    let submit = |identity: IdentityInput, answer: &str| SubmitAnswerMessage {
        user_id: Some(identity),
        answer: answer.to_string(),
        question_id: None,
        game_id: None,
    };

    let first = answer_service::submit_live_answer(&state, submit(IdentityInput::Id(ada), "Madrid")).await;
    assert_eq!(first.outcome, AnswerOutcome::FirstCorrect);
    assert_eq!(first.points, 15);

    let second = answer_service::submit_live_answer(
        &state,
        submit(IdentityInput::Uid("uid-bob".into()), "Madrid"),
    )
    .await;
    assert_eq!(second.outcome, AnswerOutcome::Correct);
    assert_eq!(second.points, 10);

    let repeat = answer_service::submit_live_answer(&state, submit(IdentityInput::Id(bob), "Madrid")).await;
    assert_eq!(repeat.outcome, AnswerOutcome::AlreadyAnswered);

    sequencer::close_window(&state).await.expect("close window");
    let late = answer_service::submit_live_answer(
        &state,
        submit(IdentityInput::Uid("uid-carol".into()), "Madrid"),
    )
    .await;
    assert_eq!(late.outcome, AnswerOutcome::NoActiveQuestion);

    let (_, board) = send(&app, Method::GET, "/leaderboard/global", None).await;
    let players = board["players"].as_array().expect("players");
    assert_eq!(players.len(), 2);
    assert_eq!(players[0]["user_id"], ada);
    assert_eq!(players[0]["score"], 15);
    assert_eq!(players[1]["user_id"], bob);
    assert_eq!(players[1]["score"], 10);
}

#[tokio::test(start_paused = true)]
async fn sequencer_runs_the_catalog_on_the_configured_schedule() {
    let state = AppState::new(AppConfig {
        question_window: Duration::from_secs(10),
        start_delay: Duration::from_secs(5),
        ..AppConfig::default()
    });
    state
        .install_quiz_store(Arc::new(InMemoryQuizStore::new()))
        .await;
    let app = router(state.clone());
    for text in ["Q1", "Q2"] {
        send(&app, Method::POST, "/admin/questions", Some(question(text, "Paris"))).await;
    }

    let mut events = state.public_sse().subscribe();
    let task = tokio::spawn(sequencer::run(state.clone()));

    tokio::time::sleep(Duration::from_secs(6)).await;
    let (_, snapshot) = send(&app, Method::GET, "/session", None).await;
    assert_eq!(snapshot["phase"], "question_live");
    assert_eq!(snapshot["total_questions"], 2);

    tokio::time::sleep(Duration::from_secs(20)).await;
    let (_, snapshot) = send(&app, Method::GET, "/session", None).await;
    assert_eq!(snapshot["phase"], "game_over");
    task.await.expect("sequencer task");

    let mut names = Vec::new();
    while let Ok(event) = events.try_recv() {
        names.push(event.event);
    }
    assert_eq!(names, vec!["new-question", "new-question", "game-over"]);
}

#[tokio::test]
async fn correct_answers_broadcast_fresh_leaderboards() {
    let state = app_state().await;
    let app = router(state.clone());
    let teacher = register(&app, "teacher-9", "Ms. K").await;
    let student = register(&app, "student-9", "Hedy").await;
    let (_, created) = send(
        &app,
        Method::POST,
        "/admin/questions",
        Some(question("Capital of Germany?", "A")),
    )
    .await;
    let question_id = created["id"].as_u64().expect("question id");
    let (_, game) = send(
        &app,
        Method::POST,
        "/admin/games",
        Some(json!({ "name": "Capitals", "teacher_id": teacher })),
    )
    .await;
    let game_id = game["id"].as_u64().expect("game id");

    let mut events = state.public_sse().subscribe();
    let (status, body) = send(
        &app,
        Method::POST,
        "/answers",
        Some(json!({
            "user_id": student,
            "question_id": question_id,
            "selected": "Berlin",
            "game_id": game_id,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["game_score"]["score"], 10);

    let mut global = None;
    let mut per_game = None;
    while global.is_none() || per_game.is_none() {
        let event = tokio::time::timeout(Duration::from_secs(1), events.recv())
            .await
            .expect("leaderboard broadcast in time")
            .expect("hub open");
        match event.event.as_str() {
            "leaderboard-global" => global = Some(event.data),
            "leaderboard-game" => per_game = Some(event.data),
            _ => {}
        }
    }

    let global = global.expect("global snapshot");
    assert_eq!(global["players"][0]["user_id"], student);
    let per_game = per_game.expect("game snapshot");
    assert_eq!(per_game["game_id"], game_id);
    assert_eq!(per_game["game_name"], "Capitals");
    assert_eq!(per_game["players"][0]["score"], 10);
}
