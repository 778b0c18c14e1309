/// Live and REST answer intake.
pub mod answer_service;
/// Question catalog management.
pub mod catalog_service;
/// OpenAPI documentation generation.
pub mod documentation;
/// Game sessions, join codes and participation.
pub mod game_service;
/// Health check service.
pub mod health_service;
/// Leaderboard computation and broadcasting.
pub mod leaderboard_service;
/// Background task driving the question sequence.
pub mod sequencer;
/// Event payload generation for the broadcast hub.
pub mod sse_events;
/// Server-Sent Events streaming service.
pub mod sse_service;
/// Storage connection supervisor with exponential backoff.
pub mod storage_supervisor;
/// User registration and identity resolution.
pub mod user_service;
/// WebSocket connection and message handling service.
pub mod websocket_service;
