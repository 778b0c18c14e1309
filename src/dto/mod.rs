use std::time::SystemTime;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

pub mod answer;
pub mod game;
pub mod health;
pub mod leaderboard;
pub mod question;
pub mod session;
pub mod sse;
pub mod user;
pub mod validation;
pub mod ws;

/// Render a timestamp as RFC 3339.
pub(crate) fn format_system_time(time: SystemTime) -> String {
    OffsetDateTime::from(time)
        .format(&Rfc3339)
        .unwrap_or_else(|_| "invalid-timestamp".into())
}
