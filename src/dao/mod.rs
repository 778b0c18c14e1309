/// Database model definitions.
pub mod models;
/// Question, user, score and game session persistence.
pub mod quiz_store;
/// Storage abstraction layer for database operations.
pub mod storage;
