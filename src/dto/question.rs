//! DTOs for catalog administration and the student question view.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use crate::{
    dao::models::QuestionEntity,
    dto::validation::{resolve_correct_answer, validate_not_blank},
    state::catalog::Question,
};

/// Difficulty applied when the caller does not provide one.
pub const DEFAULT_DIFFICULTY: &str = "Medium";

/// Payload used to add a single question to the catalog.
#[derive(Debug, Deserialize, ToSchema, Validate)]
#[validate(schema(function = "validate_correct_option"))]
pub struct AddQuestionRequest {
    #[validate(custom(function = "validate_not_blank"))]
    pub question: String,
    #[validate(custom(function = "validate_not_blank"))]
    pub option_a: String,
    #[validate(custom(function = "validate_not_blank"))]
    pub option_b: String,
    #[validate(custom(function = "validate_not_blank"))]
    pub option_c: String,
    #[validate(custom(function = "validate_not_blank"))]
    pub option_d: String,
    /// Text of the correct option, or its letter.
    pub correct: String,
    #[serde(default)]
    pub difficulty: Option<String>,
}

impl AddQuestionRequest {
    pub fn options(&self) -> [&str; 4] {
        [
            self.option_a.as_str(),
            self.option_b.as_str(),
            self.option_c.as_str(),
            self.option_d.as_str(),
        ]
    }
}

fn validate_correct_option(request: &AddQuestionRequest) -> Result<(), ValidationError> {
    if resolve_correct_answer(&request.options(), &request.correct).is_some() {
        return Ok(());
    }
    let mut err = ValidationError::new("correct_option");
    err.message = Some("Correct answer must match one of the options".into());
    Err(err)
}

/// One row of a bulk import, as parsed from the uploaded sheet.
#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
pub struct BulkQuestionRow {
    #[serde(default)]
    pub question: Option<String>,
    #[serde(default)]
    pub option_a: Option<String>,
    #[serde(default)]
    pub option_b: Option<String>,
    #[serde(default)]
    pub option_c: Option<String>,
    #[serde(default)]
    pub option_d: Option<String>,
    #[serde(default)]
    pub correct: Option<String>,
    #[serde(default)]
    pub difficulty: Option<String>,
}

/// Batch of rows to import. Rows are validated one by one.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct BulkImportRequest {
    #[validate(length(min = 1, message = "No rows to import"))]
    pub rows: Vec<BulkQuestionRow>,
}

/// Reason a bulk row was skipped.
#[derive(Debug, Clone, Serialize, ToSchema, PartialEq, Eq)]
pub struct BulkImportError {
    /// One-based row number.
    pub row: usize,
    pub reason: String,
}

/// Outcome of a bulk import. Valid rows are committed even when others fail.
#[derive(Debug, Serialize, ToSchema)]
pub struct BulkImportResponse {
    pub parsed_rows: usize,
    pub inserted: usize,
    pub skipped: usize,
    pub errors: Vec<BulkImportError>,
}

/// Full question projection returned to administrators.
#[derive(Debug, Serialize, ToSchema)]
pub struct QuestionSummary {
    pub id: u64,
    pub question: String,
    pub option_a: String,
    pub option_b: String,
    pub option_c: String,
    pub option_d: String,
    pub correct: String,
    pub difficulty: String,
}

impl From<QuestionEntity> for QuestionSummary {
    fn from(value: QuestionEntity) -> Self {
        Self {
            id: value.id,
            question: value.text,
            option_a: value.option_a,
            option_b: value.option_b,
            option_c: value.option_c,
            option_d: value.option_d,
            correct: value.correct,
            difficulty: value.difficulty,
        }
    }
}

/// Question as shown to students: the answer key is left out.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StudentQuestion {
    pub id: u64,
    pub text: String,
    #[schema(value_type = Object)]
    pub options: IndexMap<String, String>,
    pub difficulty: String,
}

impl From<&Question> for StudentQuestion {
    fn from(value: &Question) -> Self {
        Self {
            id: value.id,
            text: value.text.clone(),
            options: value.options.clone(),
            difficulty: value.difficulty.clone(),
        }
    }
}

/// Result of reloading the catalog into the live session.
#[derive(Debug, Serialize, ToSchema)]
pub struct CatalogReloadResponse {
    pub questions: usize,
}
