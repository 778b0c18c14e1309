//! Question catalog management: administrative inserts, bulk import and reloading the
//! catalog into the live session.

use tracing::info;

use crate::{
    dao::models::NewQuestionEntity,
    dto::{
        question::{
            AddQuestionRequest, BulkImportError, BulkImportRequest, BulkImportResponse,
            BulkQuestionRow, DEFAULT_DIFFICULTY, QuestionSummary, StudentQuestion,
        },
        validation::resolve_correct_answer,
    },
    error::ServiceError,
    state::{SharedState, catalog::Question},
};

const MISSING_FIELDS: &str = "Missing question/options";
const MISSING_CORRECT: &str = "Missing correct answer";
const CORRECT_NOT_AN_OPTION: &str = "Correct answer must match one of the options";

/// Insert one question and refresh the live catalog.
pub async fn add_question(
    state: &SharedState,
    request: AddQuestionRequest,
) -> Result<QuestionSummary, ServiceError> {
    let correct = resolve_correct_answer(&request.options(), &request.correct)
        .ok_or_else(|| ServiceError::InvalidInput(CORRECT_NOT_AN_OPTION.into()))?;

    let question = NewQuestionEntity {
        text: request.question.trim().to_string(),
        option_a: request.option_a.trim().to_string(),
        option_b: request.option_b.trim().to_string(),
        option_c: request.option_c.trim().to_string(),
        option_d: request.option_d.trim().to_string(),
        correct,
        difficulty: normalize_difficulty(request.difficulty.as_deref()),
    };

    let store = state.require_quiz_store().await?;
    let mut inserted = store.insert_questions(vec![question]).await?;
    let entity = inserted
        .pop()
        .ok_or_else(|| ServiceError::InvalidState("store returned no question".into()))?;
    info!(question_id = entity.id, "question added to catalog");

    reload_catalog(state).await?;
    Ok(entity.into())
}

/// Import a batch of parsed rows. Invalid rows are reported and skipped; valid rows are
/// committed together.
pub async fn import_questions(
    state: &SharedState,
    request: BulkImportRequest,
) -> Result<BulkImportResponse, ServiceError> {
    if request.rows.is_empty() {
        return Err(ServiceError::InvalidInput("No rows to import".into()));
    }

    let parsed_rows = request.rows.len();
    let mut valid = Vec::with_capacity(parsed_rows);
    let mut errors = Vec::new();
    for (index, row) in request.rows.iter().enumerate() {
        match parse_row(row) {
            Ok(question) => valid.push(question),
            Err(reason) => errors.push(BulkImportError {
                row: index + 1,
                reason: reason.to_string(),
            }),
        }
    }

    let inserted = if valid.is_empty() {
        0
    } else {
        let store = state.require_quiz_store().await?;
        let inserted = store.insert_questions(valid).await?.len();
        reload_catalog(state).await?;
        inserted
    };

    info!(parsed_rows, inserted, skipped = errors.len(), "bulk question import finished");
    Ok(BulkImportResponse {
        parsed_rows,
        inserted,
        skipped: errors.len(),
        errors,
    })
}

/// Turn one bulk row into a question, or explain why it cannot be imported.
pub fn parse_row(row: &BulkQuestionRow) -> Result<NewQuestionEntity, &'static str> {
    let field = |value: &Option<String>| {
        value
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    };

    let (Some(text), Some(option_a), Some(option_b), Some(option_c), Some(option_d)) = (
        field(&row.question),
        field(&row.option_a),
        field(&row.option_b),
        field(&row.option_c),
        field(&row.option_d),
    ) else {
        return Err(MISSING_FIELDS);
    };

    let raw_correct = field(&row.correct).ok_or(MISSING_CORRECT)?;
    let correct = resolve_correct_answer(
        &[
            option_a.as_str(),
            option_b.as_str(),
            option_c.as_str(),
            option_d.as_str(),
        ],
        &raw_correct,
    )
    .ok_or(CORRECT_NOT_AN_OPTION)?;

    Ok(NewQuestionEntity {
        text,
        option_a,
        option_b,
        option_c,
        option_d,
        correct,
        difficulty: normalize_difficulty(row.difficulty.as_deref()),
    })
}

/// Load the catalog from the store and swap it into the live session.
///
/// The question currently accepting answers keeps its answer key.
pub async fn reload_catalog(state: &SharedState) -> Result<usize, ServiceError> {
    let store = state.require_quiz_store().await?;
    let questions: Vec<Question> = store
        .list_questions()
        .await?
        .into_iter()
        .map(Question::from)
        .collect();
    let count = questions.len();

    state.session().lock().await.replace_catalog(questions);
    info!(questions = count, "catalog loaded into the live session");
    Ok(count)
}

/// Catalog as shown to students, without answer keys.
pub async fn student_questions(state: &SharedState) -> Result<Vec<StudentQuestion>, ServiceError> {
    let store = state.require_quiz_store().await?;
    Ok(store
        .list_questions()
        .await?
        .into_iter()
        .map(|entity| StudentQuestion::from(&Question::from(entity)))
        .collect())
}

fn normalize_difficulty(raw: Option<&str>) -> String {
    raw.map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(DEFAULT_DIFFICULTY)
        .to_string()
}
