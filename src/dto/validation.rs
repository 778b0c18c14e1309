//! Validation helpers for DTOs.

use validator::ValidationError;

use crate::state::catalog::OPTION_LABELS;

/// Rejects strings that are empty once surrounding whitespace is removed.
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("Value must not be blank".into());
        return Err(err);
    }
    Ok(())
}

/// Validates a join code: letters and digits only, at most 12 characters.
///
/// Case is not checked because lookups upper-case the input.
pub fn validate_game_code(code: &str) -> Result<(), ValidationError> {
    let code = code.trim();
    if code.is_empty() || code.len() > 12 {
        let mut err = ValidationError::new("game_code_length");
        err.message = Some(format!("Game code must be 1 to 12 characters (got {})", code.len()).into());
        return Err(err);
    }

    if !code.chars().all(|c| c.is_ascii_alphanumeric()) {
        let mut err = ValidationError::new("game_code_format");
        err.message = Some("Game code must contain only letters and digits".into());
        return Err(err);
    }

    Ok(())
}

/// Resolve the correct answer of a question against its options.
///
/// Accepts either the option text or its letter (`A`..`D`, case-insensitive) and returns the
/// matching option text.
///
/// ```ignore
/// resolve_correct_answer(&["red", "green", "blue", "black"], "b")     // Some("green")
/// resolve_correct_answer(&["red", "green", "blue", "black"], "green") // Some("green")
/// resolve_correct_answer(&["red", "green", "blue", "black"], "pink")  // None
/// ```
pub fn resolve_correct_answer(options: &[&str; 4], correct: &str) -> Option<String> {
    let correct = correct.trim();
    if let Some(option) = options.iter().find(|option| option.trim() == correct) {
        return Some(option.trim().to_string());
    }

    OPTION_LABELS
        .iter()
        .position(|label| label.eq_ignore_ascii_case(correct))
        .map(|index| options[index].trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const OPTIONS: [&str; 4] = ["red", "green", "blue", "black"];

    #[test]
    fn test_validate_not_blank() {
        assert!(validate_not_blank("quiz").is_ok());
        assert!(validate_not_blank("").is_err());
        assert!(validate_not_blank("  \t").is_err());
    }

    #[test]
    fn test_validate_game_code() {
        assert!(validate_game_code("AB12CD").is_ok());
        assert!(validate_game_code(" ab12cd ").is_ok());
        assert!(validate_game_code("").is_err());
        assert!(validate_game_code("AB-12").is_err());
        assert!(validate_game_code("ABCDEFGHIJKLM").is_err());
    }

    #[test]
    fn test_resolve_correct_answer_by_text() {
        assert_eq!(resolve_correct_answer(&OPTIONS, " blue "), Some("blue".into()));
        assert_eq!(resolve_correct_answer(&OPTIONS, "pink"), None);
    }

    #[test]
    fn test_resolve_correct_answer_by_letter() {
        assert_eq!(resolve_correct_answer(&OPTIONS, "b"), Some("green".into()));
        assert_eq!(resolve_correct_answer(&OPTIONS, "D"), Some("black".into()));
        assert_eq!(resolve_correct_answer(&OPTIONS, "E"), None);
    }
}
