use serde::Deserialize;

/// Point values shared by every answer submission path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ScoringPolicy {
    /// Points for any correct answer.
    pub base_points: u32,
    /// Extra points for the first correct answer to a live question.
    pub first_correct_bonus: u32,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            base_points: 10,
            first_correct_bonus: 5,
        }
    }
}

impl ScoringPolicy {
    /// Points earned by a submission.
    pub fn points(&self, correct: bool, first: bool) -> u32 {
        match (correct, first) {
            (false, _) => 0,
            (true, false) => self.base_points,
            (true, true) => self.base_points + self.first_correct_bonus,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_awards_ten_plus_five() {
        let policy = ScoringPolicy::default();
        assert_eq!(policy.points(true, true), 15);
        assert_eq!(policy.points(true, false), 10);
        assert_eq!(policy.points(false, true), 0);
        assert_eq!(policy.points(false, false), 0);
    }
}
