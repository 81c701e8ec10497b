use crate::model::Question;

/// Whether a submitted true/false answer matches the expected one.
#[must_use]
pub fn evaluate(submitted: bool, correct: bool) -> bool {
    submitted == correct
}

/// Evaluates an answer against a question without touching it.
#[must_use]
pub fn evaluate_question(question: &Question, submitted: bool) -> bool {
    evaluate(submitted, question.correct_answer())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_table() {
        assert!(evaluate(true, true));
        assert!(evaluate(false, false));
        assert!(!evaluate(true, false));
        assert!(!evaluate(false, true));
    }
}
