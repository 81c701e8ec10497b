use std::collections::HashSet;

use rand::Rng;
use rand::seq::SliceRandom;
use thiserror::Error;

use crate::model::Question;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum SamplingError {
    #[error("no questions match the selection")]
    EmptySelection,
}

/// Pick `min(target, pool)` distinct questions in random order.
///
/// The pool is expected to be pre-filtered by the caller. Repeated ids in the
/// pool are collapsed so a session never shows the same question twice.
///
/// # Errors
///
/// Returns `SamplingError::EmptySelection` if the pool is empty.
pub fn sample<R>(
    pool: impl IntoIterator<Item = Question>,
    target: usize,
    rng: &mut R,
) -> Result<Vec<Question>, SamplingError>
where
    R: Rng + ?Sized,
{
    let mut seen = HashSet::new();
    let mut candidates: Vec<Question> = pool
        .into_iter()
        .filter(|q| seen.insert(q.id()))
        .collect();

    if candidates.is_empty() {
        return Err(SamplingError::EmptySelection);
    }

    candidates.as_mut_slice().shuffle(rng);
    candidates.truncate(target);
    Ok(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Difficulty, QuestionDraft, QuestionId};
    use crate::time::fixed_now;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn question(n: usize) -> Question {
        QuestionDraft {
            prompt_it: format!("Domanda {n}"),
            prompt_ar: format!("سؤال {n}"),
            correct_answer: n % 2 == 0,
            explanation_it: String::new(),
            explanation_ar: String::new(),
            category: "regole".into(),
            difficulty: Difficulty::Medium,
            lesson_id: None,
            sign_id: None,
        }
        .validate(QuestionId::new_v4(), fixed_now())
        .unwrap()
    }

    fn pool(n: usize) -> Vec<Question> {
        (0..n).map(question).collect()
    }

    #[test]
    fn small_pool_is_returned_whole_without_padding() {
        let mut rng = StdRng::seed_from_u64(7);
        let picked = sample(pool(5), 10, &mut rng).unwrap();
        assert_eq!(picked.len(), 5);
    }

    #[test]
    fn large_pool_is_cut_to_target_without_repeats() {
        let mut rng = StdRng::seed_from_u64(11);
        for target in [1, 10, 30] {
            let picked = sample(pool(40), target, &mut rng).unwrap();
            assert_eq!(picked.len(), target);
            let ids: HashSet<_> = picked.iter().map(Question::id).collect();
            assert_eq!(ids.len(), picked.len());
        }
    }

    #[test]
    fn duplicate_pool_entries_are_collapsed() {
        let q = question(1);
        let mut rng = StdRng::seed_from_u64(3);
        let picked = sample(vec![q.clone(), q.clone(), question(2)], 10, &mut rng).unwrap();
        assert_eq!(picked.len(), 2);
    }

    #[test]
    fn empty_pool_is_an_empty_selection() {
        let mut rng = StdRng::seed_from_u64(1);
        let err = sample(Vec::new(), 10, &mut rng).unwrap_err();
        assert_eq!(err, SamplingError::EmptySelection);
    }

    #[test]
    fn every_question_is_selectable() {
        let questions = pool(4);
        let mut hits = HashSet::new();
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..200 {
            let picked = sample(questions.clone(), 1, &mut rng).unwrap();
            hits.insert(picked[0].id());
        }
        assert_eq!(hits.len(), 4);
    }
}
