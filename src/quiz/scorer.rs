// src/quiz/scorer.rs

use std::collections::HashMap;

use crate::models::assessment::Question;

/// Outcome of marking one attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tally {
    pub correct: usize,
    pub total: usize,
    /// `round(correct / total * 100)`, rounding halves up.
    pub marks: u8,
}

/// Marks an attempt against the answer key.
///
/// `selected` maps question index to option index. Unanswered questions and
/// indices that do not belong to the assessment count as incorrect.
pub fn tally(questions: &[Question], selected: &HashMap<usize, usize>) -> Tally {
    let correct = questions
        .iter()
        .enumerate()
        .filter(|(index, question)| selected.get(index) == Some(&question.correct_answer))
        .count();
    let total = questions.len();

    Tally {
        correct,
        total,
        marks: percentage(correct, total),
    }
}

/// Percentage score for an attempt, 0-100.
pub fn score(questions: &[Question], selected: &HashMap<usize, usize>) -> u8 {
    tally(questions, selected).marks
}

/// Integer round-half-up of `correct / total * 100`. Zero questions scores 0.
fn percentage(correct: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let correct = correct.min(total);
    ((correct * 200 + total) / (2 * total)) as u8
}
