//! Running subscale totals and the assessment report built from them.
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::questions::{OPTIONS_PER_QUESTION, QuestionBank, Subscale};
use crate::severity::{Severity, SeverityTable, overall_severity};
use crate::session::GameError;

/// Reported scores use a 0-6 per item scale while answers are scored 0-3.
pub const REPORT_MULTIPLIER: u16 = 2;

/// Raw per-subscale totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Tallies {
    pub stress: u16,
    pub anxiety: u16,
    pub depression: u16,
}

impl Tallies {
    #[must_use]
    pub const fn raw(&self, subscale: Subscale) -> u16 {
        match subscale {
            Subscale::Stress => self.stress,
            Subscale::Anxiety => self.anxiety,
            Subscale::Depression => self.depression,
        }
    }

    /// Raw total scaled to the clinical reporting range.
    #[must_use]
    pub const fn reported(&self, subscale: Subscale) -> u16 {
        self.raw(subscale).saturating_mul(REPORT_MULTIPLIER)
    }

    pub const fn add(&mut self, subscale: Subscale, points: u16) {
        let slot = match subscale {
            Subscale::Stress => &mut self.stress,
            Subscale::Anxiety => &mut self.anxiety,
            Subscale::Depression => &mut self.depression,
        };
        *slot = slot.saturating_add(points);
    }
}

/// Totals plus the set of answered question IDs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Scorecard {
    pub tallies: Tallies,
    #[serde(default)]
    pub answered: BTreeSet<u8>,
}

impl Scorecard {
    /// Add `option_index` points to the subscale whose trigger set holds the
    /// question's position.
    ///
    /// Answering the same question twice accumulates again; callers that
    /// route answers through [`crate::GameSession`] can only answer the
    /// pending question, so a duplicate never arises there.
    ///
    /// # Errors
    ///
    /// Returns an error when the option index is outside 0..=3 or the
    /// question is not in the bank. The scorecard is unchanged on error.
    pub fn record_answer(
        &mut self,
        bank: &QuestionBank,
        question_id: u8,
        option_index: u8,
    ) -> Result<Subscale, GameError> {
        if usize::from(option_index) >= OPTIONS_PER_QUESTION {
            return Err(GameError::OptionOutOfRange {
                index: option_index,
            });
        }
        let question = bank
            .get(question_id)
            .ok_or(GameError::UnknownQuestion { id: question_id })?;
        let subscale = bank
            .trigger_sets()
            .subscale_for(question.position)
            .unwrap_or(question.subscale);
        self.tallies.add(subscale, u16::from(option_index));
        self.answered.insert(question_id);
        Ok(subscale)
    }

    #[must_use]
    pub fn is_answered(&self, question_id: u8) -> bool {
        self.answered.contains(&question_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscaleResult {
    pub raw: u16,
    pub reported: u16,
    pub severity: Severity,
}

/// Classified results for all three subscales.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssessmentReport {
    pub stress: SubscaleResult,
    pub anxiety: SubscaleResult,
    pub depression: SubscaleResult,
}

impl AssessmentReport {
    #[must_use]
    pub fn from_tallies(tallies: &Tallies, table: &SeverityTable) -> Self {
        let result = |subscale: Subscale| {
            let reported = tallies.reported(subscale);
            SubscaleResult {
                raw: tallies.raw(subscale),
                reported,
                severity: table.classify(subscale, reported),
            }
        };
        Self {
            stress: result(Subscale::Stress),
            anxiety: result(Subscale::Anxiety),
            depression: result(Subscale::Depression),
        }
    }

    #[must_use]
    pub const fn get(&self, subscale: Subscale) -> SubscaleResult {
        match subscale {
            Subscale::Stress => self.stress,
            Subscale::Anxiety => self.anxiety,
            Subscale::Depression => self.depression,
        }
    }

    /// Worst label across subscales; selects conversational tone only.
    #[must_use]
    pub fn overall_severity(&self) -> Severity {
        overall_severity([
            self.stress.severity,
            self.anxiety.severity,
            self.depression.severity,
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn answers_route_to_owning_subscale() {
        let bank = QuestionBank::default_bank();
        let mut card = Scorecard::default();
        assert_eq!(card.record_answer(bank, 1, 2), Ok(Subscale::Stress));
        assert_eq!(card.record_answer(bank, 8, 3), Ok(Subscale::Anxiety));
        assert_eq!(card.record_answer(bank, 21, 1), Ok(Subscale::Depression));
        assert_eq!(card.tallies.stress, 2);
        assert_eq!(card.tallies.anxiety, 3);
        assert_eq!(card.tallies.depression, 1);
        assert!(card.is_answered(8));
    }

    #[test]
    fn position_fourteen_counts_toward_stress() {
        let bank = QuestionBank::default_bank();
        let mut card = Scorecard::default();
        card.record_answer(bank, 3, 3).unwrap();
        assert_eq!(card.tallies.stress, 3);
    }

    #[test]
    fn points_follow_the_bank_trigger_sets() {
        let json = r#"{"questions":[
            {"id":1,"position":14,"subscale":"anxiety","prompt":"a"},
            {"id":2,"position":40,"subscale":"depression","prompt":"b"}
        ]}"#;
        let bank = QuestionBank::from_json(json).unwrap();
        let mut card = Scorecard::default();
        assert_eq!(card.record_answer(&bank, 1, 2), Ok(Subscale::Anxiety));
        assert_eq!(card.record_answer(&bank, 2, 3), Ok(Subscale::Depression));
        assert_eq!(card.tallies.stress, 0);
        assert_eq!(card.tallies.anxiety, 2);
        assert_eq!(card.tallies.depression, 3);
    }

    #[test]
    fn out_of_range_option_is_rejected_without_change() {
        let bank = QuestionBank::default_bank();
        let mut card = Scorecard::default();
        assert_eq!(
            card.record_answer(bank, 1, 4),
            Err(GameError::OptionOutOfRange { index: 4 })
        );
        assert_eq!(
            card.record_answer(bank, 99, 1),
            Err(GameError::UnknownQuestion { id: 99 })
        );
        assert_eq!(card, Scorecard::default());
    }

    #[test]
    fn duplicate_answers_accumulate() {
        let bank = QuestionBank::default_bank();
        let mut card = Scorecard::default();
        card.record_answer(bank, 1, 3).unwrap();
        card.record_answer(bank, 1, 3).unwrap();
        assert_eq!(card.tallies.stress, 6);
        assert_eq!(card.answered.len(), 1);
    }

    #[test]
    fn report_doubles_and_classifies() {
        let tallies = Tallies {
            stress: 9,
            anxiety: 0,
            depression: 14,
        };
        let report = AssessmentReport::from_tallies(&tallies, &SeverityTable::default());
        assert_eq!(report.stress.reported, 18);
        assert_eq!(report.stress.severity, Severity::Mild);
        assert_eq!(report.anxiety.severity, Severity::Normal);
        assert_eq!(report.depression.reported, 28);
        assert_eq!(report.depression.severity, Severity::ExtremelySevere);
        assert_eq!(report.overall_severity(), Severity::ExtremelySevere);
    }
}
