//! Questionnaire bank and trigger positions.
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::OnceLock;

const DEFAULT_QUESTION_DATA: &str = include_str!("../assets/data/questions.json");

/// Number of answer options every question carries. The option index is its point value.
pub const OPTIONS_PER_QUESTION: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Subscale {
    Stress,
    Anxiety,
    Depression,
}

impl Subscale {
    pub const ALL: [Self; 3] = [Self::Stress, Self::Anxiety, Self::Depression];

    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Stress => "stress",
            Self::Anxiety => "anxiety",
            Self::Depression => "depression",
        }
    }
}

impl fmt::Display for Subscale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerOption {
    pub emoji: String,
    pub text: String,
}

fn default_options() -> Vec<AnswerOption> {
    [
        ("☀", "Not at all"),
        ("🌤", "Sometimes"),
        ("🌧", "Often"),
        ("⛈", "Always"),
    ]
    .into_iter()
    .map(|(emoji, text)| AnswerOption {
        emoji: emoji.to_string(),
        text: text.to_string(),
    })
    .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: u8,
    /// Board cell that must be answered before movement continues past it.
    pub position: u8,
    pub subscale: Subscale,
    #[serde(default)]
    pub fun_fact: String,
    pub prompt: String,
    #[serde(default = "default_options")]
    pub options: Vec<AnswerOption>,
}

/// Range of cells scanned for crossed, unanswered trigger positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScanWindow {
    /// `from < position <= to`; used by rolls and forward effects.
    Forward { from: u8, to: u8 },
    /// `low <= position <= high`; used by the knight's backward jump.
    Span { low: u8, high: u8 },
    /// Every trigger at or below `cell`; used when the goal is reached.
    UpTo { cell: u8 },
}

impl ScanWindow {
    #[must_use]
    pub const fn contains(self, position: u8) -> bool {
        match self {
            Self::Forward { from, to } => from < position && position <= to,
            Self::Span { low, high } => low <= position && position <= high,
            Self::UpTo { cell } => position <= cell,
        }
    }
}

/// Ordered, immutable questionnaire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct QuestionBank {
    #[serde(default)]
    pub questions: Vec<Question>,
}

impl QuestionBank {
    #[must_use]
    pub fn load_from_static() -> Self {
        serde_json::from_str(DEFAULT_QUESTION_DATA).unwrap_or_default()
    }

    #[must_use]
    pub fn default_bank() -> &'static Self {
        static BANK: OnceLock<QuestionBank> = OnceLock::new();
        BANK.get_or_init(Self::load_from_static)
    }

    /// # Errors
    ///
    /// Returns an error if the JSON cannot be parsed into a question bank.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    #[must_use]
    pub fn from_questions(questions: Vec<Question>) -> Self {
        Self { questions }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    #[must_use]
    pub fn get(&self, id: u8) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == id)
    }

    /// First question in bank order whose trigger lies in `window` and is not yet answered.
    #[must_use]
    pub fn first_unanswered(
        &self,
        window: ScanWindow,
        answered: &BTreeSet<u8>,
    ) -> Option<&Question> {
        self.questions
            .iter()
            .find(|q| window.contains(q.position) && !answered.contains(&q.id))
    }

    #[must_use]
    pub fn trigger_sets(&self) -> TriggerSets {
        let mut sets = TriggerSets::default();
        for question in &self.questions {
            sets.by_subscale
                .entry(question.subscale)
                .or_default()
                .insert(question.position);
        }
        sets
    }
}

/// Trigger positions grouped per subscale.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TriggerSets {
    by_subscale: BTreeMap<Subscale, BTreeSet<u8>>,
}

impl TriggerSets {
    #[must_use]
    pub fn positions(&self, subscale: Subscale) -> BTreeSet<u8> {
        self.by_subscale.get(&subscale).cloned().unwrap_or_default()
    }

    /// Subscale owning a trigger position. Answer points are routed through this.
    #[must_use]
    pub fn subscale_for(&self, position: u8) -> Option<Subscale> {
        self.by_subscale
            .iter()
            .find(|(_, cells)| cells.contains(&position))
            .map(|(subscale, _)| *subscale)
    }

    /// True when no position is claimed by more than one subscale.
    #[must_use]
    pub fn is_disjoint(&self) -> bool {
        let sets: Vec<&BTreeSet<u8>> = self.by_subscale.values().collect();
        sets.iter().enumerate().all(|(i, a)| {
            sets.iter()
                .skip(i + 1)
                .all(|b| a.intersection(b).next().is_none())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_bank_has_seven_items_per_subscale() {
        let bank = QuestionBank::default_bank();
        assert_eq!(bank.len(), 21);
        for subscale in Subscale::ALL {
            let count = bank
                .questions
                .iter()
                .filter(|q| q.subscale == subscale)
                .count();
            assert_eq!(count, 7, "{subscale}");
        }
        assert!(
            bank.questions
                .iter()
                .all(|q| q.options.len() == OPTIONS_PER_QUESTION)
        );
    }

    #[test]
    fn trigger_sets_route_positions() {
        let sets = QuestionBank::default_bank().trigger_sets();
        assert!(sets.is_disjoint());
        assert_eq!(sets.subscale_for(14), Some(Subscale::Stress));
        assert_eq!(sets.subscale_for(33), Some(Subscale::Anxiety));
        assert_eq!(sets.subscale_for(98), Some(Subscale::Depression));
        assert_eq!(sets.subscale_for(13), None);
        assert_eq!(
            sets.positions(Subscale::Stress).into_iter().collect::<Vec<_>>(),
            vec![5, 9, 14, 18, 23, 27, 30]
        );
    }

    #[test]
    fn scan_windows_bound_correctly() {
        let forward = ScanWindow::Forward { from: 4, to: 9 };
        assert!(!forward.contains(4));
        assert!(forward.contains(5));
        assert!(forward.contains(9));
        assert!(!forward.contains(10));

        let span = ScanWindow::Span { low: 18, high: 39 };
        assert!(span.contains(18));
        assert!(span.contains(39));
        assert!(!span.contains(40));

        assert!(ScanWindow::UpTo { cell: 100 }.contains(98));
    }

    #[test]
    fn first_unanswered_prefers_bank_order() {
        let bank = QuestionBank::default_bank();
        let mut answered = BTreeSet::new();
        let window = ScanWindow::Forward { from: 1, to: 20 };
        assert_eq!(bank.first_unanswered(window, &answered).map(|q| q.id), Some(1));
        answered.insert(1);
        assert_eq!(bank.first_unanswered(window, &answered).map(|q| q.id), Some(2));
    }

    #[test]
    fn options_default_when_omitted() {
        let json = r#"{"questions":[{"id":1,"position":3,"subscale":"anxiety","prompt":"p"}]}"#;
        let bank = QuestionBank::from_json(json).unwrap();
        assert_eq!(bank.questions[0].options.len(), OPTIONS_PER_QUESTION);
        assert_eq!(bank.questions[0].options[3].text, "Always");
    }
}
