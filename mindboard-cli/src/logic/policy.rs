use std::fmt;

use clap::ValueEnum;
use mindboard_game::{Question, QueenMove, Subscale};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};

/// Policy interface for automated answering.
pub trait AnswerPolicy {
    /// Name used for logging/debug output.
    fn name(&self) -> &'static str;

    /// Select an option index (0..=3) for a raised question.
    fn pick_option(&mut self, question: &Question) -> u8;
}

/// Built-in answering strategies for automated runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerStrategy {
    /// Always "Not at all"
    Calm,
    /// Varies by subscale and item
    Mixed,
    /// Always "Always"
    Distressed,
    /// Uniform over the four options, seeded
    Random,
}

impl AnswerStrategy {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Calm => "Calm",
            Self::Mixed => "Mixed",
            Self::Distressed => "Distressed",
            Self::Random => "Random",
        }
    }

    #[must_use]
    pub fn create_policy(self, seed: u64) -> Box<dyn AnswerPolicy + Send> {
        match self {
            Self::Calm => Box::new(FixedPolicy {
                name: "Calm",
                option: 0,
            }),
            Self::Distressed => Box::new(FixedPolicy {
                name: "Distressed",
                option: 3,
            }),
            Self::Mixed => Box::new(MixedPolicy),
            Self::Random => Box::new(RandomPolicy {
                rng: ChaCha20Rng::seed_from_u64(seed),
            }),
        }
    }
}

impl fmt::Display for AnswerStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

struct FixedPolicy {
    name: &'static str,
    option: u8,
}

struct MixedPolicy;

struct RandomPolicy {
    rng: ChaCha20Rng,
}

impl AnswerPolicy for FixedPolicy {
    fn name(&self) -> &'static str {
        self.name
    }

    fn pick_option(&mut self, _question: &Question) -> u8 {
        self.option
    }
}

impl AnswerPolicy for MixedPolicy {
    fn name(&self) -> &'static str {
        "Mixed"
    }

    fn pick_option(&mut self, question: &Question) -> u8 {
        let base = match question.subscale {
            Subscale::Stress => 2,
            Subscale::Anxiety => 1,
            Subscale::Depression => 0,
        };
        (base + question.id % 2) % 4
    }
}

impl AnswerPolicy for RandomPolicy {
    fn name(&self) -> &'static str {
        "Random"
    }

    fn pick_option(&mut self, _question: &Question) -> u8 {
        self.rng.gen_range(0..=3)
    }
}

/// Alternates queen choices so both effects are exercised in one run.
#[derive(Debug, Clone, Default)]
pub struct QueenAlternator {
    next_forward: bool,
}

impl QueenAlternator {
    pub fn choose(&mut self) -> QueenMove {
        let choice = if self.next_forward {
            QueenMove::Forward
        } else {
            QueenMove::Diagonal
        };
        self.next_forward = !self.next_forward;
        choice
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mindboard_game::QuestionBank;

    #[test]
    fn fixed_policies_pick_extremes() {
        let question = &QuestionBank::default_bank().questions[0];
        assert_eq!(AnswerStrategy::Calm.create_policy(1).pick_option(question), 0);
        assert_eq!(
            AnswerStrategy::Distressed.create_policy(1).pick_option(question),
            3
        );
    }

    #[test]
    fn mixed_policy_stays_in_range() {
        let mut policy = AnswerStrategy::Mixed.create_policy(0);
        for question in &QuestionBank::default_bank().questions {
            assert!(policy.pick_option(question) <= 3);
        }
    }

    #[test]
    fn random_policy_is_seeded() {
        let bank = QuestionBank::default_bank();
        let picks = |seed| {
            let mut policy = AnswerStrategy::Random.create_policy(seed);
            bank.questions
                .iter()
                .map(|q| policy.pick_option(q))
                .collect::<Vec<_>>()
        };
        assert_eq!(picks(5), picks(5));
        assert!(picks(5).iter().all(|&o| o <= 3));
    }

    #[test]
    fn queen_choices_alternate() {
        let mut queen = QueenAlternator::default();
        assert_eq!(queen.choose(), QueenMove::Diagonal);
        assert_eq!(queen.choose(), QueenMove::Forward);
        assert_eq!(queen.choose(), QueenMove::Diagonal);
    }
}
