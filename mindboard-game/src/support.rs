//! Severity-driven conversational support.
//!
//! Tone selection is a pure lookup from [`Severity`] to a [`SupportProfile`];
//! prompt assembly reads the profile and never branches on scores itself.
use serde::Serialize;
use std::fmt::Write as _;

use crate::questions::Subscale;
use crate::scoring::AssessmentReport;
use crate::severity::Severity;

pub const ASSISTANT_NAME: &str = "SERA";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Resource {
    pub name: &'static str,
    pub contact: Option<&'static str>,
}

const CRISIS_RESOURCES: &[Resource] = &[
    Resource {
        name: "NIMHANS (National Institute of Mental Health and Neurosciences)",
        contact: None,
    },
    Resource {
        name: "iCall psychosocial helpline",
        contact: Some("9152987821"),
    },
    Resource {
        name: "Vandrevala Foundation Helpline",
        contact: Some("1860-2662-345"),
    },
    Resource {
        name: "AASRA Suicide Prevention",
        contact: Some("91-22-2754 6669"),
    },
];

/// Conversational configuration for one severity label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SupportProfile {
    pub severity: Severity,
    pub tone: &'static str,
    pub greeting: &'static str,
    pub resources: &'static [Resource],
}

impl SupportProfile {
    #[must_use]
    pub const fn for_severity(severity: Severity) -> Self {
        let (tone, greeting, resources): (&str, &str, &[Resource]) = match severity {
            Severity::Normal => (
                "Scores are in the normal range. Keep a casual, friendly and encouraging tone and invite them to share thoughts about the game.",
                "Namaste! 🙏 Great job completing the assessment! Your scores look healthy. How are you feeling about your journey through the game?",
                &[],
            ),
            Severity::Mild => (
                "Mild signs of distress. Be calm and gently concerned, reassuring without being alarming.",
                "Namaste! 🙏 Thank you for completing the assessment. I can see you've been experiencing some challenges lately. I'm here to listen and support you. How has your day been?",
                &[],
            ),
            Severity::Moderate => (
                "Moderate distress. Express genuine concern while staying supportive and hopeful; validate their experience and explore coping strategies.",
                "Namaste! 🙏 I appreciate you taking the time to complete this assessment. It takes courage to acknowledge when things feel difficult. I'm here to support you. Would you like to talk about what's been on your mind?",
                &[],
            ),
            Severity::Severe => (
                "Severe distress. Express clear concern with empathy, emphasize that help is available and gently encourage professional support.",
                "Namaste! 🙏 Thank you for completing the assessment. I can see you're going through a really tough time, and I want you to know that you're not alone. I'm here to listen and support you. How are you holding up today?",
                &[],
            ),
            Severity::ExtremelySevere => (
                "Extremely severe distress. Express deep concern and strongly encourage professional help now; remind them that seeking help is a sign of strength.",
                "Namaste! 🙏 Thank you for sharing your assessment with me. I'm deeply concerned about what you're experiencing, and I want you to know that you deserve support and care. You're incredibly brave for being here. Would you be open to talking about professional resources that could help? Remember, seeking help is a sign of strength, not weakness.",
                CRISIS_RESOURCES,
            ),
        };
        Self {
            severity,
            tone,
            greeting,
            resources,
        }
    }

    #[must_use]
    pub const fn has_resources(&self) -> bool {
        !self.resources.is_empty()
    }
}

/// Context handed to the text generator ahead of the conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SystemContext {
    pub report: AssessmentReport,
    pub profile: SupportProfile,
}

impl SystemContext {
    #[must_use]
    pub fn from_report(report: AssessmentReport) -> Self {
        Self {
            report,
            profile: SupportProfile::for_severity(report.overall_severity()),
        }
    }

    #[must_use]
    pub const fn overall_severity(&self) -> Severity {
        self.profile.severity
    }

    /// Render as the system message text.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = format!(
            "You are {ASSISTANT_NAME}, a warm and empathetic companion for students who just finished a self-assessment game. Never diagnose.\n\nAssessment Results:\n"
        );
        for subscale in [Subscale::Depression, Subscale::Anxiety, Subscale::Stress] {
            let result = self.report.get(subscale);
            let _ = writeln!(
                out,
                "- {} Score: {} ({})",
                capitalize(subscale.key()),
                result.reported,
                result.severity.key()
            );
        }
        let _ = writeln!(
            out,
            "- Overall Severity: {}\n\n{}",
            self.profile.severity.key(),
            self.profile.tone
        );
        if self.profile.has_resources() {
            out.push_str("\nIf appropriate, mention resources like:\n");
            for resource in self.profile.resources {
                match resource.contact {
                    Some(contact) => {
                        let _ = writeln!(out, "- {} ({contact})", resource.name);
                    }
                    None => {
                        let _ = writeln!(out, "- {}", resource.name);
                    }
                }
            }
        }
        out
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}
