//! Yes/no questions whose safe answer is known from the wording alone.

use super::FieldOption;
use crate::utils::normalize_text;

/// Questions that must be answered "no".
const DECLINE_TERMS: &[&str] = &["visa", "sponsorship", "sponsor"];

/// Questions that must be answered "yes".
const AFFIRM_TERMS: &[&str] = &[
    "legally authorized",
    "legally authorised",
    "authorized to work",
    "authorised to work",
    "commute",
    "commuting",
    "relocate",
    "relocation",
    "onsite",
    "on-site",
    "remote",
    "hybrid",
    "location",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    Decline,
    Affirm,
    Neutral,
}

impl Polarity {
    /// Decline terms win when a label carries both.
    pub fn of(label: &str) -> Self {
        let label = normalize_text(label);
        if DECLINE_TERMS.iter().any(|t| label.contains(t)) {
            Polarity::Decline
        } else if AFFIRM_TERMS.iter().any(|t| label.contains(t)) {
            Polarity::Affirm
        } else {
            Polarity::Neutral
        }
    }

    /// The option spelling this polarity, if the question has one.
    pub fn pick<'a>(self, options: &'a [FieldOption]) -> Option<&'a FieldOption> {
        let wanted = match self {
            Polarity::Decline => "no",
            Polarity::Affirm => "yes",
            Polarity::Neutral => return None,
        };
        option_labelled(options, wanted)
    }
}

/// Exact label first, then a label starting with `wanted` ("Yes, I am").
pub fn option_labelled<'a>(options: &'a [FieldOption], wanted: &str) -> Option<&'a FieldOption> {
    options
        .iter()
        .find(|o| normalize_text(&o.label) == wanted)
        .or_else(|| {
            options
                .iter()
                .find(|o| normalize_text(&o.label).starts_with(wanted))
        })
}
