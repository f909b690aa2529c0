//! Maps a field to an answer from the applicant's profile.
//!
//! Rules are tried in table order and the first one that both matches the
//! label and has an answer wins, so more specific phrases sit above the
//! generic ones ("phone country code" before "phone", "email" before
//! "address").

use super::polarity::Polarity;
use super::{Action, FieldKind, FieldOption, FormField};
use crate::profile::UserProfile;
use crate::utils::normalize_text;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    Email,
    PhoneCountryCode,
    PhoneNumber,
    CoverLetter,
    FollowCompany,
    Disability,
    HearAboutJob,
    RightToWork,
    LivingInCountry,
    NoticePeriod,
    ExperienceLevel,
    YearsOfExperience,
    Gender,
    Ethnicity,
    SexualOrientation,
    DrivingLicense,
    Salary,
    SecurityClearance,
    WillingToRelocate,
    Address,
    Headline,
    City,
    /// No rule matched; the field's own options supplied the answer.
    DefaultOption,
}

impl Topic {
    /// Topics answered by the equal-opportunities pass.
    pub fn is_equal_opportunity(self) -> bool {
        matches!(
            self,
            Topic::Disability
                | Topic::HearAboutJob
                | Topic::RightToWork
                | Topic::LivingInCountry
                | Topic::NoticePeriod
                | Topic::ExperienceLevel
                | Topic::Gender
                | Topic::Ethnicity
                | Topic::SexualOrientation
                | Topic::DrivingLicense
                | Topic::SecurityClearance
                | Topic::WillingToRelocate
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub topic: Topic,
    pub action: Action,
}

/// A profile answer before it is fitted to the field's kind.
enum Answer {
    /// Free text, or an option value for choice fields.
    Text(String),
    /// An option label for choice fields, or free text otherwise.
    Choice(String),
    Flag(bool),
    File(PathBuf),
}

impl Answer {
    fn into_action(self, kind: FieldKind) -> Option<Action> {
        match (self, kind) {
            (Answer::Text(v) | Answer::Choice(v), FieldKind::Text | FieldKind::Textarea) => {
                Some(Action::SetText(v))
            }
            (Answer::Text(v), k) if k.has_options() => Some(Action::SelectByValue(v)),
            (Answer::Choice(v), k) if k.has_options() => Some(Action::SelectByLabelSubstring(v)),
            (Answer::Flag(b), FieldKind::Checkbox) => Some(Action::Check(b)),
            (Answer::File(p), FieldKind::File) => Some(Action::UploadFile(p)),
            _ => None,
        }
    }
}

pub struct Rule {
    pub topic: Topic,
    pub keywords: &'static [&'static str],
    answer: fn(&UserProfile, &FormField) -> Option<Answer>,
}

fn choice(value: &Option<String>) -> Option<Answer> {
    value
        .as_deref()
        .filter(|v| !v.trim().is_empty())
        .map(|v| Answer::Choice(v.to_string()))
}

fn text(value: &Option<String>) -> Option<Answer> {
    value
        .as_deref()
        .filter(|v| !v.trim().is_empty())
        .map(|v| Answer::Text(v.to_string()))
}

fn cover_letter(profile: &UserProfile, field: &FormField) -> Option<Answer> {
    match field.kind {
        FieldKind::File if !profile.has_cover_letter() => Some(Answer::File(
            profile.cover_letter_path.clone().unwrap_or_default(),
        )),
        FieldKind::File => profile.cover_letter_path.clone().map(Answer::File),
        FieldKind::Checkbox => Some(Answer::Flag(profile.has_cover_letter())),
        _ => None,
    }
}

fn disability(profile: &UserProfile, field: &FormField) -> Option<Answer> {
    let disability = profile.disability.as_ref()?;
    match field.kind {
        FieldKind::Text | FieldKind::Textarea => {
            let disclosed = disability
                .status
                .as_deref()
                .is_some_and(|s| s.trim().eq_ignore_ascii_case("yes"));
            if disclosed {
                text(&disability.description)
            } else {
                None
            }
        }
        _ => choice(&disability.status),
    }
}

fn years_of_experience(profile: &UserProfile, field: &FormField) -> Option<Answer> {
    let years = profile.years_for_label(&field.label).unwrap_or("0");
    Some(Answer::Text(years.to_string()))
}

/// The rule table. Order is priority.
pub static RULES: &[Rule] = &[
    Rule {
        topic: Topic::Email,
        keywords: &["email"],
        answer: |p, _| text(&p.email),
    },
    Rule {
        topic: Topic::PhoneCountryCode,
        keywords: &["phone country code", "country code"],
        answer: |p, f| match f.kind {
            // A free-text "phone" field also matches this rule in reverse.
            FieldKind::Text | FieldKind::Textarea => None,
            _ => choice(&p.phone_country_code),
        },
    },
    Rule {
        topic: Topic::PhoneNumber,
        keywords: &["mobile phone number", "phone", "mobile"],
        answer: |p, _| text(&p.phone_number),
    },
    Rule {
        topic: Topic::CoverLetter,
        keywords: &["cover letter"],
        answer: cover_letter,
    },
    Rule {
        topic: Topic::FollowCompany,
        keywords: &["follow"],
        answer: |p, _| p.follow_company.map(Answer::Flag),
    },
    Rule {
        topic: Topic::Disability,
        keywords: &["disability", "impairment"],
        answer: disability,
    },
    Rule {
        topic: Topic::HearAboutJob,
        keywords: &["hear about"],
        answer: |p, _| choice(&p.hear_about_job),
    },
    Rule {
        topic: Topic::RightToWork,
        keywords: &["right to work"],
        answer: |p, _| choice(&p.right_to_work),
    },
    Rule {
        topic: Topic::LivingInCountry,
        keywords: &["currently living", "living in", "reside in"],
        answer: |p, _| choice(&p.living_in_country),
    },
    Rule {
        topic: Topic::NoticePeriod,
        keywords: &["notice period", "availability"],
        answer: |p, _| choice(&p.notice_period),
    },
    Rule {
        topic: Topic::ExperienceLevel,
        keywords: &["experience level", "experience-level"],
        answer: |p, _| choice(&p.experience_level),
    },
    Rule {
        topic: Topic::YearsOfExperience,
        keywords: &[
            "years of experience",
            "years of work experience",
            "how many years",
            "years experience",
        ],
        answer: years_of_experience,
    },
    Rule {
        topic: Topic::Gender,
        keywords: &["gender"],
        answer: |p, _| choice(&p.gender),
    },
    Rule {
        topic: Topic::Ethnicity,
        keywords: &["ethnicity", "ethnic"],
        answer: |p, _| choice(&p.ethnicity),
    },
    Rule {
        topic: Topic::SexualOrientation,
        keywords: &["sexual orientation"],
        answer: |p, _| choice(&p.sexual_orientation),
    },
    Rule {
        topic: Topic::DrivingLicense,
        keywords: &["driving license", "driving licence", "driver's license", "drivers license"],
        answer: |p, _| choice(&p.driving_license),
    },
    Rule {
        topic: Topic::Salary,
        keywords: &["salary", "compensation"],
        answer: |p, _| text(&p.salary),
    },
    Rule {
        topic: Topic::SecurityClearance,
        keywords: &["security clearance", "sc clearance"],
        answer: |p, _| choice(&p.security_clearance),
    },
    Rule {
        topic: Topic::WillingToRelocate,
        keywords: &["willing to", "relocate"],
        answer: |p, _| choice(&p.willing_to_relocate),
    },
    Rule {
        topic: Topic::Address,
        keywords: &["address"],
        answer: |p, _| text(&p.address),
    },
    Rule {
        topic: Topic::Headline,
        keywords: &["headline"],
        answer: |p, _| text(&p.headline),
    },
    Rule {
        topic: Topic::City,
        keywords: &["city", "location"],
        answer: |p, _| choice(&p.city),
    },
];

/// Shortest label allowed to match by being contained in a keyword.
/// Keeps two-letter fragments like "no" from matching "notice period".
const MIN_REVERSE_MATCH: usize = 3;

/// Case-insensitive containment in either direction. An empty label never
/// matches.
pub fn label_matches(label: &str, keywords: &[&str]) -> bool {
    let label = normalize_text(label);
    if label.is_empty() {
        return false;
    }
    keywords.iter().any(|keyword| {
        label.contains(keyword)
            || (label.chars().count() >= MIN_REVERSE_MATCH && keyword.contains(label.as_str()))
    })
}

/// First rule in `rules` that matches the label and yields an action.
pub fn resolve_with<'r>(
    field: &FormField,
    profile: &UserProfile,
    rules: impl IntoIterator<Item = &'r Rule>,
) -> Option<Resolution> {
    rules.into_iter().find_map(|rule| {
        if !label_matches(&field.label, rule.keywords) {
            return None;
        }
        let action = (rule.answer)(profile, field)?.into_action(field.kind)?;
        Some(Resolution {
            topic: rule.topic,
            action,
        })
    })
}

/// Resolves `field` against the full table, falling back to the
/// default-option policy for any field with options. `None` leaves the field
/// to the sweep.
pub fn resolve(field: &FormField, profile: &UserProfile) -> Option<Resolution> {
    resolve_with(field, profile, RULES.iter()).or_else(|| default_resolution(field))
}

/// The default-option policy as a resolution. `None` for fields without
/// options (text, files and lone checkboxes).
pub fn default_resolution(field: &FormField) -> Option<Resolution> {
    if field.options.is_empty() {
        return None;
    }
    default_option(&field.label, &field.options).map(|option| Resolution {
        topic: Topic::DefaultOption,
        action: if option.value.trim().is_empty() {
            Action::SelectByLabelSubstring(option.label.clone())
        } else {
            Action::SelectByValue(option.value.clone())
        },
    })
}

/// Labels that decline to answer; preferred when no rule applies.
const NEUTRAL_LABELS: &[&str] = &["no", "0", "none", "prefer not to say"];

/// The yes/no answer the wording calls for, else a neutral option, else the
/// first real option, else the first option of any kind.
pub fn default_option<'a>(label: &str, options: &'a [FieldOption]) -> Option<&'a FieldOption> {
    Polarity::of(label)
        .pick(options)
        .or_else(|| {
            options
                .iter()
                .find(|o| NEUTRAL_LABELS.contains(&normalize_text(&o.label).as_str()))
        })
        .or_else(|| options.iter().find(|o| !o.is_placeholder()))
        .or_else(|| options.first())
}
