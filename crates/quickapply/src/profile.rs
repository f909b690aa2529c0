//! The applicant's canned answers.
//!
//! Every key but `email` is optional: a missing key means the matching
//! questions are left to the default-option policy or the sweep.

use crate::error::ApplyError;
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct Disability {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone_country_code: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub headline: Option<String>,
    #[serde(default)]
    pub follow_company: Option<bool>,
    #[serde(default)]
    pub disability: Option<Disability>,
    #[serde(default)]
    pub hear_about_job: Option<String>,
    #[serde(default)]
    pub right_to_work: Option<String>,
    #[serde(default, alias = "living_in_uk")]
    pub living_in_country: Option<String>,
    #[serde(default)]
    pub notice_period: Option<String>,
    #[serde(default)]
    pub experience_level: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub ethnicity: Option<String>,
    #[serde(default)]
    pub sexual_orientation: Option<String>,
    #[serde(default)]
    pub driving_license: Option<String>,
    #[serde(default, alias = "sc_clearance")]
    pub security_clearance: Option<String>,
    #[serde(default, alias = "willing")]
    pub willing_to_relocate: Option<String>,
    /// Skill name -> years, e.g. `{"python": "2"}`.
    #[serde(default, deserialize_with = "years_by_skill")]
    pub years_of_experience: BTreeMap<String, String>,
    #[serde(default)]
    pub salary: Option<String>,
    #[serde(default)]
    pub cover_letter_path: Option<PathBuf>,
    /// `true` when a cover letter already exists at `cover_letter_path`.
    #[serde(default)]
    pub used_cover: Option<bool>,
}

/// Accepts both `"2"` and `2` as the years value.
fn years_by_skill<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: BTreeMap<String, serde_json::Value> = BTreeMap::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .filter_map(|(skill, value)| {
            let years = match value {
                serde_json::Value::String(s) => s,
                serde_json::Value::Number(n) => n.to_string(),
                _ => return None,
            };
            Some((skill.to_lowercase(), years))
        })
        .collect())
}

impl UserProfile {
    /// Reads and validates the profile document.
    pub fn load(path: &Path) -> Result<Self, ApplyError> {
        let raw = std::fs::read_to_string(path).map_err(|e| ApplyError::Config {
            missing: vec![format!("readable profile at {} ({})", path.display(), e)],
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, ApplyError> {
        let profile: UserProfile =
            serde_json::from_str(raw).map_err(|e| ApplyError::InvalidProfile {
                message: e.to_string(),
            })?;
        profile.validate()?;
        Ok(profile)
    }

    fn validate(&self) -> Result<(), ApplyError> {
        match self.email.as_deref().map(str::trim) {
            Some(email) if !email.is_empty() => Ok(()),
            _ => Err(ApplyError::Config {
                missing: vec!["`email` in the user profile".to_string()],
            }),
        }
    }

    pub fn email(&self) -> &str {
        self.email.as_deref().unwrap_or_default()
    }

    /// Whether a finished cover letter is already on disk.
    ///
    /// Only an explicit `used_cover: false` asks for a fresh letter per job.
    pub fn has_cover_letter(&self) -> bool {
        self.used_cover.unwrap_or(true)
    }

    /// Years claimed for the first known skill named in `label`.
    pub fn years_for_label(&self, label: &str) -> Option<&str> {
        let label = label.to_lowercase();
        self.years_of_experience
            .iter()
            .find(|(skill, _)| !skill.is_empty() && label.contains(skill.as_str()))
            .map(|(_, years)| years.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_email_is_a_config_error() {
        let err = UserProfile::from_json(r#"{"city": "Sheffield"}"#).unwrap_err();
        assert!(matches!(err, ApplyError::Config { .. }));

        let err = UserProfile::from_json(r#"{"email": "  "}"#).unwrap_err();
        assert!(matches!(err, ApplyError::Config { .. }));
    }

    #[test]
    fn optional_keys_are_tolerated() {
        let profile = UserProfile::from_json(r#"{"email": "a@b.com"}"#).unwrap();
        assert_eq!(profile.email(), "a@b.com");
        assert!(profile.city.is_none());
        assert!(profile.years_of_experience.is_empty());
        assert!(profile.has_cover_letter());
    }

    #[test]
    fn legacy_key_names_are_accepted() {
        let profile = UserProfile::from_json(
            r#"{
                "email": "a@b.com",
                "living_in_uk": "Yes",
                "sc_clearance": "No",
                "willing": "Yes",
                "used_cover": false,
                "disability": {"status": "no"}
            }"#,
        )
        .unwrap();
        assert_eq!(profile.living_in_country.as_deref(), Some("Yes"));
        assert_eq!(profile.security_clearance.as_deref(), Some("No"));
        assert_eq!(profile.willing_to_relocate.as_deref(), Some("Yes"));
        assert!(!profile.has_cover_letter());
        assert_eq!(
            profile.disability.unwrap().status.as_deref(),
            Some("no")
        );
    }

    #[test]
    fn years_of_experience_accepts_numbers_and_matches_skills() {
        let profile = UserProfile::from_json(
            r#"{"email": "a@b.com", "years_of_experience": {"Python": 2, "SQL": "3"}}"#,
        )
        .unwrap();
        assert_eq!(
            profile.years_for_label("How many years of work experience do you have with Python?"),
            Some("2")
        );
        assert_eq!(profile.years_for_label("Years with sql"), Some("3"));
        assert_eq!(profile.years_for_label("Years with Kotlin"), None);
    }

    #[test]
    fn malformed_profile_is_reported() {
        let err = UserProfile::from_json("{not json").unwrap_err();
        assert!(matches!(err, ApplyError::InvalidProfile { .. }));
    }
}
