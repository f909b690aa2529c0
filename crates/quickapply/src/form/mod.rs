//! Multi-step application form handling.
//!
//! The browser is reached only through [`FormSurface`]; everything in this
//! module is plain data plus decisions, so the whole state machine runs
//! against an in-memory page in tests.

pub mod classifier;
pub mod diversity;
pub mod driver;
pub mod oracle;
pub mod polarity;
pub mod resolver;
pub mod sweep;

pub use classifier::{classify, scan_step, ElementProbe, OptionProbe, SiblingProbe};
pub use driver::{ApplicationAttempt, Outcome, StepDriver, StepState};
pub use oracle::{ProgressOracle, TransitionResult};
pub use resolver::{default_resolution, resolve, Resolution, Topic};
pub use sweep::{sweep, SweepReport};

use crate::utils::normalize_text;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Text,
    Textarea,
    Select,
    RadioGroup,
    Checkbox,
    File,
}

impl FieldKind {
    pub fn has_options(self) -> bool {
        matches!(
            self,
            FieldKind::Select | FieldKind::RadioGroup | FieldKind::Checkbox
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldOption {
    pub id: String,
    pub label: String,
    pub value: String,
    pub selected: bool,
}

/// Phrases that mark a `<select>` entry as a prompt rather than an answer.
const PLACEHOLDER_PHRASES: &[&str] = &["select an option", "please select", "choose", "select"];

impl FieldOption {
    pub fn is_placeholder(&self) -> bool {
        let label = normalize_text(&self.label);
        self.value.trim().is_empty()
            || label.is_empty()
            || PLACEHOLDER_PHRASES.iter().any(|p| label.contains(p))
    }
}

/// One control on the current step, rebuilt on every scan.
#[derive(Debug, Clone, PartialEq)]
pub struct FormField {
    /// Position among the step's scanned elements; the surface addresses
    /// fields by it.
    pub index: usize,
    pub id: String,
    pub name: String,
    pub kind: FieldKind,
    pub label: String,
    pub options: Vec<FieldOption>,
    pub value: String,
    pub checked: bool,
    pub numeric: bool,
}

impl FormField {
    /// Radio groups and checkbox groups share one key across their inputs.
    pub fn group_key(&self) -> Option<String> {
        match self.kind {
            FieldKind::RadioGroup => Some(if self.name.is_empty() {
                format!("radio:{}", self.first_option_id().unwrap_or(&self.id))
            } else {
                format!("radio:{}", self.name)
            }),
            FieldKind::Checkbox if !self.options.is_empty() => Some(format!(
                "checkbox:{}",
                self.first_option_id().unwrap_or(&self.id)
            )),
            _ => None,
        }
    }

    fn first_option_id(&self) -> Option<&str> {
        self.options
            .first()
            .map(|o| o.id.as_str())
            .filter(|id| !id.is_empty())
    }

    pub fn selected_option(&self) -> Option<&FieldOption> {
        self.options.iter().find(|o| o.selected)
    }

    /// Whether the control already carries an answer.
    pub fn has_value(&self) -> bool {
        match self.kind {
            FieldKind::Text | FieldKind::Textarea | FieldKind::File => {
                !self.value.trim().is_empty()
            }
            FieldKind::Select => match self.selected_option() {
                Some(option) => !option.is_placeholder(),
                None => !self.value.trim().is_empty() && self.options.is_empty(),
            },
            FieldKind::RadioGroup => self.selected_option().is_some(),
            FieldKind::Checkbox => self.checked || self.selected_option().is_some(),
        }
    }

    /// Exact (case-insensitive) value match first, then containment.
    pub fn option_by_value(&self, value: &str) -> Option<&FieldOption> {
        let wanted = value.trim().to_lowercase();
        if wanted.is_empty() {
            return None;
        }
        self.options
            .iter()
            .find(|o| o.value.trim().to_lowercase() == wanted)
            .or_else(|| {
                self.options
                    .iter()
                    .find(|o| o.value.to_lowercase().contains(&wanted))
            })
    }

    /// Exact (case-insensitive) label match first, then containment.
    pub fn option_by_label(&self, text: &str) -> Option<&FieldOption> {
        let wanted = normalize_text(text);
        if wanted.is_empty() {
            return None;
        }
        self.options
            .iter()
            .find(|o| normalize_text(&o.label) == wanted)
            .or_else(|| {
                self.options
                    .iter()
                    .find(|o| normalize_text(&o.label).contains(&wanted))
            })
    }
}

/// What to do with a single field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    SetText(String),
    SelectByValue(String),
    SelectByLabelSubstring(String),
    Check(bool),
    UploadFile(PathBuf),
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::SetText(v) => write!(f, "fill '{}'", v),
            Action::SelectByValue(v) => write!(f, "select value '{}'", v),
            Action::SelectByLabelSubstring(v) => write!(f, "select option like '{}'", v),
            Action::Check(true) => write!(f, "check"),
            Action::Check(false) => write!(f, "uncheck"),
            Action::UploadFile(p) => write!(f, "upload {}", p.display()),
        }
    }
}

/// Addresses either a scanned field or a specific element (an option input).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target<'a> {
    Field(usize),
    Element(&'a str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionButton {
    Review,
    Next,
    Submit,
}

impl TransitionButton {
    /// Fixed priority; a step shows at most one of them.
    pub const PRIORITY: [TransitionButton; 3] = [
        TransitionButton::Review,
        TransitionButton::Next,
        TransitionButton::Submit,
    ];
}

impl fmt::Display for TransitionButton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransitionButton::Review => "Review",
            TransitionButton::Next => "Next",
            TransitionButton::Submit => "Submit",
        };
        f.write_str(name)
    }
}

/// The page operations the form logic needs.
///
/// Every probe is bounded: implementations return `Ok(None)` / `Ok(false)`
/// for "not there" rather than waiting indefinitely.
pub trait FormSurface {
    /// Number of candidate elements in the open application.
    fn field_count(&self) -> anyhow::Result<usize>;
    /// Reads one element without touching page state.
    fn probe_field(&self, index: usize) -> anyhow::Result<ElementProbe>;

    fn fill_text(&self, index: usize, value: &str) -> anyhow::Result<()>;
    fn select_value(&self, index: usize, value: &str) -> anyhow::Result<()>;
    fn set_checked(&self, target: Target<'_>, checked: bool) -> anyhow::Result<()>;
    fn upload_file(&self, index: usize, path: &Path) -> anyhow::Result<()>;

    /// Current value of the completion meter, `None` when none is shown.
    fn progress_value(&self) -> anyhow::Result<Option<u32>>;
    /// Clicks the button if it is present; `Ok(false)` when it is not.
    fn click_transition(&self, button: TransitionButton) -> anyhow::Result<bool>;
    /// Waits up to `timeout` for the post-submit confirmation and clicks it.
    fn confirm_submission(&self, timeout: Duration) -> anyhow::Result<bool>;
    fn has_equal_opportunity_section(&self) -> anyhow::Result<bool>;
    /// Closes the application dialog, discarding unsaved progress.
    fn dismiss_application(&self) -> anyhow::Result<()>;

    fn settle(&self, delay: Duration) {
        std::thread::sleep(delay);
    }
}

/// Carries out `action` on `field` through the surface.
pub fn apply_action<S: FormSurface + ?Sized>(
    surface: &S,
    field: &FormField,
    action: &Action,
) -> anyhow::Result<()> {
    match (action, field.kind) {
        (Action::SetText(value), FieldKind::Text | FieldKind::Textarea) => {
            surface.fill_text(field.index, value)
        }
        (Action::SelectByValue(value), _) if field.kind.has_options() => {
            let option = field.option_by_value(value).ok_or_else(|| {
                anyhow::anyhow!("no option with value like '{}' in '{}'", value, field.label)
            })?;
            choose_option(surface, field, option)
        }
        (Action::SelectByLabelSubstring(text), _) if field.kind.has_options() => {
            let option = field.option_by_label(text).ok_or_else(|| {
                anyhow::anyhow!("no option labelled like '{}' in '{}'", text, field.label)
            })?;
            choose_option(surface, field, option)
        }
        (Action::Check(checked), FieldKind::Checkbox) => {
            surface.set_checked(Target::Field(field.index), *checked)
        }
        (Action::UploadFile(path), FieldKind::File) => {
            if !path.is_file() {
                anyhow::bail!("file {} does not exist", path.display());
            }
            surface.upload_file(field.index, path)
        }
        (action, kind) => anyhow::bail!("cannot {} on a {:?} field", action, kind),
    }
}

fn choose_option<S: FormSurface + ?Sized>(
    surface: &S,
    field: &FormField,
    option: &FieldOption,
) -> anyhow::Result<()> {
    match field.kind {
        FieldKind::Select => surface.select_value(field.index, &option.value),
        _ if option.id.is_empty() => {
            anyhow::bail!("option '{}' of '{}' has no id", option.label, field.label)
        }
        _ => surface.set_checked(Target::Element(&option.id), true),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::testing::{FakePage, FakeStep, SurfaceCall};

    pub(crate) fn option(id: &str, label: &str, value: &str) -> FieldOption {
        FieldOption {
            id: id.to_string(),
            label: label.to_string(),
            value: value.to_string(),
            selected: false,
        }
    }

    pub(crate) fn field(kind: FieldKind, label: &str) -> FormField {
        FormField {
            index: 0,
            id: "f0".to_string(),
            name: String::new(),
            kind,
            label: label.to_string(),
            options: Vec::new(),
            value: String::new(),
            checked: false,
            numeric: false,
        }
    }

    #[test]
    fn select_placeholders_do_not_count_as_values() {
        let mut select = field(FieldKind::Select, "Notice period");
        select.options = vec![
            FieldOption {
                selected: true,
                ..option("", "Select an option", "Select an option")
            },
            option("", "1 month", "1 month"),
        ];
        assert!(!select.has_value());

        select.options[0].selected = false;
        select.options[1].selected = true;
        assert!(select.has_value());
    }

    #[test]
    fn option_lookup_prefers_exact_matches() {
        let mut radio = field(FieldKind::RadioGroup, "Gender");
        radio.options = vec![
            option("g1", "Non-binary", "nb"),
            option("g2", "Man", "man"),
            option("g3", "Woman", "woman"),
        ];
        assert_eq!(radio.option_by_label("man").unwrap().id, "g2");
        assert_eq!(radio.option_by_label("bin").unwrap().id, "g1");
        assert_eq!(radio.option_by_value("WOMAN").unwrap().id, "g3");
        assert!(radio.option_by_label("").is_none());
    }

    #[test]
    fn apply_routes_actions_by_kind() {
        let page = FakePage::new(vec![FakeStep::default()]);

        let text = field(FieldKind::Text, "Email");
        apply_action(&page, &text, &Action::SetText("a@b.com".into())).unwrap();

        let mut radio = field(FieldKind::RadioGroup, "Relocate?");
        radio.options = vec![option("r-yes", "Yes", "Yes"), option("r-no", "No", "No")];
        apply_action(&page, &radio, &Action::SelectByLabelSubstring("no".into())).unwrap();

        let mut select = field(FieldKind::Select, "Country code");
        select.index = 3;
        select.options = vec![option("", "United Kingdom (+44)", "GB"), option("", "France (+33)", "FR")];
        apply_action(&page, &select, &Action::SelectByValue("fr".into())).unwrap();

        assert_eq!(
            page.calls(),
            vec![
                SurfaceCall::Fill(0, "a@b.com".into()),
                SurfaceCall::Check("r-no".into(), true),
                SurfaceCall::Select(3, "FR".into()),
            ]
        );
    }

    #[test]
    fn apply_rejects_mismatched_actions() {
        let page = FakePage::new(vec![FakeStep::default()]);
        let text = field(FieldKind::Text, "City");
        assert!(apply_action(&page, &text, &Action::Check(true)).is_err());

        let mut radio = field(FieldKind::RadioGroup, "Relocate?");
        radio.options = vec![option("r-yes", "Yes", "Yes")];
        assert!(apply_action(&page, &radio, &Action::SelectByLabelSubstring("maybe".into())).is_err());

        let file = field(FieldKind::File, "Cover letter");
        assert!(apply_action(&page, &file, &Action::UploadFile("/definitely/missing.pdf".into())).is_err());
        assert!(page.calls().is_empty());
    }
}
