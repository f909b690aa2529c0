//! Turns raw element probes into [`FormField`]s.

use super::{FieldKind, FieldOption, FormField, FormSurface};
use crate::utils::normalize_text;
use serde::Deserialize;
use std::collections::HashSet;

/// The element immediately before a control, as the page reported it.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct SiblingProbe {
    pub tag: String,
    pub text: String,
    /// Text of a `label` or `span` nested inside a wrapper `div`.
    pub nested_label: Option<String>,
}

/// One radio/checkbox of a group, or one `<option>` of a select.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct OptionProbe {
    pub id: String,
    pub value: String,
    pub selected: bool,
    pub label_for: Option<String>,
    /// Own text of an `<option>`, or of a wrapping `<label>`.
    pub text: Option<String>,
    pub preceding: Option<SiblingProbe>,
}

/// Everything the classifier needs to know about one element.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct ElementProbe {
    pub id: String,
    pub name: String,
    pub tag: String,
    pub input_type: String,
    pub role: String,
    pub value: String,
    pub checked: bool,
    /// Text of `label[for=<id>]`.
    pub label_for: Option<String>,
    /// Legend (or group label) of the enclosing fieldset.
    pub group_caption: Option<String>,
    pub preceding: Option<SiblingProbe>,
    pub options: Vec<OptionProbe>,
}

/// Words in an id, name or label that mark a field as numeric.
const NUMERIC_HINTS: &[&str] = &["numeric", "number of", "how many", "years"];

fn non_empty(text: Option<&str>) -> Option<String> {
    text.map(|t| t.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|t| !t.is_empty())
}

fn sibling_label(sibling: Option<&SiblingProbe>) -> Option<String> {
    let sibling = sibling?;
    match sibling.tag.to_lowercase().as_str() {
        "label" | "legend" => non_empty(Some(&sibling.text)),
        "div" | "span" => non_empty(sibling.nested_label.as_deref()),
        _ => None,
    }
}

/// `label[for=id]`, then the fieldset caption, then a label-like previous
/// sibling. Empty when none of them has text.
fn element_label(probe: &ElementProbe) -> String {
    non_empty(probe.label_for.as_deref())
        .or_else(|| non_empty(probe.group_caption.as_deref()))
        .or_else(|| sibling_label(probe.preceding.as_ref()))
        .unwrap_or_default()
}

fn option_label(option: &OptionProbe) -> String {
    non_empty(option.label_for.as_deref())
        .or_else(|| non_empty(option.text.as_deref()))
        .or_else(|| sibling_label(option.preceding.as_ref()))
        .unwrap_or_default()
}

fn kind_of(probe: &ElementProbe) -> anyhow::Result<FieldKind> {
    let tag = probe.tag.to_lowercase();
    let input_type = probe.input_type.to_lowercase();
    let kind = match (tag.as_str(), input_type.as_str()) {
        ("select", _) => FieldKind::Select,
        ("textarea", _) => FieldKind::Textarea,
        (_, "radio") => FieldKind::RadioGroup,
        (_, "checkbox") => FieldKind::Checkbox,
        (_, "file") => FieldKind::File,
        (_, "hidden" | "submit" | "button" | "reset" | "image") => {
            anyhow::bail!("'{}' input is not a form field", input_type)
        }
        ("input", _) => FieldKind::Text,
        _ if probe.role.eq_ignore_ascii_case("radiogroup") => FieldKind::RadioGroup,
        _ => anyhow::bail!("unsupported element <{}>", probe.tag),
    };
    Ok(kind)
}

/// Classifies one probed element.
pub fn classify(index: usize, probe: &ElementProbe) -> anyhow::Result<FormField> {
    let kind = kind_of(probe)?;
    let label = element_label(probe);

    let mut options: Vec<FieldOption> = probe
        .options
        .iter()
        .map(|o| FieldOption {
            id: o.id.clone(),
            label: option_label(o),
            value: o.value.clone(),
            selected: o.selected,
        })
        .collect();
    // A lone checkbox is its own answer, not a group.
    if kind == FieldKind::Checkbox && options.len() < 2 {
        options.clear();
    }
    if kind == FieldKind::RadioGroup && options.is_empty() {
        anyhow::bail!("radio '{}' has no options", label);
    }

    let checked = match kind {
        FieldKind::RadioGroup => options.iter().any(|o| o.selected),
        _ => probe.checked,
    };

    let hints = format!(
        "{} {} {}",
        probe.id.to_lowercase(),
        probe.name.to_lowercase(),
        normalize_text(&label)
    );
    let numeric = probe.input_type.eq_ignore_ascii_case("number")
        || NUMERIC_HINTS.iter().any(|h| hints.contains(h));

    Ok(FormField {
        index,
        id: probe.id.clone(),
        name: probe.name.clone(),
        kind,
        label,
        options,
        value: probe.value.clone(),
        checked,
        numeric,
    })
}

/// Scans the open step. A field that fails to probe or classify is logged
/// and skipped; grouped inputs are reported once.
pub fn scan_step<S: FormSurface + ?Sized>(surface: &S) -> Vec<FormField> {
    let count = match surface.field_count() {
        Ok(count) => count,
        Err(e) => {
            log::warn!("[!] Could not enumerate form fields: {:#}", e);
            return Vec::new();
        }
    };

    let mut seen_groups = HashSet::new();
    let mut fields = Vec::with_capacity(count);
    for index in 0..count {
        let field = match surface
            .probe_field(index)
            .and_then(|probe| classify(index, &probe))
        {
            Ok(field) => field,
            Err(e) => {
                log::debug!("Skipping element #{}: {:#}", index, e);
                continue;
            }
        };
        if let Some(group) = field.group_key() {
            if !seen_groups.insert(group) {
                continue;
            }
        }
        fields.push(field);
    }
    log::debug!("Scanned {} field(s) out of {} element(s)", fields.len(), count);
    fields
}
