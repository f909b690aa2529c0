//! Last-resort pass that gives every still-empty field some value, so a
//! validation error on an unknown question does not block the step.

use super::polarity::{option_labelled, Polarity};
use super::{FieldKind, FieldOption, FormField, FormSurface, Target};
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashSet;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SweepReport {
    pub filled: usize,
    pub skipped: usize,
    pub failed: usize,
}

fn fill_one<S, R>(
    surface: &S,
    field: &FormField,
    rng: &mut R,
    checkbox_probability: f64,
) -> anyhow::Result<bool>
where
    S: FormSurface + ?Sized,
    R: Rng,
{
    match field.kind {
        FieldKind::Text | FieldKind::Textarea => {
            let filler = if field.numeric { "0" } else { "N/A" };
            surface.fill_text(field.index, filler)?;
            Ok(true)
        }
        FieldKind::Select => {
            let real: Vec<&FieldOption> =
                field.options.iter().filter(|o| !o.is_placeholder()).collect();
            let Some(option) = real.choose(rng) else {
                return Ok(false);
            };
            surface.select_value(field.index, &option.value)?;
            Ok(true)
        }
        FieldKind::RadioGroup => {
            let option = Polarity::of(&field.label)
                .pick(&field.options)
                .or_else(|| field.options.choose(rng));
            let Some(option) = option.filter(|o| !o.id.is_empty()) else {
                return Ok(false);
            };
            surface.set_checked(Target::Element(&option.id), true)?;
            Ok(true)
        }
        FieldKind::Checkbox => {
            let tick = match Polarity::of(&field.label) {
                Polarity::Decline => false,
                Polarity::Affirm => true,
                Polarity::Neutral => rng.gen_bool(checkbox_probability.clamp(0.0, 1.0)),
            };
            if !tick {
                return Ok(false);
            }
            if field.options.is_empty() {
                surface.set_checked(Target::Field(field.index), true)?;
                return Ok(true);
            }
            let option = option_labelled(&field.options, "yes").or_else(|| field.options.choose(rng));
            match option.filter(|o| !o.id.is_empty()) {
                Some(option) => {
                    surface.set_checked(Target::Element(&option.id), true)?;
                    Ok(true)
                }
                None => Ok(false),
            }
        }
        FieldKind::File => Ok(false),
    }
}

/// Fills every field in `fields` that has no value yet. Fields that already
/// carry a value are untouched, so running it twice changes nothing.
pub fn sweep<S, R>(
    surface: &S,
    fields: &[FormField],
    rng: &mut R,
    checkbox_probability: f64,
) -> SweepReport
where
    S: FormSurface + ?Sized,
    R: Rng,
{
    let mut report = SweepReport::default();
    let mut groups = HashSet::new();

    for field in fields {
        if let Some(group) = field.group_key() {
            if !groups.insert(group) {
                continue;
            }
        }
        if field.has_value() {
            report.skipped += 1;
            continue;
        }
        match fill_one(surface, field, rng, checkbox_probability) {
            Ok(true) => {
                log::debug!("Swept '{}'", field.label);
                report.filled += 1;
            }
            Ok(false) => report.skipped += 1,
            Err(e) => {
                log::warn!("[!] Could not sweep '{}': {:#}", field.label, e);
                report.failed += 1;
            }
        }
    }
    log::info!(
        "[*] Sweep filled {} field(s), left {} alone",
        report.filled,
        report.skipped
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::scan_step;
    use crate::form::tests::{field, option};
    use crate::testing::{FakePage, FakeStep, SurfaceCall};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn radio(label: &str, name: &str) -> FormField {
        let mut f = field(FieldKind::RadioGroup, label);
        f.name = name.to_string();
        f.options = vec![
            option(&format!("{name}-yes"), "Yes", "Yes"),
            option(&format!("{name}-no"), "No", "No"),
        ];
        f
    }

    #[test]
    fn biased_radios_follow_their_keywords() {
        let page = FakePage::new(vec![FakeStep::default()]);
        let fields = vec![
            radio("Will you now or in the future require visa sponsorship?", "visa"),
            radio("Are you legally authorized to work in the UK?", "auth"),
            radio("Are you comfortable commuting to this job's location?", "commute"),
        ];

        let mut rng = StdRng::seed_from_u64(7);
        let report = sweep(&page, &fields, &mut rng, 0.5);

        assert_eq!(report.filled, 3);
        assert_eq!(
            page.calls(),
            vec![
                SurfaceCall::Check("visa-no".into(), true),
                SurfaceCall::Check("auth-yes".into(), true),
                SurfaceCall::Check("commute-yes".into(), true),
            ]
        );
    }

    #[test]
    fn radios_sharing_a_name_are_answered_once() {
        let page = FakePage::new(vec![FakeStep::default()]);
        let first = radio("Are you willing to relocate?", "relocate");
        let mut second = first.clone();
        second.index = 1;
        second.id = "relocate-no".into();

        let report = sweep(&page, &[first, second], &mut StdRng::seed_from_u64(5), 0.5);

        assert_eq!(report.filled, 1);
        assert_eq!(report.skipped, 0);
        assert_eq!(page.calls(), vec![SurfaceCall::Check("relocate-yes".into(), true)]);
    }

    #[test]
    fn text_fillers_depend_on_numeric_hint() {
        let page = FakePage::new(vec![FakeStep::default()]);
        let mut years = field(FieldKind::Text, "Years with Go");
        years.index = 1;
        years.numeric = true;
        let mut motto = field(FieldKind::Textarea, "Motto");
        motto.index = 2;

        sweep(&page, &[years, motto], &mut StdRng::seed_from_u64(1), 0.5);
        assert_eq!(
            page.calls(),
            vec![
                SurfaceCall::Fill(1, "0".into()),
                SurfaceCall::Fill(2, "N/A".into()),
            ]
        );
    }

    #[test]
    fn select_never_picks_placeholder() {
        let mut select = field(FieldKind::Select, "Shift");
        select.options = vec![
            option("", "Select an option", "Select an option"),
            option("", "Early", "early"),
            option("", "Late", "late"),
        ];
        for seed in 0..20 {
            let page = FakePage::new(vec![FakeStep::default()]);
            sweep(&page, std::slice::from_ref(&select), &mut StdRng::seed_from_u64(seed), 0.5);
            match page.calls().as_slice() {
                [SurfaceCall::Select(0, value)] => assert!(value == "early" || value == "late"),
                other => panic!("unexpected calls {other:?}"),
            }
        }
    }

    #[test]
    fn sponsorship_checkbox_stays_unchecked() {
        let page = FakePage::new(vec![FakeStep::default()]);
        let tick = field(FieldKind::Checkbox, "I require sponsorship");
        let report = sweep(&page, &[tick], &mut StdRng::seed_from_u64(3), 1.0);
        assert_eq!(report.filled, 0);
        assert!(page.calls().is_empty());
    }

    #[test]
    fn answered_fields_are_left_alone() {
        let page = FakePage::new(vec![FakeStep::default()]);
        let mut city = field(FieldKind::Text, "City");
        city.value = "Leeds".into();
        let mut picked = radio("Relocate?", "reloc");
        picked.options[0].selected = true;

        let report = sweep(&page, &[city, picked], &mut StdRng::seed_from_u64(3), 0.5);
        assert_eq!(report.skipped, 2);
        assert!(page.calls().is_empty());
    }

    #[test]
    fn second_sweep_over_a_rescan_changes_nothing() {
        let q = crate::form::ElementProbe {
            id: "q".into(),
            tag: "input".into(),
            input_type: "text".into(),
            label_for: Some("Anything else?".into()),
            ..Default::default()
        };
        let mut r = q.clone();
        r.id = "r-yes".into();
        r.name = "r".into();
        r.input_type = "radio".into();
        r.label_for = None;
        r.group_caption = Some("Are you happy to work hybrid?".into());
        r.options = vec![
            crate::form::OptionProbe {
                id: "r-yes".into(),
                value: "Yes".into(),
                label_for: Some("Yes".into()),
                ..Default::default()
            },
            crate::form::OptionProbe {
                id: "r-no".into(),
                value: "No".into(),
                label_for: Some("No".into()),
                ..Default::default()
            },
        ];
        let page = FakePage::new(vec![FakeStep {
            elements: vec![q, r],
            ..Default::default()
        }]);
        let mut rng = StdRng::seed_from_u64(11);

        let first = sweep(&page, &scan_step(&page), &mut rng, 0.5);
        assert_eq!(first.filled, 2);
        let calls_after_first = page.calls().len();

        let second = sweep(&page, &scan_step(&page), &mut rng, 0.5);
        assert_eq!(second.filled, 0);
        assert_eq!(page.calls().len(), calls_after_first);
    }
}
