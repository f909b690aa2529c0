//! Equal-opportunities step: demographic questions answered from the profile
//! before the general pass sees the step.

use super::resolver::{resolve_with, RULES};
use super::{apply_action, FormField, FormSurface};
use crate::profile::UserProfile;
use std::collections::HashSet;

/// Answers the equal-opportunity questions among `fields` when the step
/// carries that section. Returns the indices it handled.
pub fn fill_equal_opportunity<S: FormSurface + ?Sized>(
    surface: &S,
    fields: &[FormField],
    profile: &UserProfile,
) -> HashSet<usize> {
    let mut handled = HashSet::new();
    match surface.has_equal_opportunity_section() {
        Ok(true) => log::info!("[*] Equal opportunities section detected"),
        Ok(false) => return handled,
        Err(e) => {
            log::debug!("Equal opportunities probe failed: {:#}", e);
            return handled;
        }
    }

    let rules = || RULES.iter().filter(|rule| rule.topic.is_equal_opportunity());
    for field in fields {
        let Some(resolution) = resolve_with(field, profile, rules()) else {
            continue;
        };
        match apply_action(surface, field, &resolution.action) {
            Ok(()) => {
                log::info!("[✓] {:?}: {}", resolution.topic, resolution.action);
                handled.insert(field.index);
            }
            Err(e) => log::warn!("[!] Could not answer '{}': {:#}", field.label, e),
        }
    }
    handled
}
