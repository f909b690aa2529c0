use super::{FormSurface, TransitionButton};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionResult {
    /// Submit was clicked and the confirmation appeared.
    Submitted,
    /// Review or Next was clicked; carries the meter reading afterwards.
    Advanced(Option<u32>),
    NoButtonFound,
    /// Submit was clicked but no confirmation showed up in time.
    SubmitUnconfirmed,
}

/// Observes the completion meter and presses the transition buttons.
pub struct ProgressOracle<'a, S: FormSurface + ?Sized> {
    surface: &'a S,
    settle_delay: Duration,
    confirmation_timeout: Duration,
}

impl<'a, S: FormSurface + ?Sized> ProgressOracle<'a, S> {
    pub fn new(surface: &'a S, settle_delay: Duration, confirmation_timeout: Duration) -> Self {
        Self {
            surface,
            settle_delay,
            confirmation_timeout,
        }
    }

    /// Meter value, or `None` when it is absent or unreadable.
    pub fn read_progress(&self) -> Option<u32> {
        match self.surface.progress_value() {
            Ok(value) => value,
            Err(e) => {
                log::debug!("Progress meter unreadable: {:#}", e);
                None
            }
        }
    }

    /// Clicks the first present button in priority order.
    pub fn attempt_transition(&self) -> TransitionResult {
        for button in TransitionButton::PRIORITY {
            match self.surface.click_transition(button) {
                Ok(true) => {}
                Ok(false) => continue,
                Err(e) => {
                    log::warn!("[!] Clicking {} failed: {:#}", button, e);
                    continue;
                }
            }
            log::debug!("Clicked {}", button);
            self.surface.settle(self.settle_delay);

            if button != TransitionButton::Submit {
                return TransitionResult::Advanced(self.read_progress());
            }
            return match self.surface.confirm_submission(self.confirmation_timeout) {
                Ok(true) => TransitionResult::Submitted,
                Ok(false) => TransitionResult::SubmitUnconfirmed,
                Err(e) => {
                    log::warn!("[!] Waiting for submit confirmation failed: {:#}", e);
                    TransitionResult::SubmitUnconfirmed
                }
            };
        }
        TransitionResult::NoButtonFound
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakePage, FakeStep, SurfaceCall};

    fn oracle(page: &FakePage) -> ProgressOracle<'_, FakePage> {
        ProgressOracle::new(page, Duration::ZERO, Duration::ZERO)
    }

    #[test]
    fn review_takes_priority_over_next() {
        let page = FakePage::new(vec![
            FakeStep {
                progress: Some(10),
                buttons: vec![TransitionButton::Next, TransitionButton::Review],
                ..Default::default()
            },
            FakeStep {
                progress: Some(90),
                ..Default::default()
            },
        ]);

        assert_eq!(oracle(&page).read_progress(), Some(10));
        assert_eq!(oracle(&page).attempt_transition(), TransitionResult::Advanced(Some(90)));
        assert_eq!(
            page.calls(),
            vec![SurfaceCall::Click(TransitionButton::Review)]
        );
    }

    #[test]
    fn submit_needs_confirmation() {
        let confirmed = FakePage::new(vec![FakeStep {
            buttons: vec![TransitionButton::Submit],
            confirms: true,
            ..Default::default()
        }]);
        assert_eq!(oracle(&confirmed).attempt_transition(), TransitionResult::Submitted);

        let silent = FakePage::new(vec![FakeStep {
            buttons: vec![TransitionButton::Submit],
            ..Default::default()
        }]);
        assert_eq!(
            oracle(&silent).attempt_transition(),
            TransitionResult::SubmitUnconfirmed
        );
    }

    #[test]
    fn no_buttons_and_no_meter() {
        let page = FakePage::new(vec![FakeStep::default()]);
        assert_eq!(oracle(&page).read_progress(), None);
        assert_eq!(oracle(&page).attempt_transition(), TransitionResult::NoButtonFound);
    }
}
