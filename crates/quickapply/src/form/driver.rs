//! The per-application state machine.

use super::diversity::fill_equal_opportunity;
use super::{
    apply_action, default_resolution, resolve, scan_step, sweep, Action, FormField, FormSurface,
    ProgressOracle, Topic, TransitionResult,
};
use crate::config::DriverConfig;
use crate::cover_letter::CoverLetterSource;
use crate::profile::UserProfile;
use crate::registry::FailedApplications;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepState {
    Scanning,
    Resolving,
    Transitioning,
    Advanced,
    Stuck,
    Submitted,
    Abandoned,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Submitted,
    Abandoned,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Submitted => f.write_str("submitted"),
            Outcome::Abandoned => f.write_str("abandoned"),
        }
    }
}

/// Bookkeeping for one job's application.
#[derive(Debug, Clone)]
pub struct ApplicationAttempt {
    pub job_id: String,
    pub job_title: String,
    pub job_description: String,
    /// Last observed meter value. Only compared within this attempt.
    pub progress_value: Option<u32>,
    pub stuck_count: u32,
    pub transitions: u32,
    pub outcome: Option<Outcome>,
    /// Every state the driver passed through, in order.
    pub states: Vec<StepState>,
    cover_letter: Option<PathBuf>,
    cover_letter_requested: bool,
}

impl ApplicationAttempt {
    pub fn new(job_id: &str, job_title: &str, job_description: &str) -> Self {
        Self {
            job_id: job_id.to_string(),
            job_title: job_title.to_string(),
            job_description: job_description.to_string(),
            progress_value: None,
            stuck_count: 0,
            transitions: 0,
            outcome: None,
            states: Vec::new(),
            cover_letter: None,
            cover_letter_requested: false,
        }
    }

    /// Records a meter reading after a transition attempt. Returns whether
    /// the step changed; an unchanged reading counts one more stall.
    pub fn observe(&mut self, progress: Option<u32>) -> bool {
        if progress != self.progress_value {
            self.progress_value = progress;
            self.stuck_count = 0;
            true
        } else {
            self.stuck_count += 1;
            false
        }
    }

    pub fn cover_letter(&self) -> Option<&PathBuf> {
        self.cover_letter.as_ref()
    }
}

fn describe_progress(progress: Option<u32>) -> String {
    progress.map_or_else(|| "unknown".to_string(), |v| format!("{}%", v))
}

/// Drives one open application form until it is submitted or abandoned.
pub struct StepDriver<'a, S: FormSurface + ?Sized> {
    surface: &'a S,
    profile: &'a UserProfile,
    config: &'a DriverConfig,
    registry: &'a mut FailedApplications,
    cover_letters: CoverLetterSource<'a>,
    rng: StdRng,
}

impl<'a, S: FormSurface + ?Sized> StepDriver<'a, S> {
    pub fn new(
        surface: &'a S,
        profile: &'a UserProfile,
        config: &'a DriverConfig,
        registry: &'a mut FailedApplications,
        cover_letters: CoverLetterSource<'a>,
    ) -> Self {
        let rng = match config.sweep_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            surface,
            profile,
            config,
            registry,
            cover_letters,
            rng,
        }
    }

    pub fn run(&mut self, attempt: &mut ApplicationAttempt) -> Outcome {
        let oracle = ProgressOracle::new(
            self.surface,
            self.config.settle_delay,
            self.config.confirmation_timeout,
        );
        attempt.progress_value = oracle.read_progress();
        log::info!(
            "[*] Applying to '{}' (progress {})",
            attempt.job_title,
            describe_progress(attempt.progress_value)
        );

        let mut fields: Vec<FormField> = Vec::new();
        let mut retried = false;
        let mut state = StepState::Scanning;
        loop {
            attempt.states.push(state);
            log::debug!("{} -> {:?}", attempt.job_id, state);

            state = match state {
                StepState::Scanning if attempt.transitions >= self.config.max_steps => {
                    log::warn!(
                        "[!] Gave up after {} transitions without submitting",
                        attempt.transitions
                    );
                    StepState::Abandoned
                }
                StepState::Scanning => {
                    fields = scan_step(self.surface);
                    StepState::Resolving
                }
                StepState::Resolving => {
                    self.resolve_step(&fields, attempt);
                    StepState::Transitioning
                }
                StepState::Transitioning => {
                    let next = self.transition(&oracle, attempt);
                    if next == StepState::Advanced {
                        retried = false;
                    }
                    next
                }
                StepState::Advanced => {
                    log::info!(
                        "[*] Advanced to step at {}",
                        describe_progress(attempt.progress_value)
                    );
                    StepState::Scanning
                }
                StepState::Stuck if attempt.stuck_count >= self.config.max_stuck => {
                    log::warn!(
                        "[!] No progress after {} attempt(s), abandoning",
                        attempt.stuck_count
                    );
                    StepState::Abandoned
                }
                StepState::Stuck if retried => {
                    retried = false;
                    StepState::Scanning
                }
                StepState::Stuck => {
                    log::info!(
                        "[*] Step did not advance (stuck {}/{}), sweeping unfilled fields",
                        attempt.stuck_count,
                        self.config.max_stuck
                    );
                    let current = scan_step(self.surface);
                    sweep(
                        self.surface,
                        &current,
                        &mut self.rng,
                        self.config.checkbox_probability,
                    );
                    retried = true;
                    StepState::Transitioning
                }
                StepState::Submitted => {
                    attempt.outcome = Some(Outcome::Submitted);
                    log::info!("[✓] Application for '{}' submitted", attempt.job_title);
                    return Outcome::Submitted;
                }
                StepState::Abandoned => {
                    self.abandon(attempt);
                    return Outcome::Abandoned;
                }
            };
        }
    }

    fn transition(
        &self,
        oracle: &ProgressOracle<'_, S>,
        attempt: &mut ApplicationAttempt,
    ) -> StepState {
        attempt.transitions += 1;
        match oracle.attempt_transition() {
            TransitionResult::Submitted => StepState::Submitted,
            TransitionResult::Advanced(progress) => {
                if attempt.observe(progress) {
                    StepState::Advanced
                } else {
                    log::info!("[!] Progress stayed at {}", describe_progress(progress));
                    StepState::Stuck
                }
            }
            TransitionResult::NoButtonFound => {
                log::warn!("[!] No Review, Next or Submit button on this step");
                attempt.observe(attempt.progress_value);
                StepState::Stuck
            }
            TransitionResult::SubmitUnconfirmed => {
                log::warn!("[!] Submit was clicked but never confirmed");
                attempt.observe(attempt.progress_value);
                StepState::Stuck
            }
        }
    }

    fn resolve_step(&mut self, fields: &[FormField], attempt: &mut ApplicationAttempt) {
        let handled = fill_equal_opportunity(self.surface, fields, self.profile);

        for field in fields {
            if handled.contains(&field.index) {
                continue;
            }
            let Some(resolution) = resolve(field, self.profile) else {
                log::debug!("No answer for '{}', leaving it to the sweep", field.label);
                continue;
            };
            // Defaults must not overwrite what the form or an earlier pass chose.
            if resolution.topic == Topic::DefaultOption && field.has_value() {
                continue;
            }

            let action = match resolution.action {
                Action::UploadFile(path) if resolution.topic == Topic::CoverLetter => {
                    match self.cover_letter_file(path, attempt) {
                        Ok(path) => Action::UploadFile(path),
                        Err(e) => {
                            log::warn!("[!] No cover letter to upload: {:#}", e);
                            continue;
                        }
                    }
                }
                action => action,
            };

            match apply_action(self.surface, field, &action) {
                Ok(()) => log::info!("[*] {}: {}", field.label, action),
                Err(e) if resolution.topic != Topic::DefaultOption => {
                    log::warn!("[!] '{}' rejected the profile answer: {:#}", field.label, e);
                    self.apply_default(field);
                }
                Err(e) => log::warn!("[!] Skipping '{}': {:#}", field.label, e),
            }
        }
    }

    /// Falls back to the default option after a profile answer did not fit
    /// the field's options.
    fn apply_default(&self, field: &FormField) {
        if field.has_value() {
            return;
        }
        let Some(fallback) = default_resolution(field) else {
            return;
        };
        match apply_action(self.surface, field, &fallback.action) {
            Ok(()) => log::info!("[*] {}: {} (default)", field.label, fallback.action),
            Err(e) => log::warn!("[!] Skipping '{}': {:#}", field.label, e),
        }
    }

    /// The file to upload for a cover-letter field. Generates one at most
    /// once per attempt when the profile has none on file.
    fn cover_letter_file(
        &mut self,
        profile_path: PathBuf,
        attempt: &mut ApplicationAttempt,
    ) -> anyhow::Result<PathBuf> {
        if self.profile.has_cover_letter() {
            return Ok(profile_path);
        }
        if let Some(path) = &attempt.cover_letter {
            return Ok(path.clone());
        }
        if attempt.cover_letter_requested {
            anyhow::bail!("cover letter generation already failed for this job");
        }
        attempt.cover_letter_requested = true;

        log::info!("[*] Writing a cover letter for '{}'", attempt.job_title);
        let service = self.cover_letters.service;
        let markdown = service.generate(
            &attempt.job_title,
            &attempt.job_description,
            self.cover_letters.cv_text,
        )?;
        let path = service.render(&markdown)?;
        log::info!("[✓] Cover letter saved to {}", path.display());
        attempt.cover_letter = Some(path.clone());
        Ok(path)
    }

    fn abandon(&mut self, attempt: &mut ApplicationAttempt) {
        attempt.outcome = Some(Outcome::Abandoned);
        if let Err(e) = self.surface.dismiss_application() {
            log::warn!("[!] Could not close the application dialog: {:#}", e);
        }
        match self.registry.record(&attempt.job_id) {
            Ok(_) => log::info!("[*] Recorded {} as failed", attempt.job_id),
            Err(e) => log::error!("Failed to persist failed application {}: {:#}", attempt.job_id, e),
        }
    }
}
