//! Walks the search results and applies to each eligible listing.

use crate::browser::{create_browser, initial_tab};
use crate::config::RunConfig;
use crate::cover_letter::{CoverLetterSource, CoverLetterWriter, OpenAiClient, PdfRenderer};
use crate::error::ApplyError;
use crate::form::{ApplicationAttempt, FormSurface, Outcome, StepDriver};
use crate::handlers::JobTab;
use crate::jobs::JobBoard;
use crate::profile::UserProfile;
use crate::registry::FailedApplications;
use crate::session::SessionStore;
use crate::utils::{get_user_data_dir, CancellationToken};
use std::collections::HashSet;

/// What a run did, for the final report.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub submitted: usize,
    pub abandoned: usize,
    /// Listings not attempted: already failed before, ineligible, or without a form.
    pub skipped: usize,
    /// Ids recorded as failed during this run.
    pub failed_ids: Vec<String>,
    pub cancelled: bool,
}

/// Applies to listings one at a time until the quota, the results or the
/// user's patience run out.
pub struct Runner<'a, B: JobBoard + ?Sized, S: FormSurface + ?Sized> {
    board: &'a B,
    surface: &'a S,
    config: &'a RunConfig,
    profile: &'a UserProfile,
    registry: &'a mut FailedApplications,
    cover_letters: CoverLetterSource<'a>,
    cancel: CancellationToken,
}

impl<'a, B: JobBoard + ?Sized, S: FormSurface + ?Sized> Runner<'a, B, S> {
    pub fn new(
        board: &'a B,
        surface: &'a S,
        config: &'a RunConfig,
        profile: &'a UserProfile,
        registry: &'a mut FailedApplications,
        cover_letters: CoverLetterSource<'a>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            board,
            surface,
            config,
            profile,
            registry,
            cover_letters,
            cancel,
        }
    }

    pub fn apply_all(&mut self) -> anyhow::Result<RunSummary> {
        let search = &self.config.search;
        let mut summary = RunSummary::default();
        let mut seen = HashSet::new();

        self.board.search(search)?;
        let mut page = 1;
        'pages: loop {
            let cards = self.board.job_cards()?;
            log::info!("[*] Results page {}: {} listing(s)", page, cards.len());

            for job_id in cards {
                if self.cancel.is_cancelled() {
                    log::warn!("[!] Cancelled, not opening further listings");
                    summary.cancelled = true;
                    break 'pages;
                }
                if summary.submitted >= search.max_applications {
                    break 'pages;
                }
                if !seen.insert(job_id.clone()) {
                    continue;
                }
                if self.registry.contains(&job_id) {
                    log::debug!("Skipping {}, it failed in an earlier run", job_id);
                    summary.skipped += 1;
                    continue;
                }

                match self.apply_to(&job_id) {
                    Ok(Some(Outcome::Submitted)) => summary.submitted += 1,
                    Ok(Some(Outcome::Abandoned)) => {
                        summary.abandoned += 1;
                        summary.failed_ids.push(job_id);
                    }
                    Ok(None) => summary.skipped += 1,
                    Err(e) => {
                        log::warn!("[!] Listing {} failed: {:#}", job_id, e);
                        if let Err(e) = self.registry.record(&job_id) {
                            log::error!("Failed to persist failed application {}: {:#}", job_id, e);
                        }
                        summary.failed_ids.push(job_id);
                    }
                }
            }

            if summary.submitted >= search.max_applications {
                log::info!("[✓] Reached {} submitted application(s)", summary.submitted);
                break;
            }
            if !self.board.next_page()? {
                log::info!("[*] No more result pages");
                break;
            }
            page += 1;
        }
        Ok(summary)
    }

    /// `None` when the listing was not attempted.
    fn apply_to(&mut self, job_id: &str) -> anyhow::Result<Option<Outcome>> {
        let posting = self.board.open(job_id)?;
        let eligibility = &self.config.search.eligibility;
        if !eligibility.is_eligible(&posting.title, posting.quick_apply) {
            log::info!("[*] Skipping '{}', not eligible", posting.title);
            return Ok(None);
        }
        if !self.board.start_application()? {
            log::info!("[!] '{}' has no application form", posting.title);
            return Ok(None);
        }

        let mut attempt = ApplicationAttempt::new(job_id, &posting.title, &posting.description);
        let outcome = StepDriver::new(
            self.surface,
            self.profile,
            &self.config.driver,
            self.registry,
            self.cover_letters,
        )
        .run(&mut attempt);
        Ok(Some(outcome))
    }
}

fn browser_error(e: anyhow::Error) -> ApplyError {
    ApplyError::BrowserError {
        message: format!("{:#}", e),
    }
}

/// One complete run: checks the configuration, signs in and applies.
///
/// Every required input is validated before Chrome is launched.
pub fn run(config: &RunConfig, cancel: CancellationToken) -> Result<RunSummary, ApplyError> {
    let credentials = config.validate()?;
    let profile = UserProfile::load(&config.paths.profile)?;
    let cv_text = crate::cv::extract_text(&config.paths.cv)?;
    let mut registry = FailedApplications::load(&config.paths.failed_applications)?;
    if !registry.is_empty() {
        log::info!("[*] {} listing(s) already marked as failed", registry.len());
    }

    let client = config.openai.clone().map(OpenAiClient::new).transpose()?;
    if client.is_none() {
        log::info!("[*] No OpenAI key, using the cover letter on file");
    }
    let writer = CoverLetterWriter::new(
        client,
        PdfRenderer::new(&config.paths.cover_letter, &config.browser),
    );

    let session = SessionStore::new(&config.paths.session_state);
    let previous = session.load();
    if previous.logged_in {
        log::info!("[*] Previous session ended at {}", previous.last_url);
    }

    let user_data_dir = get_user_data_dir().map_err(|e| ApplyError::BrowserError {
        message: e.to_string(),
    })?;
    let browser = create_browser(&config.browser, Some(user_data_dir)).map_err(browser_error)?;
    let tab = initial_tab(&browser).map_err(browser_error)?;
    let job_tab = JobTab::new(tab, config.selectors.clone(), config.driver.settle_delay);

    if cancel.is_cancelled() {
        return Err(ApplyError::Cancelled);
    }
    job_tab.login(credentials)?;
    if let Err(e) = session.save(true, &job_tab.get_url()) {
        log::warn!("[!] Could not save session state: {:#}", e);
    }

    let cover_letters = CoverLetterSource {
        service: &writer,
        cv_text: &cv_text,
    };
    let summary = Runner::new(
        &job_tab,
        &job_tab,
        config,
        &profile,
        &mut registry,
        cover_letters,
        cancel,
    )
    .apply_all()
    .map_err(browser_error)?;

    registry.save()?;
    if let Err(e) = session.save(true, &job_tab.get_url()) {
        log::warn!("[!] Could not save session state: {:#}", e);
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Credentials, DriverConfig, SearchConfig};
    use crate::form::{ElementProbe, TransitionButton};
    use crate::testing::{FakeBoard, FakeCoverLetters, FakeJob, FakePage, FakeStep};
    use std::path::Path;
    use std::time::Duration;

    struct Fixture {
        dir: tempfile::TempDir,
        config: RunConfig,
        profile: UserProfile,
        letters: FakeCoverLetters,
    }

    impl Fixture {
        fn new(max_applications: usize) -> Self {
            let dir = tempfile::tempdir().unwrap();
            let config = RunConfig {
                credentials: Some(Credentials {
                    email: "a@b.com".into(),
                    password: "secret".into(),
                }),
                openai: None,
                paths: Default::default(),
                browser: Default::default(),
                search: SearchConfig {
                    max_applications,
                    ..Default::default()
                },
                driver: DriverConfig {
                    settle_delay: Duration::ZERO,
                    confirmation_timeout: Duration::ZERO,
                    sweep_seed: Some(5),
                    ..Default::default()
                },
                selectors: Default::default(),
            };
            let letters = FakeCoverLetters::new(dir.path().join("cover.pdf"));
            Self {
                config,
                profile: UserProfile::from_json(r#"{"email": "a@b.com"}"#).unwrap(),
                letters,
                dir,
            }
        }

        fn registry_path(&self) -> std::path::PathBuf {
            self.dir.path().join("failed.json")
        }

        fn run(
            &self,
            board: &FakeBoard<'_>,
            page: &FakePage,
            registry: &mut FailedApplications,
            cancel: CancellationToken,
        ) -> RunSummary {
            let source = CoverLetterSource {
                service: &self.letters,
                cv_text: "",
            };
            Runner::new(board, page, &self.config, &self.profile, registry, source, cancel)
                .apply_all()
                .unwrap()
        }
    }

    fn load_registry(path: &Path) -> FailedApplications {
        FailedApplications::load(path).unwrap()
    }

    fn stalling(id: &str) -> FakeJob {
        FakeJob {
            steps: vec![FakeStep {
                elements: vec![ElementProbe {
                    id: "q".into(),
                    tag: "input".into(),
                    input_type: "text".into(),
                    ..Default::default()
                }],
                progress: Some(50),
                buttons: vec![TransitionButton::Next],
                requires: vec![7],
                ..Default::default()
            }],
            ..FakeJob::submitting(id, "Stalling role")
        }
    }

    #[test]
    fn submits_until_the_quota_across_pages() {
        let fixture = Fixture::new(3);
        let page = FakePage::new(Vec::new());
        let board = FakeBoard::new(
            vec![
                vec![FakeJob::submitting("1", "Engineer"), FakeJob::submitting("2", "Analyst")],
                vec![FakeJob::submitting("3", "Developer"), FakeJob::submitting("4", "Tester")],
            ],
            &page,
        );
        let mut registry = load_registry(&fixture.registry_path());

        let summary = fixture.run(&board, &page, &mut registry, CancellationToken::new());

        assert!(board.searched());
        assert_eq!(summary.submitted, 3);
        assert_eq!(board.opens(), vec!["1", "2", "3"]);
        assert!(summary.failed_ids.is_empty());
    }

    #[test]
    fn registry_ids_and_ineligible_listings_are_skipped() {
        let fixture = Fixture::new(5);
        let mut registry = load_registry(&fixture.registry_path());
        registry.record("1").unwrap();

        let mut no_quick_apply = FakeJob::submitting("2", "Engineer");
        no_quick_apply.posting.quick_apply = false;
        let internship = FakeJob::submitting("3", "Summer Internship");
        let page = FakePage::new(Vec::new());
        let board = FakeBoard::new(
            vec![vec![
                FakeJob::submitting("1", "Engineer"),
                no_quick_apply,
                internship,
                FakeJob::submitting("4", "Engineer"),
            ]],
            &page,
        );

        let summary = fixture.run(&board, &page, &mut registry, CancellationToken::new());

        assert_eq!(summary.submitted, 1);
        assert_eq!(summary.skipped, 3);
        assert!(!board.opens().contains(&"1".to_string()));
    }

    #[test]
    fn failures_are_recorded_and_the_run_continues() {
        let fixture = Fixture::new(5);
        let mut registry = load_registry(&fixture.registry_path());
        let mut broken = FakeJob::submitting("10", "Engineer");
        broken.open_fails = true;
        let page = FakePage::new(Vec::new());
        let board = FakeBoard::new(
            vec![vec![broken, stalling("11"), FakeJob::submitting("12", "Engineer")]],
            &page,
        );

        let summary = fixture.run(&board, &page, &mut registry, CancellationToken::new());

        assert_eq!(summary.submitted, 1);
        assert_eq!(summary.abandoned, 1);
        assert_eq!(summary.failed_ids, vec!["10", "11"]);
        let reloaded = load_registry(&fixture.registry_path());
        assert!(reloaded.contains("10"));
        assert!(reloaded.contains("11"));
        assert!(!reloaded.contains("12"));
    }

    #[test]
    fn cancellation_stops_before_the_next_listing() {
        let fixture = Fixture::new(5);
        let mut registry = load_registry(&fixture.registry_path());
        let page = FakePage::new(Vec::new());
        let board = FakeBoard::new(vec![vec![FakeJob::submitting("1", "Engineer")]], &page);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let summary = fixture.run(&board, &page, &mut registry, cancel);

        assert!(summary.cancelled);
        assert_eq!(summary.submitted, 0);
        assert!(board.opens().is_empty());
    }

    #[test]
    fn run_reports_missing_configuration_before_the_browser() {
        let fixture = Fixture::new(1);
        let mut config = fixture.config.clone();
        config.paths.profile = fixture.dir.path().join("missing.json");
        config.paths.cv = fixture.dir.path().join("missing.pdf");

        match run(&config, CancellationToken::new()) {
            Err(ApplyError::Config { missing }) => {
                assert!(missing.iter().any(|m| m.contains("OPENAI_API_KEY")));
                assert!(missing.iter().any(|m| m.contains("missing.json")));
                assert!(missing.iter().any(|m| m.contains("missing.pdf")));
            }
            other => panic!("unexpected {:?}", other.map(|_| ())),
        }
    }
}
