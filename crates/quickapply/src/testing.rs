//! In-memory stand-ins for the browser side, used by unit tests.

use crate::config::SearchConfig;
use crate::cover_letter::CoverLetterService;
use crate::form::{ElementProbe, FormSurface, Target, TransitionButton};
use crate::jobs::{JobBoard, JobPosting};
use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// One recorded mutation or click.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SurfaceCall {
    Fill(usize, String),
    Select(usize, String),
    /// Element id, or `#i` when addressed by field index.
    Check(String, bool),
    Upload(usize, PathBuf),
    Click(TransitionButton),
    Dismiss,
}

/// One screen of a fake application form.
#[derive(Debug, Clone, Default)]
pub(crate) struct FakeStep {
    pub elements: Vec<ElementProbe>,
    pub progress: Option<u32>,
    pub buttons: Vec<TransitionButton>,
    /// Element indexes that must be touched before any transition succeeds.
    pub requires: Vec<usize>,
    pub equal_opportunity: bool,
    /// Whether clicking Submit is followed by the confirmation.
    pub confirms: bool,
}

pub(crate) struct FakePage {
    steps: RefCell<Vec<FakeStep>>,
    current: Cell<usize>,
    touched: RefCell<HashSet<usize>>,
    calls: RefCell<Vec<SurfaceCall>>,
    submitted: Cell<bool>,
}

impl FakePage {
    pub fn new(steps: Vec<FakeStep>) -> Self {
        Self {
            steps: RefCell::new(steps),
            current: Cell::new(0),
            touched: RefCell::new(HashSet::new()),
            calls: RefCell::new(Vec::new()),
            submitted: Cell::new(false),
        }
    }

    /// Replaces the form with a new one. Recorded calls are kept.
    pub fn load(&self, steps: Vec<FakeStep>) {
        *self.steps.borrow_mut() = steps;
        self.current.set(0);
        self.touched.borrow_mut().clear();
        self.submitted.set(false);
    }

    pub fn calls(&self) -> Vec<SurfaceCall> {
        self.calls.borrow().clone()
    }

    fn record(&self, call: SurfaceCall) {
        self.calls.borrow_mut().push(call);
    }

    fn with_step<T>(&self, f: impl FnOnce(&FakeStep) -> T) -> Option<T> {
        self.steps.borrow().get(self.current.get()).map(f)
    }

    fn with_element(&self, index: usize, f: impl FnOnce(&mut ElementProbe)) {
        let mut steps = self.steps.borrow_mut();
        if let Some(element) = steps
            .get_mut(self.current.get())
            .and_then(|step| step.elements.get_mut(index))
        {
            f(element);
        }
        self.touched.borrow_mut().insert(index);
    }

    fn requirements_met(&self) -> bool {
        let touched = self.touched.borrow();
        self.with_step(|step| step.requires.iter().all(|i| touched.contains(i)))
            .unwrap_or(true)
    }

    /// Ticks or clears every element or option carrying `id`.
    fn check_element(&self, id: &str, checked: bool) {
        let mut steps = self.steps.borrow_mut();
        let Some(step) = steps.get_mut(self.current.get()) else {
            return;
        };
        let mut touched = self.touched.borrow_mut();
        for (index, element) in step.elements.iter_mut().enumerate() {
            let radio = element.input_type == "radio";
            let mut hit = false;
            if element.id == id {
                element.checked = checked;
                hit = true;
            }
            if element.options.iter().any(|o| o.id == id) {
                for option in element.options.iter_mut() {
                    if option.id == id {
                        option.selected = checked;
                    } else if radio && checked {
                        option.selected = false;
                    }
                }
                hit = true;
            }
            if hit {
                touched.insert(index);
            }
        }
    }
}

impl FormSurface for FakePage {
    fn field_count(&self) -> anyhow::Result<usize> {
        Ok(self.with_step(|step| step.elements.len()).unwrap_or(0))
    }

    fn probe_field(&self, index: usize) -> anyhow::Result<ElementProbe> {
        self.with_step(|step| step.elements.get(index).cloned())
            .flatten()
            .ok_or_else(|| anyhow::anyhow!("element #{} disappeared", index))
    }

    fn fill_text(&self, index: usize, value: &str) -> anyhow::Result<()> {
        self.record(SurfaceCall::Fill(index, value.to_string()));
        self.with_element(index, |element| element.value = value.to_string());
        Ok(())
    }

    fn select_value(&self, index: usize, value: &str) -> anyhow::Result<()> {
        self.record(SurfaceCall::Select(index, value.to_string()));
        self.with_element(index, |element| {
            element.value = value.to_string();
            for option in element.options.iter_mut() {
                option.selected = option.value == value;
            }
        });
        Ok(())
    }

    fn set_checked(&self, target: Target<'_>, checked: bool) -> anyhow::Result<()> {
        match target {
            Target::Field(index) => {
                self.record(SurfaceCall::Check(format!("#{}", index), checked));
                self.with_element(index, |element| element.checked = checked);
            }
            Target::Element(id) => {
                self.record(SurfaceCall::Check(id.to_string(), checked));
                self.check_element(id, checked);
            }
        }
        Ok(())
    }

    fn upload_file(&self, index: usize, path: &Path) -> anyhow::Result<()> {
        self.record(SurfaceCall::Upload(index, path.to_path_buf()));
        self.with_element(index, |element| {
            element.value = path.to_string_lossy().into_owned()
        });
        Ok(())
    }

    fn progress_value(&self) -> anyhow::Result<Option<u32>> {
        Ok(self.with_step(|step| step.progress).flatten())
    }

    fn click_transition(&self, button: TransitionButton) -> anyhow::Result<bool> {
        let present = self
            .with_step(|step| step.buttons.contains(&button))
            .unwrap_or(false);
        if !present {
            return Ok(false);
        }
        self.record(SurfaceCall::Click(button));
        if !self.requirements_met() {
            return Ok(true);
        }

        if button == TransitionButton::Submit {
            self.submitted.set(true);
        } else if self.current.get() + 1 < self.steps.borrow().len() {
            self.current.set(self.current.get() + 1);
            self.touched.borrow_mut().clear();
        }
        Ok(true)
    }

    fn confirm_submission(&self, _timeout: Duration) -> anyhow::Result<bool> {
        let confirms = self.with_step(|step| step.confirms).unwrap_or(false);
        Ok(self.submitted.get() && confirms)
    }

    fn has_equal_opportunity_section(&self) -> anyhow::Result<bool> {
        Ok(self
            .with_step(|step| step.equal_opportunity)
            .unwrap_or(false))
    }

    fn dismiss_application(&self) -> anyhow::Result<()> {
        self.record(SurfaceCall::Dismiss);
        Ok(())
    }

    fn settle(&self, _delay: Duration) {}
}

/// Writes a fixed letter and counts how often it was asked to.
pub(crate) struct FakeCoverLetters {
    output: PathBuf,
    generated: Cell<usize>,
    fail: Cell<bool>,
}

impl FakeCoverLetters {
    pub fn new(output: PathBuf) -> Self {
        Self {
            output,
            generated: Cell::new(0),
            fail: Cell::new(false),
        }
    }

    pub fn generated(&self) -> usize {
        self.generated.get()
    }

    pub fn fail_generation(&self) {
        self.fail.set(true);
    }

    pub fn output(&self) -> &Path {
        &self.output
    }
}

impl CoverLetterService for FakeCoverLetters {
    fn generate(
        &self,
        job_title: &str,
        _job_description: &str,
        _cv_text: &str,
    ) -> anyhow::Result<String> {
        self.generated.set(self.generated.get() + 1);
        if self.fail.get() {
            anyhow::bail!("model unavailable");
        }
        Ok(format!("Dear hiring team,\n\nI would like to apply for {}.", job_title))
    }

    fn render(&self, markdown: &str) -> anyhow::Result<PathBuf> {
        std::fs::write(&self.output, markdown)?;
        Ok(self.output.clone())
    }
}

/// A listing on the fake board, with the form it opens.
#[derive(Debug, Clone, Default)]
pub(crate) struct FakeJob {
    pub posting: JobPosting,
    pub steps: Vec<FakeStep>,
    pub open_fails: bool,
}

impl FakeJob {
    /// A quick-apply listing whose single step submits straight away.
    pub fn submitting(id: &str, title: &str) -> Self {
        Self {
            posting: JobPosting {
                id: id.to_string(),
                title: title.to_string(),
                description: String::new(),
                quick_apply: true,
            },
            steps: vec![FakeStep {
                buttons: vec![TransitionButton::Submit],
                confirms: true,
                ..Default::default()
            }],
            open_fails: false,
        }
    }
}

/// Result pages of listings. Starting an application loads the listing's
/// steps into the shared page.
pub(crate) struct FakeBoard<'a> {
    pages: Vec<Vec<FakeJob>>,
    page: Cell<usize>,
    opened: RefCell<Option<FakeJob>>,
    opens: RefCell<Vec<String>>,
    searched: Cell<bool>,
    surface: &'a FakePage,
}

impl<'a> FakeBoard<'a> {
    pub fn new(pages: Vec<Vec<FakeJob>>, surface: &'a FakePage) -> Self {
        Self {
            pages,
            page: Cell::new(0),
            opened: RefCell::new(None),
            opens: RefCell::new(Vec::new()),
            searched: Cell::new(false),
            surface,
        }
    }

    /// Ids of every listing opened, in order.
    pub fn opens(&self) -> Vec<String> {
        self.opens.borrow().clone()
    }

    pub fn searched(&self) -> bool {
        self.searched.get()
    }
}

impl JobBoard for FakeBoard<'_> {
    fn search(&self, _search: &SearchConfig) -> anyhow::Result<()> {
        self.searched.set(true);
        Ok(())
    }

    fn job_cards(&self) -> anyhow::Result<Vec<String>> {
        Ok(self
            .pages
            .get(self.page.get())
            .map(|jobs| jobs.iter().map(|j| j.posting.id.clone()).collect())
            .unwrap_or_default())
    }

    fn open(&self, job_id: &str) -> anyhow::Result<JobPosting> {
        self.opens.borrow_mut().push(job_id.to_string());
        let job = self
            .pages
            .get(self.page.get())
            .and_then(|jobs| jobs.iter().find(|j| j.posting.id == job_id))
            .ok_or_else(|| anyhow::anyhow!("no card for {}", job_id))?;
        if job.open_fails {
            anyhow::bail!("detail pane for {} never loaded", job_id);
        }
        *self.opened.borrow_mut() = Some(job.clone());
        Ok(job.posting.clone())
    }

    fn start_application(&self) -> anyhow::Result<bool> {
        match self.opened.borrow().as_ref() {
            Some(job) if !job.steps.is_empty() => {
                self.surface.load(job.steps.clone());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn next_page(&self) -> anyhow::Result<bool> {
        if self.page.get() + 1 < self.pages.len() {
            self.page.set(self.page.get() + 1);
            Ok(true)
        } else {
            Ok(false)
        }
    }
}
