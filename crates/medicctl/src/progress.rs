//! Progress bar across a repair pass
//!
//! The bar lives on stderr. Destructive prompts suspend it so the question
//! is not drawn over.

use indicatif::{ProgressBar, ProgressStyle};
use medic_common::confirmation::{ConfirmRequest, Confirmer, Decision};
use medic_common::remediation::PassObserver;
use medic_common::{FixResult, FixSession, RemediationAction};
use std::sync::{Arc, Mutex};

const TEMPLATE: &str = "{prefix:.bold} [{bar:30.cyan/blue}] {pos}/{len} {wide_msg}";

/// Shared handle to the bar of the pass in flight
#[derive(Clone, Default)]
pub struct PassProgress {
    current: Arc<Mutex<Option<ProgressBar>>>,
}

impl PassProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observer(&self) -> ProgressObserver {
        ProgressObserver {
            progress: self.clone(),
        }
    }

    fn bar(&self) -> Option<ProgressBar> {
        self.current.lock().ok().and_then(|bar| bar.clone())
    }

    fn replace(&self, bar: Option<ProgressBar>) -> Option<ProgressBar> {
        match self.current.lock() {
            Ok(mut current) => std::mem::replace(&mut *current, bar),
            Err(_) => None,
        }
    }

    /// Clear whatever bar is still drawn
    pub fn finish(&self) {
        if let Some(bar) = self.replace(None) {
            bar.finish_and_clear();
        }
    }

    /// Run `f` with the bar hidden
    pub fn suspend<T>(&self, f: impl FnOnce() -> T) -> T {
        match self.bar() {
            Some(bar) => bar.suspend(f),
            None => f(),
        }
    }
}

/// Drives the bar from executor events
pub struct ProgressObserver {
    progress: PassProgress,
}

impl PassObserver for ProgressObserver {
    fn pass_started(&mut self, total_actions: usize, dry_run: bool) {
        let bar = ProgressBar::new(total_actions as u64);
        if let Ok(style) = ProgressStyle::with_template(TEMPLATE) {
            bar.set_style(style.progress_chars("=> "));
        }
        bar.set_prefix(if dry_run { "dry run" } else { "repair" });
        if let Some(previous) = self.progress.replace(Some(bar)) {
            previous.finish_and_clear();
        }
    }

    fn action_started(&mut self, action: &RemediationAction, _dry_run: bool) {
        if let Some(bar) = self.progress.bar() {
            bar.set_message(action.description.clone());
        }
    }

    fn action_finished(&mut self, _result: &FixResult) {
        if let Some(bar) = self.progress.bar() {
            bar.inc(1);
        }
    }

    fn pass_finished(&mut self, _session: &FixSession) {
        self.progress.finish();
    }
}

/// Confirmer that hides the progress bar while the inner one asks
pub struct SuspendingConfirmer<C> {
    inner: C,
    progress: PassProgress,
}

impl<C: Confirmer> SuspendingConfirmer<C> {
    pub fn new(inner: C, progress: PassProgress) -> Self {
        Self { inner, progress }
    }
}

impl<C: Confirmer> Confirmer for SuspendingConfirmer<C> {
    fn confirm(&mut self, request: &ConfirmRequest<'_>) -> Decision {
        let inner = &mut self.inner;
        self.progress.suspend(|| inner.confirm(request))
    }
}
