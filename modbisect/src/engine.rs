//! Bisection search for a single faulty mod.
//!
//! The engine owns the suspect/innocent bookkeeping and drives a
//! [`ModToggler`] to realize each iteration. Between [`SearchEngine::next_iteration`]
//! and [`SearchEngine::report_result`] the user tests the game out of band.
//!
//! ```text
//! NotStarted --start--> InProgress --verdict--> InProgress | Completed | Failed
//!      ^                                                         |
//!      +------------------------- reset -------------------------+
//! ```

use std::path::Path;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::core::bisect::{FoldedVerdict, fold_verdict, split_suspects};
use crate::core::types::{SearchState, Verdict};
use crate::io::progress::SearchProgress;
use crate::registry::ModToggler;

/// Minimum number of enabled mods for a bisection to make sense.
pub const MIN_CANDIDATES: usize = 2;

pub struct SearchEngine<'a, T: ModToggler + ?Sized> {
    toggler: &'a T,
    state: SearchState,
    all_ids: Vec<String>,
    suspects: Vec<String>,
    innocent: Vec<String>,
    currently_disabled: Vec<String>,
    iteration: u32,
}

impl<'a, T: ModToggler + ?Sized> SearchEngine<'a, T> {
    pub fn new(toggler: &'a T) -> Self {
        Self {
            toggler,
            state: SearchState::NotStarted,
            all_ids: Vec::new(),
            suspects: Vec::new(),
            innocent: Vec::new(),
            currently_disabled: Vec::new(),
            iteration: 0,
        }
    }

    pub fn state(&self) -> SearchState {
        self.state
    }

    pub fn iteration(&self) -> u32 {
        self.iteration
    }

    pub fn all_ids(&self) -> &[String] {
        &self.all_ids
    }

    pub fn suspects(&self) -> &[String] {
        &self.suspects
    }

    pub fn innocent(&self) -> &[String] {
        &self.innocent
    }

    /// Ids the last iteration asked to disable.
    pub fn currently_disabled(&self) -> &[String] {
        &self.currently_disabled
    }

    pub fn is_complete(&self) -> bool {
        self.state.is_terminal()
    }

    /// Snapshot the enabled mods as suspects and run the first iteration.
    ///
    /// With fewer than [`MIN_CANDIDATES`] enabled mods the search goes
    /// straight to `Failed` without touching anything on disk.
    pub fn start_search(&mut self) {
        self.all_ids = self.toggler.enabled_ids();
        self.suspects = self.all_ids.clone();
        self.innocent.clear();
        self.currently_disabled.clear();
        self.iteration = 0;

        if self.suspects.len() < MIN_CANDIDATES {
            warn!(
                enabled = self.suspects.len(),
                "not enough mods to bisect (need at least {MIN_CANDIDATES})"
            );
            self.state = SearchState::Failed;
            return;
        }

        info!(suspects = self.suspects.len(), "search started");
        self.state = SearchState::InProgress;
        self.next_iteration();
    }

    /// Disable the first half of the suspects and wait for a verdict.
    ///
    /// Returns true when a new split was applied. Returns false outside
    /// `InProgress`, and when a single suspect remains (the search is then
    /// marked `Completed`).
    pub fn next_iteration(&mut self) -> bool {
        if self.state != SearchState::InProgress {
            warn!(state = %self.state, "next iteration rejected: search not in progress");
            return false;
        }
        if self.suspects.len() == 1 {
            info!(culprit = %self.suspects[0], "culprit found");
            self.state = SearchState::Completed;
            return false;
        }

        self.iteration += 1;
        let (disable, keep) = split_suspects(&self.suspects);
        info!(
            iteration = self.iteration,
            suspects = self.suspects.len(),
            disabling = disable.len(),
            keeping = keep.len(),
            "iteration"
        );
        debug!(disable = ?disable, keep = ?keep, "split");

        let mut keep_enabled = keep;
        keep_enabled.extend(self.innocent.iter().cloned());
        if !self.toggler.disable_all_except(&keep_enabled) {
            warn!(iteration = self.iteration, "some mods could not be toggled");
        }
        self.currently_disabled = disable;
        true
    }

    /// Fold in the verdict for the current iteration.
    ///
    /// Returns false, without changing anything, unless a search is in
    /// progress. Otherwise updates the sets and either finishes the search or
    /// starts the next iteration.
    pub fn report_result(&mut self, verdict: Verdict) -> bool {
        if self.state != SearchState::InProgress {
            warn!(state = %self.state, ?verdict, "verdict rejected: no search in progress");
            return false;
        }

        let enabled = self.toggler.enabled_ids();
        let FoldedVerdict { suspects, innocent } =
            fold_verdict(verdict, &enabled, &self.innocent, &self.currently_disabled);
        self.suspects = suspects;
        self.innocent = innocent;
        info!(
            ?verdict,
            suspects = self.suspects.len(),
            innocent = self.innocent.len(),
            "verdict applied"
        );

        match self.suspects.len() {
            1 => {
                info!(culprit = %self.suspects[0], "search complete");
                self.state = SearchState::Completed;
            }
            0 => {
                warn!("search failed: no single mod explains the problem");
                self.state = SearchState::Failed;
            }
            _ => {
                self.next_iteration();
            }
        }
        true
    }

    /// The culprit, once the search has completed.
    pub fn culprits(&self) -> Vec<String> {
        if self.state == SearchState::Completed {
            self.suspects.clone()
        } else {
            Vec::new()
        }
    }

    /// Forget the search and re-enable every known mod.
    pub fn reset(&mut self) -> bool {
        self.all_ids.clear();
        self.suspects.clear();
        self.innocent.clear();
        self.currently_disabled.clear();
        self.iteration = 0;
        self.state = SearchState::NotStarted;
        let restored = self.toggler.enable_all();
        if !restored {
            warn!("some mods could not be re-enabled");
        }
        info!("search reset");
        restored
    }

    pub fn progress_report(&self) -> String {
        format!(
            "Iteration: {}\nSuspects: {}\nInnocent: {}\nStatus: {}\n",
            self.iteration,
            self.suspects.len(),
            self.innocent.len(),
            self.state
        )
    }

    /// Serializable projection of the current search state.
    pub fn snapshot(&self, store_location: &Path) -> SearchProgress {
        SearchProgress {
            iteration: self.iteration,
            suspects: self.suspects.clone(),
            innocent: self.innocent.clone(),
            currently_disabled: self.currently_disabled.clone(),
            all_ids: self.all_ids.clone(),
            store_location: store_location.display().to_string(),
            timestamp: Utc::now().to_rfc3339(),
            is_active: self.state == SearchState::InProgress,
        }
    }

    /// Rebuild in-memory state from a snapshot.
    ///
    /// The snapshot is trusted as is: nothing is checked against the mods
    /// directory and no mod is toggled.
    pub fn restore(&mut self, progress: &SearchProgress) {
        self.iteration = progress.iteration;
        self.suspects = progress.suspects.clone();
        self.innocent = progress.innocent.clone();
        self.currently_disabled = progress.currently_disabled.clone();
        self.all_ids = progress.all_ids.clone();
        self.state = if progress.is_active {
            SearchState::InProgress
        } else if progress.suspects.len() == 1 {
            SearchState::Completed
        } else if !progress.all_ids.is_empty() {
            SearchState::Failed
        } else {
            SearchState::NotStarted
        };
        debug!(state = %self.state, iteration = self.iteration, "search restored");
    }
}
