// SPDX-License-Identifier: MIT
//
// Author: Johannes Leupolz <dev@leupolz.eu>

use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum TrialEventKind {
    Enter,
    Exit,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TrialEvent {
    /// Position in the log, taken under the log lock
    pub seq: u64,

    pub trial: usize,

    pub kind: TrialEventKind,

    pub thread: Option<String>,
}

/// Append-only log shared by all trials of a test run.
#[derive(Serialize, Deserialize, Debug, Default)]
pub struct TrialLog {
    pub events: Vec<TrialEvent>,

    #[serde(skip)]
    next_seq: u64,
}

impl TrialLog {
    pub fn shared() -> Arc<Mutex<TrialLog>> {
        Arc::new(Mutex::new(TrialLog::default()))
    }

    pub fn record(log: &Mutex<TrialLog>, trial: usize, kind: TrialEventKind) {
        let thread = std::thread::current().name().map(str::to_string);
        let mut log = log.lock().unwrap();
        let seq = log.next_seq;
        log.next_seq += 1;
        log.events.push(TrialEvent {
            seq,
            trial,
            kind,
            thread,
        });
    }

    /// Events ordered by their sequence number.
    pub fn ordered_events(&self) -> Vec<&TrialEvent> {
        let mut events: Vec<&TrialEvent> = self.events.iter().collect();
        events.sort_by_key(|e| e.seq);
        events
    }

    /// Highest number of trials that were between Enter and Exit at the same time.
    pub fn peak_concurrency(&self) -> usize {
        let mut current = 0usize;
        let mut peak = 0usize;
        for event in self.ordered_events() {
            match event.kind {
                TrialEventKind::Enter => {
                    current += 1;
                    peak = peak.max(current);
                }
                TrialEventKind::Exit => current = current.saturating_sub(1),
            }
        }
        peak
    }

    pub fn entered_order(&self) -> Vec<usize> {
        self.trials_with(TrialEventKind::Enter)
    }

    pub fn exited_order(&self) -> Vec<usize> {
        self.trials_with(TrialEventKind::Exit)
    }

    fn trials_with(&self, kind: TrialEventKind) -> Vec<usize> {
        self.ordered_events()
            .into_iter()
            .filter(|e| e.kind == kind)
            .map(|e| e.trial)
            .collect()
    }

    /// Sequence numbers are unique, every trial entered exactly once and
    /// exited after it entered.
    pub fn is_well_formed(&self) -> bool {
        let mut entered = std::collections::HashSet::new();
        let mut exited = std::collections::HashSet::new();
        let mut last_seq = None;
        for event in self.ordered_events() {
            if last_seq == Some(event.seq) {
                return false;
            }
            last_seq = Some(event.seq);
            let ok = match event.kind {
                TrialEventKind::Enter => entered.insert(event.trial),
                TrialEventKind::Exit => {
                    entered.contains(&event.trial) && exited.insert(event.trial)
                }
            };
            if !ok {
                return false;
            }
        }
        entered.len() == exited.len()
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}
