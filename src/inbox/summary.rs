//! Run summary accounting.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Outcome of one successful write to the inbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileWrite {
    /// The file did not exist before this write.
    Created(String),
    /// Content was appended to an existing file.
    Appended(String),
}

impl FileWrite {
    pub fn filename(&self) -> &str {
        match self {
            Self::Created(name) | Self::Appended(name) => name,
        }
    }
}

/// What one batch run did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Messages in the received batch.
    pub parsed_count: usize,
    /// Messages dropped by the sender/group whitelist.
    pub ignored_count: usize,
    /// Files that did not exist before this run, sorted.
    pub created_files: Vec<String>,
    /// Pre-existing files that were appended to, sorted.
    pub appended_files: Vec<String>,
}

/// Mutable accumulator, finalized into a [`RunSummary`].
#[derive(Debug, Default)]
pub struct SummaryBuilder {
    parsed_count: usize,
    ignored_count: usize,
    created: BTreeSet<String>,
    appended: BTreeSet<String>,
}

impl SummaryBuilder {
    pub fn new(parsed_count: usize) -> Self {
        Self {
            parsed_count,
            ..Self::default()
        }
    }

    pub fn ignore(&mut self) {
        self.ignored_count += 1;
    }

    pub fn record(&mut self, write: FileWrite) {
        match write {
            FileWrite::Created(name) => {
                self.created.insert(name);
            }
            FileWrite::Appended(name) => {
                self.appended.insert(name);
            }
        }
    }

    pub fn extend(&mut self, writes: impl IntoIterator<Item = FileWrite>) {
        for write in writes {
            self.record(write);
        }
    }

    pub fn finish(self) -> RunSummary {
        RunSummary {
            parsed_count: self.parsed_count,
            ignored_count: self.ignored_count,
            created_files: self.created.into_iter().collect(),
            appended_files: self.appended.into_iter().collect(),
        }
    }
}
