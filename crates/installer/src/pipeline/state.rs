//! Pipeline stages and run status

use std::fmt;

/// Stage of an install run. Declaration order is execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    Idle,
    ResolvingSource,
    Downloading,
    Extracting,
    Registering,
    Complete,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Idle => "Idle",
            Stage::ResolvingSource => "ResolvingSource",
            Stage::Downloading => "Downloading",
            Stage::Extracting => "Extracting",
            Stage::Registering => "Registering",
            Stage::Complete => "Complete",
        };
        f.write_str(name)
    }
}

/// Forward-only cursor over [`Stage`] for a single run
#[derive(Debug, Clone, Copy)]
pub struct StageTracker {
    current: Stage,
}

impl Default for StageTracker {
    fn default() -> Self {
        Self { current: Stage::Idle }
    }
}

impl StageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Stage {
        self.current
    }

    /// Move to `next`. Returns `false` and stays put if `next` is not
    /// strictly after the current stage.
    pub fn advance(&mut self, next: Stage) -> bool {
        if next <= self.current {
            return false;
        }
        self.current = next;
        true
    }
}

/// Externally visible status of a controller
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PipelineStatus {
    #[default]
    Idle,
    Running(Stage),
    Complete,
    Failed { stage: Stage, cause: String },
}
