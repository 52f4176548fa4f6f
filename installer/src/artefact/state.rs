//! Per-toolchain materialisation state machine.
//!
//! ```text
//! Declared -> Fetching -> Fetched -> Extracting -> Extracted -> Registered
//!     \_________\__________\__________\_____________\-> Failed
//! ```
//!
//! `Registered` and `Failed` are terminal.

use std::fmt;

/// The pipeline stage an artefact was in when it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Download and checksum verification.
    Fetch,
    /// Decompression and staging on disk.
    Extract,
    /// Binding the binary and manifest into a handle.
    Register,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Fetch => "fetch",
            Self::Extract => "extract",
            Self::Register => "register",
        })
    }
}

/// Where a toolchain is in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ArtefactState {
    /// Known from configuration, nothing done yet.
    #[default]
    Declared,
    /// Download in progress.
    Fetching,
    /// Bytes downloaded and verified.
    Fetched,
    /// Writing to the output directory.
    Extracting,
    /// Files staged on disk.
    Extracted,
    /// Handle available by name.
    Registered,
    /// Stopped during `stage`.
    Failed {
        /// The stage that failed.
        stage: Stage,
    },
}

/// A transition the state machine does not allow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("illegal state transition from {from} to {to}")]
pub struct StateError {
    /// State before the attempted transition.
    pub from: ArtefactState,
    /// Requested state.
    pub to: ArtefactState,
}

impl ArtefactState {
    /// Whether no further transitions are possible.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Registered | Self::Failed { .. })
    }

    /// The stage this state belongs to, if any.
    #[must_use]
    pub fn stage(self) -> Option<Stage> {
        match self {
            Self::Declared | Self::Fetching => Some(Stage::Fetch),
            Self::Fetched | Self::Extracting => Some(Stage::Extract),
            Self::Extracted => Some(Stage::Register),
            Self::Registered => None,
            Self::Failed { stage } => Some(stage),
        }
    }

    /// Move to `next` if the transition is legal.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`] for any transition other than the single step
    /// forward along the happy path or a move to `Failed` from a
    /// non-terminal state.
    pub fn transition(self, next: Self) -> Result<Self, StateError> {
        let legal = match (self, next) {
            (
                Self::Declared | Self::Fetching | Self::Fetched | Self::Extracting | Self::Extracted,
                Self::Failed { .. },
            ) => true,
            (from, to) => from.successor() == Some(to),
        };
        if legal {
            Ok(next)
        } else {
            Err(StateError {
                from: self,
                to: next,
            })
        }
    }

    /// Step forward along the happy path.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`] from a terminal state.
    pub fn advance(self) -> Result<Self, StateError> {
        match self.successor() {
            Some(next) => Ok(next),
            None => Err(StateError {
                from: self,
                to: self,
            }),
        }
    }

    /// Record a failure during the current stage.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`] from a terminal state.
    pub fn fail(self) -> Result<Self, StateError> {
        let stage = self.stage().unwrap_or(Stage::Register);
        self.transition(Self::Failed { stage })
    }

    fn successor(self) -> Option<Self> {
        match self {
            Self::Declared => Some(Self::Fetching),
            Self::Fetching => Some(Self::Fetched),
            Self::Fetched => Some(Self::Extracting),
            Self::Extracting => Some(Self::Extracted),
            Self::Extracted => Some(Self::Registered),
            Self::Registered | Self::Failed { .. } => None,
        }
    }
}

impl fmt::Display for ArtefactState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Declared => f.write_str("declared"),
            Self::Fetching => f.write_str("fetching"),
            Self::Fetched => f.write_str("fetched"),
            Self::Extracting => f.write_str("extracting"),
            Self::Extracted => f.write_str("extracted"),
            Self::Registered => f.write_str("registered"),
            Self::Failed { stage } => write!(f, "failed during {stage}"),
        }
    }
}
