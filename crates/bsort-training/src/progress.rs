use serde::{Deserialize, Serialize};
use std::fmt;

/// Pipeline stages reported to a `ProgressSink`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Tracking,
    Training,
    Locate,
    Relocate,
    Export,
    Manifest,
    Predict,
    Persist,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Tracking => "tracking",
            Self::Training => "training",
            Self::Locate => "locate",
            Self::Relocate => "relocate",
            Self::Export => "export",
            Self::Manifest => "manifest",
            Self::Predict => "predict",
            Self::Persist => "persist",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressEvent {
    Started { stage: Stage, message: String },
    /// Something the user should know about that does not affect the outcome.
    Notice { message: String },
    /// A recoverable failure. `code` names the error kind, e.g. `ExportFailed`.
    Warning { code: String, message: String },
    Finished { stage: Stage, message: String },
}

pub trait ProgressSink: Send + Sync {
    fn on_event(&self, event: ProgressEvent);
}

/// Sink that drops every event.
#[derive(Debug, Default)]
pub struct NullProgressSink;

impl ProgressSink for NullProgressSink {
    fn on_event(&self, _event: ProgressEvent) {}
}

pub(crate) fn started(progress: &dyn ProgressSink, stage: Stage, message: impl Into<String>) {
    progress.on_event(ProgressEvent::Started { stage, message: message.into() });
}

pub(crate) fn finished(progress: &dyn ProgressSink, stage: Stage, message: impl Into<String>) {
    progress.on_event(ProgressEvent::Finished { stage, message: message.into() });
}

pub(crate) fn notice(progress: &dyn ProgressSink, message: impl Into<String>) {
    progress.on_event(ProgressEvent::Notice { message: message.into() });
}

pub(crate) fn warning(progress: &dyn ProgressSink, code: &str, message: impl Into<String>) {
    progress.on_event(ProgressEvent::Warning { code: code.to_string(), message: message.into() });
}
