//! Structured record of what the pipeline did.
//!
//! Passes never print. Each change they make to a function, and each
//! diagnostic they raise, is appended to an [`EventLog`] that tests and
//! drivers inspect after the run. The log is append-only and accepts new
//! events through `&self`, so one log can be shared by every pass through
//! the [`CompilerContext`](crate::compiler::CompilerContext).
//!
//! # Example
//!
//! ```rust,ignore
//! use irscope::compiler::{EventKind, EventLog};
//!
//! let log = EventLog::new();
//! log.record(EventKind::PhiInserted)
//!     .at(function, 3)
//!     .pass("promotion")
//!     .message("phi for v7");
//! assert_eq!(log.count_kind(EventKind::PhiInserted), 1);
//! println!("{}", log.summary());
//! ```

use std::{collections::BTreeMap, fmt};

use strum::IntoEnumIterator;

use crate::ir::FunctionId;

/// What an [`Event`] reports.
///
/// Variants are declared in the order [`EventLog::summary`] lists them.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, strum::Display, strum::EnumIter,
)]
pub enum EventKind {
    /// A reference cell was replaced by SSA values.
    #[strum(serialize = "cell promoted")]
    CellPromoted,
    /// A phi was inserted during promotion.
    #[strum(serialize = "phi inserted")]
    PhiInserted,
    /// An instruction was removed.
    #[strum(serialize = "instruction removed")]
    InstructionRemoved,
    /// An unreachable block was removed.
    #[strum(serialize = "block removed")]
    BlockRemoved,
    /// Storage slots were assigned to a function's values.
    #[strum(serialize = "slots assigned")]
    SlotsAssigned,
    /// A control group without a back-edge into it was built.
    #[strum(serialize = "group structured")]
    GroupStructured,
    /// A control group was identified as a loop head.
    #[strum(serialize = "loop detected")]
    LoopDetected,

    /// A pass left a function failing verification.
    #[strum(serialize = "verification failed")]
    VerificationFailed,
    /// A pass started a sweep over the module.
    #[strum(serialize = "pass started")]
    PassStarted,
    /// A pass finished a sweep over the module.
    #[strum(serialize = "pass completed")]
    PassCompleted,

    /// Informational message.
    #[strum(serialize = "info")]
    Info,
    /// Something unexpected but recoverable.
    #[strum(serialize = "warning")]
    Warning,
    /// Something failed.
    #[strum(serialize = "error")]
    Error,
}

impl EventKind {
    /// Returns `true` for events that describe an edit to a function or a
    /// newly derived result for it.
    #[must_use]
    pub fn is_transformation(self) -> bool {
        self < Self::VerificationFailed
    }

    /// Returns `true` for info, warning, error and verification failures.
    #[must_use]
    pub fn is_diagnostic(self) -> bool {
        matches!(
            self,
            Self::VerificationFailed | Self::Info | Self::Warning | Self::Error
        )
    }
}

/// One recorded event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    /// What happened.
    pub kind: EventKind,
    /// The function it happened in, if any.
    pub function: Option<FunctionId>,
    /// Block index within that function, if any.
    pub location: Option<usize>,
    /// Free-form detail.
    pub message: String,
    /// Name of the pass that recorded it, if any.
    pub pass: Option<&'static str>,
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.kind)?;
        if let Some(pass) = self.pass {
            write!(f, " {pass}")?;
        }
        match (self.function, self.location) {
            (Some(function), Some(block)) => write!(f, " {function}:b{block}")?,
            (Some(function), None) => write!(f, " {function}")?,
            _ => {}
        }
        write!(f, ": {}", self.message)
    }
}

/// Fluent constructor returned by [`EventLog::record`].
///
/// The event is appended when the builder goes out of scope, so a bare
/// `log.record(kind);` statement records an event with the kind's default
/// message.
pub struct EventBuilder<'a> {
    log: &'a EventLog,
    event: Option<Event>,
}

impl EventBuilder<'_> {
    fn event(&mut self) -> &mut Event {
        // Only `drop` takes the event out.
        self.event.get_or_insert_with(|| Event {
            kind: EventKind::Info,
            function: None,
            location: None,
            message: String::new(),
            pass: None,
        })
    }

    /// Sets the function and block index the event refers to.
    pub fn at(mut self, function: FunctionId, block: usize) -> Self {
        let event = self.event();
        event.function = Some(function);
        event.location = Some(block);
        self
    }

    /// Sets the function the event refers to.
    pub fn function(mut self, function: FunctionId) -> Self {
        self.event().function = Some(function);
        self
    }

    /// Replaces the default message.
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.event().message = message.into();
        self
    }

    /// Attributes the event to a pass.
    pub fn pass(mut self, name: &'static str) -> Self {
        self.event().pass = Some(name);
        self
    }
}

impl Drop for EventBuilder<'_> {
    fn drop(&mut self) {
        if let Some(event) = self.event.take() {
            self.log.push(event);
        }
    }
}

/// Append-only, shareable event collection.
#[derive(Debug, Default)]
pub struct EventLog {
    events: boxcar::Vec<Event>,
}

impl Clone for EventLog {
    fn clone(&self) -> Self {
        let copy = Self::new();
        copy.merge(self);
        copy
    }
}

impl EventLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of recorded events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.count()
    }

    /// Returns `true` if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn push(&self, event: Event) {
        log::trace!("{event}");
        self.events.push(event);
    }

    /// Starts an event of `kind` carrying the kind's name as its message.
    pub fn record(&self, kind: EventKind) -> EventBuilder<'_> {
        EventBuilder {
            log: self,
            event: Some(Event {
                kind,
                function: None,
                location: None,
                message: kind.to_string(),
                pass: None,
            }),
        }
    }

    /// Records an [`EventKind::Info`] message.
    pub fn info(&self, message: impl Into<String>) {
        self.record(EventKind::Info).message(message);
    }

    /// Records an [`EventKind::Warning`] message.
    pub fn warn(&self, message: impl Into<String>) {
        self.record(EventKind::Warning).message(message);
    }

    /// Records an [`EventKind::Error`] message.
    pub fn error(&self, message: impl Into<String>) {
        self.record(EventKind::Error).message(message);
    }

    /// Appends a copy of every event in `other`, preserving their order.
    pub fn merge(&self, other: &EventLog) {
        for event in other.iter() {
            self.push(event.clone());
        }
    }

    /// Iterates events in recording order.
    pub fn iter(&self) -> impl Iterator<Item = &Event> + '_ {
        self.events.iter().map(|(_, event)| event)
    }

    /// Returns `true` if an event of `kind` was recorded.
    #[must_use]
    pub fn has(&self, kind: EventKind) -> bool {
        self.iter().any(|e| e.kind == kind)
    }

    /// Counts events of `kind`.
    #[must_use]
    pub fn count_kind(&self, kind: EventKind) -> usize {
        self.filter_kind(kind).count()
    }

    /// Iterates events of `kind`.
    pub fn filter_kind(&self, kind: EventKind) -> impl Iterator<Item = &Event> + '_ {
        self.iter().filter(move |e| e.kind == kind)
    }

    /// Iterates events recorded for `function`.
    pub fn filter_function(&self, function: FunctionId) -> impl Iterator<Item = &Event> + '_ {
        self.iter().filter(move |e| e.function == Some(function))
    }

    /// Iterates events attributed to the pass called `name`.
    pub fn filter_pass<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Event> + 'a {
        self.iter().filter(move |e| e.pass == Some(name))
    }

    /// Iterates diagnostic events.
    pub fn diagnostics(&self) -> impl Iterator<Item = &Event> + '_ {
        self.iter().filter(|e| e.kind.is_diagnostic())
    }

    /// Counts events per kind. Kinds with no events are absent.
    #[must_use]
    pub fn counts(&self) -> BTreeMap<EventKind, usize> {
        let mut counts = BTreeMap::new();
        for event in self.iter() {
            *counts.entry(event.kind).or_insert(0) += 1;
        }
        counts
    }

    /// One-line summary of the transformation events, e.g.
    /// `"2 cell promoted, 1 phi inserted"`.
    #[must_use]
    pub fn summary(&self) -> String {
        if self.is_empty() {
            return "no events".to_string();
        }

        let counts = self.counts();
        let parts: Vec<String> = EventKind::iter()
            .filter(|kind| kind.is_transformation())
            .filter_map(|kind| counts.get(&kind).map(|n| format!("{n} {kind}")))
            .collect();

        if parts.is_empty() {
            format!("{} event(s), no changes", self.len())
        } else {
            parts.join(", ")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_records_on_drop() {
        let log = EventLog::new();
        log.record(EventKind::PhiInserted)
            .at(FunctionId::new(0), 3)
            .pass("promotion")
            .message("phi for v2");
        log.record(EventKind::CellPromoted).function(FunctionId::new(1));

        assert_eq!(log.len(), 2);
        let first = log.iter().next().unwrap();
        assert_eq!(first.location, Some(3));
        assert_eq!(first.pass, Some("promotion"));
        assert_eq!(first.to_string(), "[phi inserted] promotion f0:b3: phi for v2");
        assert_eq!(log.iter().nth(1).unwrap().message, "cell promoted");
    }

    #[test]
    fn test_queries() {
        let log = EventLog::new();
        log.record(EventKind::BlockRemoved)
            .function(FunctionId::new(0))
            .pass("unreachable-blocks");
        log.record(EventKind::BlockRemoved).function(FunctionId::new(1));
        log.warn("odd");

        assert!(log.has(EventKind::BlockRemoved));
        assert!(!log.has(EventKind::LoopDetected));
        assert_eq!(log.count_kind(EventKind::BlockRemoved), 2);
        assert_eq!(log.filter_function(FunctionId::new(1)).count(), 1);
        assert_eq!(log.filter_pass("unreachable-blocks").count(), 1);
        assert_eq!(log.diagnostics().count(), 1);
        assert_eq!(log.counts().get(&EventKind::Warning), Some(&1));
    }

    #[test]
    fn test_kind_classes() {
        assert!(EventKind::LoopDetected.is_transformation());
        assert!(!EventKind::PassStarted.is_transformation());
        assert!(!EventKind::PassStarted.is_diagnostic());
        assert!(EventKind::VerificationFailed.is_diagnostic());
    }

    #[test]
    fn test_summary_follows_kind_order() {
        let log = EventLog::new();
        assert_eq!(log.summary(), "no events");

        log.info("hello");
        assert_eq!(log.summary(), "1 event(s), no changes");

        log.record(EventKind::PhiInserted);
        log.record(EventKind::CellPromoted);
        log.record(EventKind::CellPromoted);
        assert_eq!(log.summary(), "2 cell promoted, 1 phi inserted");
    }

    #[test]
    fn test_merge_and_clone() {
        let a = EventLog::new();
        a.info("one");
        let b = a.clone();
        b.merge(&a);
        assert_eq!(a.len(), 1);
        assert_eq!(b.len(), 2);
        assert!(b.iter().all(|e| e.message == "one"));
    }
}
