use crate::location::{FilePosition, Position, Range};
use report_parser::{DiagnosticEntry, Location, PathEvent};
use serde::Serialize;
use std::path::Path;

/// Which match wins when several events sit under the cursor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    First,
    Last,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkKind {
    PreviousStep,
    NextStep,
    ReproducesBug,
    FirstStep,
    LastStep,
    OriginatedHere,
}

impl LinkKind {
    pub fn message(&self) -> &'static str {
        match self {
            LinkKind::PreviousStep => "previous reproduction step",
            LinkKind::NextStep => "next reproduction step",
            LinkKind::ReproducesBug => "reproduces this bug",
            LinkKind::FirstStep => "first reproduction step",
            LinkKind::LastStep => "last reproduction step",
            LinkKind::OriginatedHere => "originated from here",
        }
    }
}

/// A related location attached to a rendered event
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelatedLink {
    pub kind: LinkKind,
    pub target: FilePosition,
}

/// The visible events of one diagnostic, split into reproduction steps and the
/// terminal bug event.
#[derive(Debug, Clone)]
pub struct ReproductionPath<'a> {
    entry: &'a DiagnosticEntry,
    events: Vec<&'a PathEvent>,
}

impl<'a> ReproductionPath<'a> {
    pub fn new(entry: &'a DiagnosticEntry) -> Self {
        Self {
            entry,
            events: entry.events().collect(),
        }
    }

    pub fn entry(&self) -> &'a DiagnosticEntry {
        self.entry
    }

    /// All events, terminal included
    pub fn events(&self) -> &[&'a PathEvent] {
        &self.events
    }

    /// Every event except the terminal one
    pub fn steps(&self) -> &[&'a PathEvent] {
        match self.events.split_last() {
            Some((_, steps)) => steps,
            None => &[],
        }
    }

    pub fn terminal(&self) -> Option<&'a PathEvent> {
        self.events.last().copied()
    }

    /// Number of events, the path length shown in listings
    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Absolute position of a report location of this diagnostic
    pub fn resolve(&self, location: &Location) -> Option<FilePosition> {
        self.entry
            .file_of(location)
            .map(|file| FilePosition::new(file, Position::from_report(location)))
    }

    fn event_is_under(&self, event: &PathEvent, file: &Path, cursor: Position) -> bool {
        if self.entry.file_of(&event.location) != Some(file) {
            return false;
        }
        if Position::from_report(&event.location) == cursor {
            return true;
        }
        event.ranges.iter().flatten().any(|(start, end)| {
            self.entry.file_of(start) == Some(file) && Range::from_report(start, end).contains(cursor)
        })
    }

    /// Index into [`ReproductionPath::events`] of the event under the cursor
    pub fn event_under_cursor(&self, cursor: &FilePosition, anchor: Anchor) -> Option<usize> {
        let mut matches = self
            .events
            .iter()
            .enumerate()
            .filter(|(_, event)| self.event_is_under(event, &cursor.file, cursor.position))
            .map(|(idx, _)| idx);

        match anchor {
            Anchor::First => matches.next(),
            Anchor::Last => matches.last(),
        }
    }

    /// The event after the last one under the cursor
    pub fn next_event(&self, cursor: &FilePosition) -> Option<usize> {
        let idx = self.event_under_cursor(cursor, Anchor::Last)?;
        (idx + 1 < self.events.len()).then_some(idx + 1)
    }

    /// The event before the first one under the cursor
    pub fn previous_event(&self, cursor: &FilePosition) -> Option<usize> {
        let idx = self.event_under_cursor(cursor, Anchor::First)?;
        idx.checked_sub(1)
    }

    /// Links shown on reproduction step `idx`.
    ///
    /// The successor link is only attached while `idx + 2 < steps().len()`, so the
    /// second-to-last step does not point at the last one.
    pub fn step_links(&self, idx: usize) -> Vec<RelatedLink> {
        let steps = self.steps();
        let Some(step) = steps.get(idx) else {
            return Vec::new();
        };

        let mut links = Vec::new();
        if idx > 0 {
            self.push_link(&mut links, LinkKind::PreviousStep, &steps[idx - 1].location);
        }
        if idx + 2 < steps.len() {
            self.push_link(&mut links, LinkKind::NextStep, &steps[idx + 1].location);
        }
        if let Some(terminal) = self.terminal() {
            self.push_link(&mut links, LinkKind::ReproducesBug, &terminal.location);
        }
        self.push_origin_link(&mut links, step);
        links
    }

    /// Links shown on the terminal event when the path is expanded
    pub fn terminal_links(&self) -> Vec<RelatedLink> {
        let mut links = Vec::new();
        let steps = self.steps();
        if let (Some(first), Some(last)) = (steps.first(), steps.last()) {
            self.push_link(&mut links, LinkKind::FirstStep, &first.location);
            self.push_link(&mut links, LinkKind::LastStep, &last.location);
        }
        if let Some(terminal) = self.terminal() {
            self.push_origin_link(&mut links, terminal);
        }
        links
    }

    /// An event highlighting several ranges also points back at the diagnostic itself
    pub(crate) fn push_origin_link(&self, links: &mut Vec<RelatedLink>, event: &PathEvent) {
        if event.ranges.as_ref().is_some_and(|ranges| ranges.len() > 1) {
            self.push_link(links, LinkKind::OriginatedHere, &self.entry.location);
        }
    }

    fn push_link(&self, links: &mut Vec<RelatedLink>, kind: LinkKind, location: &Location) {
        if let Some(target) = self.resolve(location) {
            links.push(RelatedLink { kind, target });
        }
    }

    /// Ranges an event is drawn at; its location when it carries no ranges
    pub fn event_ranges(event: &PathEvent) -> Vec<(Location, Range)> {
        match &event.ranges {
            Some(ranges) if !ranges.is_empty() => ranges
                .iter()
                .map(|(start, end)| (*start, Range::from_report(start, end)))
                .collect(),
            _ => vec![(
                event.location,
                Range::at(Position::from_report(&event.location)),
            )],
        }
    }
}
