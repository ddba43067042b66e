//! Append-only ledger of page visits
//!
//! The open visit is held by index. Two visits to the same page are
//! different entries, and closing always targets the one that is actually
//! open, never an older visit that happens to share the page name.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::types::PageVisit;

/// Ordered page visits with at most one open entry
#[derive(Debug, Clone, Default, Serialize)]
pub struct PageVisitLedger {
    visits: Vec<PageVisit>,
    #[serde(skip)]
    open: Option<usize>,
}

impl PageVisitLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a visit for `page`, closing any visit still open
    ///
    /// Returns the index of the new visit.
    pub fn enter(
        &mut self,
        page: impl Into<String>,
        at: DateTime<Utc>,
        from_page: Option<String>,
    ) -> usize {
        self.close_open(at);
        self.visits.push(PageVisit::open(page, at, from_page));
        let index = self.visits.len() - 1;
        self.open = Some(index);
        index
    }

    /// Close the open visit, if there is one
    ///
    /// Returns the closed visit.
    pub fn close_open(&mut self, at: DateTime<Utc>) -> Option<&PageVisit> {
        let index = self.open.take()?;
        let visit = &mut self.visits[index];
        let duration = (at - visit.entered_at).num_milliseconds().max(0);
        visit.left_at = Some(at);
        visit.duration = Some(duration);
        visit.duration_formatted = Some(format_duration(duration));
        Some(&self.visits[index])
    }

    pub fn open_visit(&self) -> Option<&PageVisit> {
        self.open.map(|index| &self.visits[index])
    }

    pub fn visits(&self) -> &[PageVisit] {
        &self.visits
    }

    pub fn len(&self) -> usize {
        self.visits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.visits.is_empty()
    }

    pub fn clear(&mut self) {
        self.visits.clear();
        self.open = None;
    }
}

/// Render a dwell time as `Hh Mm Ss`, dropping leading zero units
///
/// Sub-second remainders are truncated.
pub fn format_duration(millis: i64) -> String {
    let seconds = millis.max(0) / 1000;
    let minutes = seconds / 60;
    let hours = minutes / 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes % 60, seconds % 60)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds % 60)
    } else {
        format!("{}s", seconds)
    }
}
