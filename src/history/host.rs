//! The host side of the tab strip.
//!
//! [`TabHost`] is the on-demand position lookup the move-chain resolver needs
//! mid-cascade. [`TabStrip`] is an in-process model of a host strip, used to
//! replay recorded event streams and in tests.

use crate::core::error::TabGraphError;
use crate::history::model::{RealTab, TabId};

pub trait TabHost {
    /// Current (post-move) position of `tab_id`, or `None` when the host no
    /// longer has the tab.
    fn tab_position(&self, tab_id: TabId) -> Result<Option<u32>, TabGraphError>;
}

impl<H: TabHost + ?Sized> TabHost for &H {
    fn tab_position(&self, tab_id: TabId) -> Result<Option<u32>, TabGraphError> {
        (**self).tab_position(tab_id)
    }
}

/// Ordered tab strip; a tab's position is its index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TabStrip {
    tabs: Vec<TabId>,
}

impl TabStrip {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_order(tabs: impl IntoIterator<Item = TabId>) -> Self {
        Self {
            tabs: tabs.into_iter().collect(),
        }
    }

    /// Builds the strip from a startup snapshot, ordered by reported position.
    pub fn from_snapshot(snapshot: &[RealTab]) -> Result<Self, TabGraphError> {
        let mut sorted: Vec<&RealTab> = snapshot.iter().collect();
        sorted.sort_by_key(|t| t.position);
        for (expected, tab) in sorted.iter().enumerate() {
            if tab.position as usize != expected {
                return Err(TabGraphError::ValidationError(format!(
                    "snapshot positions must be dense and unique; tab {} reports {} where {} was expected",
                    tab.tab_id, tab.position, expected
                )));
            }
        }
        Ok(Self::from_order(sorted.into_iter().map(|t| t.tab_id)))
    }

    pub fn len(&self) -> usize {
        self.tabs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }

    pub fn order(&self) -> &[TabId] {
        &self.tabs
    }

    pub fn position_of(&self, tab_id: TabId) -> Option<u32> {
        self.tabs
            .iter()
            .position(|t| *t == tab_id)
            .map(|idx| idx as u32)
    }

    /// Opens `tab_id` at `position`, shifting later tabs right. Positions
    /// past the end append.
    pub fn open(&mut self, tab_id: TabId, position: u32) -> Result<u32, TabGraphError> {
        if self.position_of(tab_id).is_some() {
            return Err(TabGraphError::HostError(format!("tab {tab_id} is already open")));
        }
        let idx = (position as usize).min(self.tabs.len());
        self.tabs.insert(idx, tab_id);
        Ok(idx as u32)
    }

    /// Closes `tab_id`, shifting later tabs left. Returns its last position.
    pub fn close(&mut self, tab_id: TabId) -> Result<u32, TabGraphError> {
        let idx = self
            .position_of(tab_id)
            .ok_or_else(|| TabGraphError::HostError(format!("tab {tab_id} is not open")))?;
        self.tabs.remove(idx as usize);
        Ok(idx)
    }

    /// Moves `tab_id` to `position` the way a drag in the strip does: every
    /// tab between the old and new slot shifts by one toward the gap.
    pub fn move_tab(&mut self, tab_id: TabId, position: u32) -> Result<u32, TabGraphError> {
        let from = self
            .position_of(tab_id)
            .ok_or_else(|| TabGraphError::HostError(format!("tab {tab_id} is not open")))?;
        self.tabs.remove(from as usize);
        let to = (position as usize).min(self.tabs.len());
        self.tabs.insert(to, tab_id);
        Ok(to as u32)
    }
}

impl TabHost for TabStrip {
    fn tab_position(&self, tab_id: TabId) -> Result<Option<u32>, TabGraphError> {
        Ok(self.position_of(tab_id))
    }
}
