//! Pointer-driven selection of a contiguous slot range.
//!
//! `Idle -> Dragging -> Idle` on cancel, `Dragging -> Committing -> Idle` on commit.
//! This machine is the only writer of slot selection flags.

use crate::domain::slot_grid::SlotGrid;
use crate::domain::time_math::{snap_to_interval, to_time_string};
use crate::infrastructure::error::TimesheetError;
use log::debug;
use std::ops::RangeInclusive;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionRange {
    pub anchor: usize,
    pub current: usize,
}

impl SelectionRange {
    pub fn low(&self) -> usize {
        self.anchor.min(self.current)
    }

    pub fn high(&self) -> usize {
        self.anchor.max(self.current)
    }

    pub fn bounds(&self) -> RangeInclusive<usize> {
        self.low()..=self.high()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DragState {
    #[default]
    Idle,
    Dragging(SelectionRange),
    Committing(SelectionRange),
}

impl DragState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Dragging(_) => "dragging",
            Self::Committing(_) => "committing",
        }
    }
}

/// Clock range produced by a committed selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitPlan {
    pub start_time: String,
    pub end_time: String,
    pub slots: RangeInclusive<usize>,
}

#[derive(Debug, Default)]
pub struct DragSelectionMachine {
    state: DragState,
}

impl DragSelectionMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> DragState {
        self.state
    }

    pub fn selection(&self) -> Option<SelectionRange> {
        match self.state {
            DragState::Idle => None,
            DragState::Dragging(range) | DragState::Committing(range) => Some(range),
        }
    }

    pub fn is_committing(&self) -> bool {
        matches!(self.state, DragState::Committing(_))
    }

    pub fn begin(&mut self, grid: &mut SlotGrid, index: usize) -> Result<(), TimesheetError> {
        match self.state {
            DragState::Idle => {
                ensure_in_grid(grid, index)?;
                let range = SelectionRange {
                    anchor: index,
                    current: index,
                };
                self.state = DragState::Dragging(range);
                grid.apply_selection(Some(range.bounds()));
                debug!("drag started at slot {index}");
                Ok(())
            }
            DragState::Dragging(range) if range.anchor == index && range.current == index => Ok(()),
            DragState::Dragging(_) => Err(TimesheetError::DragInProgress),
            DragState::Committing(_) => Err(TimesheetError::CommitInProgress),
        }
    }

    pub fn extend(&mut self, grid: &mut SlotGrid, index: usize) -> Result<(), TimesheetError> {
        match self.state {
            DragState::Dragging(range) => {
                ensure_in_grid(grid, index)?;
                let range = SelectionRange {
                    current: index,
                    ..range
                };
                self.state = DragState::Dragging(range);
                grid.apply_selection(Some(range.bounds()));
                Ok(())
            }
            DragState::Idle => Err(TimesheetError::NotDragging),
            DragState::Committing(_) => Err(TimesheetError::CommitInProgress),
        }
    }

    /// Drops an in-progress drag. Returns whether a drag was actually cancelled;
    /// a selection already handed to a commit is left alone.
    pub fn cancel(&mut self, grid: &mut SlotGrid) -> bool {
        match self.state {
            DragState::Dragging(_) => {
                self.state = DragState::Idle;
                grid.apply_selection(None);
                debug!("drag cancelled");
                true
            }
            DragState::Idle => {
                grid.apply_selection(None);
                false
            }
            DragState::Committing(_) => false,
        }
    }

    /// Moves `Dragging -> Committing` and computes the clock range of the selection.
    ///
    /// The end is the start of the slot after the highest selected one. When the highest
    /// selected slot is the last in the grid the end is one interval past it.
    pub fn begin_commit(&mut self, grid: &SlotGrid) -> Result<CommitPlan, TimesheetError> {
        let range = match self.state {
            DragState::Dragging(range) => range,
            DragState::Idle => return Err(TimesheetError::NotDragging),
            DragState::Committing(_) => return Err(TimesheetError::CommitInProgress),
        };

        let low = grid
            .get(range.low())
            .ok_or_else(|| TimesheetError::NotFound(format!("slot {}", range.low())))?;
        let high = grid
            .get(range.high())
            .ok_or_else(|| TimesheetError::NotFound(format!("slot {}", range.high())))?;
        let end_time = match grid.get(range.high() + 1) {
            Some(next) => next.time_string.clone(),
            None => {
                let interval = grid.config().interval_minutes;
                to_time_string(i64::from(snap_to_interval(high.minutes() + interval, interval)))
            }
        };

        let plan = CommitPlan {
            start_time: low.time_string.clone(),
            end_time,
            slots: range.bounds(),
        };
        self.state = DragState::Committing(range);
        debug!("committing selection {}-{}", plan.start_time, plan.end_time);
        Ok(plan)
    }

    /// Returns to `Idle` after a commit attempt, whatever its outcome, and clears the selection.
    pub fn finish_commit(&mut self, grid: &mut SlotGrid) {
        self.state = DragState::Idle;
        grid.apply_selection(None);
    }

    /// Re-applies the active selection after the grid was rebuilt underneath it.
    pub fn sync_selection(&self, grid: &mut SlotGrid) {
        grid.apply_selection(self.selection().map(|range| range.bounds()));
    }
}

fn ensure_in_grid(grid: &SlotGrid, index: usize) -> Result<(), TimesheetError> {
    if index >= grid.len() {
        return Err(TimesheetError::NotFound(format!(
            "slot index {index} is outside a grid of {} slots",
            grid.len()
        )));
    }
    Ok(())
}
