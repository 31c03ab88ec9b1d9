use crate::domain::models::{EntryId, GridConfig, TimeEntry};
use crate::domain::time_math::{generate_slots, normalize_clock, to_minutes};
use crate::infrastructure::error::TimesheetError;
use chrono::NaiveDate;
use log::{debug, warn};
use serde::Serialize;
use std::ops::RangeInclusive;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSlot {
    pub hour: u32,
    pub minute: u32,
    pub time_string: String,
    pub bound_entry_id: Option<EntryId>,
    selected: bool,
}

impl TimeSlot {
    fn from_key(time_string: String) -> Result<Self, TimesheetError> {
        let minutes = to_minutes(&time_string)?;
        Ok(Self {
            hour: minutes / 60,
            minute: minutes % 60,
            time_string,
            bound_entry_id: None,
            selected: false,
        })
    }

    pub fn minutes(&self) -> u32 {
        self.hour * 60 + self.minute
    }

    pub fn is_selected(&self) -> bool {
        self.selected
    }
}

/// A slot matched by more than one entry. Only possible when the input entries overlap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotConflict {
    pub slot_index: usize,
    pub time_string: String,
    pub bound_entry_id: EntryId,
    pub conflicting_entry_id: EntryId,
}

/// Fixed-width slots of one day, each bound to at most one covering entry.
#[derive(Debug, Clone)]
pub struct SlotGrid {
    config: GridConfig,
    date: Option<NaiveDate>,
    slots: Vec<TimeSlot>,
}

impl SlotGrid {
    pub fn new(config: GridConfig) -> Result<Self, TimesheetError> {
        config.validate()?;
        let mut grid = Self {
            config,
            date: None,
            slots: Vec::new(),
        };
        grid.slots = grid.fresh_slots()?;
        Ok(grid)
    }

    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    pub fn date(&self) -> Option<NaiveDate> {
        self.date
    }

    pub fn slots(&self) -> &[TimeSlot] {
        &self.slots
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&TimeSlot> {
        self.slots.get(index)
    }

    /// Regenerates every slot for `date` and binds each one to the entry covering it.
    ///
    /// A slot at minute `m` belongs to entry `e` when `e.start <= m < e.end`. Entries for
    /// other dates are ignored. Prior selection flags are discarded. When a second entry
    /// also covers a slot the first one keeps the binding and the clash is returned.
    pub fn rebuild(
        &mut self,
        date: NaiveDate,
        entries: &[TimeEntry],
    ) -> Result<Vec<SlotConflict>, TimesheetError> {
        let ranges = entries
            .iter()
            .filter(|entry| entry.entry_date == date)
            .map(|entry| {
                entry
                    .minute_range()
                    .map(|(start, end)| (entry.id, start, end))
            })
            .collect::<Result<Vec<_>, TimesheetError>>()?;

        let mut slots = self.fresh_slots()?;
        let mut conflicts = Vec::new();
        for (index, slot) in slots.iter_mut().enumerate() {
            let minute = slot.minutes();
            let mut covering = ranges
                .iter()
                .filter(|(_, start, end)| *start <= minute && minute < *end)
                .map(|(id, _, _)| *id);
            let Some(bound) = covering.next() else {
                continue;
            };
            slot.bound_entry_id = Some(bound);
            for other in covering {
                warn!(
                    "slot {} on {date} is covered by entries {bound} and {other}",
                    slot.time_string
                );
                conflicts.push(SlotConflict {
                    slot_index: index,
                    time_string: slot.time_string.clone(),
                    bound_entry_id: bound,
                    conflicting_entry_id: other,
                });
            }
        }

        debug!(
            "rebuilt {} slots for {date} from {} entries",
            slots.len(),
            ranges.len()
        );
        self.date = Some(date);
        self.slots = slots;
        Ok(conflicts)
    }

    pub fn index_of(&self, time_string: &str) -> Result<usize, TimesheetError> {
        let key = normalize_clock(time_string)?;
        self.slots
            .iter()
            .position(|slot| slot.time_string == key)
            .ok_or_else(|| TimesheetError::NotFound(format!("slot {key} is outside the grid window")))
    }

    pub fn find_slot_by_time(&self, time_string: &str) -> Result<&TimeSlot, TimesheetError> {
        let index = self.index_of(time_string)?;
        Ok(&self.slots[index])
    }

    pub fn entry_for_slot(&self, index: usize) -> Option<EntryId> {
        self.slots.get(index).and_then(|slot| slot.bound_entry_id)
    }

    /// Contiguous range of selected slots, if any.
    pub fn selected_range(&self) -> Option<RangeInclusive<usize>> {
        let first = self.slots.iter().position(TimeSlot::is_selected)?;
        let last = self.slots.iter().rposition(TimeSlot::is_selected)?;
        Some(first..=last)
    }

    pub(in crate::domain) fn apply_selection(&mut self, range: Option<RangeInclusive<usize>>) {
        for (index, slot) in self.slots.iter_mut().enumerate() {
            slot.selected = range.as_ref().is_some_and(|range| range.contains(&index));
        }
    }

    fn fresh_slots(&self) -> Result<Vec<TimeSlot>, TimesheetError> {
        generate_slots(
            self.config.start_hour,
            self.config.end_hour,
            self.config.interval_minutes,
        )?
        .into_iter()
        .map(TimeSlot::from_key)
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn date(value: &str) -> NaiveDate {
        NaiveDate::parse_from_str(value, "%Y-%m-%d").expect("valid date")
    }

    fn entry(id: EntryId, entry_date: &str, start: &str, end: &str) -> TimeEntry {
        let start_minutes = to_minutes(start).expect("start");
        let end_minutes = to_minutes(end).expect("end");
        TimeEntry {
            id,
            task_id: 100 + id,
            task_title: format!("Task {id}"),
            task_color: "#cccccc".to_string(),
            task_icon: None,
            category_id: None,
            category_title: None,
            entry_date: date(entry_date),
            start_time: start.to_string(),
            end_time: end.to_string(),
            duration_minutes: end_minutes - start_minutes,
            description: None,
            is_billable: false,
        }
    }

    fn default_grid() -> SlotGrid {
        SlotGrid::new(GridConfig::default()).expect("default grid")
    }

    #[test]
    fn new_grid_covers_configured_window() {
        let grid = default_grid();
        assert_eq!(grid.len(), 40);
        assert_eq!(grid.slots()[0].time_string, "07:00");
        assert_eq!(grid.slots()[39].time_string, "16:45");
        assert_eq!(grid.slots()[39].hour, 16);
        assert_eq!(grid.slots()[39].minute, 45);
        assert!(grid.date().is_none());
    }

    #[test]
    fn rebuild_binds_slots_half_open() {
        let mut grid = default_grid();
        let entries = vec![
            entry(1, "2024-06-03", "09:00", "09:30"),
            entry(2, "2024-06-03", "09:30", "10:00"),
            entry(3, "2024-06-04", "11:00", "12:00"),
        ];

        let conflicts = grid.rebuild(date("2024-06-03"), &entries).expect("rebuild");
        assert!(conflicts.is_empty());

        let at = |time: &str| grid.find_slot_by_time(time).expect("slot").bound_entry_id;
        assert_eq!(at("08:45"), None);
        assert_eq!(at("09:00"), Some(1));
        assert_eq!(at("09:15"), Some(1));
        assert_eq!(at("09:30"), Some(2));
        assert_eq!(at("09:45"), Some(2));
        assert_eq!(at("10:00"), None);
        assert_eq!(at("11:00"), None);
    }

    #[test]
    fn rebuild_reports_overlapping_entries() {
        let mut grid = default_grid();
        let entries = vec![
            entry(1, "2024-06-03", "09:00", "09:30"),
            entry(2, "2024-06-03", "09:15", "09:45"),
        ];

        let conflicts = grid.rebuild(date("2024-06-03"), &entries).expect("rebuild");
        assert_eq!(
            conflicts,
            vec![SlotConflict {
                slot_index: grid.index_of("09:15").expect("index"),
                time_string: "09:15".to_string(),
                bound_entry_id: 1,
                conflicting_entry_id: 2,
            }]
        );
        assert_eq!(grid.find_slot_by_time("09:15").expect("slot").bound_entry_id, Some(1));
        assert_eq!(grid.find_slot_by_time("09:30").expect("slot").bound_entry_id, Some(2));
    }

    #[test]
    fn rebuild_discards_selection_and_rejects_malformed_entries() {
        let mut grid = default_grid();
        grid.apply_selection(Some(2..=4));
        assert_eq!(grid.selected_range(), Some(2..=4));

        grid.rebuild(date("2024-06-03"), &[]).expect("rebuild");
        assert_eq!(grid.selected_range(), None);

        let mut broken = entry(1, "2024-06-03", "09:00", "09:30");
        broken.end_time = "9h30".to_string();
        assert!(matches!(
            grid.rebuild(date("2024-06-03"), &[broken]),
            Err(TimesheetError::Parse(_))
        ));
    }

    #[test]
    fn find_slot_by_time_outside_window_is_not_found() {
        let grid = default_grid();
        assert!(matches!(grid.find_slot_by_time("17:00"), Err(TimesheetError::NotFound(_))));
        assert!(matches!(grid.find_slot_by_time("06:45"), Err(TimesheetError::NotFound(_))));
        assert!(matches!(grid.find_slot_by_time("09:07"), Err(TimesheetError::NotFound(_))));
        assert!(matches!(grid.find_slot_by_time("nine"), Err(TimesheetError::Parse(_))));
        assert_eq!(grid.index_of("9:00").expect("short hour"), 8);
    }

    proptest! {
        #[test]
        fn every_aligned_entry_binds_its_slots(
            layout in prop::collection::vec((0usize..4, 1usize..4), 1..6)
        ) {
            let mut grid = default_grid();
            let mut entries = Vec::new();
            let mut cursor = 0usize;
            for (id, (gap, length)) in layout.into_iter().enumerate() {
                let start = cursor + gap;
                let end = start + length;
                if end > grid.len() {
                    break;
                }
                let start_time = grid.slots()[start].time_string.clone();
                let end_time = crate::domain::time_math::to_time_string(
                    i64::from(grid.slots()[end - 1].minutes() + 15),
                );
                entries.push(entry(id as EntryId, "2024-06-03", &start_time, &end_time));
                cursor = end;
            }

            let conflicts = grid.rebuild(date("2024-06-03"), &entries).expect("rebuild");
            prop_assert!(conflicts.is_empty());
            for entry in &entries {
                let bound = grid.slots().iter().filter(|slot| slot.bound_entry_id == Some(entry.id)).count();
                prop_assert_eq!(bound as u32, entry.duration_minutes / 15);
            }
        }
    }
}
