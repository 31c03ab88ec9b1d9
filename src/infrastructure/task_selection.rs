use crate::domain::models::TaskId;
use crate::infrastructure::error::TimesheetError;
use crate::infrastructure::key_value_store::KeyValueStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const SELECTED_TASK_KEY: &str = "selected_task";

/// Externally tracked "currently selected task" of the UI.
///
/// A failure to read the selection is reported as an error, never as "nothing selected".
pub trait TaskSelection: Send + Sync {
    fn selected_task(&self) -> Result<Option<TaskId>, TimesheetError>;

    /// Title of `task_id` when the selection knows it.
    fn task_title(&self, _task_id: TaskId) -> Result<Option<String>, TimesheetError> {
        Ok(None)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SelectedTask {
    pub id: TaskId,
    pub title: String,
}

/// Task selection persisted in a [`KeyValueStore`] so it survives restarts.
pub struct StoredTaskSelection<S>
where
    S: KeyValueStore,
{
    store: Arc<S>,
}

impl<S> StoredTaskSelection<S>
where
    S: KeyValueStore,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn select(&self, task: &SelectedTask) -> Result<(), TimesheetError> {
        let encoded = serde_json::to_string(task)?;
        self.store.save(SELECTED_TASK_KEY, &encoded)
    }

    pub fn clear(&self) -> Result<(), TimesheetError> {
        self.store.clear(SELECTED_TASK_KEY)
    }

    pub fn current(&self) -> Result<Option<SelectedTask>, TimesheetError> {
        let Some(raw) = self.store.load(SELECTED_TASK_KEY)? else {
            return Ok(None);
        };
        Ok(Some(serde_json::from_str(&raw)?))
    }
}

impl<S> TaskSelection for StoredTaskSelection<S>
where
    S: KeyValueStore,
{
    fn selected_task(&self) -> Result<Option<TaskId>, TimesheetError> {
        Ok(self.current()?.map(|task| task.id))
    }

    fn task_title(&self, task_id: TaskId) -> Result<Option<String>, TimesheetError> {
        Ok(self
            .current()?
            .filter(|task| task.id == task_id)
            .map(|task| task.title))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::key_value_store::InMemoryKeyValueStore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct BrokenStore {
        loads: AtomicUsize,
    }

    impl KeyValueStore for BrokenStore {
        fn load(&self, _key: &str) -> Result<Option<String>, TimesheetError> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            Err(TimesheetError::Io(std::io::Error::other("disk I/O error")))
        }

        fn save(&self, _key: &str, _value: &str) -> Result<(), TimesheetError> {
            Err(TimesheetError::Io(std::io::Error::other("disk I/O error")))
        }

        fn clear(&self, _key: &str) -> Result<(), TimesheetError> {
            Ok(())
        }
    }

    #[test]
    fn selection_roundtrips_through_store() {
        let store = Arc::new(InMemoryKeyValueStore::default());
        let selection = StoredTaskSelection::new(Arc::clone(&store));
        assert_eq!(selection.selected_task().expect("empty"), None);

        selection
            .select(&SelectedTask {
                id: 12,
                title: "Code review".to_string(),
            })
            .expect("select");
        assert_eq!(selection.selected_task().expect("selected"), Some(12));
        assert_eq!(
            selection.task_title(12).expect("title"),
            Some("Code review".to_string())
        );
        assert_eq!(selection.task_title(13).expect("other task"), None);

        let reloaded = StoredTaskSelection::new(store);
        assert_eq!(reloaded.selected_task().expect("reloaded"), Some(12));

        reloaded.clear().expect("clear");
        assert_eq!(reloaded.selected_task().expect("cleared"), None);
    }

    #[test]
    fn unreadable_selection_is_an_error() {
        let store = Arc::new(InMemoryKeyValueStore::default());
        store.save(SELECTED_TASK_KEY, "not json").expect("seed garbage");
        let selection = StoredTaskSelection::new(store);
        assert!(matches!(selection.current(), Err(TimesheetError::Json(_))));
        assert!(matches!(selection.selected_task(), Err(TimesheetError::Json(_))));
        assert!(selection.task_title(12).is_err());
    }

    #[test]
    fn storage_failures_propagate_from_selection() {
        let store = Arc::new(BrokenStore::default());
        let selection = StoredTaskSelection::new(Arc::clone(&store));

        assert!(matches!(selection.selected_task(), Err(TimesheetError::Io(_))));
        assert!(matches!(selection.task_title(12), Err(TimesheetError::Io(_))));
        assert_eq!(store.loads.load(Ordering::SeqCst), 2);
    }
}
