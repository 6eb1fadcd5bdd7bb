use std::collections::{HashMap, HashSet};

use chrono::{SecondsFormat, Utc};
use tracing::{debug, info, warn};

use crate::io::gateway::{GatewayError, TaskGateway};
use crate::io::overlay::Overlays;
use crate::io::slot_store::SlotStore;
use crate::model::config::Settings;
use crate::model::task::{Task, TaskId, TaskOrigin, TaskPatch};
use crate::model::view::ViewSpec;
use crate::ops::projector;

/// Decides which ids must never be sent to the gateway
pub trait LocalOnly {
    fn is_local(&self, id: TaskId) -> bool;
}

/// Ids strictly above the threshold are local-only
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdAbove(pub TaskId);

impl LocalOnly for IdAbove {
    fn is_local(&self, id: TaskId) -> bool {
        id > self.0
    }
}

impl<F: Fn(TaskId) -> bool> LocalOnly for F {
    fn is_local(&self, id: TaskId) -> bool {
        self(id)
    }
}

/// RFC 3339 UTC with milliseconds, e.g. `2025-06-01T09:30:00.000Z`
pub fn utc_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

const DEFAULT_PAGE_SIZE: usize = 30;
const DEFAULT_LOCAL_THRESHOLD: TaskId = 150;

/// Owns the authoritative task collection and keeps it consistent with the
/// remote gateway and the persisted overlays.
///
/// Every mutation goes through here. Gateway-eligible tasks are changed only
/// after the gateway accepts the change; local-only tasks never reach it.
pub struct TaskEngine<G, S> {
    gateway: G,
    overlays: Overlays<S>,
    local_only: Box<dyn LocalOnly>,
    clock: Box<dyn Fn() -> String>,
    page_size: usize,
    tasks: Vec<Task>,
    /// Highest id observed this process; synthetic ids are allocated above it
    highest_id: TaskId,
    /// Ids handed out by `create`; never reused, even after deletion
    issued: HashSet<TaskId>,
    loading: bool,
    error: Option<String>,
    view: ViewSpec,
}

impl<G: TaskGateway, S: SlotStore> TaskEngine<G, S> {
    pub fn new(gateway: G, store: S) -> Self {
        TaskEngine {
            gateway,
            overlays: Overlays::new(store),
            local_only: Box::new(IdAbove(DEFAULT_LOCAL_THRESHOLD)),
            clock: Box::new(utc_timestamp),
            page_size: DEFAULT_PAGE_SIZE,
            tasks: Vec::new(),
            highest_id: 0,
            issued: HashSet::new(),
            loading: false,
            error: None,
            view: ViewSpec::default(),
        }
    }

    pub fn from_settings(gateway: G, store: S, settings: &Settings) -> Self {
        TaskEngine::new(gateway, store)
            .with_page_size(settings.remote.page_size)
            .with_local_rule(IdAbove(settings.ids.local_threshold))
    }

    pub fn with_local_rule(mut self, rule: impl LocalOnly + 'static) -> Self {
        self.local_only = Box::new(rule);
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_clock(mut self, clock: impl Fn() -> String + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    /// Authoritative order
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Message from the most recent failed operation, cleared by the next one
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn view(&self) -> &ViewSpec {
        &self.view
    }

    pub fn set_view(&mut self, view: ViewSpec) {
        self.view = view;
    }

    pub fn view_mut(&mut self) -> &mut ViewSpec {
        &mut self.view
    }

    /// Current collection projected through the current view
    pub fn visible(&self) -> Vec<&Task> {
        projector::project(&self.tasks, &self.view)
    }

    pub fn overlays(&self) -> &Overlays<S> {
        &self.overlays
    }

    /// Whether mutations of this task are routed to the gateway
    pub fn is_remote(&self, task: &Task) -> bool {
        task.origin == TaskOrigin::Remote && !self.local_only.is_local(task.id)
    }

    // -----------------------------------------------------------------------
    // Load
    // -----------------------------------------------------------------------

    /// Replace the collection with the gateway's first page merged with the
    /// overlays. Failures are recorded in [`TaskEngine::error`], not returned.
    pub fn load(&mut self) {
        self.loading = true;
        self.error = None;
        match self.gateway.list(self.page_size, 0) {
            Ok(fetched) => {
                self.tasks = self.reconcile(fetched);
                info!(count = self.tasks.len(), "loaded tasks");
            }
            Err(e) => {
                self.tasks.clear();
                self.record_failure("load", &e);
            }
        }
        self.loading = false;
    }

    fn reconcile(&mut self, fetched: Vec<Task>) -> Vec<Task> {
        let categories = self.overlays.category_map();
        let order = self.overlays.order();
        let now = (self.clock)();

        let mut seen = HashSet::new();
        let mut tasks = Vec::with_capacity(fetched.len());
        for mut task in fetched {
            if !seen.insert(task.id) {
                warn!(id = task.id, "gateway returned a duplicate id; keeping the first");
                continue;
            }
            task.category_id = categories.get(&task.id).cloned();
            task.created_at = Some(now.clone());
            self.highest_id = self.highest_id.max(task.id);
            tasks.push(task);
        }

        if !order.is_empty() {
            let mut positions: HashMap<TaskId, usize> = HashMap::with_capacity(order.len());
            for (idx, id) in order.iter().enumerate() {
                positions.entry(*id).or_insert(idx);
            }
            tasks.sort_by_key(|t| positions.get(&t.id).copied().unwrap_or(usize::MAX));
        }
        tasks
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    /// Create a task at the front of the collection.
    ///
    /// Blank text is ignored (`Ok(None)`). Returns the id the task ended up
    /// with, which differs from the gateway's when that id is already taken.
    pub fn create(
        &mut self,
        text: &str,
        category_id: Option<&str>,
    ) -> Result<Option<TaskId>, GatewayError> {
        self.error = None;
        let text = text.trim();
        if text.is_empty() {
            return Ok(None);
        }

        let mut task = match self.gateway.create(text) {
            Ok(task) => task,
            Err(e) => return Err(self.record_failure("create", &e)),
        };

        if self.task(task.id).is_some() || self.issued.contains(&task.id) {
            let highest = self.highest_id.max(task.id);
            let Some(synthetic) = highest.checked_add(1) else {
                let e = GatewayError::transport(format!("no task id left above {}", highest));
                return Err(self.record_failure("create", &e));
            };
            debug!(returned = task.id, synthetic, "gateway id already in use");
            task.id = synthetic;
            task.origin = TaskOrigin::Local;
        } else if self.local_only.is_local(task.id) {
            task.origin = TaskOrigin::Local;
        }
        self.highest_id = self.highest_id.max(task.id);
        self.issued.insert(task.id);

        let category_id = non_empty(category_id);
        let id = task.id;
        task.category_id = category_id.map(str::to_string);
        task.created_at = Some((self.clock)());
        self.tasks.insert(0, task);

        self.overlays.save_order(&self.ids());
        if let Some(category_id) = category_id {
            self.overlays.assign(id, Some(category_id));
        }
        info!(id, "created task");
        Ok(Some(id))
    }

    /// Apply a partial update. Unknown ids and blank text are ignored.
    pub fn update(&mut self, id: TaskId, patch: TaskPatch) -> Result<(), GatewayError> {
        self.error = None;
        let mut patch = patch;
        if let Some(ref text) = patch.text {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                return Ok(());
            }
            patch.text = Some(trimmed.to_string());
        }
        if patch.is_empty() {
            return Ok(());
        }
        let Some(task) = self.task(id) else {
            return Ok(());
        };

        if self.is_remote(task) {
            debug!(id, "updating via gateway");
            if let Err(e) = self.gateway.update(id, &patch) {
                return Err(self.record_failure("update", &e));
            }
        } else {
            debug!(id, "updating local-only task");
        }

        if let Some(task) = self.tasks.iter_mut().find(|t| t.id == id) {
            patch.apply_to(task);
        }
        Ok(())
    }

    /// Flip the completion flag. Unknown ids are ignored.
    pub fn toggle(&mut self, id: TaskId) -> Result<(), GatewayError> {
        let Some(completed) = self.task(id).map(|t| t.completed) else {
            self.error = None;
            return Ok(());
        };
        self.update(id, TaskPatch::completed(!completed))
    }

    /// Remove a task, its category assignment, and its place in the order.
    pub fn delete(&mut self, id: TaskId) -> Result<(), GatewayError> {
        self.error = None;
        let Some(task) = self.task(id) else {
            return Ok(());
        };

        if self.is_remote(task) {
            debug!(id, "deleting via gateway");
            if let Err(e) = self.gateway.delete(id) {
                return Err(self.record_failure("delete", &e));
            }
        } else {
            debug!(id, "deleting local-only task");
        }

        self.tasks.retain(|t| t.id != id);
        self.overlays.save_order(&self.ids());

        let mut categories = self.overlays.category_map();
        if categories.shift_remove(&id).is_some() {
            self.overlays.save_category_map(&categories);
        }
        info!(id, "deleted task");
        Ok(())
    }

    /// Move `active_id` to the index currently held by `over_id`.
    ///
    /// The active task is removed first and reinserted at the target index of
    /// the shortened list, so it lands next to the target on the side it was
    /// dragged toward. Returns false, without persisting, if either id is
    /// missing.
    pub fn reorder(&mut self, active_id: TaskId, over_id: TaskId) -> bool {
        let (Some(from), Some(to)) = (self.position(active_id), self.position(over_id)) else {
            debug!(active_id, over_id, "ignoring reorder with unknown id");
            return false;
        };
        let task = self.tasks.remove(from);
        self.tasks.insert(to, task);
        self.overlays.save_order(&self.ids());
        true
    }

    /// Set or clear a task's category. Returns false if the task is unknown.
    pub fn assign_category(&mut self, task_id: TaskId, category_id: Option<&str>) -> bool {
        let category_id = non_empty(category_id);
        let Some(task) = self.tasks.iter_mut().find(|t| t.id == task_id) else {
            return false;
        };
        task.category_id = category_id.map(str::to_string);
        self.overlays.assign(task_id, category_id);
        true
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn ids(&self) -> Vec<TaskId> {
        self.tasks.iter().map(|t| t.id).collect()
    }

    fn position(&self, id: TaskId) -> Option<usize> {
        self.tasks.iter().position(|t| t.id == id)
    }

    fn record_failure(&mut self, op: &str, e: &GatewayError) -> GatewayError {
        warn!(op, status = ?e.status, error = %e, "gateway call failed");
        self.error = Some(e.message.clone());
        e.clone()
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    use crate::io::overlay::{CATEGORY_MAP_SLOT, ORDER_SLOT};
    use crate::io::slot_store::MemoryStore;
    use crate::model::view::StatusFilter;
    use pretty_assertions::assert_eq;

    /// In-memory gateway that records every call
    #[derive(Default)]
    struct FakeGateway {
        remote: RefCell<Vec<Task>>,
        calls: RefCell<Vec<String>>,
        fail_with: Cell<Option<u16>>,
        next_id: Cell<TaskId>,
    }

    impl FakeGateway {
        fn with_tasks(tasks: Vec<Task>) -> Self {
            let gw = FakeGateway::default();
            *gw.remote.borrow_mut() = tasks;
            gw.next_id.set(151);
            gw
        }

        fn calls(&self) -> Vec<String> {
            self.calls.borrow().clone()
        }

        fn check(&self, call: String) -> Result<(), GatewayError> {
            self.calls.borrow_mut().push(call);
            match self.fail_with.get() {
                Some(status) => Err(GatewayError::http(status)),
                None => Ok(()),
            }
        }
    }

    impl TaskGateway for FakeGateway {
        fn list(&self, limit: usize, skip: usize) -> Result<Vec<Task>, GatewayError> {
            self.check(format!("list {} {}", limit, skip))?;
            Ok(self.remote.borrow().iter().take(limit).cloned().collect())
        }

        fn get(&self, id: TaskId) -> Result<Task, GatewayError> {
            self.check(format!("get {}", id))?;
            self.remote
                .borrow()
                .iter()
                .find(|t| t.id == id)
                .cloned()
                .ok_or_else(|| GatewayError::http(404))
        }

        fn create(&self, text: &str) -> Result<Task, GatewayError> {
            self.check(format!("create {}", text))?;
            Ok(Task::new(self.next_id.get(), text, false, 1))
        }

        fn update(&self, id: TaskId, patch: &TaskPatch) -> Result<Task, GatewayError> {
            self.check(format!("update {}", id))?;
            let mut task = Task::new(id, "", false, 1);
            patch.apply_to(&mut task);
            Ok(task)
        }

        fn delete(&self, id: TaskId) -> Result<(), GatewayError> {
            self.check(format!("delete {}", id))
        }
    }

    fn remote_tasks() -> Vec<Task> {
        vec![
            Task::new(1, "a", false, 1),
            Task::new(2, "b", true, 1),
            Task::new(3, "c", false, 1),
        ]
    }

    fn fixed_clock() -> impl Fn() -> String {
        let tick = Rc::new(Cell::new(0u32));
        move || {
            tick.set(tick.get() + 1);
            format!("2025-01-01T00:00:{:02}.000Z", tick.get())
        }
    }

    fn engine<'a>(
        gw: &'a FakeGateway,
        store: &MemoryStore,
    ) -> TaskEngine<&'a FakeGateway, MemoryStore> {
        TaskEngine::new(gw, store.clone()).with_clock(fixed_clock())
    }

    fn ids(engine: &TaskEngine<&FakeGateway, MemoryStore>) -> Vec<TaskId> {
        engine.tasks().iter().map(|t| t.id).collect()
    }

    // --- load ---

    #[test]
    fn load_keeps_gateway_order_without_overlay() {
        let gw = FakeGateway::with_tasks(remote_tasks());
        let store = MemoryStore::new();
        let mut engine = engine(&gw, &store);
        engine.load();
        assert_eq!(ids(&engine), vec![1, 2, 3]);
        assert_eq!(gw.calls(), vec!["list 30 0"]);
        assert!(!engine.is_loading());
        assert!(engine.error().is_none());
        assert_eq!(store.writes(), 0);
    }

    #[test]
    fn load_applies_order_overlay() {
        let gw = FakeGateway::with_tasks(vec![Task::new(1, "a", false, 1), Task::new(2, "b", false, 1)]);
        let store = MemoryStore::new();
        store.seed(ORDER_SLOT, "[2,1]");
        let mut engine = engine(&gw, &store);
        engine.load();
        assert_eq!(ids(&engine), vec![2, 1]);
    }

    #[test]
    fn load_puts_unordered_tasks_last_in_gateway_order() {
        let gw = FakeGateway::with_tasks(remote_tasks());
        let store = MemoryStore::new();
        store.seed(ORDER_SLOT, "[3, 99]");
        let mut engine = engine(&gw, &store);
        engine.load();
        assert_eq!(ids(&engine), vec![3, 1, 2]);
    }

    #[test]
    fn load_attaches_categories_and_timestamps() {
        let gw = FakeGateway::with_tasks(remote_tasks());
        let store = MemoryStore::new();
        store.seed(CATEGORY_MAP_SLOT, r#"{"2":"work"}"#);
        let mut engine = engine(&gw, &store);
        engine.load();
        assert_eq!(engine.task(2).unwrap().category_id.as_deref(), Some("work"));
        assert!(engine.task(1).unwrap().category_id.is_none());
        assert!(engine.tasks().iter().all(|t| t.created_at.is_some()));
    }

    #[test]
    fn load_drops_duplicate_ids() {
        let gw = FakeGateway::with_tasks(vec![Task::new(1, "a", false, 1), Task::new(1, "again", false, 1)]);
        let store = MemoryStore::new();
        let mut engine = engine(&gw, &store);
        engine.load();
        assert_eq!(engine.tasks().len(), 1);
        assert_eq!(engine.tasks()[0].text, "a");
    }

    #[test]
    fn load_failure_leaves_collection_empty() {
        let gw = FakeGateway::with_tasks(remote_tasks());
        let store = MemoryStore::new();
        let mut engine = engine(&gw, &store);
        engine.load();
        gw.fail_with.set(Some(500));
        engine.load();
        assert!(engine.tasks().is_empty());
        assert_eq!(engine.error(), Some("HTTP error! status: 500"));
        assert_eq!(store.writes(), 0);

        gw.fail_with.set(None);
        engine.load();
        assert!(engine.error().is_none());
        assert_eq!(engine.tasks().len(), 3);
    }

    #[test]
    fn page_size_is_passed_to_gateway() {
        let gw = FakeGateway::with_tasks(remote_tasks());
        let store = MemoryStore::new();
        let mut engine = engine(&gw, &store).with_page_size(2);
        engine.load();
        assert_eq!(gw.calls(), vec!["list 2 0"]);
        assert_eq!(engine.tasks().len(), 2);
    }

    // --- create ---

    #[test]
    fn create_prepends_and_persists_order() {
        let gw = FakeGateway::with_tasks(remote_tasks());
        let store = MemoryStore::new();
        let mut engine = engine(&gw, &store);
        engine.load();

        let id = engine.create("  new thing  ", Some("work")).unwrap().unwrap();
        assert_eq!(id, 151);
        assert_eq!(ids(&engine), vec![151, 1, 2, 3]);
        let created = &engine.tasks()[0];
        assert_eq!(created.text, "new thing");
        assert_eq!(created.category_id.as_deref(), Some("work"));
        assert_eq!(created.origin, TaskOrigin::Local);
        assert_eq!(engine.overlays().order(), vec![151, 1, 2, 3]);
        assert_eq!(engine.overlays().category_map().get(&151).map(String::as_str), Some("work"));
        assert_eq!(gw.calls().last().unwrap(), "create new thing");
    }

    #[test]
    fn create_blank_text_is_a_no_op() {
        let gw = FakeGateway::with_tasks(remote_tasks());
        let store = MemoryStore::new();
        let mut engine = engine(&gw, &store);
        engine.load();
        let calls_before = gw.calls().len();

        assert_eq!(engine.create("   ", Some("work")).unwrap(), None);
        assert_eq!(engine.create("", None).unwrap(), None);
        assert_eq!(gw.calls().len(), calls_before);
        assert_eq!(ids(&engine), vec![1, 2, 3]);
        assert_eq!(store.writes(), 0);
    }

    #[test]
    fn create_failure_changes_nothing() {
        let gw = FakeGateway::with_tasks(remote_tasks());
        let store = MemoryStore::new();
        let mut engine = engine(&gw, &store);
        engine.load();
        gw.fail_with.set(Some(503));

        let err = engine.create("x", None).unwrap_err();
        assert_eq!(err.status, Some(503));
        assert_eq!(engine.error(), Some("HTTP error! status: 503"));
        assert_eq!(ids(&engine), vec![1, 2, 3]);
        assert_eq!(store.writes(), 0);
    }

    #[test]
    fn repeated_gateway_id_gets_a_synthetic_one() {
        let gw = FakeGateway::with_tasks(remote_tasks());
        let store = MemoryStore::new();
        let mut engine = engine(&gw, &store);
        engine.load();

        let first = engine.create("one", None).unwrap().unwrap();
        let second = engine.create("two", None).unwrap().unwrap();
        assert_eq!(first, 151);
        assert_eq!(second, 152);
        assert_eq!(ids(&engine), vec![152, 151, 1, 2, 3]);
        assert!(engine.task(152).unwrap().is_local());

        // A deleted id is not handed out again
        engine.delete(152).unwrap();
        let third = engine.create("three", None).unwrap().unwrap();
        assert_eq!(third, 153);
    }

    #[test]
    fn exhausted_id_space_is_an_error() {
        let gw = FakeGateway::with_tasks(remote_tasks());
        gw.next_id.set(TaskId::MAX);
        let store = MemoryStore::new();
        let mut engine = engine(&gw, &store);
        engine.load();

        assert_eq!(engine.create("last", None).unwrap(), Some(TaskId::MAX));
        let err = engine.create("one more", None).unwrap_err();
        assert_eq!(err.status, None);
        assert_eq!(engine.error(), Some(err.message.as_str()));
        assert_eq!(ids(&engine), vec![TaskId::MAX, 1, 2, 3]);
    }

    #[test]
    fn create_without_category_does_not_touch_category_overlay() {
        let gw = FakeGateway::with_tasks(remote_tasks());
        let store = MemoryStore::new();
        let mut engine = engine(&gw, &store);
        engine.load();
        engine.create("x", Some("")).unwrap();
        assert!(store.raw(CATEGORY_MAP_SLOT).is_none());
        assert!(engine.tasks()[0].category_id.is_none());
    }

    // --- update / toggle ---

    #[test]
    fn update_remote_task_calls_gateway_first() {
        let gw = FakeGateway::with_tasks(remote_tasks());
        let store = MemoryStore::new();
        let mut engine = engine(&gw, &store);
        engine.load();

        engine.update(1, TaskPatch::text(" renamed ")).unwrap();
        assert_eq!(gw.calls().last().unwrap(), "update 1");
        assert_eq!(engine.task(1).unwrap().text, "renamed");
    }

    #[test]
    fn update_failure_leaves_task_unchanged() {
        let gw = FakeGateway::with_tasks(remote_tasks());
        let store = MemoryStore::new();
        let mut engine = engine(&gw, &store);
        engine.load();
        gw.fail_with.set(Some(404));

        let err = engine.update(1, TaskPatch::completed(true)).unwrap_err();
        assert_eq!(err.status, Some(404));
        assert!(!engine.task(1).unwrap().completed);
        assert_eq!(engine.error(), Some("HTTP error! status: 404"));

        gw.fail_with.set(None);
        engine.update(1, TaskPatch::completed(true)).unwrap();
        assert!(engine.error().is_none());
        assert!(engine.task(1).unwrap().completed);
    }

    #[test]
    fn local_task_updates_skip_gateway() {
        let gw = FakeGateway::with_tasks(remote_tasks());
        let store = MemoryStore::new();
        let mut engine = engine(&gw, &store);
        engine.load();
        engine.create("local", None).unwrap();
        gw.fail_with.set(Some(500));
        let calls_before = gw.calls().len();

        engine.update(151, TaskPatch::completed(true)).unwrap();
        engine.toggle(151).unwrap();
        engine.toggle(151).unwrap();
        assert!(engine.task(151).unwrap().completed);
        assert_eq!(gw.calls().len(), calls_before);
    }

    #[test]
    fn update_unknown_id_is_silent() {
        let gw = FakeGateway::with_tasks(remote_tasks());
        let store = MemoryStore::new();
        let mut engine = engine(&gw, &store);
        engine.load();
        let calls_before = gw.calls().len();

        engine.update(999, TaskPatch::completed(true)).unwrap();
        engine.toggle(999).unwrap();
        assert!(engine.error().is_none());
        assert_eq!(gw.calls().len(), calls_before);
    }

    #[test]
    fn update_blank_text_is_ignored() {
        let gw = FakeGateway::with_tasks(remote_tasks());
        let store = MemoryStore::new();
        let mut engine = engine(&gw, &store);
        engine.load();
        let calls_before = gw.calls().len();
        engine.update(1, TaskPatch::text("  ")).unwrap();
        assert_eq!(engine.task(1).unwrap().text, "a");
        assert_eq!(gw.calls().len(), calls_before);
    }

    #[test]
    fn toggle_flips_completion() {
        let gw = FakeGateway::with_tasks(remote_tasks());
        let store = MemoryStore::new();
        let mut engine = engine(&gw, &store);
        engine.load();
        engine.toggle(2).unwrap();
        assert!(!engine.task(2).unwrap().completed);
        assert_eq!(gw.calls().last().unwrap(), "update 2");
    }

    #[test]
    fn custom_local_rule_is_honored() {
        let gw = FakeGateway::with_tasks(remote_tasks());
        let store = MemoryStore::new();
        let mut engine = engine(&gw, &store).with_local_rule(|id: TaskId| id % 2 == 0);
        engine.load();
        let calls_before = gw.calls().len();
        engine.toggle(2).unwrap();
        assert_eq!(gw.calls().len(), calls_before);
        engine.toggle(3).unwrap();
        assert_eq!(gw.calls().last().unwrap(), "update 3");
    }

    #[test]
    fn default_rule_routes_ids_up_to_threshold() {
        let gw = FakeGateway::with_tasks(vec![
            Task::new(150, "last remote", false, 1),
            Task::new(151, "past threshold", false, 1),
        ]);
        let store = MemoryStore::new();
        let mut engine = engine(&gw, &store);
        engine.load();
        assert!(engine.tasks().iter().all(|t| t.origin == TaskOrigin::Remote));

        engine.toggle(150).unwrap();
        engine.toggle(151).unwrap();
        engine.delete(151).unwrap();
        assert_eq!(gw.calls(), vec!["list 30 0", "update 150"]);
        assert!(engine.task(150).unwrap().completed);
        assert!(engine.task(151).is_none());
    }

    // --- delete ---

    #[test]
    fn delete_prunes_overlays() {
        let gw = FakeGateway::with_tasks(remote_tasks());
        let store = MemoryStore::new();
        store.seed(CATEGORY_MAP_SLOT, r#"{"2":"work","3":"home"}"#);
        let mut engine = engine(&gw, &store);
        engine.load();

        engine.delete(2).unwrap();
        assert_eq!(ids(&engine), vec![1, 3]);
        assert_eq!(gw.calls().last().unwrap(), "delete 2");
        assert_eq!(engine.overlays().order(), vec![1, 3]);
        let map = engine.overlays().category_map();
        assert!(!map.contains_key(&2));
        assert_eq!(map.get(&3).map(String::as_str), Some("home"));
    }

    #[test]
    fn delete_failure_keeps_task() {
        let gw = FakeGateway::with_tasks(remote_tasks());
        let store = MemoryStore::new();
        let mut engine = engine(&gw, &store);
        engine.load();
        gw.fail_with.set(Some(500));
        assert!(engine.delete(1).is_err());
        assert_eq!(ids(&engine), vec![1, 2, 3]);
        assert_eq!(store.writes(), 0);
    }

    #[test]
    fn delete_local_task_skips_gateway() {
        let gw = FakeGateway::with_tasks(remote_tasks());
        let store = MemoryStore::new();
        let mut engine = engine(&gw, &store);
        engine.load();
        engine.create("temp", Some("1")).unwrap();
        let calls_before = gw.calls().len();

        engine.delete(151).unwrap();
        assert_eq!(gw.calls().len(), calls_before);
        assert_eq!(engine.overlays().order(), vec![1, 2, 3]);
        assert!(engine.overlays().category_map().is_empty());
    }

    #[test]
    fn delete_unknown_id_is_silent() {
        let gw = FakeGateway::with_tasks(remote_tasks());
        let store = MemoryStore::new();
        let mut engine = engine(&gw, &store);
        engine.load();
        engine.delete(42).unwrap();
        assert_eq!(store.writes(), 0);
        assert!(engine.error().is_none());
    }

    // --- reorder ---

    #[test]
    fn reorder_moves_down_past_target() {
        let gw = FakeGateway::with_tasks(remote_tasks());
        let store = MemoryStore::new();
        let mut engine = engine(&gw, &store);
        engine.load();
        assert!(engine.reorder(1, 3));
        assert_eq!(ids(&engine), vec![2, 3, 1]);
        assert_eq!(engine.overlays().order(), vec![2, 3, 1]);
    }

    #[test]
    fn reorder_moves_up_before_target() {
        let gw = FakeGateway::with_tasks(remote_tasks());
        let store = MemoryStore::new();
        let mut engine = engine(&gw, &store);
        engine.load();
        assert!(engine.reorder(3, 1));
        assert_eq!(ids(&engine), vec![3, 1, 2]);
    }

    #[test]
    fn reorder_with_unknown_id_is_a_no_op() {
        let gw = FakeGateway::with_tasks(remote_tasks());
        let store = MemoryStore::new();
        let mut engine = engine(&gw, &store);
        engine.load();
        assert!(!engine.reorder(1, 77));
        assert!(!engine.reorder(77, 1));
        assert_eq!(ids(&engine), vec![1, 2, 3]);
        assert_eq!(store.writes(), 0);
    }

    #[test]
    fn reorder_never_calls_gateway() {
        let gw = FakeGateway::with_tasks(remote_tasks());
        let store = MemoryStore::new();
        let mut engine = engine(&gw, &store);
        engine.load();
        let calls_before = gw.calls().len();
        engine.reorder(2, 1);
        assert_eq!(gw.calls().len(), calls_before);
    }

    // --- categories ---

    #[test]
    fn assign_and_clear_category() {
        let gw = FakeGateway::with_tasks(remote_tasks());
        let store = MemoryStore::new();
        let mut engine = engine(&gw, &store);
        engine.load();
        let calls_before = gw.calls().len();

        assert!(engine.assign_category(1, Some("2")));
        assert_eq!(engine.task(1).unwrap().category_id.as_deref(), Some("2"));
        assert_eq!(engine.overlays().category_map().get(&1).map(String::as_str), Some("2"));

        assert!(engine.assign_category(1, None));
        assert!(engine.task(1).unwrap().category_id.is_none());
        assert!(engine.overlays().category_map().is_empty());
        assert_eq!(gw.calls().len(), calls_before);
    }

    #[test]
    fn assign_to_unknown_task_is_ignored() {
        let gw = FakeGateway::with_tasks(remote_tasks());
        let store = MemoryStore::new();
        let mut engine = engine(&gw, &store);
        engine.load();
        assert!(!engine.assign_category(9, Some("2")));
        assert_eq!(store.writes(), 0);
    }

    // --- view ---

    #[test]
    fn visible_uses_current_view() {
        let gw = FakeGateway::with_tasks(remote_tasks());
        let store = MemoryStore::new();
        let mut engine = engine(&gw, &store);
        engine.load();
        engine.view_mut().status = StatusFilter::Completed;
        let visible: Vec<TaskId> = engine.visible().iter().map(|t| t.id).collect();
        assert_eq!(visible, vec![2]);
        assert_eq!(engine.tasks().len(), 3);
    }
}
