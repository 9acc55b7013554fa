use crate::error::{Result, TreeError};
use crate::tree::{StateTree, TreeId};
use std::collections::HashMap;
use std::sync::{Arc, Condvar, Mutex, PoisonError};

/// A unit of work whose result can be cached by content
pub trait Resolvable: Send + Sync {
    /// Canonical key; equal keys must describe equal work.
    fn key(&self) -> String;

    /// Build the tree. `id` is the identifier the store assigned to this work.
    fn resolve(&self, id: &TreeId) -> Result<StateTree>;
}

/// Content-addressed store of state trees.
///
/// `store` registers work without running it. `resolve` builds the tree for
/// an id at most once and hands the same tree to every caller. A failed
/// build is kept as well: later resolves of that id return the same error
/// without running the work again.
pub trait Store: Send + Sync {
    fn store(&self, work: Arc<dyn Resolvable>) -> Result<TreeId>;
    fn resolve(&self, id: &TreeId) -> Result<Arc<StateTree>>;
}

struct LoadWaiter {
    state: Arc<(Mutex<LoadState>, Condvar)>,
}

struct LoadState {
    done: bool,
    result: Option<Result<Arc<StateTree>>>,
}

impl Clone for LoadWaiter {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
        }
    }
}

impl LoadWaiter {
    fn new() -> Self {
        Self {
            state: Arc::new((
                Mutex::new(LoadState {
                    done: false,
                    result: None,
                }),
                Condvar::new(),
            )),
        }
    }

    fn finish(&self, result: Result<Arc<StateTree>>) {
        let (lock, cv) = &*self.state;
        {
            let mut guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
            guard.done = true;
            guard.result = Some(result);
        }
        cv.notify_all();
    }

    fn wait(&self) -> Result<Arc<StateTree>> {
        let (lock, cv) = &*self.state;
        let mut guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        while !guard.done {
            guard = cv.wait(guard).unwrap_or_else(PoisonError::into_inner);
        }
        guard
            .result
            .clone()
            .unwrap_or_else(|| Err(TreeError::Other("tree load finished without a result".into())))
    }
}

#[derive(Clone)]
enum Entry {
    Ready(Arc<StateTree>),
    Failed(TreeError),
    Loading(LoadWaiter),
}

struct StoreState {
    capacity: usize,
    work: HashMap<TreeId, Arc<dyn Resolvable>>,
    entries: HashMap<TreeId, Entry>,
}

impl StoreState {
    fn begin_load(&mut self, id: TreeId) -> LoadWaiter {
        let waiter = LoadWaiter::new();
        self.entries.insert(id, Entry::Loading(waiter.clone()));
        waiter
    }

    fn settle(&mut self, id: &TreeId, result: &Result<Arc<StateTree>>) {
        let entry = match result {
            Ok(tree) => Entry::Ready(tree.clone()),
            Err(err) => {
                log::warn!("Failed to build state tree {}: {err}", id.short());
                Entry::Failed(err.clone())
            }
        };
        self.entries.insert(id.clone(), entry);
    }

    fn ready_len(&self) -> usize {
        self.entries
            .values()
            .filter(|e| matches!(e, Entry::Ready(_)))
            .count()
    }
}

enum Step {
    Done(Result<Arc<StateTree>>),
    Wait(LoadWaiter),
    Load(Arc<dyn Resolvable>, LoadWaiter),
}

/// Settles an in-flight load even when the work unwinds, so waiters never
/// block on a load that will not finish.
struct LoadGuard<'a> {
    store: &'a MemoryStore,
    id: &'a TreeId,
    waiter: Option<LoadWaiter>,
}

impl LoadGuard<'_> {
    fn complete(mut self, result: Result<Arc<StateTree>>) -> Result<Arc<StateTree>> {
        if let Some(waiter) = self.waiter.take() {
            self.store.lock().settle(self.id, &result);
            waiter.finish(result.clone());
        }
        result
    }
}

impl Drop for LoadGuard<'_> {
    fn drop(&mut self) {
        if let Some(waiter) = self.waiter.take() {
            let result = Err(TreeError::Other(format!(
                "building state tree {} panicked",
                self.id.short()
            )));
            self.store.lock().settle(self.id, &result);
            waiter.finish(result);
        }
    }
}

/// In-process [`Store`] with single-flight loads.
///
/// Every outcome is kept for the life of the store, so each registered key
/// is built at most once. `capacity` bounds the number of distinct keys;
/// registering a new key beyond it fails with [`TreeError::StoreFull`].
pub struct MemoryStore {
    state: Mutex<StoreState>,
}

impl MemoryStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(StoreState {
                capacity: capacity.max(1),
                work: HashMap::new(),
                entries: HashMap::new(),
            }),
        }
    }

    /// Number of trees currently built.
    pub fn ready_len(&self) -> usize {
        self.lock().ready_len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Store for MemoryStore {
    fn store(&self, work: Arc<dyn Resolvable>) -> Result<TreeId> {
        let id = TreeId::fingerprint(&work.key());
        let mut state = self.lock();
        if !state.work.contains_key(&id) {
            if state.work.len() >= state.capacity {
                return Err(TreeError::StoreFull(state.capacity));
            }
            state.work.insert(id.clone(), work);
        }
        Ok(id)
    }

    fn resolve(&self, id: &TreeId) -> Result<Arc<StateTree>> {
        let step = {
            let mut state = self.lock();
            match state.entries.get(id).cloned() {
                Some(Entry::Ready(tree)) => Step::Done(Ok(tree)),
                Some(Entry::Failed(err)) => Step::Done(Err(err)),
                Some(Entry::Loading(waiter)) => Step::Wait(waiter),
                None => {
                    let work = state
                        .work
                        .get(id)
                        .cloned()
                        .ok_or_else(|| TreeError::UnknownTree(id.clone()))?;
                    Step::Load(work, state.begin_load(id.clone()))
                }
            }
        };

        match step {
            Step::Done(result) => result,
            Step::Wait(waiter) => waiter.wait(),
            Step::Load(work, waiter) => {
                let guard = LoadGuard {
                    store: self,
                    id,
                    waiter: Some(waiter),
                };
                let result = work.resolve(id).map(Arc::new);
                guard.complete(result)
            }
        }
    }
}
