use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::client::TaskClient;
use crate::envelope::EventEnvelope;
use crate::errors::TaskError;
use crate::reducer::{ProgressSnapshot, RunReducer, RunState};
use crate::session::{AbortHandle, TaskObserver};
use crate::task::TaskRequest;

/// How long a run may sit in `Initializing` before it is shown as `Running`
/// even though no envelope arrived yet. Feedback only, no network effect.
pub const INIT_GRACE: Duration = Duration::from_millis(400);

/// Handle for one task run wired to its own reducer.
///
/// Snapshots are read-only; all mutation flows through envelope dispatch
/// inside the session. Two overlapping runs never share a reducer, and no
/// ordering is guaranteed between their callbacks.
pub struct TaskRun {
    reducer: Arc<Mutex<RunReducer>>,
    abort: AbortHandle,
}

impl TaskClient {
    /// Starts a run and returns a handle exposing log/progress snapshots.
    ///
    /// This is the convenience layer over `dispatch` for callers that do not
    /// need a custom observer. The run starts in
    /// [`RunState::Initializing`](crate::reducer::RunState) and shows
    /// `Running` once the first server envelope arrives or after
    /// [`INIT_GRACE`] (400 ms), whichever comes first.
    pub fn start(&self, request: TaskRequest) -> TaskRun {
        let reducer = Arc::new(Mutex::new(RunReducer::new(request.effective_max_steps())));
        lock(&reducer).begin();

        let grace = reducer.clone();
        tokio::spawn(async move {
            tokio::time::sleep(INIT_GRACE).await;
            lock(&grace).mark_running();
        });

        let abort = self.dispatch(
            request,
            ReducerObserver {
                reducer: reducer.clone(),
            },
        );
        TaskRun { reducer, abort }
    }
}

impl TaskRun {
    /// Requests cancellation. Idempotent, safe in any state.
    pub fn abort(&self) {
        self.abort.abort();
    }

    /// A cloneable cancellation handle, e.g. for layering a timeout.
    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    pub fn state(&self) -> RunState {
        lock(&self.reducer).state()
    }

    /// Copy of the execution log in arrival order.
    pub fn log(&self) -> Vec<EventEnvelope> {
        lock(&self.reducer).log().to_vec()
    }

    pub fn progress(&self) -> ProgressSnapshot {
        lock(&self.reducer).progress()
    }
}

struct ReducerObserver {
    reducer: Arc<Mutex<RunReducer>>,
}

impl TaskObserver for ReducerObserver {
    fn on_event(&mut self, envelope: EventEnvelope) {
        lock(&self.reducer).apply(envelope);
    }

    fn on_error(&mut self, error: TaskError) {
        lock(&self.reducer).fail(&error);
    }

    fn on_complete(&mut self) {
        lock(&self.reducer).complete();
    }

    fn on_cancelled(&mut self) {
        lock(&self.reducer).cancel();
    }
}

fn lock(reducer: &Mutex<RunReducer>) -> MutexGuard<'_, RunReducer> {
    reducer.lock().unwrap_or_else(PoisonError::into_inner)
}
