use tokio::task::JoinHandle;

/// Tracks in-flight background requests so they can be cancelled together
pub struct TaskManager {
    handles: Vec<JoinHandle<()>>,
}

impl TaskManager {
    /// Create a new empty task manager
    pub fn new() -> Self {
        Self {
            handles: Vec::new(),
        }
    }

    /// Spawn a task and track it, forgetting tasks that already finished
    pub fn spawn<F>(&mut self, future: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        self.handles.retain(|handle| !handle.is_finished());
        self.handles.push(tokio::spawn(future));
    }

    /// Abort all tasks without waiting, returning how many were still running
    pub fn abort_all(&mut self) -> usize {
        let mut running = 0;
        for handle in self.handles.drain(..) {
            if !handle.is_finished() {
                running += 1;
            }
            handle.abort();
        }
        running
    }
}

impl Default for TaskManager {
    fn default() -> Self {
        Self::new()
    }
}
