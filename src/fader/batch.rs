use std::sync::{Arc, Mutex, MutexGuard};

/// Batches kept for reuse once their job is done
const MAX_POOLED: usize = 4;

/// Per-frame command groups for one job.
///
/// Frame `i` holds the concatenated directives of every container for that
/// frame, so a whole frame goes out in a single RUN_COMMAND.
#[derive(Debug, Clone, Default)]
pub struct FrameBatch {
    frames: Vec<String>,
    containers: usize,
}

impl FrameBatch {
    pub fn new(num_frames: usize) -> Self {
        Self {
            frames: vec![String::new(); num_frames],
            containers: 0,
        }
    }

    /// Append one container's per-frame directives
    pub fn push_commands<S: AsRef<str>>(&mut self, commands: &[S]) {
        debug_assert_eq!(commands.len(), self.frames.len());
        for (frame, command) in self.frames.iter_mut().zip(commands) {
            frame.push_str(command.as_ref());
        }
        self.containers += 1;
    }

    /// Number of frames
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// True when no container contributed a command
    pub fn is_empty(&self) -> bool {
        self.containers == 0
    }

    pub fn containers(&self) -> usize {
        self.containers
    }

    pub fn frame(&self, index: usize) -> Option<&str> {
        self.frames.get(index).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.frames.iter().map(String::as_str)
    }

    /// Empty every frame, keeping the allocations
    pub fn clear(&mut self) {
        for frame in &mut self.frames {
            frame.clear();
        }
        self.containers = 0;
    }
}

/// Recycles frame batches between jobs
#[derive(Debug, Clone)]
pub struct BatchPool {
    num_frames: usize,
    free: Arc<Mutex<Vec<FrameBatch>>>,
}

impl BatchPool {
    pub fn new(num_frames: usize) -> Self {
        Self {
            num_frames,
            free: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<FrameBatch>> {
        // A panic while holding the lock cannot leave the free list inconsistent
        self.free.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// An empty batch, reused when one is available
    pub fn get(&self) -> FrameBatch {
        self.lock()
            .pop()
            .unwrap_or_else(|| FrameBatch::new(self.num_frames))
    }

    /// Hand a batch back once its job no longer needs it
    pub fn put(&self, mut batch: FrameBatch) {
        if batch.len() != self.num_frames {
            return;
        }
        batch.clear();

        let mut free = self.lock();
        if free.len() < MAX_POOLED {
            free.push(batch);
        }
    }

    pub fn available(&self) -> usize {
        self.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_groups_by_frame() {
        let mut batch = FrameBatch::new(2);
        assert!(batch.is_empty());

        batch.push_commands(&["[con_id=1] opacity 0.5000;", "[con_id=1] opacity 1.0000;"]);
        batch.push_commands(&["[con_id=2] opacity 0.6000;", "[con_id=2] opacity 0.9000;"]);

        assert_eq!(batch.containers(), 2);
        assert_eq!(
            batch.frame(0),
            Some("[con_id=1] opacity 0.5000;[con_id=2] opacity 0.6000;")
        );
        assert_eq!(
            batch.frame(1),
            Some("[con_id=1] opacity 1.0000;[con_id=2] opacity 0.9000;")
        );
    }

    #[test]
    fn test_pool_reuses_cleared_batches() {
        let pool = BatchPool::new(3);
        let mut batch = pool.get();
        batch.push_commands(&["a;", "b;", "c;"]);
        pool.put(batch);
        assert_eq!(pool.available(), 1);

        let reused = pool.get();
        assert!(reused.is_empty());
        assert_eq!(reused.len(), 3);
        assert!(reused.iter().all(str::is_empty));
        assert_eq!(pool.available(), 0);
    }

    #[test]
    fn test_pool_is_bounded() {
        let pool = BatchPool::new(1);
        for _ in 0..10 {
            pool.put(FrameBatch::new(1));
        }
        assert_eq!(pool.available(), MAX_POOLED);

        pool.put(FrameBatch::new(5));
        assert_eq!(pool.available(), MAX_POOLED);
    }
}
