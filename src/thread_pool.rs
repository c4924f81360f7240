use core_affinity::{get_core_ids, set_for_current};
use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use std::cell;
use std::thread;

type Job = Box<dyn FnOnce() + Send + 'static>;

struct Worker {
    handle: Option<thread::JoinHandle<()>>,
    sender: Option<Sender<Job>>,
}

/// A minimal thread pool with core affinity. No effort is made to schedule
/// jobs intelligently, it just goes round-robin. Jobs must be `'static`, and
/// each job hands its result back through a single-shot channel so the
/// submitting thread can collect results in submission order.
///
pub struct ThreadPool {
    workers: Vec<Worker>,
    current_worker_id: cell::Cell<usize>,
}

impl ThreadPool {
    /// Create a new thread pool with at most the given number of threads. If
    /// the system has fewer physical CPU cores than the requested number of
    /// threads, then the number of cores is used instead.
    ///
    pub fn new(num_threads: usize) -> Self {
        let workers = get_core_ids()
            .unwrap()
            .into_iter()
            .take(num_threads)
            .map(|core_id| {
                let (sender, receiver): (Sender<Job>, Receiver<Job>) = unbounded();
                let handle = thread::spawn(move || {
                    set_for_current(core_id);
                    for job in receiver {
                        job()
                    }
                });
                Worker {
                    handle: Some(handle),
                    sender: Some(sender),
                }
            })
            .collect();

        ThreadPool {
            workers,
            current_worker_id: cell::Cell::new(0),
        }
    }

    /// Return the number of worker threads in the pool.
    ///
    pub fn num_threads(&self) -> usize {
        self.workers.len()
    }

    /// Submit a job to the pool and return the handle on which its result
    /// will arrive. Job submissions go cyclically to the workers: if worker
    /// `n` gets this job, then worker `(n + 1) % num_workers` gets the next
    /// one.
    ///
    pub fn spawn<F, T>(&self, job: F) -> Receiver<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let (sender, receiver) = bounded(1);
        self.spawn_job(Box::new(move || {
            sender.send(job()).ok();
        }));
        receiver
    }

    fn spawn_job(&self, job: Job) {
        let worker_id = self.current_worker_id.get();
        self.current_worker_id
            .set((worker_id + 1) % self.num_threads());
        self.workers[worker_id]
            .sender
            .as_ref()
            .unwrap()
            .send(job)
            .unwrap();
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.sender.take().unwrap();
        self.handle.take().unwrap().join().unwrap();
    }
}

#[cfg(test)]
mod test {

    use super::*;

    #[test]
    fn results_come_back_through_the_handles_in_submission_order() {
        let pool = ThreadPool::new(4);
        let handles: Vec<_> = (0..32)
            .map(|n| pool.spawn(move || n * n))
            .collect();
        let results: Vec<i64> = handles.iter().map(|h| h.recv().unwrap()).collect();
        assert_eq!(results, (0..32).map(|n| n * n).collect::<Vec<i64>>());
    }

    #[test]
    fn the_pool_does_not_exceed_the_requested_size() {
        let pool = ThreadPool::new(2);
        assert!(pool.num_threads() <= 2);
    }
}
