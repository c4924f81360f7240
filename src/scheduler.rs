use crate::error::Error;




type Action<C> = Box<dyn FnMut(&mut C, i32) -> Result<(), Error>>;


struct RecurringTask<C> {
    name: String,
    interval: f64,
    count: i32,
    action: Action<C>,
}




/**
 * Dispatches named tasks at fixed intervals of simulation time. Each task
 * keeps a count of how many times it has fired; task `n` is due once the
 * clock reaches `interval * n`. Counts are supplied at installation so a
 * restarted run resumes the firing sequence of an uninterrupted one.
 *
 * Tasks receive a caller-supplied context (mutably) and their current count.
 * A task whose interval is not positive never fires.
 */
pub struct Scheduler<C> {
    tasks: Vec<RecurringTask<C>>,
}




// ============================================================================
impl<C> Scheduler<C> {

    pub fn new() -> Self {
        Self { tasks: Vec::new() }
    }


    /**
     * Install a named task with the given interval, initial count, and
     * action.
     */
    pub fn repeat<F>(&mut self, name: &str, interval: f64, count: i32, action: F)
    where
        F: FnMut(&mut C, i32) -> Result<(), Error> + 'static,
    {
        self.tasks.push(RecurringTask {
            name: name.to_string(),
            interval,
            count,
            action: Box::new(action),
        })
    }


    /**
     * Run every task that has come due at the given time, passing it the
     * context and its count, and advance the counts past `time`.
     */
    pub fn dispatch(&mut self, context: &mut C, time: f64) -> Result<(), Error> {
        for task in &mut self.tasks {
            if task.interval <= 0.0 {
                continue;
            }
            while task.interval * task.count as f64 <= time {
                log::trace!("dispatch {} (count {})", task.name, task.count);
                (task.action)(context, task.count)?;
                task.count += 1;
            }
        }
        Ok(())
    }
}




// ============================================================================
impl<C> std::fmt::Display for Scheduler<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        for task in &self.tasks {
            writeln!(
                f,
                "{:.<24} interval={} count={}",
                task.name, task.interval, task.count)?
        }
        Ok(())
    }
}
