//! Running event-graph aggregates folded on long-lived worker threads.
//!
//! Each aggregate owns one worker. A fold hands the accumulator and the
//! frame graph to the worker, which sends the accumulator back once the
//! combine is done; `wait` is the barrier for that hand-back.

use crate::event_graph::EventGraphNode;
use log::{debug, error, warn};
use std::io;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Tree merge applied by a running aggregate
pub type CombineFn = fn(&mut EventGraphNode, &EventGraphNode);

type CombineJob = (EventGraphNode, Arc<EventGraphNode>);

struct CombineWorker {
    jobs: Option<Sender<CombineJob>>,
    results: Receiver<EventGraphNode>,
    handle: Option<JoinHandle<()>>,
}

impl CombineWorker {
    fn spawn(label: &'static str, combine: CombineFn) -> io::Result<Self> {
        let (jobs, pending) = mpsc::channel::<CombineJob>();
        let (done, results) = mpsc::channel();
        let handle = thread::Builder::new()
            .name(format!("frametrace-{}", label))
            .spawn(move || {
                for (mut accumulator, graph) in pending {
                    combine(&mut accumulator, &graph);
                    if done.send(accumulator).is_err() {
                        break;
                    }
                }
            })?;
        debug!("Started {} combine worker", label);

        Ok(Self {
            jobs: Some(jobs),
            results,
            handle: Some(handle),
        })
    }

    /// Queue one fold; the accumulator comes back when the worker is gone
    fn dispatch(&self, accumulator: EventGraphNode, graph: Arc<EventGraphNode>) -> Result<(), EventGraphNode> {
        match &self.jobs {
            Some(jobs) => jobs.send((accumulator, graph)).map_err(|err| err.0 .0),
            None => Err(accumulator),
        }
    }
}

impl Drop for CombineWorker {
    fn drop(&mut self) {
        // Closing the job channel ends the worker loop.
        self.jobs.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("Combine worker panicked");
            }
        }
    }
}

/// One running aggregate (total or maximum) of every frame graph folded in
pub struct RunningGraph {
    label: &'static str,
    combine: CombineFn,
    graph: Option<EventGraphNode>,
    worker: Option<CombineWorker>,
    pending: bool,
}

impl RunningGraph {
    pub fn new(label: &'static str, combine: CombineFn) -> Self {
        Self {
            label,
            combine,
            graph: None,
            worker: None,
            pending: false,
        }
    }

    /// Start folding `frame` into the aggregate
    ///
    /// The first frame seeds the aggregate. The worker is started on the
    /// first real fold; if it cannot be started, or has died, the fold runs
    /// on the calling thread instead.
    ///
    /// Callers must `wait` between two folds.
    pub fn fold(&mut self, frame: &Arc<EventGraphNode>) {
        debug_assert!(!self.pending, "fold while a combine is outstanding");
        let Some(mut accumulator) = self.graph.take() else {
            self.graph = Some(EventGraphNode::clone(frame));
            return;
        };

        if self.worker.is_none() {
            match CombineWorker::spawn(self.label, self.combine) {
                Ok(worker) => self.worker = Some(worker),
                Err(err) => warn!("Cannot start {} combine worker: {}", self.label, err),
            }
        }

        if let Some(worker) = &self.worker {
            match worker.dispatch(accumulator, Arc::clone(frame)) {
                Ok(()) => {
                    self.pending = true;
                    return;
                }
                Err(returned) => {
                    warn!("{} combine worker stopped, folding on the session thread", self.label);
                    accumulator = returned;
                    self.worker = None;
                }
            }
        }

        (self.combine)(&mut accumulator, frame);
        self.graph = Some(accumulator);
    }

    /// Barrier for the outstanding fold, if any
    ///
    /// A fold that panicked loses the aggregate; the next frame seeds a new one.
    pub fn wait(&mut self) {
        if !std::mem::take(&mut self.pending) {
            return;
        }
        let Some(worker) = &self.worker else {
            return;
        };
        match worker.results.recv() {
            Ok(graph) => self.graph = Some(graph),
            Err(_) => {
                error!("{} event graph combine panicked; running aggregate lost", self.label);
                self.worker = None;
            }
        }
    }

    /// Aggregate as of the last completed fold
    pub fn graph(&self) -> Option<&EventGraphNode> {
        self.graph.as_ref()
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// True once a worker thread has been started and is still alive
    pub fn has_worker(&self) -> bool {
        self.worker.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_graph::{combine_and_add, combine_and_find_max};

    fn frame(ms: f64) -> Arc<EventGraphNode> {
        Arc::new(
            EventGraphNode::new(1, "Root")
                .with_timing(0.0, ms, 1.0)
                .with_child(EventGraphNode::new(10, "Tick").with_timing(0.0, ms, 1.0)),
        )
    }

    #[test]
    fn test_first_frame_seeds_without_worker() {
        let mut total = RunningGraph::new("total", combine_and_add);
        total.fold(&frame(4.0));
        assert!(!total.is_pending());
        assert!(!total.has_worker());
        assert_eq!(total.graph().unwrap().inclusive_ms, 4.0);
    }

    #[test]
    fn test_one_worker_serves_every_fold() {
        let mut total = RunningGraph::new("total", combine_and_add);
        let mut maximum = RunningGraph::new("maximum", combine_and_find_max);
        for ms in [4.0, 8.0, 2.0, 16.0] {
            let graph = frame(ms);
            total.fold(&graph);
            maximum.fold(&graph);
            total.wait();
            maximum.wait();
        }

        assert!(total.has_worker());
        assert_eq!(total.graph().unwrap().inclusive_ms, 30.0);
        assert_eq!(total.graph().unwrap().find("Tick").unwrap().num_calls, 4.0);
        assert_eq!(maximum.graph().unwrap().inclusive_ms, 16.0);
    }

    #[test]
    fn test_wait_without_fold_is_a_no_op() {
        let mut total = RunningGraph::new("total", combine_and_add);
        total.wait();
        assert!(total.graph().is_none());
    }
}
