mod batch_worker;

pub use batch_worker::{run_batch, spawn_batch, BatchSink, WorkerEvent};
