pub mod executor;
pub mod rpc;
pub mod worker;

pub use executor::{MapFn, ReduceFn};
pub use rpc::CoordinatorClient;
pub use worker::{run_worker, WorkerConfig};
