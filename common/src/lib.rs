pub mod endpoint;
pub mod job;
pub mod kv;
pub mod partition;
pub mod task;
pub mod wordcount;

pub use job::JobStatusReport;
pub use kv::KeyValue;
pub use partition::{bucket_for, ihash};
pub use task::{
    AssignmentRequest, CompletionNotice, CompletionReply, Task, TaskId, TaskKind, WorkerId,
};
