pub mod pool;
pub mod result;
pub mod retry;

pub use pool::{RunnerConfig, TaskRunner};
pub use result::{AttemptOutcome, BatchResult, ErrorDescriptor, ErrorKind};
pub use retry::{FixedJitter, JitterSource, RetryPolicy, ThreadRngJitter};
