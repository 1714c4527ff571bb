//! Job progress reporting and cooperative cancellation.
//!
//! A running job holds a `JobHandle` over some `JobChannel`:
//!
//! ```text
//! JobHandle::begin(channel, total)   -> "0 total"
//!     check_cancelled() / advance()  -> "k total"
//! JobHandle::end()                   -> "total total"
//! ```
//!
//! and returns a `JobOutcome` telling whether it ran to completion.

mod channel;
mod handle;
mod outcome;

pub use channel::{
    read_progress, request_cancel, CancelHandle, FileChannel, JobChannel, MemoryChannel,
    Progress, BUILD_PROGRESS_FILE, CANCEL_SENTINEL, SWEEP_PROGRESS_FILE,
};
pub use handle::JobHandle;
pub use outcome::JobOutcome;
