//! # Dispatch Layer
//!
//! Thread pools and the two delivery strategies.
//!
//! | Component | Used by | Blocks caller |
//! |-----------|---------|---------------|
//! | `SyncDeliverTasks` | `send`, async drains | yes, bounded by the timeout per handler |
//! | `AsyncDeliverTasks` | `publish` | no |
//! | `ThreadPool` | both | no |

pub mod async_deliver;
pub mod ignore;
pub mod sync_deliver;
pub mod thread_pool;

pub use async_deliver::AsyncDeliverTasks;
pub use ignore::IgnoreTimeout;
pub use sync_deliver::{DeliveryReport, SyncDeliverTasks};
pub use thread_pool::{CloseMode, Job, PoolConfig, PoolStats, ThreadPool};

use std::any::Any;

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
