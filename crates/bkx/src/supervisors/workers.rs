//! 🧵 Workers: the ones who actually move the bytes while the Supervisor takes all
//! the credit in the sprint retro.
//!
//! ⚠️ Workers are the supervisor's private minions. They stay `pub(in crate::supervisors)`.

use tokio::task::JoinHandle;

use crate::common::RunSummary;

mod transfer_worker;
pub(in crate::supervisors) use transfer_worker::TransferWorker;

/// 🏗️ A background worker, that does work. duh.
///
/// Spawned onto the runtime; the handle resolves to the worker's own tally once its
/// queue is drained and closed.
pub(in crate::supervisors) trait Worker {
    fn start(self) -> JoinHandle<RunSummary>;
}
