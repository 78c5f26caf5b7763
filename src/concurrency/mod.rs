pub mod build_lock;

pub use build_lock::{BuildLock, BuildLockGuard};
