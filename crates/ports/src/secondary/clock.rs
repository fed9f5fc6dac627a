use std::time::SystemTime;

/// Wall-clock source. Injected so window math is deterministic under test.
pub trait Clock: Send + Sync {
    fn now(&self) -> SystemTime;
}
