use bson::DateTime;

/// Wall-clock collaborator. All durations and window checks in the
/// attendance engine derive from this, which keeps the lifecycle rules
/// deterministic under test.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime {
        DateTime::now()
    }
}
