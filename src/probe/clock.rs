use std::fmt::{Debug, Formatter};
use std::time::{SystemTime, UNIX_EPOCH};
use anyhow::anyhow;

/// Wall clock time as seconds and nanoseconds since the UNIX epoch
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd)]
pub struct Timestamp {
    pub secs: u64,
    pub nanos: u32,
}
impl Debug for Timestamp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{:09}", self.secs, self.nanos)
    }
}

/// Source of arrival / send timestamps. Sender and receiver clocks are not synchronized in any
///  way, so delays computed from two logs include the clock offset between the hosts.
#[cfg_attr(test, mockall::automock)]
pub trait WallClock {
    fn now(&self) -> anyhow::Result<Timestamp>;
}

pub struct SystemWallClock {}
impl WallClock for SystemWallClock {
    fn now(&self) -> anyhow::Result<Timestamp> {
        let since_epoch = SystemTime::now().duration_since(UNIX_EPOCH)
            .map_err(|e| anyhow!("system time is before UNIX epoch: {}", e))?;
        Ok(Timestamp {
            secs: since_epoch.as_secs(),
            nanos: since_epoch.subsec_nanos(),
        })
    }
}
