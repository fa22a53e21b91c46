use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
/// How live votes are run.
pub struct VotingConfig {
    /// Votes needed to close a session early. The assembly has 245 members.
    pub quorum: usize,
    /// Ticks in the voting window.
    pub countdown: u64,
    /// Wall-clock length of one tick.
    pub tick_interval: Duration,
}

impl VotingConfig {
    /// Validates the configuration, ensuring all values make sense.
    pub fn validate(&self) -> Result<()> {
        if self.quorum == 0 {
            return Err(anyhow::anyhow!("quorum cannot be 0"));
        }
        if self.countdown == 0 {
            return Err(anyhow::anyhow!("countdown cannot be 0"));
        }
        if self.tick_interval < Duration::from_millis(10) {
            return Err(anyhow::anyhow!("tick interval is too low"));
        }

        Ok(())
    }

    /// Wall-clock length of the whole voting window.
    pub fn window(&self) -> Duration {
        self.tick_interval
            .saturating_mul(u32::try_from(self.countdown).unwrap_or(u32::MAX))
    }
}

impl Default for VotingConfig {
    fn default() -> Self {
        VotingConfig {
            quorum: 245,
            countdown: 25,
            tick_interval: Duration::from_secs(1),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory of the sled database holding session snapshots.
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            path: PathBuf::from("data/votes"),
        }
    }
}
