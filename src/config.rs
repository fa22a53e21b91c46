use crate::error::Result;
use crate::vote::config::{StoreConfig, VotingConfig};

#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct PlenaryConfig {
    pub voting: VotingConfig,
    pub store: StoreConfig,
}

/// Reads the configuration file at `config_path`, if there is one, overlaid with `PLENARY_`
/// environment variables (`PLENARY_VOTING__QUORUM=120`).
pub fn config<P: AsRef<std::path::Path>>(config_path: P) -> Result<PlenaryConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::from(config_path.as_ref()).required(false))
        .add_source(config::Environment::with_prefix("PLENARY").separator("__"))
        .build()?;

    Ok(settings.try_deserialize()?)
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::time::Duration;

    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path().join("Plenary.toml")).unwrap();
        assert_eq!(config, PlenaryConfig::default());
    }

    #[test]
    fn file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Plenary.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            r#"
[voting]
quorum = 3
countdown = 10
tick_interval = {{ secs = 0, nanos = 500000000 }}

[store]
path = "/tmp/plenary-test"
"#
        )
        .unwrap();

        let config = config(&path).unwrap();
        assert_eq!(config.voting.quorum, 3);
        assert_eq!(config.voting.countdown, 10);
        assert_eq!(config.voting.tick_interval, Duration::from_millis(500));
        assert_eq!(config.store.path, std::path::PathBuf::from("/tmp/plenary-test"));
    }
}
