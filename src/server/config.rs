use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    pub port: u16,
    pub devices: Vec<DeviceConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DeviceConfig {
    pub name: String,
    #[serde(flatten)]
    pub backend: DeviceBackend,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceBackend {
    InMemory { capacity: u64 },
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::{Config, DeviceBackend};

    #[test]
    fn deserialize_example() {
        let mut example_config_path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
        example_config_path.push("conf/example.json");

        let stringified_json = std::fs::read_to_string(example_config_path).unwrap();

        let config: Config = serde_json::from_str(&stringified_json).unwrap();

        assert_eq!(config.port, 3001);
        assert_eq!(config.devices.len(), 2);
        assert_eq!(config.devices[0].name, "d0");
        assert!(matches!(
            config.devices[0].backend,
            DeviceBackend::InMemory { capacity: 65536 }
        ));
        assert_eq!(config.devices[1].name, "d1");
    }
}
