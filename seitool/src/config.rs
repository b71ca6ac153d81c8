use anyhow::{bail, Context, Result};
use sei::{uuid_from_str, Placement, Uuid};
use serde::Deserialize;
use serde_json::{Map, Value};

/// Placement as spelled in config files and on the command line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum PlacementInput {
    #[default]
    Prepend,
    AfterParameterSets,
}

impl From<PlacementInput> for Placement {
    fn from(value: PlacementInput) -> Self {
        match value {
            PlacementInput::Prepend => Placement::Prepend,
            PlacementInput::AfterParameterSets => Placement::AfterParameterSets,
        }
    }
}

/// Injection session settings as written in a TOML file. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SessionConfigInput {
    pub uuid: Option<String>,
    pub period: Option<u64>,
    pub placement: Option<PlacementInput>,
    pub metadata: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub uuid: Uuid,
    pub period: u64,
    pub placement: Placement,
    pub metadata: Map<String, Value>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        let mut metadata = Map::new();
        metadata.insert("user".into(), Value::from("demo"));
        metadata.insert("note".into(), Value::from("sei"));

        Self {
            uuid: Uuid::from_u128(0x1234_5678_1234_1234_1234_1234_5678_90ab),
            period: 0,
            placement: Placement::Prepend,
            metadata,
        }
    }
}

impl SessionConfigInput {
    pub fn from_toml_str(input: &str) -> Result<Self> {
        if input.trim().is_empty() {
            return Ok(SessionConfigInput::default());
        }
        toml::from_str(input).context("invalid session config TOML")
    }

    /// Fields set in `other` win.
    pub fn merge(self, other: SessionConfigInput) -> SessionConfigInput {
        SessionConfigInput {
            uuid: other.uuid.or(self.uuid),
            period: other.period.or(self.period),
            placement: other.placement.or(self.placement),
            metadata: other.metadata.or(self.metadata),
        }
    }

    pub fn resolve(self) -> Result<SessionConfig> {
        let defaults = SessionConfig::default();

        let uuid = match self.uuid.as_deref().map(str::trim) {
            Some(uuid) if !uuid.is_empty() => {
                uuid_from_str(uuid).with_context(|| format!("invalid session UUID `{uuid}`"))?
            }
            _ => defaults.uuid,
        };

        Ok(SessionConfig {
            uuid,
            period: self.period.unwrap_or(defaults.period),
            placement: self.placement.map_or(defaults.placement, Placement::from),
            metadata: self.metadata.unwrap_or(defaults.metadata),
        })
    }
}

impl SessionConfig {
    /// Compact JSON for one access unit: the configured metadata with `frame` set to `au_index`.
    pub fn body_for(&self, au_index: u64) -> Vec<u8> {
        let mut metadata = self.metadata.clone();
        metadata.insert("frame".into(), Value::from(au_index));
        Value::Object(metadata).to_string().into_bytes()
    }
}

/// Parses a `--meta` argument, which must be a JSON object.
pub fn parse_metadata(json: &str) -> Result<Map<String, Value>> {
    match serde_json::from_str::<Value>(json).context("metadata is not valid JSON")? {
        Value::Object(map) => Ok(map),
        other => bail!("metadata must be a JSON object, got `{other}`"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_toml_config() -> Result<()> {
        let toml = r#"
            uuid = "00112233-4455-6677-8899-aabbccddeeff"
            period = 30
            placement = "after-parameter-sets"

            [metadata]
            user = "vladi"
            task = "gparted-pipe"
        "#;

        let cfg = SessionConfigInput::from_toml_str(toml)?.resolve()?;
        assert_eq!(cfg.uuid.to_string(), "00112233-4455-6677-8899-aabbccddeeff");
        assert_eq!(cfg.period, 30);
        assert_eq!(cfg.placement, Placement::AfterParameterSets);
        assert_eq!(cfg.metadata.get("user"), Some(&Value::from("vladi")));
        assert_eq!(cfg.metadata.len(), 2);
        Ok(())
    }

    #[test]
    fn test_defaults() -> Result<()> {
        let cfg = SessionConfigInput::from_toml_str("")?.resolve()?;
        assert_eq!(cfg, SessionConfig::default());
        assert_eq!(cfg.uuid.to_string(), "12345678-1234-1234-1234-1234567890ab");
        assert_eq!(cfg.period, 0);
        assert_eq!(cfg.placement, Placement::Prepend);
        Ok(())
    }

    #[test]
    fn test_flags_override_file() -> Result<()> {
        let file = SessionConfigInput::from_toml_str(
            "period = 10\nplacement = \"after-parameter-sets\"",
        )?;
        let flags = SessionConfigInput {
            period: Some(5),
            ..Default::default()
        };

        let cfg = file.merge(flags).resolve()?;
        assert_eq!(cfg.period, 5);
        assert_eq!(cfg.placement, Placement::AfterParameterSets);
        Ok(())
    }

    #[test]
    fn test_invalid_uuid() {
        assert!(SessionConfigInput::from_toml_str("uuid = \"not-a-uuid\"")
            .and_then(SessionConfigInput::resolve)
            .is_err());
        assert!(SessionConfigInput::from_toml_str("period = \"often\"").is_err());
    }

    #[test]
    fn test_body_for_stamps_frame() -> Result<()> {
        let cfg = SessionConfig {
            metadata: parse_metadata(r#"{"user":"john"}"#)?,
            ..Default::default()
        };
        assert_eq!(cfg.body_for(7), br#"{"frame":7,"user":"john"}"#.to_vec());
        Ok(())
    }

    #[test]
    fn test_parse_metadata_rejects_non_objects() {
        assert!(parse_metadata("[1, 2]").is_err());
        assert!(parse_metadata("{").is_err());
    }
}
