use serde::{Deserialize, Serialize};

static TURN_ON: &str = "TURN_ON";
static TURN_OFF: &str = "TURN_OFF";
static PERCENTAGE: &str = "PERCENTAGE";

/// Normalized value of a single switch command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SwitchCommandValue {
    /// turn fully on
    TurnOn,
    /// turn off
    TurnOff,
    /// dim to a percentage, always within `0..=100`
    Percentage(u8),
    /// command type this client does not understand
    Unknown,
}

impl SwitchCommandValue {
    fn from_wire(command_type: Option<&str>, percentage: Option<&serde_json::Value>) -> Self {
        let percentage = percentage.and_then(|p| p.as_f64());

        match (command_type, percentage) {
            (Some(t), _) if t == TURN_ON => Self::TurnOn,
            (Some(t), _) if t == TURN_OFF => Self::TurnOff,
            (Some(t), Some(p)) if t == PERCENTAGE => Self::Percentage(clamp_percentage(p)),
            (None, Some(p)) => Self::Percentage(clamp_percentage(p)),
            _ => Self::Unknown,
        }
    }
}

fn clamp_percentage(p: f64) -> u8 {
    p.trunc().clamp(0.0, 100.0) as u8
}

#[derive(Deserialize)]
struct RawSwitchCommand {
    id: String,
    uid: u64,
    #[serde(default, rename = "type")]
    command_type: Option<String>,
    #[serde(default)]
    percentage: Option<serde_json::Value>,
}

/// Request to switch one crownstone
#[derive(Debug, Clone, PartialEq)]
pub struct SwitchCommand {
    /// crownstone cloud id
    pub cloud_id: String,
    /// crownstone unique id
    pub unique_id: u64,
    /// what to do
    pub value: SwitchCommandValue,
}

impl<'de> Deserialize<'de> for SwitchCommand {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = RawSwitchCommand::deserialize(deserializer)?;
        let value =
            SwitchCommandValue::from_wire(raw.command_type.as_deref(), raw.percentage.as_ref());

        Ok(Self {
            cloud_id: raw.id,
            unique_id: raw.uid,
            value,
        })
    }
}

impl Serialize for SwitchCommand {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;

        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("id", &self.cloud_id)?;
        map.serialize_entry("uid", &self.unique_id)?;
        match self.value {
            SwitchCommandValue::TurnOn => map.serialize_entry("type", TURN_ON)?,
            SwitchCommandValue::TurnOff => map.serialize_entry("type", TURN_OFF)?,
            SwitchCommandValue::Percentage(p) => {
                map.serialize_entry("type", PERCENTAGE)?;
                map.serialize_entry("percentage", &p)?;
            }
            SwitchCommandValue::Unknown => {}
        }
        map.end()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    fn value_of(json: serde_json::Value) -> SwitchCommandValue {
        serde_json::from_value::<SwitchCommand>(json).unwrap().value
    }

    #[test]
    fn test_percentage_is_clamped() {
        assert_eq!(
            value_of(json!({"id": "a", "uid": 1, "type": "PERCENTAGE", "percentage": 150})),
            SwitchCommandValue::Percentage(100)
        );
        assert_eq!(
            value_of(json!({"id": "a", "uid": 1, "percentage": -10})),
            SwitchCommandValue::Percentage(0)
        );
        assert_eq!(
            value_of(json!({"id": "a", "uid": 1, "type": "PERCENTAGE", "percentage": 42})),
            SwitchCommandValue::Percentage(42)
        );
    }

    #[test]
    fn test_fractional_percentage_is_truncated() {
        assert_eq!(
            value_of(json!({"id": "a", "uid": 1, "type": "PERCENTAGE", "percentage": 55.7})),
            SwitchCommandValue::Percentage(55)
        );
        assert_eq!(
            value_of(json!({"id": "a", "uid": 1, "percentage": 99.9})),
            SwitchCommandValue::Percentage(99)
        );
    }

    #[test]
    fn test_turn_on_off_ignore_percentage() {
        assert_eq!(
            value_of(json!({"id": "a", "uid": 1, "type": "TURN_ON", "percentage": 20})),
            SwitchCommandValue::TurnOn
        );
        assert_eq!(
            value_of(json!({"id": "a", "uid": 1, "type": "TURN_OFF", "percentage": 80})),
            SwitchCommandValue::TurnOff
        );
    }

    #[test]
    fn test_unknown_commands() {
        assert_eq!(
            value_of(json!({"id": "a", "uid": 1, "type": "BLINK"})),
            SwitchCommandValue::Unknown
        );
        assert_eq!(
            value_of(json!({"id": "a", "uid": 1, "type": "PERCENTAGE"})),
            SwitchCommandValue::Unknown
        );
        assert_eq!(
            value_of(json!({"id": "a", "uid": 1})),
            SwitchCommandValue::Unknown
        );
    }

    #[test]
    fn test_serialize_keeps_wire_names() {
        let command = SwitchCommand {
            cloud_id: "a".to_string(),
            unique_id: 7,
            value: SwitchCommandValue::Percentage(30),
        };

        assert_eq!(
            serde_json::to_value(&command).unwrap(),
            json!({"id": "a", "uid": 7, "type": "PERCENTAGE", "percentage": 30})
        );
    }
}
