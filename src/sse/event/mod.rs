//! Crownstone cloud events carried in `data:` frames.
//!
//! Every payload is a json object with a `type` field, most types also have a `subType`. Events
//! are published on the [`EventBus`](crate::bus::EventBus) under [`Event::event_type`].

mod switch;
mod types;

pub use switch::{SwitchCommand, SwitchCommandValue};
pub use types::*;

use enum_as_inner::EnumAsInner;
use serde::{Deserialize, Serialize};
use snafu::prelude::*;

/// Event type strings used as bus keys
pub mod event_type {
    /// [`PingEvent`](super::PingEvent)
    pub const PING: &str = "ping";
    /// [`SwitchStateUpdateEvent`](super::SwitchStateUpdateEvent)
    pub const SWITCH_STATE_UPDATE: &str = "switchStateUpdate";

    /// access token expired, handled inside the client and never published
    pub const TOKEN_EXPIRED: &str = "TOKEN_EXPIRED";
    /// stream request had no access token
    pub const NO_ACCESS_TOKEN: &str = "NO_ACCESS_TOKEN";
    /// event server lost its own upstream connection
    pub const NO_CONNECTION: &str = "NO_CONNECTION";
    /// stream started
    pub const STREAM_START: &str = "STREAM_START";
    /// stream closed by the server
    pub const STREAM_CLOSED: &str = "STREAM_CLOSED";

    /// dimming ability changed
    pub const DIMMING: &str = "dimming";
    /// switchcraft ability changed
    pub const SWITCHCRAFT: &str = "switchcraft";
    /// tap to toggle ability changed
    pub const TAP_TO_TOGGLE: &str = "tapToToggle";

    /// crownstone data changed
    pub const STONES: &str = "stones";
    /// sphere data changed
    pub const SPHERES: &str = "spheres";
    /// user data changed
    pub const USERS: &str = "users";
    /// location data changed
    pub const LOCATIONS: &str = "locations";

    /// user entered a sphere
    pub const ENTER_SPHERE: &str = "enterSphere";
    /// user left a sphere
    pub const EXIT_SPHERE: &str = "exitSphere";
    /// user entered a location
    pub const ENTER_LOCATION: &str = "enterLocation";
    /// user left a location
    pub const EXIT_LOCATION: &str = "exitLocation";

    /// switch a list of crownstones
    pub const MULTI_SWITCH: &str = "multiSwitch";
}

static TYPE_FIELD: &str = "type";

static KNOWN_TYPES: &[&str] = &[
    "ping",
    "system",
    "command",
    "switchStateUpdate",
    "dataChange",
    "presence",
    "abilityChange",
];

/// Error when turn a decoded payload into an [`Event`]
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)), module(classify_error), context(suffix(false)))]
pub enum ClassifyError {
    /// payload is not a json object
    #[snafu(display("event payload is not object: {json}"))]
    PayloadNotObject {
        /// json string
        json: String,
    },

    /// payload has no string `type` field
    #[snafu(display("event payload has no type field: {json}"))]
    NoEventType {
        /// json string
        json: String,
    },

    /// payload of a known type has unexpected shape or sub type
    #[snafu(display("parse to {type_name} event failed: {source}"))]
    ParseTypedEventFailed {
        /// value of the type field
        type_name: String,
        /// source error
        source: serde_json::Error,
    },
}

/// Crownstone cloud event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, EnumAsInner)]
#[serde(tag = "type")]
pub enum Event {
    /// stream lifecycle and token notifications
    #[serde(rename = "system")]
    System(SystemEvent),
    /// a crownstone ability was enabled, disabled or synced
    #[serde(rename = "abilityChange")]
    AbilityChange(AbilityChangeEvent),
    /// a crownstone, sphere, user or location was created, updated or deleted
    #[serde(rename = "dataChange")]
    DataChange(DataChangeEvent),
    /// a user entered or left a sphere or location
    #[serde(rename = "presence")]
    Presence(PresenceEvent),
    /// a crownstone reports a new switch state
    #[serde(rename = "switchStateUpdate")]
    SwitchStateUpdate(SwitchStateUpdateEvent),
    /// request to switch crownstones
    #[serde(rename = "command")]
    MultiSwitchCommand(MultiSwitchCommandEvent),
    /// server liveness ping
    #[serde(rename = "ping")]
    Ping(PingEvent),
}

impl Event {
    /// Classify a decoded payload.
    ///
    /// Returns `Ok(None)` for a `type` this client does not know, those are dropped silently.
    pub fn classify(value: serde_json::Value) -> Result<Option<Self>, ClassifyError> {
        let obj = value
            .as_object()
            .with_context(|| classify_error::PayloadNotObject {
                json: value.to_string(),
            })?;

        let type_name = obj
            .get(TYPE_FIELD)
            .and_then(|t| t.as_str())
            .map(ToString::to_string)
            .with_context(|| classify_error::NoEventType {
                json: value.to_string(),
            })?;

        if !KNOWN_TYPES.contains(&type_name.as_str()) {
            log::trace!("Drop event with unknown type {}", type_name);
            return Ok(None);
        }

        serde_json::from_value(value)
            .map(Some)
            .context(classify_error::ParseTypedEventFailed { type_name })
    }

    /// Key this event is published under.
    ///
    /// The sub type for most events, the type itself for ping and switch state update.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::System(e) => e.sub_type.as_str(),
            Self::AbilityChange(e) => e.sub_type.as_str(),
            Self::DataChange(e) => e.sub_type.as_str(),
            Self::Presence(e) => e.sub_type.as_str(),
            Self::MultiSwitchCommand(e) => e.sub_type.as_str(),
            Self::SwitchStateUpdate(_) => event_type::SWITCH_STATE_UPDATE,
            Self::Ping(_) => event_type::PING,
        }
    }

    /// value of the `type` field
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::System(_) => "system",
            Self::AbilityChange(_) => "abilityChange",
            Self::DataChange(_) => "dataChange",
            Self::Presence(_) => "presence",
            Self::SwitchStateUpdate(_) => "switchStateUpdate",
            Self::MultiSwitchCommand(_) => "command",
            Self::Ping(_) => "ping",
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_classify_system() {
        let event = Event::classify(json!({
            "type": "system",
            "subType": "TOKEN_EXPIRED",
            "code": 401,
            "message": "Token Expired.",
        }))
        .unwrap()
        .unwrap();

        let system = event.as_system().unwrap();
        assert_eq!(system.sub_type, SystemEventType::TokenExpired);
        assert_eq!(system.code, 401);
        assert_eq!(system.message, "Token Expired.");
        assert_eq!(event.event_type(), event_type::TOKEN_EXPIRED);
        assert_eq!(event.type_name(), "system");
    }

    #[test]
    fn test_classify_presence() {
        let event = Event::classify(json!({
            "type": "presence",
            "subType": "enterLocation",
            "sphere": {"id": "sphere_id", "name": "sphere_name", "uid": 84},
            "location": {"id": "location_id", "name": "location_name"},
            "user": {"id": "user_id", "name": "user_name"},
        }))
        .unwrap()
        .unwrap();

        assert_eq!(event.event_type(), event_type::ENTER_LOCATION);

        let presence = event.into_presence().unwrap();
        assert_eq!(presence.sphere_id(), "sphere_id");
        assert_eq!(presence.location_id(), Some("location_id"));
        assert_eq!(presence.user_id(), "user_id");
    }

    #[test]
    fn test_classify_presence_sphere_without_location() {
        let event = Event::classify(json!({
            "type": "presence",
            "subType": "exitSphere",
            "sphere": {"id": "sphere_id"},
            "user": {"id": "user_id"},
        }))
        .unwrap()
        .unwrap();

        assert_eq!(event.event_type(), event_type::EXIT_SPHERE);
        assert_eq!(event.as_presence().unwrap().location_id(), None);
    }

    #[test]
    fn test_classify_data_change() {
        let event = Event::classify(json!({
            "type": "dataChange",
            "subType": "stones",
            "operation": "update",
            "sphere": {"id": "sphere_id", "uid": 84, "name": "sphere_name"},
            "changedItem": {"id": "item_id", "name": "item_name"},
        }))
        .unwrap()
        .unwrap();

        assert_eq!(event.event_type(), event_type::STONES);

        let change = event.as_data_change().unwrap();
        assert_eq!(change.operation, Operation::Update);
        assert_eq!(change.sphere_id(), "sphere_id");
        assert_eq!(change.changed_item_id(), "item_id");
        assert_eq!(change.changed_item_name(), Some("item_name"));
    }

    #[test]
    fn test_classify_ability_change() {
        let event = Event::classify(json!({
            "type": "abilityChange",
            "subType": "tapToToggle",
            "sphere": {"id": "sphere_id"},
            "stone": {"id": "stone_id", "uid": 12},
            "ability": {"type": "tapToToggle", "enabled": true, "syncedToCrownstone": false},
        }))
        .unwrap()
        .unwrap();

        assert_eq!(event.event_type(), event_type::TAP_TO_TOGGLE);

        let ability = event.as_ability_change().unwrap();
        assert_eq!(ability.cloud_id(), "stone_id");
        assert_eq!(ability.unique_id(), 12);
        assert_eq!(ability.ability_type(), "tapToToggle");
        assert!(ability.ability_enabled());
        assert!(!ability.ability_synced_to_crownstone());
    }

    #[test]
    fn test_classify_switch_state_update() {
        let event = Event::classify(json!({
            "type": "switchStateUpdate",
            "subType": "stone",
            "sphere": {"id": "sphere_id"},
            "crownstone": {"id": "stone_id", "uid": 3, "percentage": 40},
        }))
        .unwrap()
        .unwrap();

        assert_eq!(event.event_type(), event_type::SWITCH_STATE_UPDATE);

        let update = event.as_switch_state_update().unwrap();
        assert_eq!(update.sphere_id(), Some("sphere_id"));
        assert_eq!(update.cloud_id(), "stone_id");
        assert_eq!(update.unique_id(), 3);
        assert_eq!(update.switch_state(), 40);
    }

    #[test]
    fn test_classify_multi_switch() {
        let event = Event::classify(json!({
            "type": "command",
            "subType": "multiSwitch",
            "sphere": {"id": "sphere_id"},
            "switchData": [
                {"id": "a", "uid": 1, "type": "PERCENTAGE", "percentage": 150},
                {"id": "b", "uid": 2, "percentage": -10},
                {"id": "c", "uid": 3, "type": "TURN_ON", "percentage": 20},
                {"id": "d", "uid": 4, "type": "TURN_OFF"},
                {"id": "e", "uid": 5, "type": "BLINK"},
            ],
        }))
        .unwrap()
        .unwrap();

        assert_eq!(event.event_type(), event_type::MULTI_SWITCH);

        let command = event.as_multi_switch_command().unwrap();
        let values: Vec<_> = command.switch_data.iter().map(|c| c.value).collect();
        assert_eq!(
            values,
            vec![
                SwitchCommandValue::Percentage(100),
                SwitchCommandValue::Percentage(0),
                SwitchCommandValue::TurnOn,
                SwitchCommandValue::TurnOff,
                SwitchCommandValue::Unknown,
            ]
        );
        assert_eq!(command.switch_data[0].cloud_id, "a");
        assert_eq!(command.switch_data[4].unique_id, 5);
    }

    #[test]
    fn test_classify_ping() {
        let event = Event::classify(json!({"type": "ping", "counter": 4}))
            .unwrap()
            .unwrap();

        assert_eq!(event.event_type(), event_type::PING);

        let ping = event.as_ping().unwrap();
        assert_eq!(ping.counter, 4);
        assert_eq!(ping.elapsed_time(), std::time::Duration::from_secs(120));
    }

    #[test]
    fn test_classify_unknown_type_is_dropped() {
        let event = Event::classify(json!({"type": "somethingNew", "x": 1})).unwrap();
        assert!(event.is_none());
    }

    #[test]
    fn test_classify_errors() {
        assert!(matches!(
            Event::classify(json!([1, 2])).unwrap_err(),
            ClassifyError::PayloadNotObject { .. }
        ));

        assert!(matches!(
            Event::classify(json!({"subType": "STREAM_START"})).unwrap_err(),
            ClassifyError::NoEventType { .. }
        ));

        let err = Event::classify(json!({
            "type": "system",
            "subType": "SOMETHING_ELSE",
            "code": 200,
            "message": "",
        }))
        .unwrap_err();
        assert!(matches!(
            err,
            ClassifyError::ParseTypedEventFailed { ref type_name, .. } if type_name == "system"
        ));
    }
}
