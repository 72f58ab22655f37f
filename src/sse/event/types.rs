use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{event_type, SwitchCommand};

/// The server sends a ping event this often
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Reference to a sphere
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SphereRef {
    /// cloud id
    pub id: String,
    /// sphere name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// sphere unique id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<u64>,
}

/// Reference to a location, user or changed item
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRef {
    /// cloud id
    pub id: String,
    /// display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Reference to a crownstone
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoneRef {
    /// cloud id
    pub id: String,
    /// unique id inside its sphere
    pub uid: u64,
}

// ===== system =====

/// Sub types of [`SystemEvent`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SystemEventType {
    /// access token expired
    TokenExpired,
    /// no access token given
    NoAccessToken,
    /// event server has no upstream connection
    NoConnection,
    /// stream started
    StreamStart,
    /// stream closed
    StreamClosed,
}

impl SystemEventType {
    /// wire string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TokenExpired => event_type::TOKEN_EXPIRED,
            Self::NoAccessToken => event_type::NO_ACCESS_TOKEN,
            Self::NoConnection => event_type::NO_CONNECTION,
            Self::StreamStart => event_type::STREAM_START,
            Self::StreamClosed => event_type::STREAM_CLOSED,
        }
    }
}

/// Stream lifecycle notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemEvent {
    /// sub type
    #[serde(rename = "subType")]
    pub sub_type: SystemEventType,
    /// http-like status code
    pub code: i64,
    /// human readable message
    #[serde(default)]
    pub message: String,
}

// ===== ability change =====

/// Sub types of [`AbilityChangeEvent`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AbilityType {
    /// dimming
    Dimming,
    /// switchcraft
    Switchcraft,
    /// tap to toggle
    TapToToggle,
}

impl AbilityType {
    /// wire string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dimming => event_type::DIMMING,
            Self::Switchcraft => event_type::SWITCHCRAFT,
            Self::TapToToggle => event_type::TAP_TO_TOGGLE,
        }
    }
}

/// Ability state carried by [`AbilityChangeEvent`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ability {
    /// ability name
    #[serde(rename = "type")]
    pub ability_type: String,
    /// enabled by the user
    pub enabled: bool,
    /// setting reached the crownstone
    pub synced_to_crownstone: bool,
}

/// A crownstone ability changed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbilityChangeEvent {
    /// sub type
    #[serde(rename = "subType")]
    pub sub_type: AbilityType,
    /// sphere of the crownstone
    pub sphere: SphereRef,
    /// changed crownstone
    pub stone: StoneRef,
    /// new ability state
    pub ability: Ability,
}

impl AbilityChangeEvent {
    /// sphere cloud id
    pub fn sphere_id(&self) -> &str {
        &self.sphere.id
    }

    /// crownstone cloud id
    pub fn cloud_id(&self) -> &str {
        &self.stone.id
    }

    /// crownstone unique id
    pub fn unique_id(&self) -> u64 {
        self.stone.uid
    }

    /// ability name
    pub fn ability_type(&self) -> &str {
        &self.ability.ability_type
    }

    /// ability enabled
    pub fn ability_enabled(&self) -> bool {
        self.ability.enabled
    }

    /// ability synced to the crownstone
    pub fn ability_synced_to_crownstone(&self) -> bool {
        self.ability.synced_to_crownstone
    }
}

// ===== data change =====

/// Sub types of [`DataChangeEvent`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DataChangeType {
    /// crownstones
    Stones,
    /// spheres
    Spheres,
    /// users
    Users,
    /// locations
    Locations,
}

impl DataChangeType {
    /// wire string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stones => event_type::STONES,
            Self::Spheres => event_type::SPHERES,
            Self::Users => event_type::USERS,
            Self::Locations => event_type::LOCATIONS,
        }
    }
}

/// Operation done on changed data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Operation {
    /// created
    Create,
    /// updated
    Update,
    /// deleted
    Delete,
}

/// Cloud data changed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataChangeEvent {
    /// sub type
    pub sub_type: DataChangeType,
    /// what happened to the item
    pub operation: Operation,
    /// sphere of the item
    pub sphere: SphereRef,
    /// changed item
    pub changed_item: ItemRef,
}

impl DataChangeEvent {
    /// sphere cloud id
    pub fn sphere_id(&self) -> &str {
        &self.sphere.id
    }

    /// changed item cloud id
    pub fn changed_item_id(&self) -> &str {
        &self.changed_item.id
    }

    /// changed item name
    pub fn changed_item_name(&self) -> Option<&str> {
        self.changed_item.name.as_deref()
    }
}

// ===== presence =====

/// Sub types of [`PresenceEvent`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PresenceType {
    /// entered a sphere
    EnterSphere,
    /// left a sphere
    ExitSphere,
    /// entered a location
    EnterLocation,
    /// left a location
    ExitLocation,
}

impl PresenceType {
    /// wire string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EnterSphere => event_type::ENTER_SPHERE,
            Self::ExitSphere => event_type::EXIT_SPHERE,
            Self::EnterLocation => event_type::ENTER_LOCATION,
            Self::ExitLocation => event_type::EXIT_LOCATION,
        }
    }
}

/// A user entered or left a place
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceEvent {
    /// sub type
    #[serde(rename = "subType")]
    pub sub_type: PresenceType,
    /// sphere
    pub sphere: SphereRef,
    /// location, absent for sphere presence
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<ItemRef>,
    /// user
    pub user: ItemRef,
}

impl PresenceEvent {
    /// sphere cloud id
    pub fn sphere_id(&self) -> &str {
        &self.sphere.id
    }

    /// location cloud id
    pub fn location_id(&self) -> Option<&str> {
        self.location.as_ref().map(|l| l.id.as_str())
    }

    /// user cloud id
    pub fn user_id(&self) -> &str {
        &self.user.id
    }
}

// ===== switch state update =====

/// Crownstone with its switch state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchState {
    /// cloud id
    pub id: String,
    /// unique id inside its sphere
    pub uid: u64,
    /// switch state, 0 to 100
    pub percentage: i64,
}

/// A crownstone was switched
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchStateUpdateEvent {
    /// sphere of the crownstone
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sphere: Option<SphereRef>,
    /// switched crownstone
    pub crownstone: SwitchState,
}

impl SwitchStateUpdateEvent {
    /// sphere cloud id
    pub fn sphere_id(&self) -> Option<&str> {
        self.sphere.as_ref().map(|s| s.id.as_str())
    }

    /// crownstone cloud id
    pub fn cloud_id(&self) -> &str {
        &self.crownstone.id
    }

    /// crownstone unique id
    pub fn unique_id(&self) -> u64 {
        self.crownstone.uid
    }

    /// switch state
    pub fn switch_state(&self) -> i64 {
        self.crownstone.percentage
    }
}

// ===== command =====

/// Sub types of [`MultiSwitchCommandEvent`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CommandType {
    /// switch several crownstones
    MultiSwitch,
}

impl CommandType {
    /// wire string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MultiSwitch => event_type::MULTI_SWITCH,
        }
    }
}

/// Request to switch a list of crownstones
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiSwitchCommandEvent {
    /// sub type
    pub sub_type: CommandType,
    /// sphere of the crownstones
    pub sphere: SphereRef,
    /// one command per crownstone
    pub switch_data: Vec<SwitchCommand>,
}

impl MultiSwitchCommandEvent {
    /// sphere cloud id
    pub fn sphere_id(&self) -> &str {
        &self.sphere.id
    }
}

// ===== ping =====

/// Server liveness ping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PingEvent {
    /// pings sent on this stream so far
    pub counter: u64,
}

impl PingEvent {
    /// time since the stream was opened, as counted by the server
    pub fn elapsed_time(&self) -> Duration {
        // saturate, counter comes from the network
        HEARTBEAT_INTERVAL.saturating_mul(self.counter.min(u32::MAX as u64) as u32)
    }
}
