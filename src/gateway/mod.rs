//! Peer configuration façades
//!
//! Each façade owns one feature that lives in a sibling service and turns
//! peer replies and failures into API-level results:
//!
//! - **channel.rs**: channel CRUD across broker and bridge, plus radio channels
//! - **toggle.rs**: API authentication mirrored on broker and bridge
//! - **tunnel.rs**: cloud-tunnel HTTPS/SSH port mappings
//! - **broker.rs**: broker-wide settings
//! - **version.rs**: combined API version and device identity

pub mod broker;
pub mod channel;
pub mod toggle;
pub mod tunnel;
pub mod version;

pub use broker::BrokerSettings;
pub use channel::{ChannelKind, ChannelRegistry};
pub use toggle::{MirroredToggle, ToggleOutcome, ToggleState};
pub use tunnel::{TunnelPortMapping, TunnelStatus, TunnelUpdate};
pub use version::{DeviceInfo, UNKNOWN_VERSION, VersionInfo, VersionReport};
