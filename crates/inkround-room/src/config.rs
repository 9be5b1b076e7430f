//! Registry-wide settings.

use std::time::Duration;

/// Settings shared by every room in a registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryConfig {
    /// How long a room may sit without a live connection before
    /// [`cleanup_empty_rooms`](crate::RoomRegistry::cleanup_empty_rooms)
    /// removes it.
    pub empty_room_grace: Duration,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            empty_room_grace: Duration::from_secs(5 * 60),
        }
    }
}
