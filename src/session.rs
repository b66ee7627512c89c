//! Session role handshake
//!
//! One `role` message per connection decides whether this client drives the
//! room or follows it. The server may re-send the message when a host
//! reconnects inside the deletion grace period, so assignment is an
//! idempotent overwrite rather than an error.

use log::info;

/// Authoritative role for the lifetime of one connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRole {
    /// Whether this participant's player state drives the room.
    pub is_host: bool,
    /// Opaque reference to the video every participant should load.
    pub video_url: String,
}

/// Tracks role assignment across the join handshake.
#[derive(Debug, Default)]
pub struct RoleResolver {
    role: Option<SessionRole>,
}

impl RoleResolver {
    pub fn new() -> Self {
        Self { role: None }
    }

    /// Apply a `role` message. Repeats overwrite the previous assignment.
    pub fn assign(&mut self, is_host: bool, video_url: String) -> &SessionRole {
        if self.role.is_some() {
            info!("role re-assigned (reconnect): host={}", is_host);
        } else {
            info!("role assigned: host={} video={}", is_host, video_url);
        }
        self.role = Some(SessionRole { is_host, video_url });
        self.role.as_ref().unwrap()
    }

    pub fn get(&self) -> Option<&SessionRole> {
        self.role.as_ref()
    }

    /// True once the handshake answered, and we follow rather than drive.
    pub fn is_viewer(&self) -> bool {
        matches!(self.role, Some(SessionRole { is_host: false, .. }))
    }

    pub fn is_host(&self) -> bool {
        matches!(self.role, Some(SessionRole { is_host: true, .. }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unassigned_is_neither() {
        let resolver = RoleResolver::new();
        assert!(resolver.get().is_none());
        assert!(!resolver.is_host());
        assert!(!resolver.is_viewer());
    }

    #[test]
    fn test_assignment() {
        let mut resolver = RoleResolver::new();
        let role = resolver.assign(true, "https://youtu.be/xyz".into());
        assert!(role.is_host);
        assert!(resolver.is_host());
        assert!(!resolver.is_viewer());
    }

    #[test]
    fn test_reassignment_overwrites() {
        let mut resolver = RoleResolver::new();
        resolver.assign(false, "a".into());
        resolver.assign(true, "b".into());
        let role = resolver.get().unwrap();
        assert!(role.is_host);
        assert_eq!(role.video_url, "b");
    }
}
