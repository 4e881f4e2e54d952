use crate::types::UserId;

/// Trait for host game integration
///
/// The coordinator drives the game through this trait when a session it
/// manages changes state: opening the room level after hosting starts,
/// travelling to a joined session, going back to the menu after teardown.
pub trait GameHost: Send + Sync {
    /// The local player that owns session requests (None = no player yet)
    fn local_player(&self) -> Option<UserId>;

    /// Open a level, as a listen server when `listen` is set
    fn open_level(&self, entry: &str, listen: bool);

    /// Move the local player to a remote session address
    fn client_travel(&self, address: &str);
}
