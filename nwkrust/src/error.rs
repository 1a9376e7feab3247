//! High-level error types

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Core protocol error: {0}")]
    Core(#[from] nwkrust_core::Error),

    #[error("Transport error: {0}")]
    Transport(#[from] nwkrust_transport::Error),

    #[error("Topology error: {0}")]
    Types(#[from] nwkrust_types::Error),

    #[error("Room {0} not found")]
    RoomNotFound(u32),

    #[error("Load {load} not found in room {room}")]
    LoadNotFound { room: u32, load: u32 },

    #[error("Shade {shade} not found in room {room}")]
    ShadeNotFound { room: u32, shade: u32 },

    #[error("Scene {scene} not found in room {room}")]
    SceneNotFound { room: u32, scene: u32 },

    #[error("No async runtime available for a timed command")]
    NoRuntime,
}

impl Error {
    /// Caller addressed a room, load, shade or scene that does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Error::RoomNotFound(_)
                | Error::LoadNotFound { .. }
                | Error::ShadeNotFound { .. }
                | Error::SceneNotFound { .. }
        )
    }
}
