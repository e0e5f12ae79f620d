mod backend;
mod playback;

pub use backend::BackendPhase;
pub use playback::{PlaybackCell, PlaybackState};
