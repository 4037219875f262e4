pub mod buffer;
pub mod landmark;
pub mod window;

pub use buffer::FrameBuffer;
pub use landmark::{Frame, Landmark, LandmarkIndex, FEATURES_PER_FRAME, VALUES_PER_LANDMARK};
pub use window::Window;
