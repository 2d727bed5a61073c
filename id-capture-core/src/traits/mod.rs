pub mod media_provider;
pub mod preview_surface;
pub mod recognition_engine;
pub mod session_delegate;
