//! UI layer for the desktop client: app shell, screens, and preview textures.

pub mod app;
pub mod preview;

pub use app::MelanomaApp;
