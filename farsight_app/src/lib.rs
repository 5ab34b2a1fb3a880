mod app;
mod error;
mod state;

pub use app::OverlayApp;
pub use error::AppError;
pub use state::{KillSummary, OverlaySnapshot, RenderDataProvider};
