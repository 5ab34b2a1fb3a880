use farsight_core::{Killmail, SolarSystem, Timestamp, ZkbKill};

/// One resolved kill, ready to draw.
#[derive(Clone, Debug, PartialEq)]
pub struct KillSummary {
    pub feed: ZkbKill,
    pub killmail: Killmail,
    /// Display name of the victim's hull, placeholder when unresolvable.
    pub victim_ship: String,
}

/// Everything the overlay window draws for the current system. Kills arrive
/// incrementally as their killmails resolve on the executor.
#[derive(Clone, Debug, PartialEq)]
pub struct OverlaySnapshot {
    pub system: SolarSystem,
    pub kills: Vec<KillSummary>,
    pub refreshed_at: Timestamp,
}

/// The single seam the windowing layer consumes. Rendering code asks for the
/// current snapshot each frame and draws whatever is there; it never reaches
/// into the session underneath.
pub trait RenderDataProvider {
    fn render_snapshot(&self) -> Option<OverlaySnapshot>;
}
