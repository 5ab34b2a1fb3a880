use std::{
    cell::RefCell,
    rc::Rc,
    time::{Duration, Instant},
};

use farsight_core::{
    Killmail, Timestamp, ZkbKill,
    ids::{SolarSystemId, TypeId},
};
use farsight_esi::EsiSession;

use crate::{
    AppError,
    state::{KillSummary, OverlaySnapshot, RenderDataProvider},
};

const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(5);
const DEFAULT_KILL_LIMIT: usize = 10;

/// Glue between the session and the overlay window. The render loop calls
/// [`tick`](OverlayApp::tick) once per frame; everything else happens on the
/// session's executor during that call. Killmails stream into the snapshot as
/// their resolutions complete.
pub struct OverlayApp {
    session: EsiSession,
    refresh_interval: Duration,
    kill_limit: usize,
    last_check: Option<Instant>,
    snapshot: Option<OverlaySnapshot>,
    // Filled by resolution callbacks, drained into the snapshot on the next
    // tick so enrichment never runs inside a callback.
    resolved_kills: Rc<RefCell<Vec<(ZkbKill, Killmail)>>>,
    last_error: Option<AppError>,
}

impl OverlayApp {
    pub fn new(session: EsiSession) -> Self {
        Self::with_settings(session, DEFAULT_REFRESH_INTERVAL, DEFAULT_KILL_LIMIT)
    }

    pub fn with_settings(
        session: EsiSession,
        refresh_interval: Duration,
        kill_limit: usize,
    ) -> Self {
        Self {
            session,
            refresh_interval,
            kill_limit,
            last_check: None,
            snapshot: None,
            resolved_kills: Rc::new(RefCell::new(Vec::new())),
            last_error: None,
        }
    }

    pub fn session(&self) -> &EsiSession {
        &self.session
    }

    pub fn last_error(&self) -> Option<&AppError> {
        self.last_error.as_ref()
    }

    /// One frame worth of work: drive the executor for `budget`, fold in any
    /// freshly resolved killmails, and re-check the character location once
    /// the refresh interval has passed.
    pub fn tick(&mut self, budget: Duration) {
        self.session.executor().pump_for(budget);
        self.absorb_resolved_kills();

        let due = match self.last_check {
            None => true,
            Some(at) => at.elapsed() >= self.refresh_interval,
        };
        if due {
            self.refresh_location();
            self.last_check = Some(Instant::now());
        }
    }

    fn refresh_location(&mut self) {
        let location = match self.session.character_location() {
            Ok(location) => location,
            Err(err) => {
                log::error!("location poll failed: {}", err.display_chain());
                self.last_error = Some(err.into());
                return;
            }
        };

        let current = self.snapshot.as_ref().map(|s| s.system.system_id);
        if current != Some(location.solar_system_id) {
            self.enter_system(location.solar_system_id);
        }
    }

    fn enter_system(&mut self, system_id: SolarSystemId) {
        log::info!("character moved to system {system_id}");

        let system = match self.session.resolve_solar_system(system_id) {
            Ok(system) => system,
            Err(err) => {
                log::error!("system resolution failed: {}", err.display_chain());
                self.last_error = Some(err.into());
                return;
            }
        };

        let feed = match self.session.kills_in_system(system_id, self.kill_limit) {
            Ok(feed) => feed,
            Err(err) => {
                log::error!("kill feed fetch failed: {}", err.display_chain());
                self.last_error = Some(err.into());
                return;
            }
        };

        self.snapshot = Some(OverlaySnapshot {
            system,
            kills: Vec::new(),
            refreshed_at: Timestamp::now(),
        });
        self.resolved_kills.borrow_mut().clear();

        for kill in feed {
            let sink = Rc::clone(&self.resolved_kills);
            let hash = kill.killmail_hash.clone();
            self.session
                .resolve_killmail_async(kill.killmail_id, &hash, move |result| match result {
                    Ok(killmail) => sink.borrow_mut().push((kill, killmail)),
                    Err(err) => {
                        log::error!("killmail resolution failed: {}", err.display_chain())
                    }
                });
        }
    }

    fn absorb_resolved_kills(&mut self) {
        let delivered: Vec<_> = self.resolved_kills.borrow_mut().drain(..).collect();
        if delivered.is_empty() {
            return;
        }

        let Some(current_system) = self.snapshot.as_ref().map(|s| s.system.system_id) else {
            return;
        };

        let mut summaries = Vec::new();
        for (feed, killmail) in delivered {
            // A jump can race in-flight resolutions; kills for a system we
            // already left are dropped.
            if killmail.solar_system_id != current_system {
                continue;
            }

            let victim_ship = self.resolve_victim_ship(&killmail);
            summaries.push(KillSummary {
                feed,
                killmail,
                victim_ship,
            });
        }

        if let Some(snapshot) = self.snapshot.as_mut() {
            snapshot.kills.extend(summaries);
        }
    }

    fn resolve_victim_ship(&mut self, killmail: &Killmail) -> String {
        let Some(type_id) = victim_ship_type(killmail) else {
            return "Unknown ship".to_owned();
        };

        match self.session.type_name(type_id) {
            Ok(name) => name,
            Err(err) => {
                log::error!("type name lookup failed: {}", err.display_chain());
                self.last_error = Some(err.into());
                format!("Unknown type ({type_id})")
            }
        }
    }
}

impl RenderDataProvider for OverlayApp {
    fn render_snapshot(&self) -> Option<OverlaySnapshot> {
        self.snapshot.clone()
    }
}

fn victim_ship_type(killmail: &Killmail) -> Option<TypeId> {
    let victim: serde_json::Value = serde_json::from_str(&killmail.victim_json).ok()?;
    let ship_type = victim.get("ship_type_id")?.as_i64()?;
    Some(TypeId(ship_type as i32))
}
