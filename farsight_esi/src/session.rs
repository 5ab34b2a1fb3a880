use std::{cell::RefCell, rc::Rc};

use farsight_core::{
    CharacterInfo, CharacterLocation, Killmail, SolarSystem, Timestamp, ZkbKill,
    ids::{CharacterId, KillmailId, SolarSystemId, TypeId},
};
use farsight_store::{OverlayStore, TokenRecord};

use crate::{
    EsiResult,
    api::ApiClient,
    auth::{SsoClient, open_in_browser},
    config::EsiConfig,
    executor::Executor,
    resolve::resolve_cached,
};

/// Scope requested when the session has to run the interactive login.
pub const DEFAULT_SCOPE: &str = "esi-location.read_location.v1";

/// The composed entry point for everything authenticated and everything
/// cached: token bootstrap and upkeep, location queries, reference-entity
/// resolution and the live killboard feed.
///
/// All I/O runs on the shared [`Executor`]; the synchronous methods block on
/// it, the `_async` variants queue a task and invoke their callback exactly
/// once on a later pump. Synchronous methods must not be called from inside a
/// spawned task.
pub struct EsiSession {
    store: OverlayStore,
    executor: Rc<Executor>,
    sso: SsoClient,
    api: ApiClient,
    // Exactly one current token per process. Mutated in place on refresh,
    // persisted after every mutation.
    current: Rc<RefCell<TokenRecord>>,
}

impl EsiSession {
    /// Loads the most-recently-expiring stored token, refreshing it when
    /// stale. With no stored token, or a stored token the SSO refuses to
    /// refresh, the full interactive authorization flow runs instead. That
    /// fallback is the only recovery path for authentication failures.
    pub fn connect(
        store: OverlayStore,
        executor: Rc<Executor>,
        config: EsiConfig,
    ) -> EsiResult<Self> {
        let sso = SsoClient::new(config.clone())?;
        let api = ApiClient::new(config.clone())?;

        let record = executor.block_on(Self::bootstrap_token(
            &store,
            &sso,
            config.launch_browser,
        ))?;
        log::info!(
            "session ready for {} ({})",
            record.character_name,
            record.character_id
        );

        Ok(Self {
            store,
            executor,
            sso,
            api,
            current: Rc::new(RefCell::new(record)),
        })
    }

    async fn bootstrap_token(
        store: &OverlayStore,
        sso: &SsoClient,
        launch_browser: bool,
    ) -> EsiResult<TokenRecord> {
        if let Some(mut record) = store.latest_token().await? {
            if !record.expires_on.is_expired(Timestamp::now()) {
                return Ok(record);
            }

            match sso.refresh(&mut record).await {
                Ok(()) => {
                    store.save_token(&record).await?;
                    return Ok(record);
                }
                Err(err) => log::warn!(
                    "stored token is beyond refresh, starting interactive login: {}",
                    err.display_chain()
                ),
            }
        }

        Self::interactive_login(store, sso, launch_browser).await
    }

    async fn interactive_login(
        store: &OverlayStore,
        sso: &SsoClient,
        launch_browser: bool,
    ) -> EsiResult<TokenRecord> {
        let login = sso.begin_authorization(&[DEFAULT_SCOPE]);
        if launch_browser {
            open_in_browser(&login.authorization_url);
        }

        let code = sso.await_redirect().await?;
        let grant = sso.exchange_token(&code, &login.code_verifier).await?;
        let verified = sso.verify_token(&grant.access_token).await?;

        let record = TokenRecord {
            refresh_token: grant.refresh_token,
            access_token: grant.access_token,
            character_id: verified.character_id,
            character_name: verified.character_name,
            expires_on: verified.expires_on,
            code_challenge: login.code_verifier,
        };
        store.save_token(&record).await?;
        Ok(record)
    }

    pub fn character_id(&self) -> CharacterId {
        self.current.borrow().character_id
    }

    pub fn character_name(&self) -> String {
        self.current.borrow().character_name.clone()
    }

    pub fn store(&self) -> &OverlayStore {
        &self.store
    }

    pub fn executor(&self) -> &Rc<Executor> {
        &self.executor
    }

    /// Current location of the authenticated character.
    pub fn character_location(&self) -> EsiResult<CharacterLocation> {
        self.executor.block_on(Self::location_task(
            self.store.clone(),
            self.sso.clone(),
            self.api.clone(),
            Rc::clone(&self.current),
        ))
    }

    pub fn character_location_async(
        &self,
        callback: impl FnOnce(EsiResult<CharacterLocation>) + 'static,
    ) {
        let task = Self::location_task(
            self.store.clone(),
            self.sso.clone(),
            self.api.clone(),
            Rc::clone(&self.current),
        );
        self.executor.spawn(async move {
            callback(task.await);
        });
    }

    async fn location_task(
        store: OverlayStore,
        sso: SsoClient,
        api: ApiClient,
        current: Rc<RefCell<TokenRecord>>,
    ) -> EsiResult<CharacterLocation> {
        let (character_id, access_token) = ensure_valid_token(&store, &sso, &current).await?;
        api.character_location(character_id, &access_token).await
    }

    pub fn resolve_solar_system(&self, system_id: SolarSystemId) -> EsiResult<SolarSystem> {
        self.executor.block_on(Self::system_task(
            self.store.clone(),
            self.api.clone(),
            system_id,
        ))
    }

    pub fn resolve_solar_system_async(
        &self,
        system_id: SolarSystemId,
        callback: impl FnOnce(EsiResult<SolarSystem>) + 'static,
    ) {
        let task = Self::system_task(self.store.clone(), self.api.clone(), system_id);
        self.executor.spawn(async move {
            callback(task.await);
        });
    }

    async fn system_task(
        store: OverlayStore,
        api: ApiClient,
        system_id: SolarSystemId,
    ) -> EsiResult<SolarSystem> {
        resolve_cached(
            async || store.solar_system(system_id).await,
            async || api.solar_system(system_id).await,
            async |system: SolarSystem| store.insert_solar_system(&system).await,
        )
        .await
    }

    pub fn resolve_killmail(
        &self,
        killmail_id: KillmailId,
        killmail_hash: &str,
    ) -> EsiResult<Killmail> {
        self.executor.block_on(Self::killmail_task(
            self.store.clone(),
            self.api.clone(),
            killmail_id,
            killmail_hash.to_owned(),
        ))
    }

    pub fn resolve_killmail_async(
        &self,
        killmail_id: KillmailId,
        killmail_hash: &str,
        callback: impl FnOnce(EsiResult<Killmail>) + 'static,
    ) {
        let task = Self::killmail_task(
            self.store.clone(),
            self.api.clone(),
            killmail_id,
            killmail_hash.to_owned(),
        );
        self.executor.spawn(async move {
            callback(task.await);
        });
    }

    async fn killmail_task(
        store: OverlayStore,
        api: ApiClient,
        killmail_id: KillmailId,
        killmail_hash: String,
    ) -> EsiResult<Killmail> {
        resolve_cached(
            async || store.killmail(killmail_id, &killmail_hash).await,
            async || api.killmail(killmail_id, &killmail_hash).await,
            async |killmail: Killmail| store.insert_killmail(&killmail).await,
        )
        .await
    }

    /// Display name for an inventory type. Unresolvable ids degrade to a
    /// placeholder instead of failing; the name is display-only data.
    pub fn type_name(&self, type_id: TypeId) -> EsiResult<String> {
        let row = self.executor.block_on(self.store.inventory_type(type_id))?;
        Ok(row
            .map(|inv_type| inv_type.type_name)
            .unwrap_or_else(|| format!("Unknown type ({type_id})")))
    }

    /// Recent kills in a system straight from the killboard: always live,
    /// never cached, truncated to `limit` in feed order.
    pub fn kills_in_system(
        &self,
        system_id: SolarSystemId,
        limit: usize,
    ) -> EsiResult<Vec<ZkbKill>> {
        let mut kills = self.executor.block_on(self.api.kills_in_system(system_id))?;
        kills.truncate(limit);
        Ok(kills)
    }

    /// Public character sheet lookup, uncached.
    pub fn convert_character_id_async(
        &self,
        character_id: CharacterId,
        callback: impl FnOnce(EsiResult<CharacterInfo>) + 'static,
    ) {
        let api = self.api.clone();
        self.executor.spawn(async move {
            callback(api.character(character_id).await);
        });
    }
}

/// Expiry check immediately before every authenticated call; an expired token
/// is refreshed and persisted before the dependent request goes out.
async fn ensure_valid_token(
    store: &OverlayStore,
    sso: &SsoClient,
    current: &RefCell<TokenRecord>,
) -> EsiResult<(CharacterId, String)> {
    let mut record = current.borrow().clone();

    if record.expires_on.is_expired(Timestamp::now()) {
        log::debug!("access token expired, refreshing before use");
        sso.refresh(&mut record).await?;
        store.save_token(&record).await?;
        *current.borrow_mut() = record.clone();
    }

    Ok((record.character_id, record.access_token))
}
