mod types;

use std::time::Duration;

use farsight_core::{
    CharacterInfo, CharacterLocation, Killmail, SolarSystem, ZkbKill,
    ids::{CharacterId, KillmailId, SolarSystemId},
};
use serde::de::DeserializeOwned;

use self::types::{CharacterResponse, KillmailResponse, LocationResponse, SystemResponse, ZkbEntry};
use crate::{EsiError, EsiResult, config::EsiConfig};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// ESI and zKillboard data calls. Cheap to clone; async resolution tasks take
/// their own copy.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    config: EsiConfig,
}

impl ApiClient {
    pub fn new(config: EsiConfig) -> EsiResult<Self> {
        config.validate()?;

        let http = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .pool_max_idle_per_host(0)
            .build()?;

        Ok(Self { http, config })
    }

    /// Where the character currently is. Requires a live access token; the
    /// caller owns the expiry check.
    pub async fn character_location(
        &self,
        character_id: CharacterId,
        access_token: &str,
    ) -> EsiResult<CharacterLocation> {
        let endpoint = format!(
            "{}/v1/characters/{}/location/",
            self.config.esi_base_url, character_id
        );
        let location: LocationResponse = self.get_json(&endpoint, Some(access_token)).await?;
        Ok(location.into())
    }

    pub async fn solar_system(&self, system_id: SolarSystemId) -> EsiResult<SolarSystem> {
        let endpoint = format!(
            "{}/v4/universe/systems/{}/",
            self.config.esi_base_url, system_id
        );
        let system: SystemResponse = self.get_json(&endpoint, None).await?;
        Ok(system.into())
    }

    pub async fn killmail(
        &self,
        killmail_id: KillmailId,
        killmail_hash: &str,
    ) -> EsiResult<Killmail> {
        let endpoint = format!(
            "{}/v1/killmails/{}/{}/",
            self.config.esi_base_url, killmail_id, killmail_hash
        );
        let killmail: KillmailResponse = self.get_json(&endpoint, None).await?;
        Ok(killmail.into_killmail(killmail_hash.to_owned()))
    }

    pub async fn character(&self, character_id: CharacterId) -> EsiResult<CharacterInfo> {
        let endpoint = format!(
            "{}/v4/characters/{}/",
            self.config.esi_base_url, character_id
        );
        let character: CharacterResponse = self.get_json(&endpoint, None).await?;
        Ok(character.into_info(character_id))
    }

    /// Live feed of recent kills in a system, newest first as the killboard
    /// reports them. Never cached.
    pub async fn kills_in_system(&self, system_id: SolarSystemId) -> EsiResult<Vec<ZkbKill>> {
        let endpoint = format!(
            "{}/api/kills/solarSystemID/{}/",
            self.config.zkb_base_url, system_id
        );
        let entries: Vec<ZkbEntry> = self.get_json(&endpoint, None).await?;
        Ok(entries.into_iter().map(Into::into).collect())
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        access_token: Option<&str>,
    ) -> EsiResult<T> {
        log::trace!("GET {endpoint}");
        let mut request = self
            .http
            .get(endpoint)
            .header("X-User-Agent", self.config.user_agent.as_str())
            .header("Accept", "application/json");
        if let Some(token) = access_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(EsiError::UnexpectedStatus {
                endpoint: endpoint.to_owned(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[cfg(test)]
mod tests {
    use farsight_core::ids::{
        CharacterId, KillmailId, SolarSystemId, StationId,
    };

    use super::ApiClient;
    use crate::{EsiError, config::EsiConfig};

    fn client_for(server: &mockito::ServerGuard) -> ApiClient {
        let config = EsiConfig {
            login_base_url: server.url(),
            esi_base_url: server.url(),
            zkb_base_url: server.url(),
            launch_browser: false,
            ..EsiConfig::default()
        };
        ApiClient::new(config).expect("api client")
    }

    #[tokio::test]
    async fn location_without_station_means_open_space() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v1/characters/94967354/location/")
            .match_header("authorization", "Bearer acc")
            .with_status(200)
            .with_body(r#"{"solar_system_id":30000142}"#)
            .create_async()
            .await;

        let api = client_for(&server);
        let location = api
            .character_location(CharacterId(94967354), "acc")
            .await
            .expect("location");

        assert_eq!(location.solar_system_id, SolarSystemId(30000142));
        assert_eq!(location.station_id, None);
        assert_eq!(location.structure_id, None);
    }

    #[tokio::test]
    async fn docked_location_carries_station() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v1/characters/94967354/location/")
            .with_status(200)
            .with_body(r#"{"solar_system_id":30000142,"station_id":60003760}"#)
            .create_async()
            .await;

        let api = client_for(&server);
        let location = api
            .character_location(CharacterId(94967354), "acc")
            .await
            .expect("location");

        assert_eq!(location.station_id, Some(StationId(60003760)));
    }

    #[tokio::test]
    async fn location_without_system_id_is_a_hard_failure() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v1/characters/94967354/location/")
            .with_status(200)
            .with_body(r#"{"station_id":60003760}"#)
            .create_async()
            .await;

        let api = client_for(&server);
        let err = api
            .character_location(CharacterId(94967354), "acc")
            .await
            .expect_err("missing system id must fail");
        assert!(matches!(err, EsiError::Decode(_)));
    }

    #[tokio::test]
    async fn solar_system_normalizes_nested_json() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v4/universe/systems/30000142/")
            .with_status(200)
            .with_body(
                r#"{
                    "system_id":30000142,
                    "constellation_id":20000020,
                    "name":"Jita",
                    "planets":[{"planet_id":40009077}],
                    "position":{"x":-1.29e17,"y":6.07e16,"z":1.17e17},
                    "security_class":"B",
                    "security_status":0.9459,
                    "star_id":40009076,
                    "stargates":[50001248],
                    "stations":[60003760]
                }"#,
            )
            .create_async()
            .await;

        let api = client_for(&server);
        let system = api
            .solar_system(SolarSystemId(30000142))
            .await
            .expect("system");

        assert_eq!(system.name, "Jita");
        assert_eq!(system.planets_json, r#"[{"planet_id":40009077}]"#);
        assert_eq!(system.stations_json, "[60003760]");
    }

    #[tokio::test]
    async fn killmail_keeps_the_requested_hash() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v1/killmails/84180783/abcdef/")
            .with_status(200)
            .with_body(
                r#"{
                    "killmail_id":84180783,
                    "killmail_time":"2020-03-22T19:03:52Z",
                    "solar_system_id":30000142,
                    "attackers":[{"character_id":95465499}],
                    "victim":{"character_id":90379338,"ship_type_id":587}
                }"#,
            )
            .create_async()
            .await;

        let api = client_for(&server);
        let killmail = api
            .killmail(KillmailId(84180783), "abcdef")
            .await
            .expect("killmail");

        assert_eq!(killmail.killmail_hash, "abcdef");
        assert_eq!(killmail.solar_system_id, SolarSystemId(30000142));
        assert_eq!(killmail.kill_time, "2020-03-22T19:03:52Z");
    }

    #[tokio::test]
    async fn character_without_alliance_defaults_to_zero() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v4/characters/94967354/")
            .with_status(200)
            .with_body(
                r#"{"name":"Pilot","corporation_id":98388312,"birthday":"2015-03-24T11:37:00Z","security_status":0.5}"#,
            )
            .create_async()
            .await;

        let api = client_for(&server);
        let info = api
            .character(CharacterId(94967354))
            .await
            .expect("character info");

        assert_eq!(info.name, "Pilot");
        assert_eq!(info.alliance_id, 0);
        assert_eq!(info.corporation_id, 98388312);
    }

    #[tokio::test]
    async fn kill_feed_preserves_order() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/kills/solarSystemID/30000142/")
            .with_status(200)
            .with_body(
                r#"[
                    {"killmail_id":2,"zkb":{"hash":"h2","fittedValue":10.0,"totalValue":20.0,"points":1,"npc":false,"solo":true,"awox":false}},
                    {"killmail_id":1,"zkb":{"hash":"h1","fittedValue":1.0,"totalValue":2.0,"points":5,"npc":true,"solo":false,"awox":false}}
                ]"#,
            )
            .create_async()
            .await;

        let api = client_for(&server);
        let kills = api
            .kills_in_system(SolarSystemId(30000142))
            .await
            .expect("kill feed");

        assert_eq!(kills.len(), 2);
        assert_eq!(kills[0].killmail_id, KillmailId(2));
        assert_eq!(kills[0].killmail_hash, "h2");
        assert!(kills[0].solo);
        assert_eq!(kills[1].killmail_id, KillmailId(1));
        assert!(kills[1].npc);
    }

    #[tokio::test]
    async fn error_status_is_surfaced_not_masked() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v4/universe/systems/30000142/")
            .with_status(502)
            .create_async()
            .await;

        let api = client_for(&server);
        let err = api
            .solar_system(SolarSystemId(30000142))
            .await
            .expect_err("bad gateway must surface");
        assert!(matches!(
            err,
            EsiError::UnexpectedStatus { status: 502, .. }
        ));
    }
}
