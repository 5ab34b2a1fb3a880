use std::{io, process::Command, time::Duration};

use farsight_store::TokenRecord;

use super::{
    listener,
    pkce,
    types::{LoginRequest, RefreshGrant, TokenGrant, VerifiedCharacter, VerifyResponse},
};
use crate::{EsiError, EsiResult, config::EsiConfig};

/// Anti-forgery state carried through the authorization round trip. One local
/// listener, one flow at a time, so a fixed value is sufficient.
const LOGIN_STATE: &str = "farsight-login";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Client for the SSO side of the house: PKCE authorization, token exchange,
/// verification and refresh. API traffic lives in [`crate::ApiClient`].
#[derive(Clone)]
pub struct SsoClient {
    http: reqwest::Client,
    config: EsiConfig,
}

impl SsoClient {
    pub fn new(config: EsiConfig) -> EsiResult<Self> {
        config.validate()?;

        // Every exchange owns its connection; nothing is kept alive between
        // requests.
        let http = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .pool_max_idle_per_host(0)
            .build()?;

        Ok(Self { http, config })
    }

    /// Builds the authorization URL with a fresh PKCE pair. The returned
    /// verifier must survive until [`exchange_token`](Self::exchange_token);
    /// opening the URL in a browser is the caller's move.
    pub fn begin_authorization(&self, scopes: &[&str]) -> LoginRequest {
        let pair = pkce::generate_pair();

        let scope_list = scopes
            .iter()
            .map(|scope| urlencoding::encode(scope).into_owned())
            .collect::<Vec<_>>()
            .join("%20");

        let authorization_url = format!(
            "{}/v2/oauth/authorize/?response_type=code&redirect_uri={}&client_id={}&scopes={}&code_challenge={}&code_challenge_method=S256&state={}",
            self.config.login_base_url,
            urlencoding::encode(&self.config.redirect_url),
            self.config.client_id,
            scope_list,
            pair.challenge,
            LOGIN_STATE,
        );

        log::info!("authorization request: {authorization_url}");

        LoginRequest {
            authorization_url,
            code_verifier: pair.verifier,
        }
    }

    /// Blocks (on the executor) until the one-shot local listener has served
    /// the SSO redirect, then hands back the authorization code.
    pub async fn await_redirect(&self) -> EsiResult<String> {
        listener::await_redirect(self.config.listen_port).await
    }

    /// Exchanges an authorization code for the initial token set.
    pub async fn exchange_token(&self, code: &str, verifier: &str) -> EsiResult<TokenGrant> {
        let endpoint = format!("{}/v2/oauth/token", self.config.login_base_url);
        let response = self
            .http
            .post(&endpoint)
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("client_id", self.config.client_id.as_str()),
                ("code_verifier", verifier),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(EsiError::UnexpectedStatus {
                endpoint,
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|err| EsiError::TokenExchange(err.to_string()))
    }

    /// Asks the identity endpoint who the access token belongs to and when it
    /// expires.
    pub async fn verify_token(&self, access_token: &str) -> EsiResult<VerifiedCharacter> {
        let endpoint = format!("{}/verify/", self.config.esi_base_url);
        let response = self
            .http
            .get(&endpoint)
            .header("X-User-Agent", self.config.client_id.as_str())
            .header("Accept", "application/json")
            .bearer_auth(access_token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(EsiError::UnexpectedStatus {
                endpoint,
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        let verified: VerifyResponse =
            serde_json::from_str(&body).map_err(|err| EsiError::Verification(err.to_string()))?;
        Ok(verified.into())
    }

    /// Refresh-token grant. The SSO insists on seeing the original code
    /// verifier again, which is why the record carries it for life. On
    /// success the record is updated in place with rotated tokens and a fresh
    /// expiry from `/verify/`; the caller persists it before use. Failure is
    /// fatal, never retried here.
    pub async fn refresh(&self, record: &mut TokenRecord) -> EsiResult<()> {
        let endpoint = format!("{}/v2/oauth/token", self.config.login_base_url);
        let response = self
            .http
            .post(&endpoint)
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", record.refresh_token.as_str()),
                ("client_id", self.config.client_id.as_str()),
                ("code_verifier", record.code_challenge.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(EsiError::Refresh(format!(
                "{endpoint} answered with status {status}"
            )));
        }

        let body = response.text().await?;
        let grant: RefreshGrant =
            serde_json::from_str(&body).map_err(|err| EsiError::Refresh(err.to_string()))?;
        let (Some(access_token), Some(refresh_token)) = (grant.access_token, grant.refresh_token)
        else {
            return Err(EsiError::Refresh(
                "response lacks access_token or refresh_token".to_owned(),
            ));
        };

        record.access_token = access_token;
        record.refresh_token = refresh_token;

        let verified = self.verify_token(&record.access_token).await?;
        record.character_id = verified.character_id;
        record.character_name = verified.character_name;
        record.expires_on = verified.expires_on;

        log::debug!(
            "refreshed token for {}, now expires {}",
            record.character_name,
            record.expires_on
        );
        Ok(())
    }
}

/// Fire-and-forget launch of the platform's URL opener. Failure is logged,
/// not fatal: the authorization URL is also in the log for manual use.
pub fn open_in_browser(url: &str) {
    match spawn_opener(url) {
        Ok(_) => log::debug!("opened default browser"),
        Err(err) => log::warn!("could not open a browser, follow the logged URL manually: {err}"),
    }
}

#[cfg(target_os = "linux")]
fn spawn_opener(url: &str) -> io::Result<std::process::Child> {
    Command::new("xdg-open").arg(url).spawn()
}

#[cfg(target_os = "macos")]
fn spawn_opener(url: &str) -> io::Result<std::process::Child> {
    Command::new("open").arg(url).spawn()
}

#[cfg(target_os = "windows")]
fn spawn_opener(url: &str) -> io::Result<std::process::Child> {
    Command::new("cmd").args(["/C", "start", url]).spawn()
}

#[cfg(test)]
mod tests {
    use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
    use farsight_core::{TokenExpiry, ids::CharacterId};
    use farsight_store::TokenRecord;
    use sha2::{Digest, Sha256};
    use url::Url;

    use super::{LOGIN_STATE, SsoClient};
    use crate::{EsiError, config::EsiConfig};

    fn client_for(server: &mockito::ServerGuard) -> SsoClient {
        let config = EsiConfig {
            login_base_url: server.url(),
            esi_base_url: server.url(),
            zkb_base_url: server.url(),
            launch_browser: false,
            ..EsiConfig::default()
        };
        SsoClient::new(config).expect("sso client")
    }

    fn stored_record() -> TokenRecord {
        TokenRecord {
            refresh_token: "old-refresh".to_owned(),
            access_token: "old-access".to_owned(),
            character_id: CharacterId(94967354),
            character_name: "Pilot".to_owned(),
            expires_on: TokenExpiry::new("2020-01-01T00:00:00Z"),
            code_challenge: "original-verifier".to_owned(),
        }
    }

    #[test]
    fn authorization_url_embeds_hash_of_verifier() {
        let sso = SsoClient::new(EsiConfig {
            launch_browser: false,
            ..EsiConfig::default()
        })
        .expect("sso client");

        let login = sso.begin_authorization(&["esi-location.read_location.v1"]);
        let url = Url::parse(&login.authorization_url).expect("parseable url");

        let challenge = url
            .query_pairs()
            .find(|(key, _)| key == "code_challenge")
            .map(|(_, value)| value.into_owned())
            .expect("code_challenge param");
        let expected = URL_SAFE_NO_PAD.encode(Sha256::digest(login.code_verifier.as_bytes()));
        assert_eq!(challenge, expected);

        let method = url
            .query_pairs()
            .find(|(key, _)| key == "code_challenge_method")
            .map(|(_, value)| value.into_owned())
            .expect("method param");
        assert_eq!(method, "S256");

        let state = url
            .query_pairs()
            .find(|(key, _)| key == "state")
            .map(|(_, value)| value.into_owned())
            .expect("state param");
        assert_eq!(state, LOGIN_STATE);
    }

    #[test]
    fn authorization_url_joins_scopes_with_encoded_space() {
        let sso = SsoClient::new(EsiConfig {
            launch_browser: false,
            ..EsiConfig::default()
        })
        .expect("sso client");

        let login = sso.begin_authorization(&[
            "esi-location.read_location.v1",
            "esi-killmails.read_killmails.v1",
        ]);
        assert!(login.authorization_url.contains(
            "&scopes=esi-location.read_location.v1%20esi-killmails.read_killmails.v1&"
        ));
    }

    #[tokio::test]
    async fn exchange_token_parses_grant() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v2/oauth/token")
            .match_body(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("grant_type".into(), "authorization_code".into()),
                mockito::Matcher::UrlEncoded("code".into(), "the-code".into()),
                mockito::Matcher::UrlEncoded("code_verifier".into(), "the-verifier".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"access_token":"acc","expires_in":1199,"token_type":"Bearer","refresh_token":"ref"}"#,
            )
            .create_async()
            .await;

        let sso = client_for(&server);
        let grant = sso
            .exchange_token("the-code", "the-verifier")
            .await
            .expect("token grant");

        assert_eq!(grant.access_token, "acc");
        assert_eq!(grant.refresh_token, "ref");
        assert_eq!(grant.expires_in, 1199);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn exchange_token_rejects_malformed_response() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v2/oauth/token")
            .with_status(200)
            .with_body(r#"{"access_token":"acc"}"#)
            .create_async()
            .await;

        let sso = client_for(&server);
        let err = sso
            .exchange_token("code", "verifier")
            .await
            .expect_err("malformed response must fail");
        assert!(matches!(err, EsiError::TokenExchange(_)));
    }

    #[tokio::test]
    async fn verify_token_parses_identity() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/verify/")
            .match_header("authorization", "Bearer acc")
            .with_status(200)
            .with_body(
                r#"{"CharacterID":94967354,"CharacterName":"Pilot","CharacterOwnerHash":"hash","ExpiresOn":"2026-02-01T10:30:00Z","TokenType":"Character"}"#,
            )
            .create_async()
            .await;

        let sso = client_for(&server);
        let verified = sso.verify_token("acc").await.expect("verified character");

        assert_eq!(verified.character_id, CharacterId(94967354));
        assert_eq!(verified.character_name, "Pilot");
        assert_eq!(verified.expires_on.as_str(), "2026-02-01T10:30:00Z");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn verify_token_rejects_missing_fields() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/verify/")
            .with_status(200)
            .with_body(r#"{"CharacterName":"Pilot"}"#)
            .create_async()
            .await;

        let sso = client_for(&server);
        let err = sso
            .verify_token("acc")
            .await
            .expect_err("missing fields must fail");
        assert!(matches!(err, EsiError::Verification(_)));
    }

    #[tokio::test]
    async fn refresh_rotates_tokens_and_reverifies() {
        let mut server = mockito::Server::new_async().await;
        let token_mock = server
            .mock("POST", "/v2/oauth/token")
            .match_body(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("grant_type".into(), "refresh_token".into()),
                mockito::Matcher::UrlEncoded("refresh_token".into(), "old-refresh".into()),
                mockito::Matcher::UrlEncoded("code_verifier".into(), "original-verifier".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"access_token":"new-access","refresh_token":"new-refresh"}"#)
            .create_async()
            .await;
        let verify_mock = server
            .mock("GET", "/verify/")
            .match_header("authorization", "Bearer new-access")
            .with_status(200)
            .with_body(
                r#"{"CharacterID":94967354,"CharacterName":"Pilot","CharacterOwnerHash":"hash","ExpiresOn":"2026-03-01T00:00:00Z","TokenType":"Character"}"#,
            )
            .create_async()
            .await;

        let sso = client_for(&server);
        let mut record = stored_record();
        sso.refresh(&mut record).await.expect("refresh");

        assert_eq!(record.access_token, "new-access");
        assert_eq!(record.refresh_token, "new-refresh");
        assert_eq!(record.expires_on.as_str(), "2026-03-01T00:00:00Z");
        // The verifier that minted the original grant never rotates.
        assert_eq!(record.code_challenge, "original-verifier");
        token_mock.assert_async().await;
        verify_mock.assert_async().await;
    }

    #[tokio::test]
    async fn refresh_without_rotated_tokens_is_fatal() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v2/oauth/token")
            .with_status(200)
            .with_body(r#"{"access_token":"new-access"}"#)
            .create_async()
            .await;
        let verify_mock = server
            .mock("GET", "/verify/")
            .expect(0)
            .create_async()
            .await;

        let sso = client_for(&server);
        let mut record = stored_record();
        let err = sso
            .refresh(&mut record)
            .await
            .expect_err("partial refresh must fail");

        assert!(matches!(err, EsiError::Refresh(_)));
        // The record is untouched on the failure path.
        assert_eq!(record.access_token, "old-access");
        verify_mock.assert_async().await;
    }
}
