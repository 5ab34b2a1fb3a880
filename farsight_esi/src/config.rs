use crate::{EsiError, EsiResult};

/// The OAuth application shipped with the overlay.
pub const DEFAULT_CLIENT_ID: &str = "fd612fe6fd514fd5b4c1718ed72ef33e";
pub const DEFAULT_REDIRECT_URL: &str = "http://localhost:8080/callback/";
pub const DEFAULT_LISTEN_PORT: u16 = 8080;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EsiConfig {
    pub client_id: String,
    /// Redirect URI registered with the SSO application. Must point at the
    /// local listener.
    pub redirect_url: String,
    pub listen_port: u16,
    pub login_base_url: String,
    pub esi_base_url: String,
    pub zkb_base_url: String,
    pub user_agent: String,
    /// Launch the default browser when the authorization URL is built.
    /// Headless setups turn this off and follow the logged URL by hand.
    pub launch_browser: bool,
}

impl Default for EsiConfig {
    fn default() -> Self {
        Self {
            client_id: DEFAULT_CLIENT_ID.to_owned(),
            redirect_url: DEFAULT_REDIRECT_URL.to_owned(),
            listen_port: DEFAULT_LISTEN_PORT,
            login_base_url: "https://login.eveonline.com".to_owned(),
            esi_base_url: "https://esi.evetech.net".to_owned(),
            zkb_base_url: "https://zkillboard.com".to_owned(),
            user_agent: concat!("farsight/", env!("CARGO_PKG_VERSION")).to_owned(),
            launch_browser: true,
        }
    }
}

impl EsiConfig {
    pub fn validate(&self) -> EsiResult<()> {
        if self.client_id.trim().is_empty() {
            return Err(EsiError::InvalidConfig("client_id must be set"));
        }
        if self.redirect_url.trim().is_empty() {
            return Err(EsiError::InvalidConfig("redirect_url must be set"));
        }
        if self.login_base_url.trim().is_empty()
            || self.esi_base_url.trim().is_empty()
            || self.zkb_base_url.trim().is_empty()
        {
            return Err(EsiError::InvalidConfig("endpoint base urls must be set"));
        }
        if self.user_agent.trim().is_empty() {
            return Err(EsiError::InvalidConfig("user_agent must be set"));
        }
        Ok(())
    }
}
