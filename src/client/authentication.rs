use reqwest::{StatusCode, header};
use tracing::debug;

use crate::error::Error;

impl super::Api {
    /// Log in and capture the session cookie.
    ///
    /// The server keeps the status at 200 for rejected credentials and
    /// answers `Fails.` in the body, so both the status and the body are
    /// consulted.
    pub async fn login(&self) -> Result<(), Error> {
        let Some(credentials) = self.state.read().await.credentials().cloned() else {
            return Err(Error::BadCredentials);
        };

        let response = self.post_basic("auth/login", credentials.form()).await?;
        match response.status() {
            StatusCode::FORBIDDEN => return Err(Error::IpBanned),
            StatusCode::OK => {}
            other => return Err(Error::unexpected_status("auth/login", other)),
        }

        let sid = response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .filter_map(|cookie| cookie.split(';').next())
            .find_map(|pair| pair.trim().strip_prefix("SID=").map(str::to_string));

        let body = response.text().await?;
        if body.trim() != "Ok." {
            return Err(Error::BadCredentials);
        }
        // "Ok." without a cookie still means no session was created.
        let Some(sid) = sid else {
            return Err(Error::BadCredentials);
        };

        debug!("logged in");
        let mut state = self.state.write().await;
        *state = state.add_cookie(&sid);
        Ok(())
    }

    /// End the session. The cookie is discarded even if the request fails.
    pub async fn logout(&self) -> Result<(), Error> {
        let result = self.post("auth/logout", Vec::new()).await;
        let mut state = self.state.write().await;
        *state = state.clear_cookie();
        result.map(|_| ())
    }

    /// Drop the stale cookie and log in again; used when a request gets 403.
    pub(crate) async fn relogin(&self) -> Result<(), Error> {
        {
            let mut state = self.state.write().await;
            *state = state.clear_cookie();
        }
        self.login().await
    }
}
