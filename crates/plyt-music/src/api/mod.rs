//! HTTP clients for the concrete source and destination services.

pub mod spotify;
pub mod youtube;

use std::time::Duration;

use plyt_core::{PlytError, PlytResult};
use reqwest::Client;

const USER_AGENT: &str = "plyt/0.1";

pub fn http_client() -> PlytResult<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(30))
        .build()
        .map_err(|err| PlytError::Config(format!("failed to build http client: {err}")))
}

/// Transport failures are worth retrying; anything else is a bad request.
pub(crate) fn request_error(context: &str, err: reqwest::Error) -> PlytError {
    if err.is_timeout() || err.is_connect() || err.is_request() {
        PlytError::Network(format!("{context} request failed: {err}"))
    } else {
        PlytError::Api(format!("{context} request failed: {err}"))
    }
}

pub(crate) fn is_transient_status(status: u16) -> bool {
    status == 429 || (500..600).contains(&status)
}
