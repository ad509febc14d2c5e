//! Platform authentication
//!
//! Access token exchange and gateway discovery.

mod locator;
mod token;

pub use locator::{GatewayDescriptor, GatewayLocator, SessionStartLimit, GATEWAY_BOT_PATH};
pub use token::{AccessToken, TokenProvider};

use crate::protocol::bot_token;

/// Header carrying the application id on every authenticated request
pub const APP_ID_HEADER: &str = "X-Union-Appid";

/// Attach the platform's authorization headers to a request
pub(crate) fn authorize(
    builder: reqwest::RequestBuilder,
    access_token: &str,
    app_id: &str,
) -> reqwest::RequestBuilder {
    builder
        .header(reqwest::header::AUTHORIZATION, bot_token(access_token))
        .header(APP_ID_HEADER, app_id)
}
