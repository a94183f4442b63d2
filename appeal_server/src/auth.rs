//! Caller identity.
//!
//! Authentication happens upstream, in the gateway that fronts this server. The gateway forwards the authenticated
//! user's id in the `X-User-Id` header, and handlers take it from there with the [`CallerId`] extractor.
use std::{
    fmt::Display,
    future::{ready, Ready},
};

use actix_web::{dev::Payload, FromRequest, HttpRequest};
use log::debug;

use crate::errors::ServerError;

pub const USER_ID_HEADER: &str = "X-User-Id";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerId(pub String);

impl CallerId {
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for CallerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromRequest for CallerId {
    type Error = ServerError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let id = req
            .headers()
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| CallerId(s.to_string()));
        if id.is_none() {
            debug!("💻️ Request to {} has no caller id", req.path());
        }
        ready(id.ok_or(ServerError::MissingUserId))
    }
}
