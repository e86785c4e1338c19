//! Caller identification.
//!
//! Authentication happens upstream of this server. The authentication layer passes the caller's profile id on in a
//! header (`X-Profile-Id` unless configured otherwise via `MSE_PROFILE_HEADER`), and the [`Caller`] extractor reads it.
//! Whether the caller may act on a given order is decided by the engine, not here.
use std::future::{ready, Ready};

use actix_web::{dev::Payload, web, FromRequest, HttpRequest};
use log::*;
use settlement_engine::db_types::ProfileId;

use crate::{config::ServerOptions, errors::ServerError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller(pub ProfileId);

impl Caller {
    pub fn profile(&self) -> ProfileId {
        self.0
    }
}

impl FromRequest for Caller {
    type Error = ServerError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(caller_from_request(req))
    }
}

fn caller_from_request(req: &HttpRequest) -> Result<Caller, ServerError> {
    let header = match req.app_data::<web::Data<ServerOptions>>() {
        Some(options) => options.profile_header.clone(),
        None => ServerOptions::default().profile_header,
    };
    let value = req.headers().get(header.as_str()).ok_or_else(|| {
        debug!("💻️ Request to {} has no {header} header", req.path());
        ServerError::MissingCaller(format!("The {header} header is required"))
    })?;
    let profile = value
        .to_str()
        .ok()
        .and_then(|s| s.parse::<ProfileId>().ok())
        .ok_or_else(|| ServerError::MissingCaller(format!("The {header} header must contain a profile id")))?;
    trace!("💻️ Request from {profile}");
    Ok(Caller(profile))
}
