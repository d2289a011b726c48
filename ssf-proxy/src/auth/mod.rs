//! Pluggable HTTP proxy authentication strategies (spec §3 "Auth strategy",
//! §4.5.2), tried in the fixed order `[Negotiate, Ntlm, Digest, Basic]`
//! against whichever `WWW-Authenticate`/`Proxy-Authenticate` challenges the
//! proxy actually offers, mirroring `AuthStrategy`/`HttpCodecStrategy` in
//! `digest_auth_strategy.h`.

pub mod basic;
pub mod digest;
pub mod platform;

use ssf_error::Result;

use crate::config::Credentials;
use crate::http_message::{HttpRequest, HttpResponse};

/// Which response header carries the challenge and which request header
/// carries the credentials: `WWW-Authenticate`/`Authorization` for
/// authenticating to the origin, `Proxy-Authenticate`/`Proxy-Authorization`
/// for authenticating to a proxy. SSF only ever proxy-authenticates.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Channel {
    Www,
    Proxy,
}

impl Channel {
    fn challenge_header(self) -> &'static str {
        match self {
            Channel::Www => "WWW-Authenticate",
            Channel::Proxy => "Proxy-Authenticate",
        }
    }

    fn credential_header(self) -> &'static str {
        match self {
            Channel::Www => "Authorization",
            Channel::Proxy => "Proxy-Authorization",
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Status {
    Authenticating,
    Authenticated,
    AuthFailure,
}

/// A single authentication round-trip strategy. Strategies are stateful:
/// `process_response` consumes a challenge and `populate_request` emits the
/// credentials computed from it.
pub trait AuthStrategy: Send {
    fn scheme(&self) -> &'static str;

    fn status(&self) -> Status;

    /// Whether `response` carries a challenge this strategy understands.
    fn supports(&self, channel: Channel, response: &HttpResponse) -> bool {
        response
            .header(channel.challenge_header())
            .iter()
            .any(|v| v.to_ascii_lowercase().starts_with(&self.scheme().to_ascii_lowercase()))
    }

    /// Consumes the proxy's challenge, advancing internal state.
    fn process_response(&mut self, channel: Channel, response: &HttpResponse) -> Result<()>;

    /// Adds the computed credential header to the next request.
    fn populate_request(&mut self, channel: Channel, request: &mut HttpRequest);
}

/// Picks the first strategy (in `[Negotiate, Ntlm, Digest, Basic]` order)
/// that recognizes a challenge in `response`, constructing it from
/// `credentials`. Negotiate/NTLM fall back to [`platform::NoopPlatformAuth`]
/// on this build, so they never match and Digest/Basic are reached.
pub fn select_strategy(
    channel: Channel,
    response: &HttpResponse,
    credentials: &Credentials,
) -> Option<Box<dyn AuthStrategy>> {
    let negotiate = platform::NegotiateStrategy::new(credentials.clone());
    if negotiate.supports(channel, response) {
        return Some(Box::new(negotiate));
    }
    let ntlm = platform::NtlmStrategy::new(credentials.clone());
    if ntlm.supports(channel, response) {
        return Some(Box::new(ntlm));
    }
    let digest = digest::DigestStrategy::new(credentials.clone());
    if digest.supports(channel, response) {
        return Some(Box::new(digest));
    }
    let basic = basic::BasicStrategy::new(credentials.clone());
    if basic.supports(channel, response) {
        return Some(Box::new(basic));
    }
    None
}
