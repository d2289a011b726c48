//! Negotiate (SPNEGO/Kerberos) and NTLM authentication delegate to the host
//! platform's SSPI/GSSAPI in the original implementation
//! (`negotiate_auth_strategy.h`'s `PlatformAuthImpl`); this build ships only
//! the portable [`NoopPlatformAuth`] fallback, so both strategies report
//! themselves unsupported and the [`super::select_strategy`] search falls
//! through to Digest/Basic.

use ssf_error::Result;

use super::{AuthStrategy, Channel, Status};
use crate::config::Credentials;
use crate::http_message::{HttpRequest, HttpResponse};

/// The seam the original's SSPI/GSSAPI backends plug into. No implementation
/// ships in this build; a platform-specific crate can provide one without
/// touching the strategies below.
pub trait PlatformAuthImpl: Send {
    fn init(&mut self, target: &str) -> Result<()>;
    fn process_server_token(&mut self, token: &[u8]) -> Result<()>;
    fn get_auth_token(&self) -> Option<Vec<u8>>;
    fn is_supported(&self) -> bool;
}

#[derive(Default)]
pub struct NoopPlatformAuth;

impl PlatformAuthImpl for NoopPlatformAuth {
    fn init(&mut self, _target: &str) -> Result<()> {
        Ok(())
    }

    fn process_server_token(&mut self, _token: &[u8]) -> Result<()> {
        Ok(())
    }

    fn get_auth_token(&self) -> Option<Vec<u8>> {
        None
    }

    fn is_supported(&self) -> bool {
        false
    }
}

pub struct NegotiateStrategy {
    #[allow(dead_code)]
    credentials: Credentials,
    platform: Box<dyn PlatformAuthImpl>,
}

impl NegotiateStrategy {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            platform: Box::new(NoopPlatformAuth),
        }
    }
}

impl AuthStrategy for NegotiateStrategy {
    fn scheme(&self) -> &'static str {
        "Negotiate"
    }

    fn status(&self) -> Status {
        Status::AuthFailure
    }

    fn supports(&self, _channel: Channel, _response: &HttpResponse) -> bool {
        self.platform.is_supported()
    }

    fn process_response(&mut self, _channel: Channel, _response: &HttpResponse) -> Result<()> {
        Ok(())
    }

    fn populate_request(&mut self, _channel: Channel, _request: &mut HttpRequest) {}
}

pub struct NtlmStrategy {
    #[allow(dead_code)]
    credentials: Credentials,
    platform: Box<dyn PlatformAuthImpl>,
}

impl NtlmStrategy {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            platform: Box::new(NoopPlatformAuth),
        }
    }
}

impl AuthStrategy for NtlmStrategy {
    fn scheme(&self) -> &'static str {
        "NTLM"
    }

    fn status(&self) -> Status {
        Status::AuthFailure
    }

    fn supports(&self, _channel: Channel, _response: &HttpResponse) -> bool {
        self.platform.is_supported()
    }

    fn process_response(&mut self, _channel: Channel, _response: &HttpResponse) -> Result<()> {
        Ok(())
    }

    fn populate_request(&mut self, _channel: Channel, _request: &mut HttpRequest) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_platform_auth_is_never_supported() {
        assert!(!NoopPlatformAuth.is_supported());
    }

    #[test]
    fn negotiate_never_matches_a_challenge() {
        let strategy = NegotiateStrategy::new(Credentials::default());
        let mut response = HttpResponse::default();
        response.add_header("Proxy-Authenticate", "Negotiate");
        assert!(!strategy.supports(Channel::Proxy, &response));
    }
}
