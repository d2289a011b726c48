//! HTTP Basic authentication: a single round-trip, `base64(user:pass)`.

use ssf_error::Result;

use super::{AuthStrategy, Channel, Status};
use crate::config::Credentials;
use crate::http_message::{HttpRequest, HttpResponse};

pub struct BasicStrategy {
    credentials: Credentials,
    status: Status,
}

impl BasicStrategy {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            status: Status::Authenticating,
        }
    }
}

impl AuthStrategy for BasicStrategy {
    fn scheme(&self) -> &'static str {
        "Basic"
    }

    fn status(&self) -> Status {
        self.status
    }

    fn process_response(&mut self, _channel: Channel, response: &HttpResponse) -> Result<()> {
        self.status = if response.success() {
            Status::Authenticated
        } else {
            Status::AuthFailure
        };
        Ok(())
    }

    fn populate_request(&mut self, channel: Channel, request: &mut HttpRequest) {
        let raw = format!(
            "{}:{}",
            self.credentials.username, self.credentials.password
        );
        let encoded = base64::encode(raw);
        request.add_header(channel.credential_header(), &format!("Basic {encoded}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn populates_base64_credentials() {
        let mut strategy = BasicStrategy::new(Credentials {
            username: "alice".into(),
            password: "s3cret".into(),
            ..Default::default()
        });
        let mut req = HttpRequest::connect("target.example", 443);
        strategy.populate_request(Channel::Proxy, &mut req);
        assert_eq!(
            req.generate().contains("Proxy-Authorization: Basic YWxpY2U6czNjcmV0"),
            true
        );
    }
}
