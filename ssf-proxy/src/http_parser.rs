//! A minimal streaming HTTP response parser (spec §3 "HTTP response
//! builder"). Feeds accumulate status line, then headers, then body;
//! `done()` flips exactly when `Content-Length` bytes of body have been
//! consumed (spec §8's quantified HTTP invariant), or immediately after the
//! header block when no body is expected.

use ssf_error::{Error, ErrorKind, Result};

use crate::http_message::HttpResponse;

#[derive(Clone, Debug, Eq, PartialEq)]
enum State {
    StatusLine,
    Headers,
    Body,
    Done,
}

#[derive(Debug)]
pub struct HttpResponseBuilder {
    state: State,
    buf: Vec<u8>,
    response: HttpResponse,
    content_length: Option<usize>,
}

impl Default for HttpResponseBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpResponseBuilder {
    pub fn new() -> Self {
        Self {
            state: State::StatusLine,
            buf: Vec::new(),
            response: HttpResponse::default(),
            content_length: None,
        }
    }

    pub fn done(&self) -> bool {
        self.state == State::Done
    }

    /// Feeds the next chunk of bytes read off the wire into the parser,
    /// advancing it from status-line through headers through body.
    pub fn process(&mut self, data: &[u8]) -> Result<()> {
        self.buf.extend_from_slice(data);

        loop {
            match self.state {
                State::StatusLine => {
                    if let Some(line) = self.take_line()? {
                        self.parse_status_line(&line)?;
                        self.state = State::Headers;
                    } else {
                        return Ok(());
                    }
                }
                State::Headers => {
                    if let Some(line) = self.take_line()? {
                        if line.is_empty() {
                            self.content_length = self
                                .response
                                .header("Content-Length")
                                .first()
                                .and_then(|v| v.parse::<usize>().ok());
                            self.state = match self.content_length {
                                Some(0) | None => State::Done,
                                Some(_) => State::Body,
                            };
                        } else {
                            self.parse_header_line(&line)?;
                        }
                    } else {
                        return Ok(());
                    }
                }
                State::Body => {
                    let want = self.content_length.unwrap_or(0);
                    if self.buf.len() >= want {
                        self.response.body = self.buf.drain(..want).collect();
                        self.state = State::Done;
                    } else {
                        return Ok(());
                    }
                }
                State::Done => return Ok(()),
            }
        }
    }

    /// Consumes and returns the parsed response, resetting the builder so
    /// it can be reused for the next response on the same connection (spec
    /// §3: "resettable for the next response").
    pub fn take(&mut self) -> HttpResponse {
        let response = std::mem::take(&mut self.response);
        *self = Self::new();
        response
    }

    fn take_line(&mut self) -> Result<Option<String>> {
        if let Some(pos) = self.buf.windows(2).position(|w| w == b"\r\n") {
            let line = self.buf.drain(..pos + 2).collect::<Vec<u8>>();
            let line = &line[..line.len() - 2];
            return Ok(Some(
                String::from_utf8(line.to_vec())
                    .map_err(|e| Error::with_source(ErrorKind::ProtocolError, e))?,
            ));
        }
        Ok(None)
    }

    fn parse_status_line(&mut self, line: &str) -> Result<()> {
        let mut parts = line.splitn(3, ' ');
        let _version = parts.next();
        let code = parts
            .next()
            .ok_or_else(|| Error::new(ErrorKind::ProtocolError))?;
        self.response.status_code = code
            .parse()
            .map_err(|_| Error::new(ErrorKind::ProtocolError))?;
        Ok(())
    }

    fn parse_header_line(&mut self, line: &str) -> Result<()> {
        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| Error::new(ErrorKind::ProtocolError))?;
        self.response.add_header(name.trim(), value.trim());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_200_connect_response() {
        let mut builder = HttpResponseBuilder::new();
        builder
            .process(b"HTTP/1.1 200 Connection Established\r\n\r\n")
            .unwrap();
        assert!(builder.done());
        let resp = builder.take();
        assert_eq!(resp.status_code, 200);
        assert!(resp.success());
    }

    #[test]
    fn done_flips_exactly_at_content_length() {
        let mut builder = HttpResponseBuilder::new();
        let head = b"HTTP/1.1 407 Proxy Authentication Required\r\nContent-Length: 5\r\n\r\n";
        builder.process(head).unwrap();
        assert!(!builder.done());
        builder.process(b"abc").unwrap();
        assert!(!builder.done());
        builder.process(b"de").unwrap();
        assert!(builder.done());
        assert_eq!(builder.take().body, b"abcde");
    }

    #[test]
    fn feeds_byte_at_a_time() {
        let mut builder = HttpResponseBuilder::new();
        let response = b"HTTP/1.1 200 OK\r\nX-A: 1\r\n\r\n";
        for byte in response {
            builder.process(&[*byte]).unwrap();
        }
        assert!(builder.done());
    }

    #[test]
    fn header_lookup_is_case_insensitive() {
        let mut builder = HttpResponseBuilder::new();
        builder
            .process(b"HTTP/1.1 407 Auth\r\nProxy-Authenticate: Digest realm=\"x\"\r\n\r\n")
            .unwrap();
        let resp = builder.take();
        assert!(resp.header_value_begins_with("proxy-authenticate", "Digest"));
    }
}
