//! The HTTP CONNECT request/response types (spec §3 "HTTP response
//! builder", §6.5). Headers are case-insensitive and multi-valued, matching
//! `http_response.h`'s `map<string, list<string>>`.

use std::collections::HashMap;

#[derive(Clone, Debug, Default)]
pub struct HttpRequest {
    method: String,
    uri: String,
    headers: HashMap<String, String>,
    body: String,
}

impl HttpRequest {
    pub fn connect(host: &str, port: u16) -> Self {
        let uri = format!("{host}:{port}");
        let mut req = Self {
            method: "CONNECT".to_string(),
            uri: uri.clone(),
            headers: HashMap::new(),
            body: String::new(),
        };
        req.add_header("Host", &uri);
        req.add_header("Connection", "keep-alive");
        req
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn add_header(&mut self, name: &str, value: &str) {
        self.headers.insert(name.to_string(), value.to_string());
    }

    /// Serializes the request line, headers, and trailing blank line
    /// exactly as `HttpRequest::GenerateRequest` does.
    pub fn generate(&self) -> String {
        let mut out = format!("{} {} HTTP/1.1\r\n", self.method, self.uri);
        for (name, value) in &self.headers {
            out.push_str(&format!("{name}: {value}\r\n"));
        }
        out.push_str(&self.body);
        out.push_str("\r\n");
        out
    }
}

#[derive(Clone, Debug, Default)]
pub struct HttpResponse {
    pub status_code: u16,
    headers: HashMap<String, Vec<String>>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn header(&self, name: &str) -> &[String] {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn add_header(&mut self, name: &str, value: &str) {
        self.headers
            .entry(name.to_ascii_lowercase())
            .or_default()
            .push(value.to_string());
    }

    pub fn success(&self) -> bool {
        self.status_code == 200
    }

    pub fn redirected(&self) -> bool {
        matches!(self.status_code, 301 | 302)
    }

    pub fn authentication_required(&self) -> bool {
        matches!(self.status_code, 401 | 407)
    }

    pub fn header_value_begins_with(&self, name: &str, prefix: &str) -> bool {
        self.header(name)
            .iter()
            .any(|v| v.to_ascii_lowercase().starts_with(&prefix.to_ascii_lowercase()))
    }
}
