//! The circuit file (spec §6.2): one `host:port` per line, top-to-bottom
//! giving first-to-last hop order for [`ssf_circuit`]'s node list. Named
//! `--circuit-file`/`-b` on the original command line (`core/command_line/base.h`).

use std::fs;
use std::path::Path;

use ssf_error::{Error, ErrorKind, Result};

/// One hop, in the order it should be dialed.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CircuitNode {
    pub host: String,
    pub port: u16,
}

/// Parses `path` into an ordered hop list. A blank line is a parse error
/// (spec §6.2's explicit boundary behavior), not silently skipped.
pub fn read_circuit_file(path: &Path) -> Result<Vec<CircuitNode>> {
    let contents = fs::read_to_string(path).map_err(Error::from)?;
    parse(&contents)
}

fn parse(contents: &str) -> Result<Vec<CircuitNode>> {
    contents.lines().map(parse_line).collect()
}

fn parse_line(line: &str) -> Result<CircuitNode> {
    if line.trim().is_empty() {
        return Err(Error::new(ErrorKind::InvalidArgument));
    }
    let (host, port) = line
        .rsplit_once(':')
        .ok_or_else(|| Error::new(ErrorKind::InvalidArgument))?;
    let port: u16 = port
        .trim()
        .parse()
        .map_err(|_| Error::new(ErrorKind::InvalidArgument))?;
    Ok(CircuitNode {
        host: host.trim().to_string(),
        port,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ordered_hops() {
        let nodes = parse("relay1.example.com:443\nrelay2.example.com:8443\n").unwrap();
        assert_eq!(
            nodes,
            vec![
                CircuitNode { host: "relay1.example.com".to_string(), port: 443 },
                CircuitNode { host: "relay2.example.com".to_string(), port: 8443 },
            ]
        );
    }

    #[test]
    fn blank_line_is_invalid_argument() {
        let err = parse("relay1.example.com:443\n\nrelay2.example.com:8443\n").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn missing_port_is_invalid_argument() {
        let err = parse("relay1.example.com\n").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }
}
