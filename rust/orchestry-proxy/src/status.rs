//! Parses nginx's `stub_status` text response (spec.md §4.4
//! `getProxyStatus`).

use serde::Serialize;

use crate::error::{ProxyError, Result};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProxyStatus {
    pub active_connections: u64,
    pub accepts: u64,
    pub handled: u64,
    pub requests: u64,
    pub reading: u64,
    pub writing: u64,
    pub waiting: u64,
}

/// Expected shape:
/// ```text
/// Active connections: 1
/// server accepts handled requests
///  5 5 10
/// Reading: 0 Writing: 1 Waiting: 0
/// ```
pub fn parse_stub_status(body: &str) -> Result<ProxyStatus> {
    let mut lines = body.lines();

    let active_connections = lines
        .next()
        .and_then(|l| l.rsplit(':').next())
        .and_then(|v| v.trim().parse().ok())
        .ok_or_else(|| ProxyError::StatusUnavailable("missing active connections line".to_string()))?;

    lines.next(); // "server accepts handled requests" header

    let counters_line = lines
        .next()
        .ok_or_else(|| ProxyError::StatusUnavailable("missing accepts/handled/requests line".to_string()))?;
    let mut counters = counters_line.split_whitespace();
    let accepts = parse_next(&mut counters)?;
    let handled = parse_next(&mut counters)?;
    let requests = parse_next(&mut counters)?;

    let rw_line = lines
        .next()
        .ok_or_else(|| ProxyError::StatusUnavailable("missing reading/writing/waiting line".to_string()))?;
    let (reading, writing, waiting) = parse_rw_line(rw_line)?;

    Ok(ProxyStatus {
        active_connections,
        accepts,
        handled,
        requests,
        reading,
        writing,
        waiting,
    })
}

fn parse_next<'a>(iter: &mut impl Iterator<Item = &'a str>) -> Result<u64> {
    iter.next()
        .and_then(|v| v.parse().ok())
        .ok_or_else(|| ProxyError::StatusUnavailable("malformed counter".to_string()))
}

fn parse_rw_line(line: &str) -> Result<(u64, u64, u64)> {
    let mut reading = None;
    let mut writing = None;
    let mut waiting = None;
    let tokens: Vec<&str> = line.split_whitespace().collect();
    for pair in tokens.chunks(2) {
        if let [label, value] = pair {
            let value: u64 = value
                .parse()
                .map_err(|_| ProxyError::StatusUnavailable(format!("malformed value for {label}")))?;
            match label.trim_end_matches(':') {
                "Reading" => reading = Some(value),
                "Writing" => writing = Some(value),
                "Waiting" => waiting = Some(value),
                _ => {}
            }
        }
    }
    match (reading, writing, waiting) {
        (Some(r), Some(w), Some(wa)) => Ok((r, w, wa)),
        _ => Err(ProxyError::StatusUnavailable("missing reading/writing/waiting fields".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_well_formed_stub_status_response() {
        let body = "Active connections: 3 \nserver accepts handled requests\n 10 10 25 \nReading: 0 Writing: 1 Waiting: 2 \n";
        let status = parse_stub_status(body).unwrap();
        assert_eq!(
            status,
            ProxyStatus {
                active_connections: 3,
                accepts: 10,
                handled: 10,
                requests: 25,
                reading: 0,
                writing: 1,
                waiting: 2,
            }
        );
    }

    #[test]
    fn rejects_truncated_response() {
        assert!(parse_stub_status("Active connections: 3").is_err());
    }
}
