use std::sync::OnceLock;

use crate::error::{ProxyError, Result};
use crate::template::UpstreamServer;

fn app_name_pattern() -> &'static regex::Regex {
    static PATTERN: OnceLock<regex::Regex> = OnceLock::new();
    PATTERN.get_or_init(|| regex::Regex::new(r"^[A-Za-z0-9_-]+$").expect("static pattern is valid"))
}

pub fn validate_app_name(app: &str) -> Result<()> {
    if app.is_empty() || !app_name_pattern().is_match(app) {
        return Err(ProxyError::InvalidAppName(app.to_string()));
    }
    Ok(())
}

pub fn validate_server(server: &UpstreamServer) -> Result<()> {
    if server.host.trim().is_empty() {
        return Err(ProxyError::InvalidServer(format!("empty host for port {}", server.port)));
    }
    if server.port == 0 {
        return Err(ProxyError::InvalidServer(format!("invalid port for host {}", server.host)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_alphanumeric_and_dash_underscore() {
        assert!(validate_app_name("my-app_2").is_ok());
    }

    #[test]
    fn rejects_slashes_and_dots() {
        assert!(validate_app_name("../etc").is_err());
        assert!(validate_app_name("app.name").is_err());
    }

    #[test]
    fn rejects_empty_host() {
        let server = UpstreamServer { host: "  ".to_string(), port: 8080 };
        assert!(validate_server(&server).is_err());
    }

    #[test]
    fn rejects_zero_port() {
        let server = UpstreamServer { host: "10.0.0.1".to_string(), port: 0 };
        assert!(validate_server(&server).is_err());
    }
}
