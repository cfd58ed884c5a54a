//! Fixed upstream-block template, replacing the original's Jinja2 render
//! (`examples/original_source/controller/nginx.py`) with a plain format
//! string — there is exactly one shape of config this crate ever emits.

use std::fmt::Write as _;

/// One backend the upstream block should route to.
#[derive(Debug, Clone)]
pub struct UpstreamServer {
    pub host: String,
    pub port: u16,
}

pub fn render_upstream_config(app: &str, servers: &[UpstreamServer]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "upstream {app}_backend {{");
    for server in servers {
        let _ = writeln!(out, "    server {}:{};", server.host, server.port);
    }
    let _ = writeln!(out, "}}");
    let _ = writeln!(out);
    let _ = writeln!(out, "server {{");
    let _ = writeln!(out, "    listen 80;");
    let _ = writeln!(out, "    server_name {app}.local;");
    let _ = writeln!(out);
    let _ = writeln!(out, "    location / {{");
    let _ = writeln!(out, "        proxy_pass http://{app}_backend;");
    let _ = writeln!(out, "        proxy_set_header Host $host;");
    let _ = writeln!(out, "        proxy_set_header X-Real-IP $remote_addr;");
    let _ = writeln!(out, "    }}");
    let _ = writeln!(out, "}}");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_one_server_line_per_backend() {
        let servers = vec![
            UpstreamServer { host: "10.0.0.1".to_string(), port: 8080 },
            UpstreamServer { host: "10.0.0.2".to_string(), port: 8080 },
        ];
        let rendered = render_upstream_config("demo", &servers);
        assert_eq!(rendered.matches("server 10.0.0").count(), 2);
        assert!(rendered.contains("upstream demo_backend"));
        assert!(rendered.contains("proxy_pass http://demo_backend;"));
    }

    #[test]
    fn renders_empty_upstream_block_with_no_servers() {
        let rendered = render_upstream_config("demo", &[]);
        assert!(rendered.contains("upstream demo_backend {"));
        assert!(!rendered.contains("server "));
    }
}
