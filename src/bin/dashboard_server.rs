//! Dashboard JSON server.
//!
//! Serves chart data for the front end. The registry and its cross-check
//! reports are computed once at startup; each view request gets its own
//! controller.
//! Run with: cargo run --bin dashboard_server

use anyhow::{Context, Result};
use collabnet_dash::logging::{log, obj, v_str, Domain, Level};
use collabnet_dash::series::{build_chart, ChartId};
use collabnet_dash::verify::invariants::{cross_check_invariants, report_violations, ViolationReport};
use collabnet_dash::{Config, Dashboard, Registry};
use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::sync::Arc;

/// Loaded once at startup and shared by every request.
struct ServerState {
    registry: Arc<Registry>,
    violations: Arc<Vec<ViolationReport>>,
    cfg: Config,
}

impl ServerState {
    fn new(registry: Registry, cfg: Config) -> Self {
        let violations = cross_check_invariants(&registry, cfg.tolerances());
        report_violations(&violations);
        Self {
            registry: Arc::new(registry),
            violations: Arc::new(violations),
            cfg,
        }
    }
}

fn respond(state: &ServerState, request: &str) -> (&'static str, String) {
    let path = request.split_whitespace().nth(1).unwrap_or("/");
    if !request.starts_with("GET ") {
        return ("405 METHOD NOT ALLOWED", json!({"error": "method not allowed"}).to_string());
    }
    let registry = &state.registry;

    match path {
        "/api/health" => ("200 OK", json!({"status": "ok"}).to_string()),
        "/api/sections" => match state.cfg.section_defs() {
            Ok(sections) => ("200 OK", json!(sections).to_string()),
            Err(err) => ("500 INTERNAL SERVER ERROR", json!({"error": err.to_string()}).to_string()),
        },
        "/api/summary" => (
            "200 OK",
            json!({
                "fingerprint": registry.fingerprint(),
                "summary": registry.network_summary(),
                "published": registry.published_metrics(),
                "inconsistent": !state.violations.is_empty(),
            })
            .to_string(),
        ),
        "/api/violations" => ("200 OK", json!(state.violations.as_slice()).to_string()),
        p if p.starts_with("/api/chart/") => match ChartId::parse(&p["/api/chart/".len()..]) {
            Some(id) => ("200 OK", json!(build_chart(registry, id, state.cfg.top_n)).to_string()),
            None => ("404 NOT FOUND", json!({"error": "unknown chart"}).to_string()),
        },
        p if p.starts_with("/api/view/") => {
            let controller = match state.cfg.view_controller() {
                Ok(c) => c,
                Err(err) => return ("500 INTERNAL SERVER ERROR", json!({"error": err.to_string()}).to_string()),
            };
            let mut dashboard = Dashboard::with_violations(
                registry.clone(),
                controller,
                state.violations.clone(),
                state.cfg.top_n,
            );
            let section = &p["/api/view/".len()..];
            match dashboard.select(section) {
                Ok(()) => ("200 OK", json!(dashboard.view()).to_string()),
                Err(err) => ("404 NOT FOUND", json!({"error": err.to_string()}).to_string()),
            }
        }
        _ => ("404 NOT FOUND", json!({"error": "not found"}).to_string()),
    }
}

fn main() -> Result<()> {
    let cfg = Config::from_env();
    let registry = cfg.load_registry().context("loading dataset")?;
    let state = ServerState::new(registry, cfg);
    let cfg = &state.cfg;
    let listener = TcpListener::bind(format!("127.0.0.1:{}", cfg.port))
        .with_context(|| format!("binding port {}", cfg.port))?;

    log(
        Level::Info,
        Domain::System,
        "listening",
        obj(&[
            ("addr", v_str(&format!("http://localhost:{}", cfg.port))),
            ("fingerprint", v_str(state.registry.fingerprint())),
        ]),
    );

    for stream in listener.incoming() {
        let mut stream = match stream {
            Ok(s) => s,
            Err(_) => continue,
        };

        let request = match BufReader::new(&stream).lines().next() {
            Some(Ok(line)) => line,
            _ => continue,
        };

        let (status, body) = respond(&state, &request);
        log(
            Level::Debug,
            Domain::System,
            "request",
            obj(&[("request", v_str(&request)), ("status", v_str(status))]),
        );

        let response = format!(
            "HTTP/1.1 {}\r\n\
             Content-Type: application/json\r\n\
             Access-Control-Allow-Origin: *\r\n\
             Content-Length: {}\r\n\r\n{}",
            status,
            body.len(),
            body
        );

        let _ = stream.write_all(response.as_bytes());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> ServerState {
        ServerState::new(Registry::canonical().unwrap(), Config::default())
    }

    fn body(state: &ServerState, request: &str) -> serde_json::Value {
        let (_, body) = respond(state, request);
        serde_json::from_str(&body).unwrap()
    }

    #[test]
    fn view_route_selects_section() {
        let state = setup();
        let (status, body) = respond(&state, "GET /api/view/topics HTTP/1.1");
        assert_eq!(status, "200 OK");
        let v: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(v["section"], "topics");
        assert_eq!(v["charts"][0]["id"], "top_topics");
    }

    #[test]
    fn unknown_section_is_404() {
        let state = setup();
        let (status, _) = respond(&state, "GET /api/view/bogus HTTP/1.1");
        assert_eq!(status, "404 NOT FOUND");
    }

    #[test]
    fn violations_route_lists_drift() {
        let state = setup();
        let v = body(&state, "GET /api/violations HTTP/1.1");
        assert_eq!(v.as_array().unwrap().len(), 3);
    }

    #[test]
    fn requests_reuse_startup_reports() {
        // Reports stored at startup are served as-is: an empty list stays
        // empty even though the canonical data has drift.
        let state = ServerState {
            registry: Arc::new(Registry::canonical().unwrap()),
            violations: Arc::new(Vec::new()),
            cfg: Config::default(),
        };
        for request in [
            "GET /api/health HTTP/1.1",
            "GET /api/sections HTTP/1.1",
            "GET /api/chart/top_topics HTTP/1.1",
        ] {
            respond(&state, request);
        }
        assert_eq!(body(&state, "GET /api/violations HTTP/1.1"), json!([]));
        assert_eq!(body(&state, "GET /api/summary HTTP/1.1")["inconsistent"], false);
        let view = body(&state, "GET /api/view/overview HTTP/1.1");
        assert_eq!(view["inconsistent"], false);
        assert_eq!(view["violations"], json!([]));
    }

    #[test]
    fn chart_route_builds_one_chart() {
        let state = setup();
        let v = body(&state, "GET /api/chart/country_funding HTTP/1.1");
        assert_eq!(v["id"], "country_funding");
        let (status, _) = respond(&state, "GET /api/chart/pie HTTP/1.1");
        assert_eq!(status, "404 NOT FOUND");
    }

    #[test]
    fn sections_route_lists_enabled_sections() {
        let state = setup();
        let v = body(&state, "GET /api/sections HTTP/1.1");
        assert_eq!(v.as_array().unwrap().len(), 3);
        assert_eq!(v[0]["id"], "overview");
    }
}
