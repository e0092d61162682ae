use anyhow::{Context, Result};
use collabnet_dash::dashboard::render_text;
use collabnet_dash::logging::{log, obj, v_str, Domain, Level};
use collabnet_dash::{Config, Dashboard};
use std::sync::Arc;

fn main() -> Result<()> {
    let mut text = false;
    let mut section: Option<String> = None;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--text" => text = true,
            other => section = Some(other.to_string()),
        }
    }

    let cfg = Config::from_env();
    let registry = Arc::new(cfg.load_registry().context("loading dataset")?);
    let mut dashboard = Dashboard::session(registry, &cfg).context("section config")?;

    if let Some(section) = &section {
        dashboard.select(section)?;
    }
    log(
        Level::Info,
        Domain::System,
        "render",
        obj(&[
            ("section", v_str(dashboard.current_section())),
            ("fingerprint", v_str(dashboard.registry().fingerprint())),
        ]),
    );

    let view = dashboard.view();
    if text {
        print!("{}", render_text(&view));
    } else {
        println!("{}", serde_json::to_string_pretty(&view)?);
    }
    Ok(())
}
