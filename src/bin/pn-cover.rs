use std::fs;
use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use log::debug;

use pn_cover::analysis::CoverabilityBuilder;
use pn_cover::config::AnalysisConfig;
use pn_cover::net::io::to_json_string;
use pn_cover::net::load_net;
use pn_cover::options::{Options, OutputFormat};
use pn_cover::report::{CoverabilityReport, render_tree, tree_to_dot};

fn main() -> Result<()> {
    if std::env::var("PN_LOG").is_ok() {
        let e = env_logger::Env::new()
            .filter("PN_LOG")
            .write_style("PN_LOG_STYLE");
        env_logger::init_from_env(e);
    }

    let mut flags = shellwords::split(&std::env::var("PN_COVER_FLAGS").unwrap_or_default())
        .context("Failed to split PN_COVER_FLAGS")?;
    flags.extend(std::env::args().skip(1));
    let options = Options::parse_from_args(&flags).map_err(|e| anyhow::anyhow!("{e}"))?;
    debug!("pn-cover options: {:?}", options);

    let mut config = AnalysisConfig::load_from_file(&options.config)?;
    if let Some(limit) = options.node_limit {
        config.node_limit = limit;
    }
    if options.hide_tags {
        config.show_tags = false;
    }
    debug!("analysis config: {:?}", config);

    let net = load_net(&options.net)
        .with_context(|| format!("Failed to load net: {:?}", options.net))?;
    net.log_diagnostics();
    if let Some(path) = &options.net_dot {
        net.write_dot(path)
            .with_context(|| format!("Failed to write net DOT: {:?}", path))?;
    }

    let start = Instant::now();
    let tree = CoverabilityBuilder::new(&net)
        .with_node_limit(config.node_limit)
        .build();
    let elapsed = start.elapsed();

    let render = config.render_options();
    let output = match options.format {
        OutputFormat::Text => {
            let report = CoverabilityReport::new(&net, &tree, elapsed);
            format!("{}\n{}", render_tree(&tree, &net, &render), report)
        }
        OutputFormat::Dot => tree_to_dot(&tree, &net, &render),
        OutputFormat::Stats => to_json_string(&CoverabilityReport::new(&net, &tree, elapsed))?,
    };

    match &options.output {
        Some(path) => write_output(path, &output)?,
        None => print!("{}", output),
    }
    Ok(())
}

fn write_output(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content).with_context(|| format!("Failed to write output: {:?}", path))
}
