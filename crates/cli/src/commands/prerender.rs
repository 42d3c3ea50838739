use super::load_site;
use anyhow::{Context, Result};
use folio_prerender::{ChromeLauncher, Pipeline, PipelineSettings, ProcessLauncher};
use std::path::PathBuf;

/// Prerender every route into the output directory.
pub async fn run(config_path: PathBuf) -> Result<()> {
    println!("🚀 Starting prerender process...");

    let site = load_site(&config_path)?;
    let config = &site.config;

    if !config.paths.dist.is_dir() {
        anyhow::bail!(
            "Output directory does not exist: {}\nBuild the site before prerendering",
            config.paths.dist.display()
        );
    }

    println!("   Output: {}", config.paths.dist.display());
    println!(
        "   Routes: {} static, {} blog posts",
        site.worklist.static_routes().count(),
        site.worklist.blog_routes().count()
    );
    println!();

    let command = match &config.server.command {
        Some(command) => command.clone(),
        None => builtin_server_command()?,
    };

    let mut pipeline = Pipeline::new(
        PipelineSettings::from_config(config),
        Box::new(ProcessLauncher::new(command, &config.server)),
        Box::new(ChromeLauncher::new(&config.browser)),
    )?;

    let report = pipeline.run(&site.worklist).await?;

    println!(
        "\n✓ Prerendering complete! {} routes ({} changed) in {:.1}s",
        report.rendered.len(),
        report.changed(),
        report.elapsed.as_secs_f64()
    );

    Ok(())
}

/// `folio serve {dir} --port {port}` through this same executable
fn builtin_server_command() -> Result<Vec<String>> {
    let exe = std::env::current_exe().context("Failed to locate the folio executable")?;
    Ok(vec![
        exe.display().to_string(),
        "serve".to_string(),
        "{dir}".to_string(),
        "--port".to_string(),
        "{port}".to_string(),
    ])
}
