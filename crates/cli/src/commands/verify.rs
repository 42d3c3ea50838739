use super::load_site;
use anyhow::Result;
use folio_validator::verify_worklist;
use std::path::PathBuf;

/// Check every prerendered page for the tags crawlers and link previews read.
pub fn run(config_path: PathBuf) -> Result<()> {
    println!("🔍 Verifying meta tags on prerendered pages\n");

    let site = load_site(&config_path)?;
    let report = verify_worklist(&site.config.paths.dist, &site.worklist);

    for line in &report.info {
        println!("  {}", line);
    }
    for warning in &report.warnings {
        eprintln!("⚠ {}", warning);
    }
    for error in &report.errors {
        eprintln!("✗ {}", error);
    }

    println!();
    println!("{}", "=".repeat(80));
    if report.is_valid() {
        println!("✅ All {} pages have their essential meta tags", site.worklist.len());
        println!("{}", "=".repeat(80));
        Ok(())
    } else {
        println!("⚠️  {} pages have problems", report.errors.len());
        println!("{}", "=".repeat(80));
        anyhow::bail!("{} meta tag errors", report.errors.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::tests::scaffold;
    use tempfile::TempDir;

    #[test]
    fn test_fails_before_prerender() {
        let dir = TempDir::new().unwrap();
        scaffold(dir.path());

        let err = run(dir.path().join("folio.toml")).unwrap_err();
        assert_eq!(err.to_string(), "7 meta tag errors");
    }
}
