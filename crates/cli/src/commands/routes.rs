use super::load_site;
use anyhow::Result;
use folio_core::Route;
use std::path::PathBuf;

/// Print the worklist a prerender run would render.
pub fn run(config_path: PathBuf) -> Result<()> {
    let site = load_site(&config_path)?;
    print!("{}", render_listing(site.worklist.routes()));
    Ok(())
}

fn render_listing(routes: &[Route]) -> String {
    let width = routes.iter().map(|r| r.path.len()).max().unwrap_or(0);
    let mut out = String::new();

    let (posts, statics): (Vec<&Route>, Vec<&Route>) = routes.iter().partition(|r| r.is_post());
    for (heading, group) in [("Static pages", statics), ("Blog posts", posts)] {
        out.push_str(&format!("{} ({})\n", heading, group.len()));
        for route in group {
            out.push_str(&format!(
                "  {:<width$}  → {}  {}\n",
                route.path,
                route.output.display(),
                route.label,
                width = width
            ));
        }
    }
    out
}
