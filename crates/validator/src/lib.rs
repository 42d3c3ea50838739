//! Post-prerender checks of the written HTML.

pub mod meta;

pub use meta::{PageCheck, check_artifact};

use folio_core::Worklist;
use std::path::Path;

#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub info: Vec<String>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Check the artifact of every route in `worklist` under `dist`.
pub fn verify_worklist(dist: &Path, worklist: &Worklist) -> ValidationReport {
    let mut report = ValidationReport::default();

    for route in worklist.routes() {
        let path = dist.join(&route.output);
        let check = match check_artifact(&path) {
            Ok(check) => check,
            Err(e) => {
                report.errors.push(format!(
                    "{}: cannot read {}: {}",
                    route.path,
                    path.display(),
                    e
                ));
                continue;
            }
        };

        let is_post = route.is_post();
        let missing = check.missing_required(is_post);
        if !missing.is_empty() {
            report
                .errors
                .push(format!("{}: missing {}", route.path, missing.join(", ")));
        }

        let recommended = check.missing_recommended(is_post);
        if !recommended.is_empty() {
            report.warnings.push(format!(
                "{}: no {}",
                route.path,
                recommended.join(", ")
            ));
        }

        if let Some(title) = &check.title {
            report.info.push(format!("{}: \"{}\"", route.path, title));
        }
        tracing::debug!(route = %route.path, ?missing, "checked artifact");
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_core::StaticRoute;
    use folio_core::content::parse_document;
    use std::fs;
    use tempfile::TempDir;

    const COMPLETE: &str = r#"<title>Home</title>
<meta name="description" content="d">
<meta property="og:title" content="t">
<meta property="og:description" content="d">
<meta property="og:url" content="https://example.com/">
<link rel="canonical" href="https://example.com/">"#;

    fn worklist() -> Worklist {
        let post = parse_document(
            Path::new("home-lab.md"),
            "---\ntitle: Home Lab\nslug: home-lab-setup\n---\nBody\n",
        )
        .unwrap()
        .unwrap();
        Worklist::build(&[StaticRoute::new("/", "Home")], &[post])
    }

    fn write(dir: &Path, rel: &str, html: &str) {
        let path = dir.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, html).unwrap();
    }

    #[test]
    fn test_missing_artifact_is_error() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "index.html", COMPLETE);

        let report = verify_worklist(dir.path(), &worklist());
        assert!(!report.is_valid());
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].starts_with("/blog/home-lab-setup: cannot read"));
    }

    #[test]
    fn test_post_needs_sharing_tags() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "index.html", COMPLETE);
        write(dir.path(), "blog/home-lab-setup/index.html", COMPLETE);

        let report = verify_worklist(dir.path(), &worklist());
        assert_eq!(
            report.errors,
            vec!["/blog/home-lab-setup: missing og:image, twitter:card"]
        );
        assert_eq!(
            report.warnings,
            vec!["/blog/home-lab-setup: no twitter:image"]
        );
        assert_eq!(report.info.len(), 2);
    }

    #[test]
    fn test_complete_site_is_valid() {
        let dir = TempDir::new().unwrap();
        let post = format!(
            "{COMPLETE}\n<meta property=\"og:image\" content=\"https://example.com/a.png\">\n<meta name=\"twitter:card\" content=\"summary\">\n<meta name=\"twitter:image\" content=\"https://example.com/a.png\">"
        );
        write(dir.path(), "index.html", COMPLETE);
        write(dir.path(), "blog/home-lab-setup/index.html", &post);

        let report = verify_worklist(dir.path(), &worklist());
        assert!(report.is_valid());
        assert!(report.warnings.is_empty());
    }
}
