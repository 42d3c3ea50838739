use crate::types::{Document, Route, RouteKind, StaticRoute};
use std::path::PathBuf;

/// Map a route path to its artifact location relative to the output tree.
///
/// `/` becomes `index.html`, `/about` becomes `about/index.html` and
/// `/blog/<slug>` becomes `blog/<slug>/index.html`.
pub fn output_for_path(path: &str) -> PathBuf {
    let mut output = PathBuf::new();
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        output.push(segment);
    }
    output.push("index.html");
    output
}

/// Ordered list of routes to prerender: static pages first, then posts.
#[derive(Debug, Clone, Default)]
pub struct Worklist {
    routes: Vec<Route>,
}

impl Worklist {
    pub fn build(static_routes: &[StaticRoute], documents: &[Document]) -> Self {
        let statics = static_routes.iter().map(|r| Route {
            path: r.path.clone(),
            output: r.output.clone(),
            label: r.label.clone(),
            kind: RouteKind::Static,
        });

        let posts = documents.iter().map(|doc| {
            let path = format!("/blog/{}", doc.meta.slug);
            Route {
                output: output_for_path(&path),
                path,
                label: if doc.meta.title.is_empty() {
                    doc.meta.slug.clone()
                } else {
                    doc.meta.title.clone()
                },
                kind: RouteKind::Post {
                    slug: doc.meta.slug.clone(),
                },
            }
        });

        Self {
            routes: statics.chain(posts).collect(),
        }
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn static_routes(&self) -> impl Iterator<Item = &Route> {
        self.routes.iter().filter(|r| !r.is_post())
    }

    pub fn blog_routes(&self) -> impl Iterator<Item = &Route> {
        self.routes.iter().filter(|r| r.is_post())
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
