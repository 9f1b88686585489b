//! Page rendering: the index page and `robots.txt`.
//!
//! ## Index page
//!
//! The index is a single grid of every photo in the gallery. Its order is
//! reshuffled on every render, so repeat visitors see the collection from a
//! different angle each build. The shuffle uses an explicitly seeded RNG:
//! a time-based seed by default, a fixed one (`--seed`) when reproducible
//! output is wanted. The seed is logged at DEBUG either way.
//!
//! Each photo renders as a 1x image with a `2x` srcset candidate pointing at
//! the double-density variant:
//!
//! ```html
//! <img src="photos/2023/a.jpg" srcset="photos/2023/a@2x.jpg 2x" loading="lazy">
//! ```
//!
//! ## HTML Generation
//!
//! Uses [maud](https://maud.lambda.xyz/): [`layout`] is the document shell and
//! [`index_content`] the page body. Photo paths arrive already URL-escaped;
//! maud only HTML-escapes them.

use crate::files;
use crate::job::{JobError, JobResult};
use maud::{DOCTYPE, Markup, html};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;

/// Disallow every crawler.
pub const ROBOTS_TXT: &str = "User-agent: *\nDisallow: /\n";

const STYLESHEET: &str = "assets/css/main.css";

/// Insert `@2x` before the extension of the last path segment.
///
/// ```
/// # use gal::render::to_2x;
/// assert_eq!(to_2x("photos/2023/a.jpg"), "photos/2023/a@2x.jpg");
/// assert_eq!(to_2x("photos/v1.0/noext"), "photos/v1.0/noext@2x");
/// ```
pub fn to_2x(path: &str) -> String {
    let name_start = path.rfind('/').map(|i| i + 1).unwrap_or(0);
    match path[name_start..].rfind('.') {
        Some(dot) if dot > 0 => {
            let at = name_start + dot;
            format!("{}@2x{}", &path[..at], &path[at..])
        }
        _ => format!("{path}@2x"),
    }
}

/// Seed for the index shuffle: `fixed` if given, otherwise the current time.
pub fn shuffle_seed(fixed: Option<u64>) -> u64 {
    fixed.unwrap_or_else(|| {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or_default()
    })
}

/// A shuffled copy of `paths`. Every entry appears exactly once.
pub fn shuffle_photos(paths: &[String], seed: u64) -> Vec<String> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut shuffled = paths.to_vec();
    shuffled.shuffle(&mut rng);
    shuffled
}

/// Renders the base HTML document structure.
pub fn layout(title: &str, content: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                meta name="robots" content="noindex";
                title { (title) }
                link rel="stylesheet" href=(STYLESHEET);
            }
            body {
                (content)
            }
        }
    }
}

/// Renders the photo grid, in the order given.
pub fn index_content(photo_paths: &[String]) -> Markup {
    html! {
        main.photos {
            @for path in photo_paths {
                a.photo href=(to_2x(path)) {
                    img src=(path) srcset={ (to_2x(path)) " 2x" } loading="lazy";
                }
            }
        }
        footer {
            (photo_paths.len()) " photos"
        }
    }
}

pub fn render_index(photo_paths: &[String], seed: u64) -> Markup {
    let shuffled = shuffle_photos(photo_paths, seed);
    layout("Gallery", index_content(&shuffled))
}

/// Job body: render `<target>/index.html`, shuffling at execution time.
pub fn write_index(target_dir: &Path, photo_paths: &[String], seed: Option<u64>) -> JobResult {
    let seed = shuffle_seed(seed);
    debug!("Shuffling {} photos with seed {}", photo_paths.len(), seed);
    let markup = render_index(photo_paths, seed);
    let path = target_dir.join("index.html");
    files::write_if_changed(&path, markup.into_string().as_bytes()).map_err(|e| JobError::io(&path, e))
}

/// Job body: write `<target>/robots.txt`.
pub fn write_robots_txt(target_dir: &Path) -> JobResult {
    let path = target_dir.join("robots.txt");
    files::write_if_changed(&path, ROBOTS_TXT.as_bytes()).map_err(|e| JobError::io(&path, e))
}
