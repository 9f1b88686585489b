//! # Gal
//!
//! A very simple static photo gallery generator. Point it at directories of
//! JPEGs and it writes a deployable site: every photo resized into a base and
//! a double-density variant, one shuffled index page, a stylesheet and a
//! `robots.txt` that keeps crawlers out.
//!
//! # Architecture: One Pass, Many Jobs
//!
//! A build is a single pass that first discovers all of its work and then
//! runs it:
//!
//! ```text
//! 1. Prepare    ensure output dirs / symlinks          (sequential, fail-fast)
//! 2. Register   walk sources → one job per photo,      (sequential)
//!               plus index, robots.txt, static assets
//! 3. Execute    run every job on a bounded pool        (parallel, fail-soft)
//! ```
//!
//! Jobs are independent: each one writes its own files and reports whether it
//! changed anything. A failing job never stops its siblings; the pass returns
//! every job's outcome and the caller decides what to do with the failures.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`job`] | `Job` (named unit of work) and the per-pass `JobRegistry` |
//! | [`scheduler`] | Runs jobs with bounded concurrency, collects an `OutcomeSet` |
//! | [`walk`] | Turns a source directory tree into photo jobs and index paths |
//! | [`build`] | The pass itself: preconditions, registration, execution |
//! | [`watch`] | Polls the sources and reruns the pass on change |
//! | [`imaging`] | External image pipeline: ImageMagick + MozJPEG behind `ImageBackend` |
//! | [`cache`] | Content-addressed cache so unchanged photos are not re-encoded |
//! | [`render`] | Index page (Maud) and `robots.txt` |
//! | [`files`] | Directory, symlink and static-asset primitives used as job bodies |
//! | [`config`] | Explicit `BuildConfig`, environments, tool path resolution |
//! | [`output`] | CLI formatting of pass outcomes |
//!
//! # Design Decisions
//!
//! ## No Global State
//!
//! Everything a pass needs arrives through a [`config::BuildConfig`] value and
//! an [`imaging::ImageBackend`] handle. Job closures capture owned copies of
//! exactly the paths they work on, so nothing is shared between jobs except
//! the backend and the cache, both of which are `Sync`.
//!
//! ## Delegated Imaging
//!
//! Pixels never pass through this crate. ImageMagick does the resize and crop,
//! MozJPEG does the encoding. The `image` crate is only used to read JPEG
//! headers when choosing between portrait, landscape and square crops.
//!
//! ## Maud Over Template Engines
//!
//! HTML is generated with [Maud](https://maud.lambda.xyz/), so there is no
//! template directory to ship or keep in sync with the binary. The only
//! difference between production and development builds is how the stylesheet
//! reaches the target directory.

pub mod build;
pub mod cache;
pub mod config;
pub mod files;
pub mod imaging;
pub mod job;
pub mod output;
pub mod render;
pub mod scheduler;
pub mod walk;
pub mod watch;

#[cfg(test)]
pub(crate) mod test_helpers;
