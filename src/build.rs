//! The build pass: preconditions, job registration, execution.
//!
//! ```text
//! 1. ensure <target>/assets and <target>/photos      (abort on failure)
//! 2. development: symlink <asset-dir>/css            (abort on failure)
//!    production:  register "static assets"
//! 3. walk every source root → photo jobs + paths     (abort on failure,
//!    or when two roots share a name and so an output directory)
//! 4. register "page: index" and "robots.txt"
//! 5. run everything on the scheduler
//! ```
//!
//! Steps 1–4 are strictly sequential and finish before any job starts. Once
//! step 5 begins every registered job runs; job failures land in the returned
//! [`OutcomeSet`] rather than in `Err`.

use crate::cache::{CacheManifest, PhotoCache};
use crate::config::{BuildConfig, ConfigError};
use crate::files;
use crate::imaging::ImageBackend;
use crate::job::{JobRegistry, RegistryError};
use crate::render;
use crate::scheduler::{self, OutcomeSet, ScheduleError};
use crate::walk::{self, PhotoPipeline, WalkContext, WalkError};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum BuildError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("could not prepare '{}': {source}", .path.display())]
    Precondition {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("source '{}': {source}", .root.display())]
    SourceRoot {
        root: PathBuf,
        #[source]
        source: WalkError,
    },
    #[error(
        "sources '{}' and '{}' would both be written to photos/{}",
        .first.display(),
        .second.display(),
        .name.display()
    )]
    RootCollision {
        first: PathBuf,
        second: PathBuf,
        name: PathBuf,
    },
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Schedule(#[from] ScheduleError),
}

fn precondition(path: &Path) -> impl FnOnce(io::Error) -> BuildError + '_ {
    move |source| BuildError::Precondition {
        path: path.to_path_buf(),
        source,
    }
}

fn source_root(root: &Path) -> impl FnOnce(WalkError) -> BuildError + '_ {
    move |source| match source {
        WalkError::Registry(e) => BuildError::Registry(e),
        source => BuildError::SourceRoot {
            root: root.to_path_buf(),
            source,
        },
    }
}

/// Split every source root, refusing roots whose photos would share an
/// output directory.
fn split_roots(roots: &[PathBuf]) -> Result<Vec<(&Path, PathBuf, PathBuf)>, BuildError> {
    let mut split: Vec<(&Path, PathBuf, PathBuf)> = Vec::with_capacity(roots.len());
    for root in roots {
        let (base, relative) = walk::split_source_root(root).map_err(source_root(root))?;
        if let Some((first, _, _)) = split.iter().find(|(_, _, name)| *name == relative) {
            return Err(BuildError::RootCollision {
                first: first.to_path_buf(),
                second: root.clone(),
                name: relative,
            });
        }
        split.push((root, base, relative));
    }
    Ok(split)
}

/// Run one full build pass.
pub fn build(config: &BuildConfig, backend: Arc<dyn ImageBackend>) -> Result<OutcomeSet, BuildError> {
    config.validate()?;
    let target = &config.target_dir;

    for dir in [target.join("assets"), target.join("photos")] {
        files::ensure_dir(&dir).map_err(precondition(&dir))?;
    }

    let mut registry = JobRegistry::new();

    if config.env.is_production() {
        let assets_target = target.clone();
        registry.register("static assets", move || {
            files::write_static_assets(&assets_target, files::STATIC_ASSETS)
        })?;
    } else {
        let css_source = config.asset_dir.join("css");
        let css_link = target.join("assets").join("css");
        files::ensure_symlink(&css_source, &css_link).map_err(precondition(&css_link))?;
    }

    let manifest = if config.use_cache {
        CacheManifest::load(target)
    } else {
        CacheManifest::empty()
    };
    let cache = Arc::new(PhotoCache::new(target, manifest));
    let pipeline = PhotoPipeline::new(backend).with_cache(Some(cache.clone()));
    let ctx = WalkContext {
        target_dir: target,
        pipeline: &pipeline,
    };

    let roots = split_roots(&config.source_dirs)?;
    let mut photo_paths = Vec::new();
    for (root, base, relative) in roots {
        let found = walk::walk(&base, &relative, &ctx, &mut registry).map_err(source_root(root))?;
        debug!("{}: {} photos", root.display(), found.len());
        photo_paths.extend(found);
    }

    let photo_paths: Arc<[String]> = photo_paths.into();
    let index_target = target.clone();
    let seed = config.shuffle_seed;
    registry.register("page: index", move || render::write_index(&index_target, &photo_paths, seed))?;

    let robots_target = target.clone();
    registry.register("robots.txt", move || render::write_robots_txt(&robots_target))?;

    let jobs = registry.drain();
    debug!("Registered {} jobs ({} build)", jobs.len(), config.env);
    let outcome = scheduler::run(jobs, config.concurrency)?;

    let stats = cache.stats();
    if stats.total() > 0 {
        info!("Photos: {stats}");
    }
    if let Err(e) = cache.save() {
        warn!("Could not save build cache in {}: {e}", target.display());
    }

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GalEnv;
    use crate::job::JobError;
    use crate::test_helpers::{RecordingBackend, test_config, write_tree};
    use std::fs;
    use tempfile::TempDir;

    fn backend() -> Arc<RecordingBackend> {
        Arc::new(RecordingBackend::with_dimensions(600, 900))
    }

    #[test]
    fn production_pass_writes_site() {
        let tmp = TempDir::new().unwrap();
        write_tree(tmp.path(), &["src/2023/a.jpg", "src/2023/trip/c.jpg"]);
        let config = test_config(tmp.path(), &["src/2023"]);

        let outcome = build(&config, backend()).unwrap();

        // 2 photos + static assets + index + robots
        assert_eq!(outcome.len(), 5);
        assert!(outcome.is_success());
        let public = tmp.path().join("public");
        assert!(public.join("index.html").is_file());
        assert!(public.join("robots.txt").is_file());
        assert!(public.join("assets/css/main.css").is_file());
        assert!(public.join("photos/2023/a.jpg").is_file());
        assert!(public.join("photos/2023/trip/c@2x.jpg").is_file());
        assert!(public.join(crate::cache::MANIFEST_FILENAME).is_file());
    }

    #[test]
    fn job_names_follow_registration_order() {
        let tmp = TempDir::new().unwrap();
        write_tree(tmp.path(), &["src/g/a.jpg"]);
        let config = test_config(tmp.path(), &["src/g"]);

        let outcome = build(&config, backend()).unwrap();

        let names: Vec<&str> = outcome.outcomes.iter().map(|o| o.name.as_str()).collect();
        let photo_job = format!("photo: {}", tmp.path().join("src/g/a.jpg").display());
        assert_eq!(names, vec!["static assets", photo_job.as_str(), "page: index", "robots.txt"]);
    }

    #[test]
    fn index_lists_photos_from_every_root() {
        let tmp = TempDir::new().unwrap();
        write_tree(tmp.path(), &["one/a.jpg", "two/b.jpg", "two/sub/c.JPG"]);
        let config = test_config(tmp.path(), &["one", "two"]);

        build(&config, backend()).unwrap();

        let html = fs::read_to_string(tmp.path().join("public/index.html")).unwrap();
        for path in ["photos/one/a.jpg", "photos/two/b.jpg", "photos/two/sub/c.JPG"] {
            assert!(html.contains(&format!("src=\"{path}\"")), "{path} missing");
        }
        assert!(html.contains("3 photos"));
    }

    #[test]
    fn empty_source_still_renders_pages() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("empty")).unwrap();
        let config = test_config(tmp.path(), &["empty"]);

        let outcome = build(&config, backend()).unwrap();

        assert_eq!(outcome.len(), 3);
        assert!(tmp.path().join("public/photos").is_dir());
        assert!(tmp.path().join("public/index.html").is_file());
    }

    #[test]
    fn missing_root_aborts_before_any_job() {
        let tmp = TempDir::new().unwrap();
        write_tree(tmp.path(), &["good/a.jpg"]);
        let config = test_config(tmp.path(), &["good", "missing"]);
        let backend = backend();

        let err = build(&config, backend.clone()).unwrap_err();

        assert!(
            matches!(err, BuildError::SourceRoot { ref root, .. } if root == &tmp.path().join("missing"))
        );
        assert!(backend.operations().is_empty());
        assert!(!tmp.path().join("public/index.html").exists());
    }

    #[test]
    fn roots_sharing_a_name_are_rejected() {
        let tmp = TempDir::new().unwrap();
        write_tree(tmp.path(), &["alice/2023/x.jpg", "bob/2023/x.jpg"]);
        let config = test_config(tmp.path(), &["alice/2023", "bob/2023"]);
        let backend = backend();

        let err = build(&config, backend.clone()).unwrap_err();

        match err {
            BuildError::RootCollision { first, second, name } => {
                assert_eq!(first, tmp.path().join("alice/2023"));
                assert_eq!(second, tmp.path().join("bob/2023"));
                assert_eq!(name, PathBuf::from("2023"));
            }
            other => panic!("expected RootCollision, got {other}"),
        }
        assert!(backend.operations().is_empty());
        assert!(!tmp.path().join("public/photos/2023").exists());
    }

    #[test]
    fn same_root_twice_is_rejected() {
        let tmp = TempDir::new().unwrap();
        write_tree(tmp.path(), &["src/a.jpg"]);
        let config = test_config(tmp.path(), &["src", "src"]);

        let err = build(&config, backend()).unwrap_err();

        assert!(matches!(err, BuildError::RootCollision { .. }));
        assert!(!tmp.path().join("public/index.html").exists());
    }

    #[test]
    fn unwritable_target_is_precondition_failure() {
        let tmp = TempDir::new().unwrap();
        write_tree(tmp.path(), &["src/a.jpg", "public"]);
        let config = test_config(tmp.path(), &["src"]);

        let err = build(&config, backend()).unwrap_err();

        assert!(
            matches!(err, BuildError::Precondition { ref path, .. } if path == &tmp.path().join("public/assets"))
        );
    }

    #[test]
    fn invalid_config_is_rejected_before_touching_disk() {
        let tmp = TempDir::new().unwrap();
        let mut config = test_config(tmp.path(), &["src"]);
        config.concurrency = 0;

        let err = build(&config, backend()).unwrap_err();

        assert!(matches!(err, BuildError::Config(ConfigError::InvalidConcurrency(0))));
        assert!(!tmp.path().join("public").exists());
    }

    #[test]
    fn failing_photo_does_not_stop_other_jobs() {
        let tmp = TempDir::new().unwrap();
        write_tree(tmp.path(), &["src/bad.jpg", "src/good.jpg"]);
        let config = test_config(tmp.path(), &["src"]);
        let backend = Arc::new(RecordingBackend::with_dimensions(600, 900).failing_on("bad.jpg"));

        let outcome = build(&config, backend).unwrap();

        assert_eq!(outcome.error_count(), 1);
        assert!(matches!(
            outcome.errors().next(),
            Some(JobError::Imaging { path, .. }) if path == &tmp.path().join("src/bad.jpg")
        ));
        assert!(tmp.path().join("public/photos/src/good.jpg").is_file());
        assert!(tmp.path().join("public/index.html").is_file());
    }

    #[test]
    fn second_pass_skips_unchanged_photos() {
        let tmp = TempDir::new().unwrap();
        write_tree(tmp.path(), &["src/a.jpg", "src/b.jpg"]);
        let config = test_config(tmp.path(), &["src"]);
        build(&config, backend()).unwrap();

        let second = backend();
        let outcome = build(&config, second.clone()).unwrap();

        assert!(second.operations().is_empty());
        let photo_changes = outcome
            .outcomes
            .iter()
            .filter(|o| o.name.starts_with("photo: ") && o.changed)
            .count();
        assert_eq!(photo_changes, 0);
    }

    #[test]
    fn no_cache_re_encodes_everything() {
        let tmp = TempDir::new().unwrap();
        write_tree(tmp.path(), &["src/a.jpg"]);
        let mut config = test_config(tmp.path(), &["src"]);
        build(&config, backend()).unwrap();

        config.use_cache = false;
        let second = backend();
        build(&config, second.clone()).unwrap();

        assert_eq!(second.resizes().len(), 2);
    }

    #[cfg(unix)]
    #[test]
    fn development_symlinks_css_instead_of_copying() {
        let tmp = TempDir::new().unwrap();
        write_tree(tmp.path(), &["src/a.jpg", "assets/css/main.css"]);
        let mut config = test_config(tmp.path(), &["src"]);
        config.env = GalEnv::Development;

        let outcome = build(&config, backend()).unwrap();

        let link = tmp.path().join("public/assets/css");
        assert!(fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
        assert!(outcome.outcomes.iter().all(|o| o.name != "static assets"));
    }

    #[test]
    fn development_without_asset_dir_is_precondition_failure() {
        let tmp = TempDir::new().unwrap();
        write_tree(tmp.path(), &["src/a.jpg"]);
        let mut config = test_config(tmp.path(), &["src"]);
        config.env = GalEnv::Development;

        let err = build(&config, backend()).unwrap_err();

        assert!(matches!(err, BuildError::Precondition { .. }));
    }
}
