use super::build::{self, build};
use crate::{
    env::Env,
    opts::{NoiseLevel, Profile},
    project::Project,
    util::archive,
};
use serde::Serialize;
use std::{
    fs, io,
    path::{Path, PathBuf},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    BuildFailed(#[from] build::Error),
    #[error("No .app file found")]
    AppBundleMissing { products_dir: PathBuf },
    #[error("Failed to stage Payload directory: {0}")]
    StagingFailed(#[source] io::Error),
    #[error(transparent)]
    ArchiveFailed(#[from] archive::Error),
    #[error("Failed to place {ipa_path:?}: {source}")]
    PlacementFailed { ipa_path: PathBuf, source: io::Error },
}

/// A packaged build: where the archive landed and what went into it.
#[derive(Debug, Serialize)]
pub struct Packaged {
    pub ipa_path: PathBuf,
    pub app_path: PathBuf,
    pub size: u64,
    pub size_mb: f64,
}

/// Build, then repackage the produced `.app` bundle as an installable
/// archive at `build/ipa/<scheme>_<build_type>.ipa`: a zip whose top level
/// is a `Payload/` folder containing the bundle, written with a `.zip` name
/// and renamed to the target extension. A failed build propagates untouched,
/// before any filesystem work happens.
pub fn package(
    project: &Project,
    env: &Env,
    noise_level: NoiseLevel,
    profile: Profile,
    scheme: Option<String>,
    destination: Option<String>,
) -> Result<Packaged, Error> {
    let built = build(project, env, noise_level, profile, scheme, destination)?;
    let products_dir = project.products_dir();
    let app_path = find_app_bundle(&products_dir, profile.configuration()).ok_or(
        Error::AppBundleMissing {
            products_dir: products_dir.clone(),
        },
    )?;
    let bundle_name = match app_path.file_name() {
        Some(name) => name.to_owned(),
        None => return Err(Error::AppBundleMissing { products_dir }),
    };
    let ipa_dir = project.ipa_dir();
    fs::create_dir_all(&ipa_dir).map_err(Error::StagingFailed)?;

    // The staging tree lives in a TempDir, so it's gone on every path out of
    // here, error or not.
    let staging = tempfile::Builder::new()
        .prefix("payload")
        .tempdir_in(project.build_dir())
        .map_err(Error::StagingFailed)?;
    let payload_dir = staging.path().join("Payload");
    archive::copy_dir(&app_path, &payload_dir.join(&bundle_name)).map_err(Error::StagingFailed)?;

    let file_stem = format!("{}_{}", built.scheme, built.build_type);
    let zip_path = ipa_dir.join(format!("{}.zip", file_stem));
    archive::zip_directory(staging.path(), &zip_path)?;
    let ipa_path = ipa_dir.join(format!("{}.ipa", file_stem));
    fs::rename(&zip_path, &ipa_path).map_err(|source| Error::PlacementFailed {
        ipa_path: ipa_path.clone(),
        source,
    })?;

    let size = fs::metadata(&ipa_path)
        .map_err(|source| Error::PlacementFailed {
            ipa_path: ipa_path.clone(),
            source,
        })?
        .len();
    Ok(Packaged {
        ipa_path,
        app_path,
        size,
        size_mb: (size as f64 / 1024.0 / 1024.0 * 100.0).round() / 100.0,
    })
}

/// First `.app` bundle beneath a configuration-specific products
/// subdirectory (`Debug`, `Debug-iphonesimulator`, ...). Name-sorted so the
/// first-match-wins rule is deterministic.
fn find_app_bundle(products_dir: &Path, configuration: &str) -> Option<PathBuf> {
    let entries = fs::read_dir(products_dir).ok()?;
    let mut config_dirs = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_dir()
                && path
                    .file_name()
                    .and_then(|name| name.to_str())
                    .map(|name| name.starts_with(configuration))
                    .unwrap_or(false)
        })
        .collect::<Vec<_>>();
    config_dirs.sort();
    for dir in config_dirs {
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(_) => continue,
        };
        let mut apps = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().map(|ext| ext == "app").unwrap_or(false))
            .collect::<Vec<_>>();
        apps.sort();
        if let Some(app) = apps.into_iter().next() {
            return Some(app);
        }
    }
    None
}
