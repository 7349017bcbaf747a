use crate::{
    env::Env,
    invoke::{Invocation, Outcome},
    project::Project,
};
use std::{fs, io, time::Duration};
use thiserror::Error;

static CLEAN_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum Error {
    #[error("Failed to remove build directory: {0}")]
    RemoveFailed(#[source] io::Error),
}

/// Best-effort `cordova clean ios`, then remove the build output directory.
/// The Cordova CLI failing (or missing entirely) doesn't stop the removal.
pub fn clean(project: &Project, env: &Env) -> Result<(), Error> {
    let outcome = Invocation::new("cordova", CLEAN_TIMEOUT)
        .with_args(&["clean", "ios"])
        .with_current_dir(project.root_dir())
        .with_explicit_env(env)
        .run_and_capture();
    match outcome {
        Ok(Outcome::Completed(captured)) if captured.success() => {}
        Ok(Outcome::Completed(captured)) => {
            log::warn!("`cordova clean ios` exited with {:?}", captured.status())
        }
        Ok(Outcome::TimedOut { timeout }) => {
            log::warn!("`cordova clean ios` didn't finish within {:?}", timeout)
        }
        Err(err) => log::warn!("failed to run `cordova clean ios`: {}", err),
    }
    let build_dir = project.build_dir();
    if build_dir.exists() {
        fs::remove_dir_all(&build_dir).map_err(Error::RemoveFailed)?;
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn removes_build_dir_even_when_cordova_fails() {
        let dir = tempfile::tempdir().unwrap();
        let build_dir = dir.path().join("build");
        fs::create_dir_all(build_dir.join("DerivedData")).unwrap();
        fs::write(build_dir.join("DerivedData").join("junk"), b"junk").unwrap();
        let project = Project::new(dir.path());
        // There's no Cordova project here (and likely no Cordova CLI), so
        // the clean command can only fail; removal still has to happen.
        clean(&project, &Env::new().unwrap()).unwrap();
        assert!(!build_dir.exists());
    }

    #[test]
    fn missing_build_dir_is_fine() {
        let dir = tempfile::tempdir().unwrap();
        let project = Project::new(dir.path());
        clean(&project, &Env::new().unwrap()).unwrap();
    }
}
