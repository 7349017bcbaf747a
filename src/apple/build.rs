use super::scheme_list::scheme_list;
use crate::{
    env::Env,
    invoke::{self, Captured, Invocation, Outcome},
    opts::{NoiseLevel, Profile},
    project::Project,
};
use serde::Serialize;
use std::{path::PathBuf, time::Duration};
use thiserror::Error;

static BUILD_TIMEOUT: Duration = Duration::from_secs(600);

fn verbosity(noise_level: NoiseLevel) -> Option<&'static str> {
    if noise_level.pedantic() {
        None
    } else {
        Some("-quiet")
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("iOS platform not added")]
    PlatformMissing,
    #[error("No .xcworkspace found")]
    WorkspaceMissing,
    #[error("No scheme available")]
    NoSchemeAvailable,
    #[error("Build failed")]
    BuildFailed { output: Box<Captured> },
    #[error("Build timeout")]
    TimedOut { timeout: Duration },
    #[error(transparent)]
    InvocationFailed(#[from] invoke::Error),
}

impl Error {
    /// Captured output for the failure report, when the build ran at all.
    pub fn captured(&self) -> Option<&Captured> {
        match self {
            Self::BuildFailed { output } => Some(output),
            _ => None,
        }
    }
}

/// What a successful build leaves you with.
#[derive(Debug, Serialize)]
pub struct Built {
    pub build_type: &'static str,
    pub scheme: String,
    pub workspace: PathBuf,
    pub stdout: String,
}

/// Build the platform project via `xcodebuild`, with all output routed to an
/// isolated derived-data dir under the project's `build/` directory. An
/// unset scheme resolves to the first discovered one; the workspace check
/// comes first, so a misconfigured project fails before `xcodebuild` is ever
/// spawned for a build.
pub fn build(
    project: &Project,
    env: &Env,
    noise_level: NoiseLevel,
    profile: Profile,
    scheme: Option<String>,
    destination: Option<String>,
) -> Result<Built, Error> {
    if !project.ios_platform_exists() {
        return Err(Error::PlatformMissing);
    }
    let workspace = project.workspace().ok_or(Error::WorkspaceMissing)?;
    let workspace_name = workspace
        .file_name()
        .map(|name| name.to_owned())
        .ok_or(Error::WorkspaceMissing)?;
    let scheme = match scheme {
        Some(scheme) => scheme,
        None => scheme_list(project, env)
            .into_iter()
            .next()
            .ok_or(Error::NoSchemeAvailable)?,
    };
    let mut invocation = Invocation::new("xcodebuild", BUILD_TIMEOUT)
        .with_args(verbosity(noise_level))
        .with_arg("-workspace")
        .with_arg(&workspace_name)
        .with_args(&["-scheme", &scheme])
        .with_args(&["-configuration", profile.configuration()])
        .with_arg("-derivedDataPath")
        .with_arg(project.derived_data_dir())
        .with_current_dir(project.ios_dir())
        .with_explicit_env(env);
    if let Some(destination) = &destination {
        invocation = invocation.with_args(&["-destination", destination]);
    }
    let invocation = invocation.with_arg("build");
    log::info!("building with: {}", invocation.display());
    match invocation.run_and_capture()? {
        Outcome::Completed(captured) if captured.success() => Ok(Built {
            build_type: profile.as_str(),
            scheme,
            workspace,
            stdout: captured.into_stdout(),
        }),
        Outcome::Completed(captured) => Err(Error::BuildFailed {
            output: Box::new(captured),
        }),
        Outcome::TimedOut { timeout } => Err(Error::TimedOut { timeout }),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::fs;

    fn env() -> Env {
        Env::new().unwrap()
    }

    #[test]
    fn missing_platform_fails_first() {
        let dir = tempfile::tempdir().unwrap();
        let project = Project::new(dir.path());
        let err = build(
            &project,
            &env(),
            NoiseLevel::Polite,
            Profile::Debug,
            None,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, Error::PlatformMissing));
    }

    #[test]
    fn missing_workspace_fails_without_running_xcodebuild() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("platforms").join("ios")).unwrap();
        let project = Project::new(dir.path());
        // If this ever reached the toolchain, it'd surface as a spawn
        // failure instead on a machine without `xcodebuild`.
        let err = build(
            &project,
            &env(),
            NoiseLevel::Polite,
            Profile::Debug,
            None,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, Error::WorkspaceMissing));
    }
}
