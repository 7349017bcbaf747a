use crate::{
    env::Env,
    invoke::{Invocation, Outcome},
    project::Project,
};
use serde::Serialize;
use std::time::Duration;

static VERSION_TIMEOUT: Duration = Duration::from_secs(5);
static PLATFORM_LS_TIMEOUT: Duration = Duration::from_secs(10);

/// Installation status for one prerequisite tool. The version is the tool's
/// own trimmed output, unparsed.
#[derive(Debug, Eq, PartialEq, Serialize)]
pub struct ToolCheck {
    pub installed: bool,
    pub version: Option<String>,
}

impl ToolCheck {
    fn missing() -> Self {
        Self {
            installed: false,
            version: None,
        }
    }

    fn found(version: impl Into<String>) -> Self {
        Self {
            installed: true,
            version: Some(version.into()),
        }
    }
}

/// One [`ToolCheck`] per prerequisite, in the shape the `check` command
/// prints.
#[derive(Debug, Serialize)]
pub struct ToolchainReport {
    pub xcode: ToolCheck,
    pub cordova: ToolCheck,
    pub ios_platform: ToolCheck,
    pub node: ToolCheck,
}

/// Run a tool's version command against the deadline and report what we
/// learned. A missing executable, a non-zero exit, and a blown deadline all
/// read the same: not installed.
pub fn probe(env: &Env, name: &str, args: &[&str], timeout: Duration) -> ToolCheck {
    let outcome = Invocation::new(name, timeout)
        .with_args(args)
        .with_explicit_env(env)
        .run_and_capture();
    match outcome {
        Ok(Outcome::Completed(captured)) if captured.success() => {
            ToolCheck::found(captured.stdout().trim())
        }
        Ok(Outcome::Completed(captured)) => {
            log::info!(
                "`{} {}` exited with {:?}",
                name,
                args.join(" "),
                captured.status()
            );
            ToolCheck::missing()
        }
        Ok(Outcome::TimedOut { timeout }) => {
            log::info!(
                "`{} {}` didn't finish within {:?}",
                name,
                args.join(" "),
                timeout
            );
            ToolCheck::missing()
        }
        Err(err) => {
            log::info!("failed to probe for `{}`: {}", name, err);
            ToolCheck::missing()
        }
    }
}

fn check_ios_platform(project: &Project, env: &Env) -> ToolCheck {
    if !project.ios_platform_exists() {
        return ToolCheck::missing();
    }
    let outcome = Invocation::new("cordova", PLATFORM_LS_TIMEOUT)
        .with_args(&["platform", "ls", "ios"])
        .with_current_dir(project.root_dir())
        .with_explicit_env(env)
        .run_and_capture();
    match outcome {
        Ok(Outcome::Completed(captured)) if captured.success() => {
            ToolCheck::found(captured.stdout().trim())
        }
        // The platform dir is there even if the Cordova CLI can't tell us
        // anything about it.
        _ => ToolCheck::found("unknown"),
    }
}

pub fn check_toolchain(project: &Project, env: &Env) -> ToolchainReport {
    ToolchainReport {
        xcode: probe(env, "xcodebuild", &["-version"], VERSION_TIMEOUT),
        cordova: probe(env, "cordova", &["-v"], VERSION_TIMEOUT),
        ios_platform: check_ios_platform(project, env),
        node: probe(env, "node", &["--version"], VERSION_TIMEOUT),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn env() -> Env {
        Env::new().unwrap()
    }

    #[test]
    fn missing_executable_reads_as_not_installed() {
        let check = probe(
            &env(),
            "definitely-not-a-real-tool",
            &["--version"],
            VERSION_TIMEOUT,
        );
        assert_eq!(check, ToolCheck::missing());
    }

    #[cfg(unix)]
    #[test]
    fn blown_deadline_reads_as_not_installed() {
        let check = probe(&env(), "sleep", &["5"], Duration::from_millis(200));
        assert_eq!(check, ToolCheck::missing());
    }

    #[cfg(unix)]
    #[test]
    fn healthy_tool_reports_trimmed_version() {
        let check = probe(&env(), "echo", &["v1.2.3"], VERSION_TIMEOUT);
        assert_eq!(check, ToolCheck::found("v1.2.3"));
    }

    #[test]
    fn platform_check_without_platform_dir_is_not_installed() {
        let dir = tempfile::tempdir().unwrap();
        let project = Project::new(dir.path());
        assert_eq!(check_ios_platform(&project, &env()), ToolCheck::missing());
    }

    #[test]
    fn platform_check_degrades_to_unknown_when_cordova_is_unhelpful() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("platforms").join("ios")).unwrap();
        let project = Project::new(dir.path());
        // No (working) Cordova CLI in this environment, so the listing
        // fails; the platform dir alone decides `installed`.
        let check = check_ios_platform(&project, &env());
        assert!(check.installed);
    }
}
