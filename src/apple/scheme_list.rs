use crate::{
    env::Env,
    invoke::{Invocation, Outcome},
    project::Project,
};
use std::time::Duration;

static LIST_TIMEOUT: Duration = Duration::from_secs(10);

/// Scheme names from `xcodebuild -list` output: the indented lines following
/// the `Schemes:` marker, up to the first blank line.
pub fn parse_scheme_list(text: &str) -> Vec<String> {
    let mut schemes = Vec::new();
    let mut in_schemes = false;
    for line in text.lines() {
        let line = line.trim();
        if line.contains("Schemes:") {
            in_schemes = true;
            continue;
        }
        if in_schemes {
            if line.is_empty() {
                break;
            }
            schemes.push(line.to_owned());
        }
    }
    schemes
}

/// Ask `xcodebuild` for the platform project's schemes. Degrades to an empty
/// list on any failure.
pub fn scheme_list(project: &Project, env: &Env) -> Vec<String> {
    if !project.ios_platform_exists() {
        return Vec::new();
    }
    let mut invocation = Invocation::new("xcodebuild", LIST_TIMEOUT)
        .with_arg("-list")
        .with_current_dir(project.ios_dir())
        .with_explicit_env(env);
    if let Some(name) = project.xcodeproj().and_then(|path| {
        path.file_name().map(|name| name.to_owned())
    }) {
        invocation = invocation.with_arg("-project").with_arg(name);
    }
    match invocation.run_and_capture() {
        Ok(Outcome::Completed(captured)) if captured.success() => {
            parse_scheme_list(captured.stdout())
        }
        Ok(Outcome::Completed(captured)) => {
            log::warn!("`xcodebuild -list` exited with {:?}", captured.status());
            Vec::new()
        }
        Ok(Outcome::TimedOut { timeout }) => {
            log::warn!("`xcodebuild -list` didn't finish within {:?}", timeout);
            Vec::new()
        }
        Err(err) => {
            log::warn!("failed to list schemes: {}", err);
            Vec::new()
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use rstest::rstest;

    static LISTING: &str = r#"Information about project "HelloCordova":
    Targets:
        HelloCordova
        CordovaLib

    Build Configurations:
        Debug
        Release

    If no build configuration is specified and -scheme is not passed then "Release" is used.

    Schemes:
        HelloCordova
        CordovaLib

"#;

    static TRAILING: &str = "    Schemes:\n        Only\n\n    Targets:\n        Only\n";

    #[rstest(text, expected,
        case(LISTING, vec!["HelloCordova", "CordovaLib"]),
        case(TRAILING, vec!["Only"]),
        case("", vec![]),
        case("    Targets:\n        HelloCordova\n", vec![]),
        case("    Schemes:\n", vec![]),
    )]
    fn parses_schemes(text: &str, expected: Vec<&str>) {
        assert_eq!(parse_scheme_list(text), expected);
    }
}
