use crate::{
    env::Env,
    invoke::{Invocation, Outcome},
    project::Project,
};
use serde::Serialize;
use std::{collections::BTreeMap, time::Duration};

static SHOW_DESTINATIONS_TIMEOUT: Duration = Duration::from_secs(30);
static DEVICE_PLATFORMS: &[&str] = &["iOS", "iOS Simulator"];

/// One parsed `-showdestinations` entry. Keys are whatever `xcodebuild`
/// printed (`platform`, `id`, `name`, `OS`, ...); values have surrounding
/// quotes stripped.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Destination(BTreeMap<String, String>);

impl Destination {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn platform(&self) -> Option<&str> {
        self.get("platform")
    }

    pub fn id(&self) -> Option<&str> {
        self.get("id")
    }

    fn is_device_target(&self) -> bool {
        self.platform()
            .map(|platform| DEVICE_PLATFORMS.contains(&platform))
            .unwrap_or(false)
    }
}

/// Destinations from `xcodebuild -showdestinations` output. Candidate lines
/// carry both a `platform=` and an `id=` token; tokens are comma-separated
/// `key=value` pairs, with the wrapping braces tolerated. Entries whose
/// platform isn't an iOS device or simulator are dropped.
pub fn parse_destination_list(text: &str) -> Vec<Destination> {
    let mut destinations = Vec::new();
    for line in text.lines() {
        if !(line.contains("platform=") && line.contains("id=")) {
            continue;
        }
        let mut entry = BTreeMap::new();
        for token in line.trim().split(", ") {
            if let Some((key, value)) = split_key_value(token) {
                entry.insert(key.to_owned(), value.to_owned());
            }
        }
        let destination = Destination(entry);
        if destination.is_device_target() {
            destinations.push(destination);
        }
    }
    destinations
}

fn split_key_value(token: &str) -> Option<(&str, &str)> {
    let idx = token.find('=')?;
    let key = token[..idx].trim().trim_start_matches('{').trim();
    let value = token[idx + 1..]
        .trim()
        .trim_end_matches('}')
        .trim()
        .trim_matches('"');
    if key.is_empty() {
        None
    } else {
        Some((key, value))
    }
}

/// Ask `xcodebuild` where the workspace can be built to. Degrades to an
/// empty list on any failure, including there being no workspace to ask
/// about.
pub fn destination_list(project: &Project, env: &Env) -> Vec<Destination> {
    let name = match project
        .workspace()
        .and_then(|path| path.file_name().map(|name| name.to_owned()))
    {
        Some(name) => name,
        None => return Vec::new(),
    };
    let outcome = Invocation::new("xcodebuild", SHOW_DESTINATIONS_TIMEOUT)
        .with_arg("-showdestinations")
        .with_arg("-workspace")
        .with_arg(&name)
        .with_current_dir(project.ios_dir())
        .with_explicit_env(env)
        .run_and_capture();
    match outcome {
        Ok(Outcome::Completed(captured)) if captured.success() => {
            parse_destination_list(captured.stdout())
        }
        Ok(Outcome::Completed(captured)) => {
            log::warn!(
                "`xcodebuild -showdestinations` exited with {:?}",
                captured.status()
            );
            Vec::new()
        }
        Ok(Outcome::TimedOut { timeout }) => {
            log::warn!(
                "`xcodebuild -showdestinations` didn't finish within {:?}",
                timeout
            );
            Vec::new()
        }
        Err(err) => {
            log::warn!("failed to list destinations: {}", err);
            Vec::new()
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use rstest::rstest;

    static OUTPUT: &str = r#"        Available destinations for the "HelloCordova" scheme:
                { platform=iOS, arch=arm64, id=00001111-AAAA, name=Franziska's iPhone }
                { platform=iOS Simulator, arch=arm64, id=SIM-1234, OS=17.2, name=iPhone 15 }
                { platform=macOS, arch=x86_64, id=MAC-5678, name=My Mac }
                { platform=iOS Simulator, arch=arm64, id=SIM-9999, OS=17.2, name="iPhone 15 Pro" }
"#;

    #[test]
    fn keeps_only_device_and_simulator_targets() {
        let destinations = parse_destination_list(OUTPUT);
        assert_eq!(destinations.len(), 3);
        assert!(destinations
            .iter()
            .all(|destination| destination.is_device_target()));
        assert_eq!(destinations[0].id(), Some("00001111-AAAA"));
        assert_eq!(destinations[1].get("OS"), Some("17.2"));
    }

    #[test]
    fn strips_braces_and_quotes() {
        let destinations = parse_destination_list(
            "{ platform=iOS Simulator, id=SIM-9999, name=\"iPhone 15 Pro\" }\n",
        );
        assert_eq!(destinations.len(), 1);
        assert_eq!(destinations[0].get("name"), Some("iPhone 15 Pro"));
        assert_eq!(destinations[0].platform(), Some("iOS Simulator"));
    }

    #[rstest(text,
        case(""),
        case("Available destinations for the \"HelloCordova\" scheme:\n"),
        case("{ platform=macOS, arch=x86_64, id=MAC-5678, name=My Mac }\n"),
        case("{ platform=iOS Simulator, name=no id on this line }\n"),
    )]
    fn uninteresting_output_parses_to_nothing(text: &str) {
        assert!(parse_destination_list(text).is_empty());
    }
}
