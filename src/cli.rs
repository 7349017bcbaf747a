use crate::{
    apple::{build, clean, destination_list, package, scheme_list},
    doctor,
    env::{self, Env},
    opts,
    project::Project,
    util::cli::{Exec, ExecError, GlobalFlags, TextWrapper, SETTINGS},
    NAME,
};
use serde::Serialize;
use serde_json::{json, Value};
use std::{path::PathBuf, str::FromStr};
use structopt::StructOpt;
use thiserror::Error;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Command {
    Check,
    Schemes,
    Destinations,
    Build,
    Package,
    Clean,
}

impl Command {
    pub const NAME_LIST: &'static [&'static str] = &[
        "check",
        "schemes",
        "destinations",
        "build",
        "package",
        "clean",
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Check => "check",
            Self::Schemes => "schemes",
            Self::Destinations => "destinations",
            Self::Build => "build",
            Self::Package => "package",
            Self::Clean => "clean",
        }
    }
}

#[derive(Debug, Error)]
#[error("{command:?} isn't a recognized command")]
pub struct CommandInvalid {
    command: String,
}

impl FromStr for Command {
    type Err = CommandInvalid;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "check" => Ok(Self::Check),
            "schemes" => Ok(Self::Schemes),
            "destinations" => Ok(Self::Destinations),
            "build" => Ok(Self::Build),
            "package" => Ok(Self::Package),
            "clean" => Ok(Self::Clean),
            _ => Err(CommandInvalid {
                command: s.to_owned(),
            }),
        }
    }
}

#[derive(Debug, StructOpt)]
#[structopt(
    name = NAME,
    settings = SETTINGS,
    about = "Builds and packages Cordova iOS apps",
)]
pub struct Input {
    #[structopt(flatten)]
    flags: GlobalFlags,
    #[structopt(
        name = "project-dir",
        help = "Path to the Cordova project",
        parse(from_os_str)
    )]
    project_dir: PathBuf,
    #[structopt(
        name = "command",
        help = "What to do",
        default_value = "check",
        possible_values = Command::NAME_LIST,
    )]
    command: Command,
    #[structopt(
        long = "release",
        help = "Build with release optimizations",
        parse(from_flag = opts::Profile::from_flag),
    )]
    profile: opts::Profile,
    #[structopt(
        long = "scheme",
        help = "Xcode scheme (defaults to the first one listed)"
    )]
    scheme: Option<String>,
    #[structopt(long = "destination", help = "Build destination id")]
    destination: Option<String>,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    EnvInitFailed(#[from] env::Error),
    #[error("The `{command}` command reported failure")]
    OperationFailed { command: &'static str },
    #[error("Failed to serialize result: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}

impl ExecError for Error {}

/// Print a report object (a plain value, no `success` flag) to stdout.
fn emit(value: &impl Serialize) -> Result<(), Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Wrap an operation result in the `success` envelope, print it, and turn a
/// reported failure into a non-zero exit, so scripts don't have to parse
/// JSON just to notice that a build failed.
fn report(command: Command, result: Result<Value, Value>) -> Result<(), Error> {
    let (succeeded, body) = match result {
        Ok(body) => (true, body),
        Err(body) => (false, body),
    };
    let mut envelope = serde_json::Map::new();
    envelope.insert("success".to_owned(), Value::Bool(succeeded));
    if let Value::Object(fields) = body {
        envelope.extend(fields);
    }
    println!("{}", serde_json::to_string_pretty(&Value::Object(envelope))?);
    if succeeded {
        Ok(())
    } else {
        Err(Error::OperationFailed {
            command: command.as_str(),
        })
    }
}

fn build_failure_body(err: &build::Error) -> Value {
    let mut body = json!({ "error": err.to_string() });
    if let Some(output) = err.captured() {
        body["stdout"] = Value::String(output.stdout().to_owned());
        body["stderr"] = Value::String(output.stderr().to_owned());
    }
    body
}

fn package_failure_body(err: &package::Error) -> Value {
    match err {
        package::Error::BuildFailed(err) => build_failure_body(err),
        _ => json!({ "error": err.to_string() }),
    }
}

impl Exec for Input {
    type Error = Error;

    fn global_flags(&self) -> GlobalFlags {
        self.flags
    }

    fn exec(self, _wrapper: &TextWrapper) -> Result<(), Self::Error> {
        let Self {
            flags: GlobalFlags { noise_level },
            project_dir,
            command,
            profile,
            scheme,
            destination,
        } = self;
        let env = Env::new()?;
        let project = Project::new(&project_dir);
        match command {
            Command::Check => emit(&doctor::check_toolchain(&project, &env)),
            Command::Schemes => emit(&scheme_list::scheme_list(&project, &env)),
            Command::Destinations => {
                emit(&destination_list::destination_list(&project, &env))
            }
            Command::Build => {
                let result =
                    match build::build(&project, &env, noise_level, profile, scheme, destination)
                    {
                        Ok(built) => Ok(serde_json::to_value(built)?),
                        Err(err) => Err(build_failure_body(&err)),
                    };
                report(command, result)
            }
            Command::Package => {
                let result = match package::package(
                    &project,
                    &env,
                    noise_level,
                    profile,
                    scheme,
                    destination,
                ) {
                    Ok(packaged) => Ok(serde_json::to_value(packaged)?),
                    Err(err) => Err(package_failure_body(&err)),
                };
                report(command, result)
            }
            Command::Clean => {
                let result = clean::clean(&project, &env)
                    .map(|()| json!({}))
                    .map_err(|err| json!({ "error": err.to_string() }));
                report(command, result)
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn command_names_round_trip() {
        for name in Command::NAME_LIST {
            assert_eq!(name.parse::<Command>().unwrap().as_str(), *name);
        }
        assert!("destroy".parse::<Command>().is_err());
    }

    #[test]
    fn build_failure_bodies_match_the_wire_shape() {
        let body = build_failure_body(&build::Error::WorkspaceMissing);
        assert_eq!(body, json!({ "error": "No .xcworkspace found" }));

        let timeout = build::Error::TimedOut {
            timeout: std::time::Duration::from_secs(600),
        };
        assert_eq!(
            build_failure_body(&timeout),
            json!({ "error": "Build timeout" })
        );
    }

    #[test]
    fn package_propagates_build_failure_bodies_verbatim() {
        let err = package::Error::BuildFailed(build::Error::NoSchemeAvailable);
        assert_eq!(
            package_failure_body(&err),
            build_failure_body(&build::Error::NoSchemeAvailable)
        );
    }
}
