use std::{
    ffi::{OsStr, OsString},
    fmt::Debug,
    path::Path,
};
use thiserror::Error;

/// Implementors hand child processes an explicitly-constructed environment
/// instead of whatever the parent process happened to inherit.
pub trait ExplicitEnv: Debug {
    fn explicit_env(&self) -> Vec<(&str, &OsStr)>;
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("The `HOME` environment variable isn't set, which is pretty weird: {0}")]
    HomeNotSet(#[source] std::env::VarError),
    #[error("The `PATH` environment variable isn't set, which is super weird: {0}")]
    PathNotSet(#[source] std::env::VarError),
}

#[derive(Clone, Debug)]
pub struct Env {
    home: String,
    path: OsString,
    term: Option<String>,
}

impl Env {
    pub fn new() -> Result<Self, Error> {
        let home = std::env::var("HOME").map_err(Error::HomeNotSet)?;
        let path = std::env::var("PATH").map_err(Error::PathNotSet)?.into();
        let term = std::env::var("TERM").ok();
        Ok(Self { home, path, term })
    }

    pub fn path(&self) -> &OsStr {
        &self.path
    }

    pub fn prepend_to_path(mut self, path: impl AsRef<Path>) -> Self {
        let paths = std::iter::once(path.as_ref().to_owned())
            .chain(std::env::split_paths(&self.path));
        match std::env::join_paths(paths) {
            Ok(joined) => self.path = joined,
            Err(err) => log::warn!(
                "failed to prepend {:?} to `PATH`: {}",
                path.as_ref(),
                err
            ),
        }
        self
    }
}

impl ExplicitEnv for Env {
    fn explicit_env(&self) -> Vec<(&str, &OsStr)> {
        let mut env = vec![
            ("HOME", self.home.as_ref()),
            ("PATH", self.path.as_os_str()),
        ];
        if let Some(term) = self.term.as_ref() {
            env.push(("TERM", term.as_ref()));
        }
        env
    }
}
