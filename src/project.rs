use std::{
    fs,
    path::{Path, PathBuf},
};

/// Well-known locations within a Cordova project checkout. Everything is
/// derived from the root supplied on the command line; there's no
/// process-wide state to reconcile between invocations.
#[derive(Clone, Debug)]
pub struct Project {
    root: PathBuf,
}

impl Project {
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        let root = dunce::canonicalize(root).unwrap_or_else(|_| root.to_owned());
        Self { root }
    }

    pub fn root_dir(&self) -> &Path {
        &self.root
    }

    pub fn ios_dir(&self) -> PathBuf {
        self.root.join("platforms").join("ios")
    }

    pub fn build_dir(&self) -> PathBuf {
        self.root.join("build")
    }

    pub fn derived_data_dir(&self) -> PathBuf {
        self.build_dir().join("DerivedData")
    }

    pub fn products_dir(&self) -> PathBuf {
        self.derived_data_dir().join("Build").join("Products")
    }

    pub fn ipa_dir(&self) -> PathBuf {
        self.build_dir().join("ipa")
    }

    pub fn ios_platform_exists(&self) -> bool {
        self.ios_dir().is_dir()
    }

    /// First `*.xcworkspace` in the iOS platform dir, name-sorted so repeat
    /// runs agree on which one wins.
    pub fn workspace(&self) -> Option<PathBuf> {
        first_with_extension(&self.ios_dir(), "xcworkspace")
    }

    pub fn xcodeproj(&self) -> Option<PathBuf> {
        first_with_extension(&self.ios_dir(), "xcodeproj")
    }
}

fn first_with_extension(dir: &Path, extension: &str) -> Option<PathBuf> {
    let entries = fs::read_dir(dir).ok()?;
    let mut matches = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.extension().map(|ext| ext == extension).unwrap_or(false))
        .collect::<Vec<_>>();
    matches.sort();
    matches.into_iter().next()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn workspace_discovery_takes_first_sorted_match() {
        let dir = tempfile::tempdir().unwrap();
        let ios_dir = dir.path().join("platforms").join("ios");
        fs::create_dir_all(ios_dir.join("Zeta.xcworkspace")).unwrap();
        fs::create_dir_all(ios_dir.join("Alpha.xcworkspace")).unwrap();
        let project = Project::new(dir.path());
        let workspace = project.workspace().unwrap();
        assert_eq!(workspace.file_name().unwrap(), "Alpha.xcworkspace");
    }

    #[test]
    fn missing_platform_has_no_workspace() {
        let dir = tempfile::tempdir().unwrap();
        let project = Project::new(dir.path());
        assert!(!project.ios_platform_exists());
        assert!(project.workspace().is_none());
        assert!(project.xcodeproj().is_none());
    }
}
