//! Directory trees in, zip archives out.

use std::{
    fs::{self, File},
    io,
    path::{Path, PathBuf},
};
use thiserror::Error;
use zip::{result::ZipError, write::FileOptions, CompressionMethod, ZipWriter};

/// Unix permission bits applied to generated zip entries.
const ENTRY_PERMISSIONS: u32 = 0o755;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{path:?} isn't a directory")]
    SourceInvalid { path: PathBuf },
    #[error("Failed to read {path:?}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("Failed to write zip entry for {path:?}: {source}")]
    Zip { path: PathBuf, source: ZipError },
}

/// Zip a directory tree, preserving empty directories as entries. Entry
/// names are relative to `source`, so the archive's top level is whatever
/// `source` directly contains.
pub fn zip_directory(source: &Path, destination: &Path) -> Result<(), Error> {
    if !source.is_dir() {
        return Err(Error::SourceInvalid {
            path: source.to_owned(),
        });
    }
    let file = File::create(destination).map_err(|err| Error::Io {
        path: destination.to_owned(),
        source: err,
    })?;
    let mut zip = ZipWriter::new(file);
    let options = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(ENTRY_PERMISSIONS);
    add_directory(source, source, &mut zip, options)?;
    zip.finish().map_err(|err| Error::Zip {
        path: destination.to_owned(),
        source: err,
    })?;
    Ok(())
}

fn add_directory(
    base: &Path,
    current: &Path,
    zip: &mut ZipWriter<File>,
    options: FileOptions,
) -> Result<(), Error> {
    let entries = fs::read_dir(current).map_err(|err| Error::Io {
        path: current.to_owned(),
        source: err,
    })?;
    for entry in entries {
        let entry = entry.map_err(|err| Error::Io {
            path: current.to_owned(),
            source: err,
        })?;
        let path = entry.path();
        let name = path
            .strip_prefix(base)
            .unwrap_or(&path)
            .to_string_lossy()
            .replace('\\', "/");
        if path.is_dir() {
            zip.add_directory(format!("{}/", name), options)
                .map_err(|err| Error::Zip {
                    path: path.clone(),
                    source: err,
                })?;
            add_directory(base, &path, zip, options)?;
        } else {
            zip.start_file(name, options).map_err(|err| Error::Zip {
                path: path.clone(),
                source: err,
            })?;
            let mut file = File::open(&path).map_err(|err| Error::Io {
                path: path.clone(),
                source: err,
            })?;
            io::copy(&mut file, zip).map_err(|err| Error::Io {
                path: path.clone(),
                source: err,
            })?;
        }
    }
    Ok(())
}

/// Recursively copy a directory tree into `destination`, creating it first.
pub fn copy_dir(source: &Path, destination: &Path) -> io::Result<()> {
    fs::create_dir_all(destination)?;
    for entry in fs::read_dir(source)? {
        let entry = entry?;
        let target = destination.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Read as _;
    use zip::ZipArchive;

    #[test]
    fn zips_nested_files_with_relative_names() {
        let temp = tempfile::tempdir().unwrap();
        let source = temp.path().join("source");
        let nested = source.join("nested");
        fs::create_dir_all(&nested).unwrap();
        fs::write(source.join("root.txt"), b"root").unwrap();
        fs::write(nested.join("child.txt"), b"child").unwrap();

        let destination = temp.path().join("out.zip");
        zip_directory(&source, &destination).unwrap();

        let file = File::open(&destination).unwrap();
        let mut archive = ZipArchive::new(file).unwrap();
        let mut contents = String::new();
        archive
            .by_name("nested/child.txt")
            .unwrap()
            .read_to_string(&mut contents)
            .unwrap();
        assert_eq!(contents, "child");
        assert!(archive.by_name("root.txt").is_ok());
    }

    #[test]
    fn zipping_a_file_is_refused() {
        let temp = tempfile::tempdir().unwrap();
        let source = temp.path().join("file.txt");
        fs::write(&source, b"not a directory").unwrap();
        let err = zip_directory(&source, &temp.path().join("out.zip")).unwrap_err();
        assert!(matches!(err, Error::SourceInvalid { .. }));
    }

    #[test]
    fn copies_directory_trees() {
        let temp = tempfile::tempdir().unwrap();
        let source = temp.path().join("bundle.app");
        fs::create_dir_all(source.join("Frameworks")).unwrap();
        fs::write(source.join("binary"), b"binary").unwrap();
        fs::write(source.join("Frameworks").join("lib.dylib"), b"lib").unwrap();

        let destination = temp.path().join("Payload").join("bundle.app");
        copy_dir(&source, &destination).unwrap();

        assert_eq!(fs::read(destination.join("binary")).unwrap(), b"binary");
        assert_eq!(
            fs::read(destination.join("Frameworks").join("lib.dylib")).unwrap(),
            b"lib"
        );
    }
}
