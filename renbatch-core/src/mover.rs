use std::fs;
use std::io;
use std::path::Path;
use tempfile::TempDir;

/// The filesystem primitive a rename job calls once per entry.
///
/// Each call is treated as all-or-nothing. Implementations decide how to deal
/// with cross-device moves and similar platform details.
pub trait FileMover: Send + Sync {
    fn move_path(&self, source: &Path, destination: &Path) -> io::Result<()>;
}

impl<F> FileMover for F
where
    F: Fn(&Path, &Path) -> io::Result<()> + Send + Sync,
{
    fn move_path(&self, source: &Path, destination: &Path) -> io::Result<()> {
        self(source, destination)
    }
}

/// Default mover backed by `std::fs`.
#[derive(Debug, Clone)]
pub struct FsMover {
    /// Create missing parent folders of the destination
    pub create_parent_dirs: bool,
}

impl Default for FsMover {
    fn default() -> Self {
        Self {
            create_parent_dirs: true,
        }
    }
}

impl FileMover for FsMover {
    fn move_path(&self, source: &Path, destination: &Path) -> io::Result<()> {
        if source == destination {
            return Ok(());
        }

        if self.create_parent_dirs {
            if let Some(parent) = destination.parent() {
                if !parent.as_os_str().is_empty() && !parent.exists() {
                    fs::create_dir_all(parent)?;
                }
            }
        }

        let case_only = source.to_string_lossy().to_lowercase()
            == destination.to_string_lossy().to_lowercase();

        if case_only && detect_case_insensitive_fs(source.parent().unwrap_or_else(|| Path::new(".")))
        {
            // A direct rename would be a no-op on a case-insensitive filesystem
            let temp = source.with_extension(format!("{}.renbatch.tmp", std::process::id()));
            tracing::debug!(
                "Case-only rename of {} through {}",
                source.display(),
                temp.display()
            );
            return rename_through(source, &temp, destination);
        }

        match fs::rename(source, destination) {
            Err(e) if is_cross_device(&e) && source.is_file() => {
                tracing::debug!(
                    "Cross-device move of {}, copying instead",
                    source.display()
                );
                copy_then_remove(source, destination)
            },
            other => other,
        }
    }
}

/// Rename in two steps via `temp`, moving the file back if the second step
/// fails so it never stays under the temporary name.
fn rename_through(source: &Path, temp: &Path, destination: &Path) -> io::Result<()> {
    fs::rename(source, temp)?;
    if let Err(e) = fs::rename(temp, destination) {
        if let Err(restore) = fs::rename(temp, source) {
            tracing::error!(
                "Could not move {} back to {}: {}",
                temp.display(),
                source.display(),
                restore
            );
        }
        return Err(e);
    }
    Ok(())
}

fn copy_then_remove(source: &Path, destination: &Path) -> io::Result<()> {
    fs::copy(source, destination)?;
    if let Err(e) = fs::remove_file(source) {
        // Leave no second copy behind if the source cannot be removed
        let _ = fs::remove_file(destination);
        return Err(e);
    }
    Ok(())
}

#[cfg(unix)]
fn is_cross_device(error: &io::Error) -> bool {
    error.raw_os_error() == Some(libc::EXDEV)
}

#[cfg(windows)]
fn is_cross_device(error: &io::Error) -> bool {
    const ERROR_NOT_SAME_DEVICE: i32 = 17;
    error.raw_os_error() == Some(ERROR_NOT_SAME_DEVICE)
}

#[cfg(not(any(unix, windows)))]
fn is_cross_device(_error: &io::Error) -> bool {
    false
}

/// Check if the filesystem at the given path is case-insensitive
pub fn detect_case_insensitive_fs(path: &Path) -> bool {
    let Ok(temp_dir) = TempDir::new_in(path) else {
        return false; // Assume case-sensitive if we can't test
    };

    let lower = temp_dir.path().join("case_probe_a");
    let upper = temp_dir.path().join("case_probe_A");

    if fs::write(&lower, b"probe").is_err() {
        return false;
    }

    fs::metadata(&upper).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_rename_through_temp() {
        let temp_dir = TempDir::new().unwrap();
        let from = temp_dir.path().join("show.mkv");
        let temp = temp_dir.path().join("show.1.renbatch.tmp");
        let to = temp_dir.path().join("Show.mkv");
        fs::write(&from, "video").unwrap();

        rename_through(&from, &temp, &to).unwrap();

        assert!(!temp.exists());
        assert_eq!(fs::read_to_string(&to).unwrap(), "video");
    }

    #[test]
    fn test_rename_through_restores_source_on_failure() {
        let temp_dir = TempDir::new().unwrap();
        let from = temp_dir.path().join("show.mkv");
        let temp = temp_dir.path().join("show.1.renbatch.tmp");
        let to = temp_dir.path().join("missing-dir").join("Show.mkv");
        fs::write(&from, "video").unwrap();

        let err = rename_through(&from, &temp, &to).unwrap_err();

        assert_eq!(err.kind(), io::ErrorKind::NotFound);
        assert!(!temp.exists());
        assert!(!to.exists());
        assert_eq!(fs::read_to_string(&from).unwrap(), "video");
    }

    #[test]
    fn test_fs_mover_renames_file() {
        let temp_dir = TempDir::new().unwrap();
        let from = temp_dir.path().join("x.txt");
        let to = temp_dir.path().join("y.txt");
        fs::write(&from, "content").unwrap();

        FsMover::default().move_path(&from, &to).unwrap();

        assert!(!from.exists());
        assert_eq!(fs::read_to_string(&to).unwrap(), "content");
    }

    #[test]
    fn test_fs_mover_creates_missing_folders() {
        let temp_dir = TempDir::new().unwrap();
        let from = temp_dir.path().join("x.txt");
        let to = temp_dir.path().join("Season 1").join("x.txt");
        fs::write(&from, "content").unwrap();

        FsMover::default().move_path(&from, &to).unwrap();
        assert!(to.exists());
    }

    #[test]
    fn test_fs_mover_without_folder_creation_fails() {
        let temp_dir = TempDir::new().unwrap();
        let from = temp_dir.path().join("x.txt");
        let to = temp_dir.path().join("missing").join("x.txt");
        fs::write(&from, "content").unwrap();

        let mover = FsMover {
            create_parent_dirs: false,
        };
        assert!(mover.move_path(&from, &to).is_err());
        assert!(from.exists());
    }

    #[test]
    fn test_fs_mover_missing_source_is_error() {
        let temp_dir = TempDir::new().unwrap();
        let result = FsMover::default().move_path(
            &temp_dir.path().join("nope.txt"),
            &temp_dir.path().join("y.txt"),
        );
        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_fs_mover_case_only_rename() {
        let temp_dir = TempDir::new().unwrap();
        let from = temp_dir.path().join("movie.mkv");
        let to = temp_dir.path().join("Movie.mkv");
        fs::write(&from, "content").unwrap();

        FsMover::default().move_path(&from, &to).unwrap();

        let names: Vec<_> = fs::read_dir(temp_dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["Movie.mkv".to_string()]);
    }

    #[test]
    fn test_closure_is_a_mover() {
        let mover = |_: &Path, _: &Path| -> io::Result<()> { Ok(()) };
        assert!(mover.move_path(Path::new("/a"), Path::new("/b")).is_ok());
    }
}
