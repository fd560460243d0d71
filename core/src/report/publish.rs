use std::fs::{self, File};
use std::path::Path;
use tempfile::NamedTempFile;

use crate::prelude::{StageError, StageResult};

/// Writes `dest` through a temporary file in the same directory.
///
/// The destination only appears once `write` succeeded and the data is
/// synced; on any error the temporary file is removed and `dest` is left
/// untouched.
pub fn publish_atomically<F>(dest: &Path, write: F) -> StageResult<()>
where
    F: FnOnce(&mut File) -> StageResult<()>,
{
    let dir = match dest.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let mut staged = NamedTempFile::new_in(dir)?;
    write(staged.as_file_mut())?;
    staged.as_file().sync_all()?;
    staged
        .persist(dest)
        .map_err(|err| StageError::Io(err.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn successful_write_lands_at_destination() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("nested").join("out.txt");
        publish_atomically(&dest, |file| {
            file.write_all(b"ok")?;
            Ok(())
        })
        .unwrap();
        assert_eq!(fs::read_to_string(&dest).unwrap(), "ok");
    }

    #[test]
    fn failed_write_leaves_nothing_behind() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("out.pdf");
        let result = publish_atomically(&dest, |file| {
            file.write_all(b"partial")?;
            Err(StageError::Render("boom".into()))
        });
        assert!(result.is_err());
        assert!(!dest.exists());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
