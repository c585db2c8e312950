//! Lock marker file.
//!
//! The existence of the file means a visit has already been booked. It is
//! written once after a successful reservation and never removed here.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;

pub const DEFAULT_LOCK_FILE: &str = "visit.txt";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockState {
    Free,
    Held { contents: String },
}

impl LockState {
    pub fn is_held(&self) -> bool {
        matches!(self, LockState::Held { .. })
    }
}

pub fn check_lock(path: &Path) -> io::Result<LockState> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(LockState::Held {
            contents: String::from_utf8_lossy(&bytes).into_owned(),
        }),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(LockState::Free),
        Err(err) => Err(err),
    }
}

pub fn lock_contents(header: &str, summary: &str) -> String {
    format!("{}\n\n{}", header, summary)
}

/// Create the lock file. Fails if it already exists.
pub fn write_lock(path: &Path, header: &str, summary: &str) -> io::Result<()> {
    let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
    file.write_all(lock_contents(header, summary).as_bytes())?;
    file.sync_all()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_is_free() {
        let temp = tempdir().unwrap();
        let state = check_lock(&temp.path().join("visit.txt")).unwrap();
        assert_eq!(state, LockState::Free);
        assert!(!state.is_held());
    }

    #[test]
    fn existing_file_is_held_with_contents() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("visit.txt");
        std::fs::write(&path, "anything at all").unwrap();

        assert_eq!(
            check_lock(&path).unwrap(),
            LockState::Held {
                contents: "anything at all".to_string()
            }
        );
    }

    #[test]
    fn empty_file_still_holds_the_lock() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("visit.txt");
        std::fs::write(&path, "").unwrap();
        assert!(check_lock(&path).unwrap().is_held());
    }

    #[test]
    fn write_lock_formats_header_and_summary_once() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("visit.txt");

        write_lock(&path, "Booked in enel-med!", "Pon 05.01 14:30\nUSG").unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "Booked in enel-med!\n\nPon 05.01 14:30\nUSG"
        );

        let err = write_lock(&path, "again", "again").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
    }
}
