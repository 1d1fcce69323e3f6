//! Where Lacuna stores its own data (config).
//!
//! Embedding files and word lists stay wherever the user keeps them; only app state lives here.

use std::path::PathBuf;

/// Returns the directory where Lacuna stores its config.
/// On Linux: `~/.local/share/lacuna/`; on macOS: `~/Library/Application Support/Lacuna/`.
/// Creates the directory if it doesn't exist; returns `None` if we can't determine the path.
pub fn app_data_dir() -> Option<PathBuf> {
    let dir = directories::ProjectDirs::from("app", "Lacuna", "Lacuna")?
        .data_local_dir()
        .to_path_buf();
    std::fs::create_dir_all(&dir).ok()?;
    Some(dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_data_dir_exists_when_resolved() {
        if let Some(dir) = app_data_dir() {
            assert!(dir.is_dir());
        }
    }
}
