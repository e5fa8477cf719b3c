use std::path::{Path, PathBuf};

use directories::{BaseDirs, UserDirs};
use tracing::info;

use crate::error::CaptureError;

/// Folder the launcher installs its bundled encoder into.
const LAUNCHER_DIR: &str = "codmvm_launcher";

/// Where the launcher places the encoder binary
pub fn default_encoder_path() -> PathBuf {
    let binary = format!("ffmpeg{}", std::env::consts::EXE_SUFFIX);
    match BaseDirs::new() {
        Some(dirs) => dirs.data_dir().join(LAUNCHER_DIR).join(binary),
        None => PathBuf::from(binary),
    }
}

/// Videos folder, falling back to home, then the working directory.
pub fn default_output_directory() -> PathBuf {
    let base = UserDirs::new()
        .map(|dirs| {
            dirs.video_dir()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| dirs.home_dir().to_path_buf())
        })
        .unwrap_or_else(|| PathBuf::from("."));
    base.join("reelcap").join("recordings")
}

pub fn ensure_directory(path: &Path) -> Result<(), CaptureError> {
    if path.is_dir() {
        return Ok(());
    }
    info!("Creating output directory {}", path.display());
    std::fs::create_dir_all(path).map_err(|source| CaptureError::OutputDirectory {
        path: path.to_path_buf(),
        source,
    })
}

/// First free `Pass <n>.<ext>`, then `Pass <n>(1).<ext>`, `Pass <n>(2).<ext>`...
///
/// Not atomic; only one writer is expected per directory.
pub fn next_pass_output_path(dir: &Path, pass_index: usize, extension: &str) -> PathBuf {
    let mut candidate = dir.join(format!("Pass {pass_index}.{extension}"));
    let mut counter = 0;
    while candidate.exists() {
        counter += 1;
        candidate = dir.join(format!("Pass {pass_index}({counter}).{extension}"));
    }
    candidate
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn pass_name_skips_existing_files() {
        let dir = tempdir().unwrap();
        assert_eq!(
            next_pass_output_path(dir.path(), 0, "mov"),
            dir.path().join("Pass 0.mov")
        );

        std::fs::write(dir.path().join("Pass 0.mov"), b"").unwrap();
        assert_eq!(
            next_pass_output_path(dir.path(), 0, "mov"),
            dir.path().join("Pass 0(1).mov")
        );

        std::fs::write(dir.path().join("Pass 0(1).mov"), b"").unwrap();
        assert_eq!(
            next_pass_output_path(dir.path(), 0, "mov"),
            dir.path().join("Pass 0(2).mov")
        );

        // Other passes are unaffected
        assert_eq!(
            next_pass_output_path(dir.path(), 1, "mov"),
            dir.path().join("Pass 1.mov")
        );
    }

    #[test]
    fn ensure_directory_creates_nested() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        ensure_directory(&nested).unwrap();
        assert!(nested.is_dir());
        ensure_directory(&nested).unwrap();
    }

    #[test]
    fn encoder_path_names_binary() {
        let path = default_encoder_path();
        assert!(path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.starts_with("ffmpeg")));
    }
}
