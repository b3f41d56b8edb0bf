//! Local video discovery.

use crate::error::{Result, VidloreError};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Supported video file extensions.
pub const VIDEO_EXTENSIONS: &[&str] = &[
    "mp4", "mkv", "avi", "mov", "webm", "flv", "wmv", "m4v", "mpeg", "mpg", "3gp",
];

/// Check if path has a supported video extension.
pub fn is_video_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| VIDEO_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Recursively collect video files under `dir`, sorted by path.
///
/// Symlinked directories are followed, but each real directory is walked once.
pub fn discover_videos(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.exists() {
        return Err(VidloreError::InvalidInput(format!(
            "Directory not found: {}",
            dir.display()
        )));
    }

    if !dir.is_dir() {
        return Err(VidloreError::InvalidInput(format!(
            "Not a directory: {}",
            dir.display()
        )));
    }

    let mut videos = Vec::new();
    let mut visited = HashSet::new();
    let mut pending = vec![dir.to_path_buf()];

    while let Some(current) = pending.pop() {
        let real = std::fs::canonicalize(&current)?;
        if !visited.insert(real) {
            debug!("Already walked {}, skipping", current.display());
            continue;
        }

        for entry in std::fs::read_dir(&current)?.filter_map(|e| e.ok()) {
            let path = entry.path();
            if path.is_dir() {
                pending.push(path);
            } else if is_video_file(&path) {
                videos.push(path);
            } else {
                debug!("Skipping non-video file {}", path.display());
            }
        }
    }

    videos.sort();
    Ok(videos)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_video_file() {
        assert!(is_video_file(Path::new("video.mp4")));
        assert!(is_video_file(Path::new("video.MKV")));
        assert!(is_video_file(Path::new("/path/to/clip.webm")));
        assert!(!is_video_file(Path::new("audio.mp3")));
        assert!(!is_video_file(Path::new("document.pdf")));
        assert!(!is_video_file(Path::new("noextension")));
    }

    #[test]
    fn test_discover_videos_recurses_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("talks");
        std::fs::create_dir_all(&nested).unwrap();

        std::fs::write(dir.path().join("b.mp4"), b"").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"").unwrap();
        std::fs::write(nested.join("a.MOV"), b"").unwrap();

        let videos = discover_videos(dir.path()).unwrap();
        assert_eq!(videos.len(), 2);
        assert!(videos.windows(2).all(|w| w[0] <= w[1]));
        assert!(videos.iter().any(|p| p.ends_with("b.mp4")));
        assert!(videos.iter().any(|p| p.ends_with("talks/a.MOV")));
    }

    #[cfg(unix)]
    #[test]
    fn test_discover_videos_survives_symlink_loop() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.mp4"), b"").unwrap();
        std::os::unix::fs::symlink(dir.path(), dir.path().join("loop")).unwrap();

        let videos = discover_videos(dir.path()).unwrap();
        assert_eq!(videos, vec![dir.path().join("a.mp4")]);
    }

    #[cfg(unix)]
    #[test]
    fn test_discover_videos_follows_symlinked_folder() {
        let root = tempfile::tempdir().unwrap();
        let elsewhere = tempfile::tempdir().unwrap();
        std::fs::write(elsewhere.path().join("keynote.mkv"), b"").unwrap();
        std::os::unix::fs::symlink(elsewhere.path(), root.path().join("linked")).unwrap();

        let videos = discover_videos(root.path()).unwrap();
        assert_eq!(videos, vec![root.path().join("linked").join("keynote.mkv")]);
    }

    #[test]
    fn test_discover_videos_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(discover_videos(&dir.path().join("missing")).is_err());
    }
}
