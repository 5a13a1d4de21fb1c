use std::path::{Path, PathBuf};

use tracing::debug;

use crate::mission::{ContentKind, LoadFailure};
use crate::sim::FrameHandle;

/// Supplies the precomputed image sequence for a character's transformation.
pub trait FrameSource {
    /// Returns at most `requested` frames; fewer means the source ran short.
    fn load_frames(
        &mut self,
        character_id: &str,
        requested: usize,
    ) -> Result<Vec<FrameHandle>, LoadFailure>;
}

/// Keyed in-memory frames, optionally capped below the requested count.
#[derive(Debug, Clone, Default)]
pub struct SyntheticFrameSource {
    cap: Option<usize>,
}

impl SyntheticFrameSource {
    pub fn capped(cap: usize) -> Self {
        Self { cap: Some(cap) }
    }
}

impl FrameSource for SyntheticFrameSource {
    fn load_frames(
        &mut self,
        character_id: &str,
        requested: usize,
    ) -> Result<Vec<FrameHandle>, LoadFailure> {
        let count = self.cap.map_or(requested, |cap| cap.min(requested));
        Ok((0..count)
            .map(|index| FrameHandle::new(format!("{character_id}/frame_{index:04}")))
            .collect())
    }
}

/// Reads `<root>/<character>/frame_NNNN.png`, stopping at the first frame
/// that is missing or has an unreadable header.
#[derive(Debug, Clone)]
pub struct DirectoryFrameSource {
    root: PathBuf,
}

impl DirectoryFrameSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn frame_path(&self, character_id: &str, index: usize) -> PathBuf {
        self.root
            .join(character_id)
            .join(format!("frame_{index:04}.png"))
    }
}

impl FrameSource for DirectoryFrameSource {
    fn load_frames(
        &mut self,
        character_id: &str,
        requested: usize,
    ) -> Result<Vec<FrameHandle>, LoadFailure> {
        let mut frames = Vec::new();
        for index in 0..requested {
            let path = self.frame_path(character_id, index);
            match image::image_dimensions(&path) {
                Ok((width, height)) => {
                    debug!(path = %path.display(), width, height, "frame_probed");
                    frames.push(FrameHandle::new(path_key(&path)));
                }
                Err(error) if index == 0 => {
                    return Err(LoadFailure::new(
                        ContentKind::Frames,
                        format!("no readable frames at {}: {error}", path.display()),
                    ));
                }
                Err(_) => break,
            }
        }
        Ok(frames)
    }
}

fn path_key(path: &Path) -> String {
    path.components()
        .map(|component| component.as_os_str().to_string_lossy().to_string())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use std::fs;

    use image::RgbaImage;
    use tempfile::TempDir;

    use super::*;

    fn write_frames(root: &Path, character_id: &str, count: usize) {
        let dir = root.join(character_id);
        fs::create_dir_all(&dir).expect("dir");
        for index in 0..count {
            RgbaImage::new(2, 2)
                .save(dir.join(format!("frame_{index:04}.png")))
                .expect("png");
        }
    }

    #[test]
    fn synthetic_source_honors_cap() {
        let mut source = SyntheticFrameSource::capped(3);
        let frames = source.load_frames("jett", 10).expect("frames");
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[2].key, "jett/frame_0002");

        let mut uncapped = SyntheticFrameSource::default();
        assert_eq!(uncapped.load_frames("jett", 10).expect("frames").len(), 10);
    }

    #[test]
    fn directory_source_stops_at_first_gap() {
        let temp = TempDir::new().expect("temp");
        write_frames(temp.path(), "donnie", 4);
        fs::write(temp.path().join("donnie").join("frame_0002.png"), b"not a png").expect("corrupt");

        let mut source = DirectoryFrameSource::new(temp.path());
        let frames = source.load_frames("donnie", 10).expect("frames");
        assert_eq!(frames.len(), 2);
    }

    #[test]
    fn directory_source_never_exceeds_requested() {
        let temp = TempDir::new().expect("temp");
        write_frames(temp.path(), "jett", 5);

        let mut source = DirectoryFrameSource::new(temp.path());
        assert_eq!(source.load_frames("jett", 3).expect("frames").len(), 3);
    }

    #[test]
    fn missing_character_directory_is_a_load_failure() {
        let temp = TempDir::new().expect("temp");
        let mut source = DirectoryFrameSource::new(temp.path());
        let err = source.load_frames("paul", 4).expect_err("no frames");
        assert_eq!(err.kind, ContentKind::Frames);
    }
}
