//! Motion-JPEG recording sink.
//!
//! Writes annotated frames into a RIFF/AVI container with the `MJPG` fourcc at
//! a fixed 30 fps. Sizes and frame counts are patched into the header when the
//! recording is finished; dropping an unfinished recorder finalizes it so the
//! file stays playable on every exit path.

use std::fs::File;
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::Path;

use anyhow::{anyhow, Context, Result};

use crate::config::Resolution;
use crate::frame::Frame;

pub const RECORD_FPS: u32 = 30;
const JPEG_QUALITY: u8 = 85;

const AVIF_HASINDEX: u32 = 0x0000_0010;
const AVIIF_KEYFRAME: u32 = 0x0000_0010;

/// MJPEG-AVI recorder. One per run; frames must match the configured
/// resolution exactly.
pub struct Recorder {
    file: Option<BufWriter<File>>,
    resolution: Resolution,
    /// (offset within movi, chunk size) per frame, for the idx1 index.
    index: Vec<(u32, u32)>,
    riff_size_pos: u64,
    total_frames_pos: u64,
    stream_length_pos: u64,
    movi_size_pos: u64,
    finished: bool,
}

impl Recorder {
    pub fn create<P: AsRef<Path>>(path: P, resolution: Resolution) -> Result<Self> {
        let path = path.as_ref();
        let file = File::create(path)
            .with_context(|| format!("failed to create recording file {}", path.display()))?;
        let mut recorder = Self {
            file: Some(BufWriter::new(file)),
            resolution,
            index: Vec::new(),
            riff_size_pos: 0,
            total_frames_pos: 0,
            stream_length_pos: 0,
            movi_size_pos: 0,
            finished: false,
        };
        recorder.write_header()?;
        log::info!(
            "recording to {} ({} @ {} fps)",
            path.display(),
            resolution,
            RECORD_FPS
        );
        Ok(recorder)
    }

    fn writer(&mut self) -> Result<&mut BufWriter<File>> {
        self.file
            .as_mut()
            .ok_or_else(|| anyhow!("recorder already finished"))
    }

    fn write_header(&mut self) -> Result<()> {
        let Resolution { width, height } = self.resolution;
        let w = self.writer()?;

        w.write_all(b"RIFF")?;
        let riff_size_pos = w.stream_position()?;
        w.write_all(&0u32.to_le_bytes())?; // patched in finish()
        w.write_all(b"AVI ")?;

        // hdrl list: avih + one strl.
        w.write_all(b"LIST")?;
        w.write_all(&192u32.to_le_bytes())?;
        w.write_all(b"hdrl")?;

        w.write_all(b"avih")?;
        w.write_all(&56u32.to_le_bytes())?;
        w.write_all(&(1_000_000 / RECORD_FPS).to_le_bytes())?; // microseconds per frame
        w.write_all(&0u32.to_le_bytes())?; // max bytes per second
        w.write_all(&0u32.to_le_bytes())?; // padding granularity
        w.write_all(&AVIF_HASINDEX.to_le_bytes())?;
        let total_frames_pos = w.stream_position()?;
        w.write_all(&0u32.to_le_bytes())?; // total frames, patched
        w.write_all(&0u32.to_le_bytes())?; // initial frames
        w.write_all(&1u32.to_le_bytes())?; // stream count
        w.write_all(&0u32.to_le_bytes())?; // suggested buffer size
        w.write_all(&width.to_le_bytes())?;
        w.write_all(&height.to_le_bytes())?;
        w.write_all(&[0u8; 16])?; // reserved

        w.write_all(b"LIST")?;
        w.write_all(&116u32.to_le_bytes())?;
        w.write_all(b"strl")?;

        w.write_all(b"strh")?;
        w.write_all(&56u32.to_le_bytes())?;
        w.write_all(b"vids")?;
        w.write_all(b"MJPG")?;
        w.write_all(&0u32.to_le_bytes())?; // flags
        w.write_all(&0u32.to_le_bytes())?; // priority + language
        w.write_all(&0u32.to_le_bytes())?; // initial frames
        w.write_all(&1u32.to_le_bytes())?; // scale
        w.write_all(&RECORD_FPS.to_le_bytes())?; // rate: rate/scale = fps
        w.write_all(&0u32.to_le_bytes())?; // start
        let stream_length_pos = w.stream_position()?;
        w.write_all(&0u32.to_le_bytes())?; // length in frames, patched
        w.write_all(&0u32.to_le_bytes())?; // suggested buffer size
        w.write_all(&u32::MAX.to_le_bytes())?; // quality: default
        w.write_all(&0u32.to_le_bytes())?; // sample size
        w.write_all(&0u16.to_le_bytes())?; // rcFrame left
        w.write_all(&0u16.to_le_bytes())?; // rcFrame top
        w.write_all(&(width as u16).to_le_bytes())?;
        w.write_all(&(height as u16).to_le_bytes())?;

        w.write_all(b"strf")?;
        w.write_all(&40u32.to_le_bytes())?;
        w.write_all(&40u32.to_le_bytes())?; // biSize
        w.write_all(&width.to_le_bytes())?;
        w.write_all(&height.to_le_bytes())?;
        w.write_all(&1u16.to_le_bytes())?; // planes
        w.write_all(&24u16.to_le_bytes())?; // bit count
        w.write_all(b"MJPG")?; // compression
        w.write_all(&(width * height * 3).to_le_bytes())?; // image size
        w.write_all(&[0u8; 16])?; // ppm + palette fields

        w.write_all(b"LIST")?;
        let movi_size_pos = w.stream_position()?;
        w.write_all(&0u32.to_le_bytes())?; // patched in finish()
        w.write_all(b"movi")?;

        self.riff_size_pos = riff_size_pos;
        self.total_frames_pos = total_frames_pos;
        self.stream_length_pos = stream_length_pos;
        self.movi_size_pos = movi_size_pos;
        Ok(())
    }

    /// Append one frame. Dimensions must match the recording resolution.
    pub fn write(&mut self, frame: &Frame) -> Result<()> {
        if self.finished {
            return Err(anyhow!("recorder already finished"));
        }
        if frame.width() != self.resolution.width || frame.height() != self.resolution.height {
            return Err(anyhow!(
                "frame size {}x{} does not match recording resolution {}",
                frame.width(),
                frame.height(),
                self.resolution
            ));
        }

        let jpeg = frame.encode_jpeg(JPEG_QUALITY)?;
        let movi_size_pos = self.movi_size_pos;
        let w = self.writer()?;
        // Chunk offset relative to the 'movi' fourcc, per the idx1 convention.
        let offset = (w.stream_position()? - (movi_size_pos + 4)) as u32;
        w.write_all(b"00dc")?;
        w.write_all(&(jpeg.len() as u32).to_le_bytes())?;
        w.write_all(&jpeg)?;
        if jpeg.len() % 2 == 1 {
            w.write_all(&[0u8])?;
        }
        self.index.push((offset, jpeg.len() as u32));
        Ok(())
    }

    pub fn frames_written(&self) -> usize {
        self.index.len()
    }

    /// Patch container sizes and write the idx1 index. Idempotent; also run
    /// from Drop so the file is finalized on every exit path.
    pub fn finish(&mut self) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;

        let Some(mut writer) = self.file.take() else {
            return Ok(());
        };
        let movi_end = writer.stream_position()?;
        let movi_size = (movi_end - (self.movi_size_pos + 4)) as u32;

        writer.write_all(b"idx1")?;
        writer.write_all(&((self.index.len() * 16) as u32).to_le_bytes())?;
        for (offset, size) in &self.index {
            writer.write_all(b"00dc")?;
            writer.write_all(&AVIIF_KEYFRAME.to_le_bytes())?;
            writer.write_all(&offset.to_le_bytes())?;
            writer.write_all(&size.to_le_bytes())?;
        }

        let file_end = writer.stream_position()?;
        let frames = self.index.len() as u32;
        writer.seek(SeekFrom::Start(self.riff_size_pos))?;
        writer.write_all(&((file_end - 8) as u32).to_le_bytes())?;
        writer.seek(SeekFrom::Start(self.total_frames_pos))?;
        writer.write_all(&frames.to_le_bytes())?;
        writer.seek(SeekFrom::Start(self.stream_length_pos))?;
        writer.write_all(&frames.to_le_bytes())?;
        writer.seek(SeekFrom::Start(self.movi_size_pos))?;
        writer.write_all(&movi_size.to_le_bytes())?;
        writer.flush().context("flush recording file")?;

        log::info!("recording finalized ({} frames)", frames);
        Ok(())
    }
}

impl Drop for Recorder {
    fn drop(&mut self) {
        if !self.finished {
            if let Err(err) = self.finish() {
                log::warn!("failed to finalize recording: {err:#}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn res() -> Resolution {
        Resolution {
            width: 32,
            height: 24,
        }
    }

    fn frame(color: [u8; 3]) -> Frame {
        Frame::new(RgbImage::from_pixel(32, 24, Rgb(color)))
    }

    fn read_u32(bytes: &[u8], at: usize) -> u32 {
        u32::from_le_bytes(bytes[at..at + 4].try_into().unwrap())
    }

    #[test]
    fn produces_a_well_formed_container() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.avi");
        let mut recorder = Recorder::create(&path, res()).unwrap();
        recorder.write(&frame([255, 0, 0])).unwrap();
        recorder.write(&frame([0, 255, 0])).unwrap();
        recorder.finish().unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(&bytes[8..12], b"AVI ");
        assert_eq!(read_u32(&bytes, 4) as usize, bytes.len() - 8);
        // Total frames patched into the avih header.
        assert_eq!(read_u32(&bytes, 48), 2);
        // MJPG fourcc present in the stream header.
        assert!(bytes.windows(4).any(|w| w == b"MJPG"));
        // Index chunk written.
        assert!(bytes.windows(4).any(|w| w == b"idx1"));
    }

    #[test]
    fn rejects_mismatched_frame_size() {
        let dir = tempfile::tempdir().unwrap();
        let mut recorder = Recorder::create(dir.path().join("out.avi"), res()).unwrap();
        let wrong = Frame::new(RgbImage::new(64, 64));
        assert!(recorder.write(&wrong).is_err());
    }

    #[test]
    fn drop_finalizes_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.avi");
        {
            let mut recorder = Recorder::create(&path, res()).unwrap();
            recorder.write(&frame([9, 9, 9])).unwrap();
            // Dropped without an explicit finish().
        }
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(read_u32(&bytes, 4) as usize, bytes.len() - 8);
        assert_eq!(read_u32(&bytes, 48), 1);
    }

    #[test]
    fn finish_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let mut recorder = Recorder::create(dir.path().join("out.avi"), res()).unwrap();
        recorder.write(&frame([1, 2, 3])).unwrap();
        recorder.finish().unwrap();
        recorder.finish().unwrap();
        assert!(recorder.write(&frame([1, 2, 3])).is_err());
    }
}
