//! Video file source.
//!
//! `stub://video` is a finite synthetic stream; real files decode through the
//! FFmpeg backend behind the `source-ffmpeg` feature. A fully decoded file is
//! end of stream, not an error.

use anyhow::Result;

use super::synthetic::SyntheticStream;
use crate::config::Resolution;
use crate::frame::Frame;

#[cfg(not(feature = "source-ffmpeg"))]
use anyhow::anyhow;

/// Frame count for the synthetic `stub://video` stream.
const SYNTHETIC_VIDEO_FRAMES: u64 = 60;

pub struct VideoSource {
    backend: VideoBackend,
}

enum VideoBackend {
    Synthetic(SyntheticStream),
    #[cfg(feature = "source-ffmpeg")]
    Ffmpeg(ffmpeg_backend::FfmpegVideoSource),
}

impl VideoSource {
    /// Open a video source. The preferred resolution is applied at open where
    /// the backend supports it; callers still resize on read.
    pub fn open(spec: &str, preferred: Option<Resolution>) -> Result<Self> {
        if spec == "stub://video" {
            return Ok(Self {
                backend: VideoBackend::Synthetic(SyntheticStream::new(
                    preferred,
                    Some(SYNTHETIC_VIDEO_FRAMES),
                )),
            });
        }
        #[cfg(feature = "source-ffmpeg")]
        {
            Ok(Self {
                backend: VideoBackend::Ffmpeg(ffmpeg_backend::FfmpegVideoSource::open(
                    spec, preferred,
                )?),
            })
        }
        #[cfg(not(feature = "source-ffmpeg"))]
        {
            Err(anyhow!(
                "video file '{}' requires the source-ffmpeg feature",
                spec
            ))
        }
    }

    pub fn next_frame(&mut self) -> Result<Option<Frame>> {
        match &mut self.backend {
            VideoBackend::Synthetic(stream) => stream.next_frame(),
            #[cfg(feature = "source-ffmpeg")]
            VideoBackend::Ffmpeg(source) => source.next_frame(),
        }
    }
}

#[cfg(feature = "source-ffmpeg")]
mod ffmpeg_backend {
    use anyhow::{anyhow, Context, Result};
    use ffmpeg_next as ffmpeg;

    use crate::config::Resolution;
    use crate::frame::Frame;

    pub(super) struct FfmpegVideoSource {
        input: ffmpeg::format::context::Input,
        stream_index: usize,
        decoder: ffmpeg::codec::decoder::Video,
        scaler: ffmpeg::software::scaling::Context,
        eof_sent: bool,
        finished: bool,
    }

    impl FfmpegVideoSource {
        pub(super) fn open(path: &str, preferred: Option<Resolution>) -> Result<Self> {
            ffmpeg::init().context("initialize ffmpeg")?;
            let input = ffmpeg::format::input(&path)
                .with_context(|| format!("failed to open video file '{}'", path))?;
            let input_stream = input
                .streams()
                .best(ffmpeg::media::Type::Video)
                .ok_or_else(|| anyhow!("'{}' has no video track", path))?;
            let stream_index = input_stream.index();
            let context =
                ffmpeg::codec::context::Context::from_parameters(input_stream.parameters())
                    .context("load video decoder parameters")?;
            let decoder = context
                .decoder()
                .video()
                .context("open ffmpeg video decoder")?;

            let (out_w, out_h) = match preferred {
                Some(res) => (res.width, res.height),
                None => (decoder.width(), decoder.height()),
            };
            let scaler = ffmpeg::software::scaling::context::Context::get(
                decoder.format(),
                decoder.width(),
                decoder.height(),
                ffmpeg::util::format::pixel::Pixel::RGB24,
                out_w,
                out_h,
                ffmpeg::software::scaling::flag::Flags::BILINEAR,
            )
            .context("create ffmpeg scaler")?;

            log::info!("opened video file '{}' ({}x{})", path, out_w, out_h);
            Ok(Self {
                input,
                stream_index,
                decoder,
                scaler,
                eof_sent: false,
                finished: false,
            })
        }

        pub(super) fn next_frame(&mut self) -> Result<Option<Frame>> {
            if self.finished {
                return Ok(None);
            }
            let mut decoded = ffmpeg::frame::Video::empty();
            loop {
                if self.decoder.receive_frame(&mut decoded).is_ok() {
                    return self.convert(&decoded).map(Some);
                }
                match self.next_packet()? {
                    Some(packet) => self
                        .decoder
                        .send_packet(&packet)
                        .context("send packet to ffmpeg decoder")?,
                    None if !self.eof_sent => {
                        self.eof_sent = true;
                        let _ = self.decoder.send_eof();
                    }
                    None => {
                        self.finished = true;
                        return Ok(None);
                    }
                }
            }
        }

        fn next_packet(&mut self) -> Result<Option<ffmpeg::Packet>> {
            for (stream, packet) in self.input.packets() {
                if stream.index() == self.stream_index {
                    return Ok(Some(packet));
                }
            }
            Ok(None)
        }

        fn convert(&mut self, decoded: &ffmpeg::frame::Video) -> Result<Frame> {
            let mut rgb_frame = ffmpeg::frame::Video::empty();
            self.scaler
                .run(decoded, &mut rgb_frame)
                .context("scale frame to RGB")?;

            let width = rgb_frame.width();
            let height = rgb_frame.height();
            let row_bytes = (width as usize) * 3;
            let stride = rgb_frame.stride(0);
            let data = rgb_frame.data(0);

            let pixels = if stride == row_bytes {
                data.to_vec()
            } else {
                let mut pixels = Vec::with_capacity(row_bytes * height as usize);
                for row in 0..height as usize {
                    let start = row * stride;
                    let end = start + row_bytes;
                    pixels.extend_from_slice(
                        data.get(start..end)
                            .context("ffmpeg frame row is out of bounds")?,
                    );
                }
                pixels
            };

            Frame::from_rgb_bytes(pixels, width, height)
        }
    }
}
