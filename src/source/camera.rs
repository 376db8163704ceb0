//! Live camera source.
//!
//! `stub://camera` is an endless synthetic stream; `usb<N>` maps to
//! `/dev/video<N>` through the V4L2 backend behind the `source-v4l2` feature.
//!
//! A failed camera read is logged and then reported as end of stream, the
//! same terminal condition as an exhausted video file. The warning is what
//! distinguishes a cable pull from normal exhaustion in the session log.

use anyhow::Result;

use super::synthetic::SyntheticStream;
use crate::config::Resolution;
use crate::frame::Frame;

#[cfg(not(feature = "source-v4l2"))]
use anyhow::anyhow;

pub struct CameraSource {
    backend: CameraBackend,
}

enum CameraBackend {
    Synthetic(SyntheticStream),
    #[cfg(feature = "source-v4l2")]
    V4l2(v4l2_backend::DeviceCameraSource),
}

impl CameraSource {
    /// Open a camera. The preferred resolution is requested from the device
    /// at open time; the device may not honor it, so callers resize on read.
    pub fn open(spec: &str, preferred: Option<Resolution>) -> Result<Self> {
        if spec == "stub://camera" {
            return Ok(Self {
                backend: CameraBackend::Synthetic(SyntheticStream::new(preferred, None)),
            });
        }
        // resolve_kind already validated the usb<N> shape.
        let index: u32 = spec.strip_prefix("usb").unwrap_or("0").parse().unwrap_or(0);
        #[cfg(feature = "source-v4l2")]
        {
            Ok(Self {
                backend: CameraBackend::V4l2(v4l2_backend::DeviceCameraSource::open(
                    index, preferred,
                )?),
            })
        }
        #[cfg(not(feature = "source-v4l2"))]
        {
            Err(anyhow!(
                "camera usb{} requires the source-v4l2 feature",
                index
            ))
        }
    }

    pub fn next_frame(&mut self) -> Result<Option<Frame>> {
        match &mut self.backend {
            CameraBackend::Synthetic(stream) => stream.next_frame(),
            #[cfg(feature = "source-v4l2")]
            CameraBackend::V4l2(source) => source.next_frame(),
        }
    }
}

#[cfg(feature = "source-v4l2")]
mod v4l2_backend {
    use anyhow::{Context, Result};
    use ouroboros::self_referencing;

    use crate::config::Resolution;
    use crate::frame::Frame;

    pub(super) struct DeviceCameraSource {
        device_path: String,
        state: CameraState,
        active_width: u32,
        active_height: u32,
    }

    #[self_referencing]
    struct CameraState {
        device: v4l::Device,
        #[borrows(mut device)]
        #[covariant]
        stream: v4l::prelude::MmapStream<'this, v4l::Device>,
    }

    impl DeviceCameraSource {
        pub(super) fn open(index: u32, preferred: Option<Resolution>) -> Result<Self> {
            use v4l::buffer::Type;
            use v4l::video::Capture;

            let device_path = format!("/dev/video{}", index);
            let mut device = v4l::Device::with_path(&device_path)
                .with_context(|| format!("failed to open camera {}", device_path))?;

            let mut format = device.format().context("read camera format")?;
            if let Some(res) = preferred {
                format.width = res.width;
                format.height = res.height;
            }
            format.fourcc = v4l::FourCC::new(b"RGB3");
            let format = match device.set_format(&format) {
                Ok(format) => format,
                Err(err) => {
                    log::warn!("camera {} rejected preferred format: {}", device_path, err);
                    device
                        .format()
                        .context("read camera format after set failure")?
                }
            };
            let (active_width, active_height) = (format.width, format.height);

            let state = CameraStateBuilder {
                device,
                stream_builder: |device| {
                    v4l::prelude::MmapStream::with_buffers(device, Type::VideoCapture, 4)
                        .map_err(|err| anyhow::Error::new(err).context("create camera stream"))
                },
            }
            .try_build()?;

            log::info!(
                "opened camera {} ({}x{})",
                device_path,
                active_width,
                active_height
            );
            Ok(Self {
                device_path,
                state,
                active_width,
                active_height,
            })
        }

        pub(super) fn next_frame(&mut self) -> Result<Option<Frame>> {
            use v4l::io::traits::CaptureStream;

            let result = self.state.with_stream_mut(|stream| {
                stream.next().map(|(buf, _meta)| buf.to_vec())
            });
            match result {
                Ok(pixels) => {
                    Frame::from_rgb_bytes(pixels, self.active_width, self.active_height).map(Some)
                }
                Err(err) => {
                    log::warn!("camera {} read failed: {}", self.device_path, err);
                    Ok(None)
                }
            }
        }
    }
}
