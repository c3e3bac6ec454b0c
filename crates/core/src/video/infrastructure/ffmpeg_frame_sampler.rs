use std::path::Path;

use ffmpeg_next::format::context::Input;
use ffmpeg_next::software::scaling;
use ffmpeg_next::util::frame::video::Video;
use image::GrayImage;

use crate::shared::frame_sample::FrameSample;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::frame_sampler::{FrameSampler, SampleError, VideoError};

/// Samples a video through ffmpeg-next (libavformat + libavcodec).
///
/// Decodes sequentially rather than seeking: seeks land on keyframes and
/// would make sample timestamps depend on the encoder's GOP layout. Only the
/// frames that are kept get converted to GRAY8.
pub struct FfmpegFrameSampler {
    input_ctx: Option<Input>,
    video_stream_index: usize,
    metadata: Option<VideoMetadata>,
}

// Safety: the sampler is moved to a single reader thread and only used there.
// The raw pointers inside ffmpeg types are never shared across threads.
unsafe impl Send for FfmpegFrameSampler {}

impl FfmpegFrameSampler {
    pub fn new() -> Self {
        Self {
            input_ctx: None,
            video_stream_index: 0,
            metadata: None,
        }
    }
}

impl Default for FfmpegFrameSampler {
    fn default() -> Self {
        Self::new()
    }
}

fn open_error(path: &Path, e: impl std::fmt::Display) -> VideoError {
    VideoError::Open {
        path: path.to_path_buf(),
        reason: e.to_string(),
    }
}

impl FrameSampler for FfmpegFrameSampler {
    fn open(&mut self, path: &Path) -> Result<VideoMetadata, VideoError> {
        ffmpeg_next::init().map_err(|e| open_error(path, e))?;
        let ictx = ffmpeg_next::format::input(path).map_err(|e| open_error(path, e))?;

        let stream = ictx
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .ok_or_else(|| VideoError::NoVideoStream(path.to_path_buf()))?;
        let video_stream_index = stream.index();
        let codec_ctx = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())
            .map_err(|e| open_error(path, e))?;
        let decoder = codec_ctx.decoder().video().map_err(|e| open_error(path, e))?;

        let rate = stream.rate();
        let fps = if rate.denominator() != 0 {
            rate.numerator() as f64 / rate.denominator() as f64
        } else {
            0.0
        };
        // Some containers leave the frame count out; derive it from duration.
        let total_frames = if stream.frames() > 0 {
            stream.frames() as usize
        } else if ictx.duration() > 0 && fps > 0.0 {
            let seconds = ictx.duration() as f64 / f64::from(ffmpeg_next::ffi::AV_TIME_BASE);
            (seconds * fps).round() as usize
        } else {
            0
        };
        if !(fps.is_finite() && fps > 0.0) || total_frames == 0 {
            return Err(VideoError::InvalidStream { fps, total_frames });
        }

        let metadata = VideoMetadata {
            width: decoder.width(),
            height: decoder.height(),
            fps,
            total_frames,
            codec: decoder
                .codec()
                .map(|c| c.name().to_string())
                .unwrap_or_default(),
            source_path: Some(path.to_path_buf()),
        };
        log::info!(
            "Opened {}: {}x{} {} at {fps:.2} fps, {total_frames} frames",
            path.display(),
            metadata.width,
            metadata.height,
            metadata.codec
        );

        self.video_stream_index = video_stream_index;
        self.metadata = Some(metadata.clone());
        self.input_ctx = Some(ictx);
        Ok(metadata)
    }

    fn samples(
        &mut self,
        interval_seconds: f64,
    ) -> Box<dyn Iterator<Item = Result<FrameSample, SampleError>> + '_> {
        let (Some(ictx), Some(metadata)) = (self.input_ctx.as_mut(), self.metadata.as_ref()) else {
            return Box::new(std::iter::once(Err(SampleError {
                timestamp: 0.0,
                reason: VideoError::NotOpened.to_string(),
            })));
        };
        let fps = metadata.fps;
        let step = metadata.frame_step(interval_seconds);

        let (decoder, scaler) = match open_decoder(ictx, self.video_stream_index) {
            Ok(parts) => parts,
            Err(e) => {
                return Box::new(std::iter::once(Err(SampleError {
                    timestamp: 0.0,
                    reason: e.to_string(),
                })))
            }
        };

        Box::new(FfmpegSampleIter {
            width: decoder.width(),
            height: decoder.height(),
            ictx,
            decoder,
            scaler,
            video_stream_index: self.video_stream_index,
            fps,
            step,
            frame_index: 0,
            flushing: false,
            done: false,
        })
    }

    fn close(&mut self) {
        self.input_ctx = None;
        self.metadata = None;
    }
}

fn open_decoder(
    ictx: &Input,
    stream_index: usize,
) -> Result<(ffmpeg_next::decoder::Video, scaling::Context), ffmpeg_next::Error> {
    let stream = ictx
        .stream(stream_index)
        .ok_or(ffmpeg_next::Error::StreamNotFound)?;
    let decoder = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())?
        .decoder()
        .video()?;
    let scaler = scaling::Context::get(
        decoder.format(),
        decoder.width(),
        decoder.height(),
        ffmpeg_next::format::Pixel::GRAY8,
        decoder.width(),
        decoder.height(),
        scaling::Flags::BILINEAR,
    )?;
    Ok((decoder, scaler))
}

/// Decodes lazily and yields every `step`-th frame.
struct FfmpegSampleIter<'a> {
    ictx: &'a mut Input,
    decoder: ffmpeg_next::decoder::Video,
    scaler: scaling::Context,
    width: u32,
    height: u32,
    video_stream_index: usize,
    fps: f64,
    step: usize,
    frame_index: usize,
    flushing: bool,
    done: bool,
}

impl FfmpegSampleIter<'_> {
    /// Drains decoded frames until one lands on a sample position.
    fn try_receive(&mut self) -> Option<Result<FrameSample, SampleError>> {
        loop {
            let mut decoded = Video::empty();
            if self.decoder.receive_frame(&mut decoded).is_err() {
                return None;
            }
            let index = self.frame_index;
            self.frame_index += 1;
            if index % self.step != 0 {
                continue;
            }

            let timestamp = index as f64 / self.fps;
            let mut gray = Video::empty();
            if let Err(e) = self.scaler.run(&decoded, &mut gray) {
                return Some(Err(SampleError {
                    timestamp,
                    reason: e.to_string(),
                }));
            }
            return Some(
                extract_gray_image(&gray, self.width, self.height)
                    .map(|image| FrameSample::new(timestamp, index, image))
                    .ok_or_else(|| SampleError {
                        timestamp,
                        reason: "decoded frame smaller than stream dimensions".into(),
                    }),
            );
        }
    }
}

impl Iterator for FfmpegSampleIter<'_> {
    type Item = Result<FrameSample, SampleError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if let Some(result) = self.try_receive() {
            return Some(result);
        }
        if self.flushing {
            self.done = true;
            return None;
        }

        loop {
            let Some((stream, packet)) = self.ictx.packets().next() else {
                let _ = self.decoder.send_eof();
                self.flushing = true;
                if let Some(result) = self.try_receive() {
                    return Some(result);
                }
                self.done = true;
                return None;
            };
            if stream.index() != self.video_stream_index {
                continue;
            }
            // A corrupt packet only costs the frames it carried.
            if self.decoder.send_packet(&packet).is_err() {
                continue;
            }
            if let Some(result) = self.try_receive() {
                return Some(result);
            }
        }
    }
}

/// Copies the luma plane into a tightly packed image, dropping row padding.
fn extract_gray_image(frame: &Video, width: u32, height: u32) -> Option<GrayImage> {
    let stride = frame.stride(0);
    let data = frame.data(0);
    let w = width as usize;
    let h = height as usize;
    if h > 0 && data.len() < (h - 1) * stride + w {
        return None;
    }

    let mut pixels = Vec::with_capacity(w * h);
    for row in 0..h {
        let start = row * stride;
        pixels.extend_from_slice(&data[start..start + w]);
    }
    GrayImage::from_raw(width, height, pixels)
}
