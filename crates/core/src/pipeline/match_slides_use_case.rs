use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;

use crate::matching::slide_match_scorer::{MatchingComponents, SlideMatchScorer};
use crate::shared::config::MatchingConfig;
use crate::slides::domain::slide::Slide;
use crate::slides::infrastructure::slide_decoder::{decode_slides, SlideInput};
use crate::timeline::domain::timeline::{Timeline, TimelineSource};
use crate::timeline::segment_assigner::{assign_segments, assign_uniform, slide_distribution};
use crate::timeline::timeline_builder::TimelineBuilder;
use crate::timeline::timeline_estimator::estimate_timeline;
use crate::transcript::domain::transcript_segment::TranscriptSegment;
use crate::video::domain::frame_sampler::FrameSampler;
use crate::video::domain::video_source::VideoSource;

use super::pipeline_logger::PipelineLogger;
use super::sample_feed::SampleFeed;

/// Result of one run: every input segment with a `slide_index`, plus how the
/// assignment was reached.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MatchOutcome {
    pub segments: Vec<TranscriptSegment>,
    pub timeline: Timeline,
    pub source: TimelineSource,
    /// Number of segments assigned to each slide.
    pub distribution: BTreeMap<usize, usize>,
}

/// Aligns a transcript with a slide deck using the lecture recording.
///
/// Tries, in order: a timeline detected from video frames, a timeline
/// estimated from the transcript duration, and plain uniform bucketing.
/// `execute` never fails; the worst outcome is an even spread of slides.
///
/// Single-use: the sampler is consumed by the first run that reaches the
/// video.
pub struct MatchSlidesUseCase {
    config: MatchingConfig,
    components: MatchingComponents,
    sampler: Option<Box<dyn FrameSampler>>,
    logger: Box<dyn PipelineLogger>,
    cancelled: Arc<AtomicBool>,
}

impl MatchSlidesUseCase {
    pub fn new(
        config: MatchingConfig,
        components: MatchingComponents,
        sampler: Box<dyn FrameSampler>,
        logger: Box<dyn PipelineLogger>,
        cancelled: Option<Arc<AtomicBool>>,
    ) -> Self {
        Self {
            config,
            components,
            sampler: Some(sampler),
            logger,
            cancelled: cancelled.unwrap_or_else(|| Arc::new(AtomicBool::new(false))),
        }
    }

    pub fn execute(
        &mut self,
        video: &VideoSource,
        slides: &[SlideInput],
        segments: &[TranscriptSegment],
    ) -> MatchOutcome {
        let started = Instant::now();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            self.run(video, slides, segments, started)
        }))
        .unwrap_or_else(|_| {
            log::error!("Slide matching failed unexpectedly, assigning slides uniformly");
            uniform_outcome(segments, slides.len())
        });

        log::info!(
            "Assigned {} segments to {} slides ({:?} timeline, {} entries) in {:.1}s",
            outcome.segments.len(),
            slides.len(),
            outcome.source,
            outcome.timeline.len(),
            started.elapsed().as_secs_f64()
        );
        log::info!("Segment distribution: {:?}", outcome.distribution);
        self.logger.summary();
        outcome
    }

    fn run(
        &mut self,
        video: &VideoSource,
        slides: &[SlideInput],
        segments: &[TranscriptSegment],
        started: Instant,
    ) -> MatchOutcome {
        let num_slides = slides.len();
        if num_slides == 0 {
            log::warn!("No slides provided, every segment goes to slide 0");
            return uniform_outcome(segments, 0);
        }

        let decoded = decode_slides(slides);
        if decoded.is_empty() {
            log::warn!("None of the {num_slides} slides could be decoded, assigning uniformly");
            return uniform_outcome(segments, num_slides);
        }

        let detected = if num_slides == 1 {
            log::info!("Single slide, skipping video analysis");
            None
        } else {
            self.detect_timeline(video, &decoded, started)
        };

        let (timeline, source) = match detected {
            Some(timeline) if timeline.len() > 1 => (timeline, TimelineSource::Detected),
            Some(_) => {
                log::info!("No slide changes detected, falling back to estimated timeline");
                (self.estimate(segments, num_slides), TimelineSource::Estimated)
            }
            None => (self.estimate(segments, num_slides), TimelineSource::Estimated),
        };

        let assigned = assign_segments(segments, &timeline, num_slides);
        MatchOutcome {
            distribution: slide_distribution(&assigned),
            segments: assigned,
            timeline,
            source,
        }
    }

    fn estimate(&self, segments: &[TranscriptSegment], num_slides: usize) -> Timeline {
        estimate_timeline(segments, num_slides, self.config.placeholder_duration)
    }

    /// `None` whenever frames cannot be analysed to the end.
    fn detect_timeline(
        &mut self,
        video: &VideoSource,
        slides: &[Slide],
        started: Instant,
    ) -> Option<Timeline> {
        let path = match video {
            VideoSource::Local(path) => path,
            VideoSource::Remote(url) => {
                log::info!("Video only available remotely ({url}), estimating timeline");
                return None;
            }
            VideoSource::Unavailable => {
                log::info!("No video available, estimating timeline");
                return None;
            }
        };

        let Some(mut sampler) = self.sampler.take() else {
            log::warn!("Frame sampler already consumed by an earlier run");
            return None;
        };
        let metadata = match sampler.open(path) {
            Ok(metadata) => metadata,
            Err(e) => {
                log::warn!("Cannot sample video: {e}");
                sampler.close();
                return None;
            }
        };

        let interval = self.config.frame_interval_seconds;
        let expected = metadata.expected_samples(interval);
        self.logger.info(&format!(
            "Matching {} slides against ~{expected} samples ({interval}s apart, {:.0}s of video)",
            slides.len(),
            metadata.duration_seconds()
        ));

        let feed = SampleFeed::spawn(
            sampler,
            interval,
            self.config.channel_capacity,
            self.config.timeout().map(|budget| started + budget),
            Arc::clone(&self.cancelled),
        );
        let scorer = SlideMatchScorer::new(slides, &self.components, &self.config);
        let outcome = TimelineBuilder::new(&scorer, self.config.change_confirm_threshold).build(
            feed,
            expected,
            self.logger.as_mut(),
        );

        log::info!(
            "Scored {} samples ({} unreadable), {} timeline entries",
            outcome.samples_scored,
            outcome.samples_skipped,
            outcome.timeline.len()
        );
        if outcome.interrupted {
            log::warn!("Frame analysis did not finish, discarding partial timeline");
            return None;
        }
        Some(outcome.timeline)
    }
}

fn uniform_outcome(segments: &[TranscriptSegment], num_slides: usize) -> MatchOutcome {
    let assigned = assign_uniform(segments, num_slides);
    MatchOutcome {
        distribution: slide_distribution(&assigned),
        segments: assigned,
        timeline: Timeline::default(),
        source: TimelineSource::Uniform,
    }
}
