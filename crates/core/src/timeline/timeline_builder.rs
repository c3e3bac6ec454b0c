use std::time::Instant;

use crate::matching::domain::frame_scorer::FrameScorer;
use crate::pipeline::pipeline_logger::PipelineLogger;
use crate::shared::frame_sample::FrameSample;
use crate::timeline::domain::debounce::{DebounceAction, DebounceState};
use crate::timeline::domain::timeline::Timeline;

/// One item of the sample feed the builder consumes.
#[derive(Debug)]
pub enum SampleEvent {
    Sample(FrameSample),
    /// A sample position whose frame could not be decoded.
    Unreadable { timestamp: f64, reason: String },
    /// Sampling was stopped early (timeout or cancellation). Nothing follows.
    Interrupted,
}

#[derive(Clone, Debug, PartialEq)]
pub struct BuildOutcome {
    pub timeline: Timeline,
    pub samples_scored: usize,
    pub samples_skipped: usize,
    pub interrupted: bool,
}

/// Walks sampled frames in time order and turns per-frame detections into
/// a debounced slide timeline.
///
/// Sequential by nature: whether sample n commits a change depends on what
/// samples before it reported.
pub struct TimelineBuilder<'a> {
    scorer: &'a dyn FrameScorer,
    confirm_threshold: usize,
}

impl<'a> TimelineBuilder<'a> {
    pub fn new(scorer: &'a dyn FrameScorer, confirm_threshold: usize) -> Self {
        Self {
            scorer,
            confirm_threshold,
        }
    }

    /// `expected_samples` only drives progress reporting.
    pub fn build(
        &self,
        events: impl IntoIterator<Item = SampleEvent>,
        expected_samples: usize,
        logger: &mut dyn PipelineLogger,
    ) -> BuildOutcome {
        let mut timeline = Timeline::starting_with(0);
        let mut debounce = DebounceState::new(self.confirm_threshold);
        let mut scored = 0usize;
        let mut skipped = 0usize;
        let mut interrupted = false;

        for event in events {
            let sample = match event {
                SampleEvent::Sample(sample) => sample,
                SampleEvent::Unreadable { timestamp, reason } => {
                    log::warn!("Skipping unreadable sample at {timestamp:.2}s: {reason}");
                    skipped += 1;
                    continue;
                }
                SampleEvent::Interrupted => {
                    log::warn!("Sampling interrupted after {scored} samples");
                    interrupted = true;
                    break;
                }
            };

            let t0 = Instant::now();
            let detection = self.scorer.score_frame(sample.image());
            logger.timing("score", t0.elapsed().as_secs_f64() * 1000.0);
            if let Some(score) = detection {
                logger.metric("confidence", score.confidence);
            }

            let time = sample.timestamp();
            match debounce.observe(detection.map(|s| s.slide_index), time <= 0.0) {
                DebounceAction::Hold => {}
                DebounceAction::ReplaceInitial(index) => {
                    log::info!("Slide {index} on screen at start");
                    timeline.set_initial_slide(index);
                }
                DebounceAction::Commit(index) => {
                    log::info!("Slide change confirmed at {time:.2}s -> slide {index}");
                    timeline.push(time, index);
                }
            }

            scored += 1;
            logger.progress(scored + skipped, expected_samples.max(scored + skipped));
        }

        logger.metric("timeline_entries", timeline.len() as f64);
        BuildOutcome {
            timeline,
            samples_scored: scored,
            samples_skipped: skipped,
            interrupted,
        }
    }
}
