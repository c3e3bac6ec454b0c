use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};

use crate::shared::frame_sample::FrameSample;
use crate::timeline::timeline_builder::SampleEvent;
use crate::video::domain::frame_sampler::{FrameSampler, SampleError};

enum FeedMessage {
    Sample(Result<FrameSample, SampleError>),
    Done,
}

/// Decodes samples on a reader thread and hands them to the consumer over
/// a bounded channel, so decoding overlaps with scoring.
///
/// Iterating yields [`SampleEvent`]s. The feed ends with `None` after the
/// last sample, or with a single [`SampleEvent::Interrupted`] when the
/// deadline passes, the cancel flag is raised, or the reader dies early.
///
/// The reader is joined on drop only after a complete pass. Otherwise it is
/// told to stop and left to finish its current frame on its own, so a
/// stalled decoder never holds up the consumer.
pub struct SampleFeed {
    rx: Option<Receiver<FeedMessage>>,
    reader: Option<JoinHandle<()>>,
    stop: Arc<AtomicBool>,
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
    finished: bool,
    completed: bool,
}

impl SampleFeed {
    /// `sampler` must already be opened.
    pub fn spawn(
        sampler: Box<dyn FrameSampler>,
        interval_seconds: f64,
        capacity: usize,
        deadline: Option<Instant>,
        cancelled: Arc<AtomicBool>,
    ) -> Self {
        let (tx, rx) = crossbeam_channel::bounded(capacity.max(1));
        let stop = Arc::new(AtomicBool::new(false));
        let reader = spawn_reader(
            sampler,
            interval_seconds,
            tx,
            Arc::clone(&stop),
            Arc::clone(&cancelled),
        );
        Self {
            rx: Some(rx),
            reader: Some(reader),
            stop,
            cancelled,
            deadline,
            finished: false,
            completed: false,
        }
    }

    fn interrupt(&mut self, why: &str) -> Option<SampleEvent> {
        log::warn!("{why}, stopping frame sampling");
        self.finished = true;
        self.stop.store(true, Ordering::Relaxed);
        Some(SampleEvent::Interrupted)
    }
}

fn spawn_reader(
    mut sampler: Box<dyn FrameSampler>,
    interval_seconds: f64,
    tx: Sender<FeedMessage>,
    stop: Arc<AtomicBool>,
    cancelled: Arc<AtomicBool>,
) -> JoinHandle<()> {
    std::thread::spawn(move || {
        let mut completed = true;
        for sample in sampler.samples(interval_seconds) {
            if stop.load(Ordering::Relaxed) || cancelled.load(Ordering::Relaxed) {
                completed = false;
                break;
            }
            if tx.send(FeedMessage::Sample(sample)).is_err() {
                completed = false;
                break;
            }
        }
        if completed {
            let _ = tx.send(FeedMessage::Done);
        }
        sampler.close();
    })
}

impl Iterator for SampleFeed {
    type Item = SampleEvent;

    fn next(&mut self) -> Option<SampleEvent> {
        if self.finished {
            return None;
        }
        if self.cancelled.load(Ordering::Relaxed) {
            return self.interrupt("Cancelled");
        }
        if self.deadline.is_some_and(|d| Instant::now() >= d) {
            return self.interrupt("Time limit reached");
        }

        let rx = self.rx.as_ref()?;
        let received = match self.deadline {
            Some(deadline) => rx.recv_deadline(deadline),
            None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };

        match received {
            Ok(FeedMessage::Sample(Ok(sample))) => Some(SampleEvent::Sample(sample)),
            Ok(FeedMessage::Sample(Err(e))) => Some(SampleEvent::Unreadable {
                timestamp: e.timestamp,
                reason: e.reason,
            }),
            Ok(FeedMessage::Done) => {
                self.finished = true;
                self.completed = true;
                None
            }
            Err(RecvTimeoutError::Timeout) => self.interrupt("Time limit reached"),
            Err(RecvTimeoutError::Disconnected) => {
                if self.cancelled.load(Ordering::Relaxed) {
                    self.interrupt("Cancelled")
                } else {
                    self.interrupt("Frame reader stopped early")
                }
            }
        }
    }
}

impl Drop for SampleFeed {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        // Unblocks a reader waiting on a full channel.
        drop(self.rx.take());
        let Some(handle) = self.reader.take() else {
            return;
        };
        if !self.completed {
            log::debug!("Detaching frame reader; it closes its sampler when it stops");
            return;
        }
        if handle.join().is_err() {
            log::error!("Frame reader thread panicked");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{uniform_image, wait_for, ScriptedSampler};
    use std::time::Duration;

    fn feed(sampler: ScriptedSampler, deadline: Option<Instant>) -> SampleFeed {
        SampleFeed::spawn(
            Box::new(sampler),
            1.0,
            2,
            deadline,
            Arc::new(AtomicBool::new(false)),
        )
    }

    fn frames(n: usize) -> Vec<Option<image::GrayImage>> {
        (0..n).map(|i| Some(uniform_image(8, 8, i as u8))).collect()
    }

    #[test]
    fn test_yields_every_sample_then_ends() {
        let events: Vec<_> = feed(ScriptedSampler::new(frames(5)), None).collect();

        assert_eq!(events.len(), 5);
        let times: Vec<f64> = events
            .iter()
            .map(|e| match e {
                SampleEvent::Sample(s) => s.timestamp(),
                other => panic!("unexpected event {other:?}"),
            })
            .collect();
        assert_eq!(times, vec![0.0, 1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_unreadable_frames_are_reported() {
        let sampler = ScriptedSampler::new(vec![Some(uniform_image(8, 8, 0)), None]);
        let events: Vec<_> = feed(sampler, None).collect();

        assert!(matches!(events[0], SampleEvent::Sample(_)));
        assert!(matches!(
            events[1],
            SampleEvent::Unreadable { timestamp, .. } if timestamp == 1.0
        ));
    }

    #[test]
    fn test_sampler_closed_after_full_pass() {
        let sampler = ScriptedSampler::new(frames(3));
        let closed = Arc::clone(&sampler.closed);
        let mut feed = feed(sampler, None);
        while feed.next().is_some() {}
        drop(feed);
        assert!(closed.load(Ordering::SeqCst));
    }

    #[test]
    fn test_expired_deadline_interrupts_immediately() {
        let past = Instant::now() - Duration::from_millis(1);
        let events: Vec<_> = feed(ScriptedSampler::new(frames(5)), Some(past)).collect();

        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], SampleEvent::Interrupted));
    }

    #[test]
    fn test_slow_reader_hits_deadline() {
        let sampler = ScriptedSampler::new(frames(50)).with_delay(Duration::from_millis(40));
        let deadline = Instant::now() + Duration::from_millis(100);
        let events: Vec<_> = feed(sampler, Some(deadline)).collect();

        assert!(events.len() < 50);
        assert!(matches!(events.last(), Some(SampleEvent::Interrupted)));
    }

    #[test]
    fn test_cancel_flag_interrupts() {
        let cancelled = Arc::new(AtomicBool::new(false));
        let mut feed = SampleFeed::spawn(
            Box::new(ScriptedSampler::new(frames(20))),
            1.0,
            1,
            None,
            Arc::clone(&cancelled),
        );

        assert!(matches!(feed.next(), Some(SampleEvent::Sample(_))));
        cancelled.store(true, Ordering::Relaxed);
        assert!(matches!(feed.next(), Some(SampleEvent::Interrupted)));
        assert!(feed.next().is_none());
    }

    #[test]
    fn test_dropping_early_stops_reader() {
        let sampler = ScriptedSampler::new(frames(100));
        let closed = Arc::clone(&sampler.closed);
        let mut feed = feed(sampler, None);
        feed.next();
        drop(feed);
        assert!(wait_for(&closed, Duration::from_secs(5)));
    }

    #[test]
    fn test_stalled_reader_does_not_outlive_deadline() {
        let sampler = ScriptedSampler::new(frames(3)).with_delay(Duration::from_secs(3));
        let closed = Arc::clone(&sampler.closed);
        let started = Instant::now();
        let deadline = started + Duration::from_millis(200);

        let events: Vec<_> = feed(sampler, Some(deadline)).collect();

        assert!(matches!(events.as_slice(), [SampleEvent::Interrupted]));
        assert!(
            started.elapsed() < Duration::from_secs(1),
            "consumer held for {:?}",
            started.elapsed()
        );
        assert!(!closed.load(Ordering::SeqCst));
    }
}
