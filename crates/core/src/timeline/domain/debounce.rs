/// What the timeline should do after one observation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DebounceAction {
    /// Nothing to record.
    Hold,
    /// The origin sample disagrees with the default: overwrite entry 0.
    ReplaceInitial(usize),
    /// A candidate was seen often enough in a row: append a change.
    Commit(usize),
}

/// Temporal smoothing of per-frame slide detections.
///
/// A new slide is only committed after `confirm_threshold` consecutive
/// samples agree on it. Seeing the confirmed slide again, or seeing nothing,
/// discards any budding candidate. The very first sample is trusted as is.
#[derive(Clone, Debug)]
pub struct DebounceState {
    confirmed: usize,
    candidate: Option<usize>,
    streak: usize,
    confirm_threshold: usize,
}

impl DebounceState {
    pub fn new(confirm_threshold: usize) -> Self {
        Self {
            confirmed: 0,
            candidate: None,
            streak: 0,
            confirm_threshold: confirm_threshold.max(1),
        }
    }

    #[cfg(test)]
    fn confirmed(&self) -> usize {
        self.confirmed
    }

    /// Candidate slide and how many consecutive samples reported it.
    #[cfg(test)]
    fn pending(&self) -> Option<(usize, usize)> {
        self.candidate.map(|c| (c, self.streak))
    }

    pub fn observe(&mut self, detection: Option<usize>, at_origin: bool) -> DebounceAction {
        if at_origin {
            return match detection {
                Some(index) if index != self.confirmed => {
                    self.confirmed = index;
                    self.reset();
                    DebounceAction::ReplaceInitial(index)
                }
                _ => DebounceAction::Hold,
            };
        }

        let Some(index) = detection else {
            self.reset();
            return DebounceAction::Hold;
        };
        if index == self.confirmed {
            self.reset();
            return DebounceAction::Hold;
        }

        if self.candidate == Some(index) {
            self.streak += 1;
        } else {
            self.candidate = Some(index);
            self.streak = 1;
        }

        if self.streak >= self.confirm_threshold {
            self.confirmed = index;
            self.reset();
            DebounceAction::Commit(index)
        } else {
            DebounceAction::Hold
        }
    }

    fn reset(&mut self) {
        self.candidate = None;
        self.streak = 0;
    }
}
