use chrono::{DateTime, Duration, Utc};

/// Days after signup at which each step of the standard sequence is sent.
pub const STANDARD_DELAY_DAYS: [u32; 8] = [0, 3, 7, 14, 21, 28, 42, 56];

/// Cumulative send offsets for a drip sequence, indexed by step (1-based).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelaySchedule {
    days_after_signup: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScheduleError {
    #[error("delay schedule has no steps")]
    Empty,
    #[error("delay schedule has {0} steps; at most 255 are supported")]
    TooManySteps(usize),
    #[error("step {step} is scheduled before the step that precedes it")]
    Decreasing { step: u8 },
}

impl DelaySchedule {
    pub fn new(days_after_signup: Vec<u32>) -> Result<Self, ScheduleError> {
        if days_after_signup.is_empty() {
            return Err(ScheduleError::Empty);
        }
        if days_after_signup.len() > usize::from(u8::MAX) {
            return Err(ScheduleError::TooManySteps(days_after_signup.len()));
        }
        for (idx, pair) in days_after_signup.windows(2).enumerate() {
            if pair[1] < pair[0] {
                return Err(ScheduleError::Decreasing {
                    step: u8::try_from(idx + 2).unwrap_or(u8::MAX),
                });
            }
        }
        Ok(Self { days_after_signup })
    }

    pub fn standard() -> Self {
        Self {
            days_after_signup: STANDARD_DELAY_DAYS.to_vec(),
        }
    }

    pub fn len(&self) -> usize {
        self.days_after_signup.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days_after_signup.is_empty()
    }

    /// Number of the last step; a lead at this step has finished the sequence.
    pub fn final_step(&self) -> u8 {
        u8::try_from(self.days_after_signup.len()).unwrap_or(u8::MAX)
    }

    pub fn delay_days(&self, step: u8) -> Option<u32> {
        let idx = usize::from(step).checked_sub(1)?;
        self.days_after_signup.get(idx).copied()
    }

    /// `(step, days_after_signup)` pairs in step order.
    pub fn steps(&self) -> impl Iterator<Item = (u8, u32)> + '_ {
        (1..=u8::MAX).zip(self.days_after_signup.iter().copied())
    }

    pub fn due_at(&self, signed_up_at: DateTime<Utc>, step: u8) -> Option<DateTime<Utc>> {
        self.delay_days(step)
            .map(|days| signed_up_at + Duration::days(i64::from(days)))
    }

    /// Whether a lead that has received `last_sent` is owed its next email at `now`.
    pub fn is_due(&self, signed_up_at: DateTime<Utc>, last_sent: u8, now: DateTime<Utc>) -> bool {
        last_sent
            .checked_add(1)
            .and_then(|next| self.due_at(signed_up_at, next))
            .is_some_and(|due| now >= due)
    }
}

impl Default for DelaySchedule {
    fn default() -> Self {
        Self::standard()
    }
}
