//! Deterministic cron staggering.
//!
//! Each workflow gets a cron slot derived from its filename so that the
//! generated workflows do not all fire at once.

use sha2::{Digest, Sha512};

/// Hour and minute of a workflow's first daily run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScheduleTime {
    /// Hour offset within the stride, `0..hours_between_runs`.
    pub hour: u32,
    /// Minute, `0..60`.
    pub minute: u32,
}

impl ScheduleTime {
    /// Cron expression firing at this slot every `hours_between_runs` hours.
    pub fn cron(&self, hours_between_runs: u32) -> String {
        format!("{} {}/{} * * *", self.minute, self.hour, hours_between_runs)
    }
}

/// Derive a schedule slot from a filename.
///
/// The SHA-512 digest is read as a big-endian integer `h`; the slot is
/// `minute = h mod 60` and `hour = (h div 60) mod hours_between_runs`.
/// Both only depend on `h mod (60 * hours_between_runs)`, so the digest is
/// folded byte by byte under that modulus instead of building a bignum.
pub fn schedule_time(filename: &str, hours_between_runs: u32) -> ScheduleTime {
    let modulus = 60 * u64::from(hours_between_runs.max(1));
    let digest = Sha512::digest(filename.as_bytes());

    let folded = digest
        .iter()
        .fold(0u64, |acc, byte| (acc * 256 + u64::from(*byte)) % modulus);

    ScheduleTime {
        hour: (folded / 60) as u32,
        minute: (folded % 60) as u32,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn known_filenames_map_to_fixed_slots() {
        assert_eq!(schedule_time("my-job", 12), ScheduleTime { hour: 7, minute: 45 });
        assert_eq!(schedule_time("hello-world", 12), ScheduleTime { hour: 8, minute: 13 });
        assert_eq!(schedule_time("pipeline", 12), ScheduleTime { hour: 6, minute: 4 });
        assert_eq!(schedule_time("my-job.yml", 12), ScheduleTime { hour: 0, minute: 49 });
        assert_eq!(schedule_time("foo-endpoint", 12), ScheduleTime { hour: 7, minute: 56 });
    }

    #[test]
    fn repeated_calls_agree() {
        let first = schedule_time("train-job", 12);
        for _ in 0..10 {
            assert_eq!(schedule_time("train-job", 12), first);
        }
    }

    #[test]
    fn slots_stay_in_range() {
        for i in 0..200 {
            let slot = schedule_time(&format!("job-{i}"), 12);
            assert!(slot.hour < 12);
            assert!(slot.minute < 60);
        }
        let slot = schedule_time("anything", 1);
        assert_eq!(slot.hour, 0);
    }

    #[test]
    fn distribution_is_not_degenerate() {
        let slots: HashSet<ScheduleTime> = (0..100)
            .map(|i| schedule_time(&format!("example-{i}"), 12))
            .collect();
        assert!(slots.len() > 50, "only {} distinct slots", slots.len());
    }

    #[test]
    fn cron_expression_format() {
        let slot = ScheduleTime { hour: 7, minute: 45 };
        assert_eq!(slot.cron(12), "45 7/12 * * *");
    }
}
