use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone};
use chrono_tz::Tz;

/// Resolves a wall-clock `date` + `time` in `tz` to an instant.
///
/// Ambiguous local times (DST fall-back) resolve to the earliest instant. Returns `None` for
/// local times skipped by a DST transition.
pub(crate) fn local_datetime(tz: &Tz, date: NaiveDate, time: NaiveTime) -> Option<DateTime<Tz>> {
    tz.from_local_datetime(&date.and_time(time)).earliest()
}

pub(crate) trait LocalTimeExt {
    /// Returns the first instant strictly after `self` whose local wall-clock time is `time`,
    /// rolling over to the next local day when today's occurrence is not in the future.
    fn next_local_time(&self, time: NaiveTime) -> Option<DateTime<Tz>>;
}

impl LocalTimeExt for DateTime<Tz> {
    fn next_local_time(&self, time: NaiveTime) -> Option<DateTime<Tz>> {
        let tz = self.timezone();
        let today = self.date_naive();

        let candidate = local_datetime(&tz, today, time)?;
        if candidate > *self {
            return Some(candidate);
        }

        local_datetime(&tz, today.succ_opt()?, time)
    }
}

#[cfg(test)]
mod tests;
