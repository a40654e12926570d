use gridcommit_core::RunParameters;
use serde::Serialize;

/// Hours covered by one planning window.
///
/// Window-local hour 0 is the boundary entry holding the initial condition;
/// hours `1..=horizon` are free and map to absolute hours
/// `first_hour..first_hour + horizon`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HorizonWindow {
    pub day: usize,
    /// Absolute hour of window hour 1
    pub first_hour: usize,
    pub horizon: usize,
    /// Leading hours accepted into the log
    pub commit: usize,
}

impl HorizonWindow {
    pub fn for_day(day: usize, params: &RunParameters) -> Self {
        Self {
            day,
            first_hour: day * params.commit_hours + 1,
            horizon: params.horizon_hours,
            commit: params.commit_hours,
        }
    }

    /// Absolute hour of window hour `i` (`1..=horizon`).
    pub fn absolute_hour(&self, i: usize) -> usize {
        self.first_hour + i - 1
    }

    pub fn last_hour(&self) -> usize {
        self.absolute_hour(self.horizon)
    }

    pub fn committed_hours(&self) -> std::ops::RangeInclusive<usize> {
        1..=self.commit
    }
}
