//! Analysis windows: a fixed pre-period and a user-chosen post-period.

use chrono::{Datelike, Months, NaiveDate};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WindowError {
    #[error("post-period start {start} is before the event month {event}")]
    StartBeforeEvent { start: NaiveDate, event: NaiveDate },
    #[error("post-period end {end} is past the last available month {last}")]
    EndPastData { end: NaiveDate, last: NaiveDate },
    #[error("post-period end {end} must be after its start {start}")]
    EmptyPostPeriod { start: NaiveDate, end: NaiveDate },
}

/// An inclusive month range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Period {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Period {
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

/// Pre- and post-period pair handed to the estimator.
#[derive(Debug, Clone, Copy)]
pub struct AnalysisWindow {
    pub pre: Period,
    pub post: Period,
}

impl AnalysisWindow {
    /// Build a window from the fixed pre-period constants and a user-chosen
    /// post-period. The pre-period always ends the month before the event.
    pub fn new(
        pre_start: NaiveDate,
        event_month: NaiveDate,
        post: Period,
        last_month: NaiveDate,
    ) -> Result<Self, WindowError> {
        if post.start < event_month {
            return Err(WindowError::StartBeforeEvent {
                start: post.start,
                event: event_month,
            });
        }
        if post.end > last_month {
            return Err(WindowError::EndPastData {
                end: post.end,
                last: last_month,
            });
        }
        if post.end <= post.start {
            return Err(WindowError::EmptyPostPeriod {
                start: post.start,
                end: post.end,
            });
        }

        Ok(Self {
            pre: Period {
                start: pre_start,
                end: event_month - Months::new(1),
            },
            post,
        })
    }
}

/// First day of the month containing `date`.
pub fn month_floor(date: NaiveDate) -> NaiveDate {
    NaiveDate::from_ymd_opt(date.year(), date.month(), 1).unwrap_or(date)
}

/// Valid post-period start months: event month through the month before the
/// last available one.
pub fn start_options(event_month: NaiveDate, last_month: NaiveDate) -> Vec<NaiveDate> {
    months_between(event_month, last_month - Months::new(1))
}

/// Valid post-period end months for a chosen start: one month after the start
/// through the last available month.
pub fn end_options(post_start: NaiveDate, last_month: NaiveDate) -> Vec<NaiveDate> {
    months_between(post_start + Months::new(1), last_month)
}

fn months_between(from: NaiveDate, to: NaiveDate) -> Vec<NaiveDate> {
    let mut months = Vec::new();
    let mut current = month_floor(from);
    let to = month_floor(to);
    while current <= to {
        months.push(current);
        current = current + Months::new(1);
    }
    months
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, 1).unwrap()
    }

    #[test]
    fn valid_post_periods_lie_within_data_range() {
        let event = ymd(2023, 10);
        let last = ymd(2025, 6);

        for start in start_options(event, last) {
            assert!(start >= event && start < last);
            for end in end_options(start, last) {
                assert!(start < end && end <= last);
            }
        }
    }

    #[test]
    fn end_minimum_is_start_plus_one_month() {
        let start = ymd(2023, 10);
        let ends = end_options(start, ymd(2025, 6));
        assert_eq!(ends.first().copied(), Some(ymd(2023, 11)));
        // end equal to start is never offered
        assert!(!ends.contains(&start));
    }

    #[test]
    fn pre_period_ends_month_before_event() {
        let window = AnalysisWindow::new(
            ymd(2011, 4),
            ymd(2023, 10),
            Period {
                start: ymd(2023, 10),
                end: ymd(2024, 6),
            },
            ymd(2025, 6),
        )
        .expect("valid window");
        assert_eq!(window.pre.end, ymd(2023, 9));
        assert_eq!(window.pre.start, ymd(2011, 4));
    }

    #[test]
    fn rejects_out_of_range_post_periods() {
        let pre = ymd(2011, 4);
        let event = ymd(2023, 10);
        let last = ymd(2025, 6);

        let before_event = AnalysisWindow::new(
            pre,
            event,
            Period {
                start: ymd(2023, 9),
                end: ymd(2024, 1),
            },
            last,
        );
        assert!(matches!(before_event, Err(WindowError::StartBeforeEvent { .. })));

        let past_data = AnalysisWindow::new(
            pre,
            event,
            Period {
                start: ymd(2023, 10),
                end: ymd(2025, 7),
            },
            last,
        );
        assert!(matches!(past_data, Err(WindowError::EndPastData { .. })));

        let empty = AnalysisWindow::new(
            pre,
            event,
            Period {
                start: ymd(2023, 10),
                end: ymd(2023, 10),
            },
            last,
        );
        assert!(matches!(empty, Err(WindowError::EmptyPostPeriod { .. })));
    }
}
