use chrono::{Duration, NaiveDate};

/// Inclusive date window to fetch from the measurement source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Decide the date window for the next cycle, or `None` when caught up.
///
/// Before the initial backfill the window covers the configured number of
/// days back from today, regardless of any stale last-fetched date.
/// Afterwards it resumes from the day after the last committed date. Today is
/// never included: same-day readings are still unstable at the source.
pub fn plan_window(
    initial_backfill_done: bool,
    backfill_days: u32,
    last_fetched_date: Option<NaiveDate>,
    today: NaiveDate,
) -> Option<FetchWindow> {
    let yesterday = today - Duration::days(1);

    let start = if !initial_backfill_done {
        today - Duration::days(backfill_days as i64)
    } else {
        match last_fetched_date {
            Some(last) => last + Duration::days(1),
            None => yesterday,
        }
    };

    if yesterday < start {
        return None;
    }

    Some(FetchWindow {
        start,
        end: yesterday,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_backfill_window_spans_configured_days() {
        let window = plan_window(false, 7, None, date(2024, 3, 10)).unwrap();
        assert_eq!(window.start, date(2024, 3, 3));
        assert_eq!(window.end, date(2024, 3, 9));
    }

    #[test]
    fn test_backfill_ignores_stale_last_fetched_date() {
        let stale = Some(date(2024, 3, 8));
        let window = plan_window(false, 7, stale, date(2024, 3, 10)).unwrap();
        assert_eq!(window.start, date(2024, 3, 3));
        assert_eq!(window.end, date(2024, 3, 9));
    }

    #[test]
    fn test_incremental_resumes_after_last_fetched_date() {
        let window = plan_window(true, 7, Some(date(2024, 3, 5)), date(2024, 3, 10)).unwrap();
        assert_eq!(window.start, date(2024, 3, 6));
        assert_eq!(window.end, date(2024, 3, 9));
    }

    #[test]
    fn test_incremental_without_history_fetches_yesterday() {
        let window = plan_window(true, 7, None, date(2024, 3, 10)).unwrap();
        assert_eq!(window.start, date(2024, 3, 9));
        assert_eq!(window.end, date(2024, 3, 9));
    }

    #[test]
    fn test_caught_up_yields_empty_window() {
        assert_eq!(
            plan_window(true, 7, Some(date(2024, 3, 9)), date(2024, 3, 10)),
            None
        );
        assert_eq!(
            plan_window(true, 7, Some(date(2024, 3, 12)), date(2024, 3, 10)),
            None
        );
    }

    #[test]
    fn test_zero_backfill_days_yields_empty_window() {
        assert_eq!(plan_window(false, 0, None, date(2024, 3, 10)), None);
    }

    #[test]
    fn test_today_is_never_included() {
        let today = date(2024, 3, 10);
        let window = plan_window(false, 30, None, today).unwrap();
        assert!(window.end < today);
        let window = plan_window(true, 7, Some(date(2024, 3, 1)), today).unwrap();
        assert!(window.end < today);
    }
}
