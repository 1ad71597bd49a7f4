use super::*;

use chrono::{Duration, Utc};
use chrono_tz::US::Eastern;

fn four_am() -> NaiveTime {
    NaiveTime::from_hms_opt(4, 0, 0).unwrap()
}

mod local_datetime {
    use super::*;

    #[test]
    fn resolves_winter_offset() {
        let date = NaiveDate::from_ymd_opt(2026, 1, 15).unwrap();
        let time = NaiveTime::from_hms_opt(9, 30, 0).unwrap();

        let resolved = local_datetime(&Eastern, date, time).unwrap();

        // EST is UTC-5
        assert_eq!(
            resolved.with_timezone(&Utc),
            Utc.with_ymd_and_hms(2026, 1, 15, 14, 30, 0).unwrap()
        );
    }

    #[test]
    fn resolves_summer_offset() {
        let date = NaiveDate::from_ymd_opt(2026, 7, 15).unwrap();
        let time = NaiveTime::from_hms_opt(16, 0, 0).unwrap();

        let resolved = local_datetime(&Eastern, date, time).unwrap();

        // EDT is UTC-4
        assert_eq!(
            resolved.with_timezone(&Utc),
            Utc.with_ymd_and_hms(2026, 7, 15, 20, 0, 0).unwrap()
        );
    }

    #[test]
    fn skipped_local_time_is_none() {
        // 2026-03-08 02:30 does not exist in US/Eastern
        let date = NaiveDate::from_ymd_opt(2026, 3, 8).unwrap();
        let time = NaiveTime::from_hms_opt(2, 30, 0).unwrap();

        assert!(local_datetime(&Eastern, date, time).is_none());
    }
}

mod next_local_time {
    use super::*;

    #[test]
    fn before_target_stays_on_same_day() {
        let now = Eastern.with_ymd_and_hms(2026, 1, 15, 3, 0, 0).unwrap();

        let next = now.next_local_time(four_am()).unwrap();

        assert_eq!(next, Eastern.with_ymd_and_hms(2026, 1, 15, 4, 0, 0).unwrap());
    }

    #[test]
    fn after_target_rolls_to_next_day() {
        let now = Eastern.with_ymd_and_hms(2026, 1, 15, 17, 0, 0).unwrap();

        let next = now.next_local_time(four_am()).unwrap();

        assert_eq!(next, Eastern.with_ymd_and_hms(2026, 1, 16, 4, 0, 0).unwrap());
    }

    #[test]
    fn exactly_at_target_rolls_to_next_day() {
        let now = Eastern.with_ymd_and_hms(2026, 1, 15, 4, 0, 0).unwrap();

        let next = now.next_local_time(four_am()).unwrap();

        assert!(next > now);
        assert_eq!(next, Eastern.with_ymd_and_hms(2026, 1, 16, 4, 0, 0).unwrap());
    }

    #[test]
    fn result_is_always_strictly_after_now() {
        let start = Eastern.with_ymd_and_hms(2026, 3, 7, 0, 0, 0).unwrap();

        // Walk across the spring DST transition in 37 minute steps
        for step in 0..200 {
            let now = start + Duration::minutes(37 * step);
            let next = now.next_local_time(four_am()).unwrap();

            assert!(next > now);
            assert!(next - now <= Duration::hours(24));
        }
    }
}
