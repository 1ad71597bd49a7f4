use super::*;

#[test]
fn test_backoff_doubles_until_max() {
    let mut backoff = ReconnectBackoff::new(Duration::from_secs(1), Duration::from_secs(30));

    let delays: Vec<u64> = (0..7).map(|_| backoff.next_delay().as_secs()).collect();

    assert_eq!(delays, vec![1, 2, 4, 8, 16, 30, 30]);
}

#[test]
fn test_backoff_reset() {
    let mut backoff = ReconnectBackoff::new(Duration::from_secs(1), Duration::from_secs(30));

    backoff.next_delay();
    backoff.next_delay();
    backoff.reset();

    assert_eq!(backoff.next_delay(), Duration::from_secs(1));
}

#[test]
fn test_backoff_max_below_min() {
    let mut backoff = ReconnectBackoff::new(Duration::from_secs(5), Duration::from_secs(1));

    assert_eq!(backoff.next_delay(), Duration::from_secs(5));
    assert_eq!(backoff.next_delay(), Duration::from_secs(5));
}
