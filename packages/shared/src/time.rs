//! Time-related utilities with clock abstraction for testability.

use std::sync::{
    Arc,
    atomic::{AtomicI64, Ordering},
};

use chrono::{DateTime, Local, SecondsFormat, Utc};

/// Clock trait for dependency injection and testing
pub trait Clock: Send + Sync {
    /// Get current Unix timestamp (milliseconds)
    fn now_millis(&self) -> i64;
}

/// System clock implementation (uses actual system time)
#[derive(Debug, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        current_timestamp_millis()
    }
}

/// Fixed clock implementation for testing (returns a fixed time)
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    fixed_time: i64,
}

impl FixedClock {
    /// Create a new fixed clock with the given timestamp
    pub fn new(fixed_time_millis: i64) -> Self {
        Self {
            fixed_time: fixed_time_millis,
        }
    }
}

impl Clock for FixedClock {
    fn now_millis(&self) -> i64 {
        self.fixed_time
    }
}

/// Issues store-side write timestamps.
///
/// Every issued value is strictly greater than the previous one, even when
/// the wall clock stalls or steps backwards.
pub struct TimestampIssuer {
    clock: Arc<dyn Clock>,
    last_issued: AtomicI64,
}

impl TimestampIssuer {
    /// Create a new issuer backed by the given clock
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            last_issued: AtomicI64::new(i64::MIN),
        }
    }

    /// Issue the next timestamp (milliseconds)
    pub fn issue(&self) -> i64 {
        let now = self.clock.now_millis();
        let previous = self
            .last_issued
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(next_timestamp(last, now))
            })
            .unwrap_or_else(|last| last);
        next_timestamp(previous, now)
    }
}

impl Default for TimestampIssuer {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

fn next_timestamp(last: i64, now: i64) -> i64 {
    if last == i64::MIN {
        now
    } else {
        now.max(last.saturating_add(1))
    }
}

/// Get current Unix timestamp (milliseconds)
pub fn current_timestamp_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Convert Unix timestamp (milliseconds) to UTC RFC 3339 format
pub fn timestamp_to_rfc3339(timestamp_millis: i64) -> String {
    match DateTime::<Utc>::from_timestamp_millis(timestamp_millis) {
        Some(dt) => dt.to_rfc3339_opts(SecondsFormat::Millis, true),
        None => format!("invalid timestamp ({})", timestamp_millis),
    }
}

/// Format a Unix timestamp (milliseconds) in the local time zone for display,
/// e.g. `Mar 05, 2025 at 09:30 AM`.
pub fn format_local_datetime(timestamp_millis: i64) -> String {
    match DateTime::<Utc>::from_timestamp_millis(timestamp_millis) {
        Some(dt) => dt
            .with_timezone(&Local)
            .format("%b %d, %Y at %I:%M %p")
            .to_string(),
        None => "Date Missing".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock_returns_non_zero_timestamp() {
        // テスト項目: SystemClock が 0 以外のタイムスタンプを返す
        // given (前提条件):
        let clock = SystemClock;

        // when (操作):
        let timestamp = clock.now_millis();

        // then (期待する結果):
        assert!(timestamp > 0);
    }

    #[test]
    fn test_fixed_clock_returns_fixed_timestamp() {
        // テスト項目: FixedClock が固定されたタイムスタンプを返す
        // given (前提条件):
        let fixed_time = 1234567890123;
        let clock = FixedClock::new(fixed_time);

        // when (操作):
        let timestamp1 = clock.now_millis();
        let timestamp2 = clock.now_millis();

        // then (期待する結果):
        assert_eq!(timestamp1, fixed_time);
        assert_eq!(timestamp2, fixed_time);
    }

    #[test]
    fn test_timestamp_issuer_is_strictly_monotonic_on_stalled_clock() {
        // テスト項目: 時計が止まっていても発行されるタイムスタンプは単調増加する
        // given (前提条件):
        let issuer = TimestampIssuer::new(Arc::new(FixedClock::new(1000)));

        // when (操作):
        let first = issuer.issue();
        let second = issuer.issue();
        let third = issuer.issue();

        // then (期待する結果):
        assert_eq!(first, 1000);
        assert_eq!(second, 1001);
        assert_eq!(third, 1002);
    }

    #[test]
    fn test_timestamp_issuer_follows_clock_when_it_advances() {
        // テスト項目: 時計が進んでいれば時計の値がそのまま使われる
        // given (前提条件):
        let issuer = TimestampIssuer::new(Arc::new(SystemClock));

        // when (操作):
        let first = issuer.issue();
        std::thread::sleep(std::time::Duration::from_millis(10));
        let second = issuer.issue();

        // then (期待する結果):
        assert!(second >= first + 10);
    }

    #[test]
    fn test_timestamp_to_rfc3339_format() {
        // テスト項目: タイムスタンプが UTC の RFC 3339 形式に変換される
        // given (前提条件):
        // 2023-01-01 00:00:00.123 UTC in milliseconds
        let timestamp = 1672531200123;

        // when (操作):
        let result = timestamp_to_rfc3339(timestamp);

        // then (期待する結果):
        assert_eq!(result, "2023-01-01T00:00:00.123Z");
    }

    #[test]
    fn test_format_local_datetime_contains_year() {
        // テスト項目: ローカル時刻の表示文字列に年と区切りが含まれる
        // given (前提条件):
        let timestamp = 1688169600000; // 2023-07-01 00:00:00 UTC

        // when (操作):
        let result = format_local_datetime(timestamp);

        // then (期待する結果):
        assert!(result.contains("2023"));
        assert!(result.contains(" at "));
    }

    #[test]
    fn test_format_local_datetime_out_of_range() {
        // テスト項目: 範囲外のタイムスタンプは欠損表示になる
        // given (前提条件):
        let timestamp = i64::MAX;

        // when (操作):
        let result = format_local_datetime(timestamp);

        // then (期待する結果):
        assert_eq!(result, "Date Missing");
    }
}
