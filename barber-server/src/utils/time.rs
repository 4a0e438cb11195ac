//! 时间工具函数 — 业务时区转换
//!
//! 所有日期→时间戳转换统一在 API handler 层完成，
//! repository 层和调度核心只接收 `i64` Unix millis。

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use chrono_tz::Tz;

use super::{AppError, AppResult};

pub const MINUTE_MS: i64 = 60_000;

/// 本地日期时间可接受的格式 (无时区)
const LOCAL_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// 解析日期字符串 (YYYY-MM-DD)
pub fn parse_date(date: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
        .map_err(|_| AppError::validation(format!("Invalid date format: {}", date)))
}

/// 解析时刻 (HH:MM)
pub fn parse_time_of_day(time: &str) -> AppResult<NaiveTime> {
    NaiveTime::parse_from_str(time.trim(), "%H:%M")
        .map_err(|_| AppError::validation(format!("Invalid time format: {} (expected HH:MM)", time)))
}

/// 日期 + 时刻 → Unix millis (业务时区)
///
/// DST gap fallback: 如果本地时间不存在 (夏令时跳跃)，fallback 到 UTC。
pub fn date_time_to_millis(date: NaiveDate, time: NaiveTime, tz: Tz) -> i64 {
    local_to_millis(date.and_time(time), tz)
}

fn local_to_millis(naive: NaiveDateTime, tz: Tz) -> i64 {
    naive
        .and_local_timezone(tz)
        .latest()
        .map(|dt| dt.timestamp_millis())
        .unwrap_or_else(|| naive.and_utc().timestamp_millis())
}

/// 日期开始 (00:00:00) → Unix millis (业务时区)
pub fn day_start_millis(date: NaiveDate, tz: Tz) -> i64 {
    date_time_to_millis(date, NaiveTime::MIN, tz)
}

/// 日期结束 → 次日 00:00:00 的 Unix millis (业务时区)
///
/// 返回次日零点时间戳，调用方使用 `< end` (不含) 语义。
pub fn day_end_millis(date: NaiveDate, tz: Tz) -> i64 {
    let next_day = date.succ_opt().unwrap_or(date);
    day_start_millis(next_day, tz)
}

/// 解析预约开始时间
///
/// 接受 RFC 3339 (带偏移) 或本地时间 `YYYY-MM-DDTHH:MM[:SS]` (按业务时区解释)。
pub fn parse_start_time(raw: &str, tz: Tz) -> AppResult<i64> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.timestamp_millis());
    }
    LOCAL_DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| local_to_millis(naive, tz))
        .ok_or_else(|| AppError::validation(format!("Invalid date format: {}", raw)))
}

/// Unix millis → 本地日期 (业务时区)
pub fn local_date(millis: i64, tz: Tz) -> NaiveDate {
    tz.timestamp_millis_opt(millis)
        .single()
        .map(|dt| dt.date_naive())
        .unwrap_or_default()
}

/// Unix millis → 本地时间字符串 (业务时区)
pub fn format_local(millis: i64, tz: Tz, fmt: &str) -> String {
    tz.timestamp_millis_opt(millis)
        .single()
        .map(|dt| dt.format(fmt).to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_start_time_local_and_rfc3339() {
        let utc = chrono_tz::UTC;
        let local = parse_start_time("2025-07-21T10:00:00", utc).unwrap();
        let local_short = parse_start_time("2025-07-21T10:00", utc).unwrap();
        let rfc = parse_start_time("2025-07-21T10:00:00Z", utc).unwrap();
        assert_eq!(local, rfc);
        assert_eq!(local_short, rfc);

        let sao_paulo = chrono_tz::America::Sao_Paulo;
        let sp = parse_start_time("2025-07-21T10:00:00", sao_paulo).unwrap();
        // UTC-3
        assert_eq!(sp - rfc, 3 * 60 * MINUTE_MS);
    }

    #[test]
    fn test_parse_start_time_rejects_garbage() {
        assert!(parse_start_time("tomorrow at ten", chrono_tz::UTC).is_err());
    }

    #[test]
    fn test_day_bounds() {
        let date = parse_date("2025-07-21").unwrap();
        let tz = chrono_tz::UTC;
        assert_eq!(day_end_millis(date, tz) - day_start_millis(date, tz), 24 * 60 * MINUTE_MS);
    }

    #[test]
    fn test_local_date_and_format() {
        let tz = chrono_tz::UTC;
        let millis = parse_start_time("2025-07-21T23:30:00", tz).unwrap();
        assert_eq!(local_date(millis, tz), parse_date("2025-07-21").unwrap());
        assert_eq!(format_local(millis, tz, "%d/%m/%Y %H:%M"), "21/07/2025 23:30");
        // 同一时刻在圣保罗是当天 20:30
        assert_eq!(
            format_local(millis, chrono_tz::America::Sao_Paulo, "%H:%M"),
            "20:30"
        );
    }
}
