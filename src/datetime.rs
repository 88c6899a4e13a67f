use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone};

use crate::error::SyncError;

/// 日付文字列のフォーマット。
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// TimeCampに送信する日時文字列のフォーマット。
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// `YYYY-MM-DD`形式の日付をパースする。
pub fn parse_date(s: &str) -> Result<NaiveDate, SyncError> {
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
        .map_err(|e| SyncError::parse(format!("date '{}'", s), e))
}

/// 指定されたタイムゾーンでの日付の00:00:00をエポックミリ秒で返す。
///
/// DSTで00:00:00が2回ある場合は早い方を利用する。00:00:00が存在しない場合はエラーとする。
pub fn local_midnight_millis<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> Result<i64, SyncError> {
    let naive_datetime = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| SyncError::parse(format!("date '{}'", date), "no midnight"))?;

    tz.from_local_datetime(&naive_datetime)
        .earliest()
        .map(|datetime| datetime.timestamp_millis())
        .ok_or_else(|| {
            SyncError::parse(
                format!("date '{}'", date),
                "midnight does not exist in the local time zone",
            )
        })
}

/// `YYYY-MM-DD`形式の日付をLocalタイムゾーンの00:00:00として、エポックミリ秒に変換する。
///
/// # Examples
///
/// ```ignore
/// let millis = date_to_epoch_millis("2024-01-01").unwrap();
/// ```
pub fn date_to_epoch_millis(s: &str) -> Result<i64, SyncError> {
    date_to_epoch_millis_in(s, &Local)
}

/// `date_to_epoch_millis`のタイムゾーン指定版。
pub fn date_to_epoch_millis_in<Tz: TimeZone>(s: &str, tz: &Tz) -> Result<i64, SyncError> {
    local_midnight_millis(parse_date(s)?, tz)
}

/// エポック秒を指定されたタイムゾーンの日時に変換する。
///
/// 表現できない範囲の値の場合は`None`を返す。
pub fn epoch_seconds_to_local<Tz: TimeZone>(seconds: i64, tz: &Tz) -> Option<NaiveDateTime> {
    DateTime::from_timestamp(seconds, 0).map(|datetime| datetime.with_timezone(tz).naive_local())
}

/// 日時を`YYYY-MM-DD HH:MM:SS`形式の文字列にする。
pub fn format_timestamp(datetime: &NaiveDateTime) -> String {
    datetime.format(TIMESTAMP_FORMAT).to_string()
}

/// エポック秒をLocalタイムゾーンの`YYYY-MM-DD HH:MM:SS`形式の文字列に変換する。
pub fn epoch_seconds_to_local_timestamp(seconds: i64) -> Option<String> {
    epoch_seconds_to_timestamp_in(seconds, &Local)
}

/// `epoch_seconds_to_local_timestamp`のタイムゾーン指定版。
pub fn epoch_seconds_to_timestamp_in<Tz: TimeZone>(seconds: i64, tz: &Tz) -> Option<String> {
    epoch_seconds_to_local(seconds, tz).map(|datetime| format_timestamp(&datetime))
}

/// ミリ秒を秒に変換する。負の値も含めて切り捨てる。
pub fn millis_to_seconds(millis: i64) -> i64 {
    millis.div_euclid(1000)
}
