use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{Local, NaiveDate, TimeZone};
use log::{debug, info, warn};
use reqwest::{
    header::{AUTHORIZATION, CONTENT_TYPE},
    Client,
};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

#[cfg(test)]
use mockall::automock;

use crate::datetime::local_midnight_millis;
use crate::error::SyncError;
use crate::http::{read_success_body, transport_error};
use crate::time_entry::SourceTimeEntry;

pub const DEFAULT_API_URL: &str = "https://api.clickup.com/api/v2";

/// ClickUp APIのレスポンスをデシリアライズするための構造体。
///
/// 1件のデコード失敗で全体が失敗しないよう、要素は1件ずつデコードする。
#[derive(Debug, Deserialize)]
struct ClickUpTimeEntriesResponse {
    #[serde(default)]
    data: Option<Vec<Value>>,
}

/// ClickUpのtime entry。
///
/// `start`, `end`, `duration`は文字列で返ってくるため、数値と文字列の両方を受け付ける。
#[derive(Debug, Deserialize)]
struct ClickUpTimeEntry {
    #[serde(default, deserialize_with = "deserialize_text")]
    id: String,
    #[serde(default, deserialize_with = "deserialize_text")]
    description: String,
    #[serde(default)]
    task: Option<ClickUpTask>,
    #[serde(default, deserialize_with = "deserialize_millis")]
    start: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_millis")]
    end: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_millis")]
    duration: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
struct ClickUpTask {
    #[serde(default, deserialize_with = "deserialize_text")]
    id: String,
    #[serde(default, deserialize_with = "deserialize_text")]
    name: String,
    #[serde(default)]
    tags: Option<Vec<ClickUpTag>>,
}

#[derive(Debug, Deserialize)]
struct ClickUpTag {
    #[serde(default, deserialize_with = "deserialize_text")]
    name: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Millis {
    Number(i64),
    Text(String),
    Other(Value),
}

/// ミリ秒の値を読み取る。整数として解釈できない値は欠損として扱う。
fn deserialize_millis<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Millis>::deserialize(deserializer)?;

    Ok(match value {
        Some(Millis::Number(millis)) => Some(millis),
        Some(Millis::Text(text)) => text.trim().parse().ok(),
        Some(Millis::Other(_)) | None => None,
    })
}

/// 文字列の値を読み取る。数値は文字列にし、`null`などそれ以外は空文字列とする。
fn deserialize_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(text)) => text,
        Some(Value::Number(number)) => number.to_string(),
        _ => String::new(),
    })
}

impl From<ClickUpTimeEntry> for SourceTimeEntry {
    fn from(entry: ClickUpTimeEntry) -> Self {
        let task = entry.task.unwrap_or_default();

        Self {
            id: entry.id,
            description: entry.description,
            task_id: task.id,
            task_name: task.name,
            tags: task
                .tags
                .unwrap_or_default()
                .into_iter()
                .map(|tag| tag.name)
                .filter(|name| !name.is_empty())
                .collect(),
            start_millis: entry.start,
            end_millis: entry.end,
            duration_millis: entry.duration.unwrap_or(0),
        }
    }
}

/// `data`の1要素をデコードする。
///
/// デコードできない要素は開始、終了日時のない`SourceTimeEntry`にして、同期処理側でスキップさせる。
fn decode_time_entry(value: Value) -> SourceTimeEntry {
    let id = value
        .get("id")
        .and_then(|id| match id {
            Value::String(id) => Some(id.clone()),
            Value::Number(id) => Some(id.to_string()),
            _ => None,
        })
        .unwrap_or_default();

    match serde_json::from_value::<ClickUpTimeEntry>(value) {
        Ok(entry) => SourceTimeEntry::from(entry),
        Err(e) => {
            warn!("Failed to decode ClickUp time entry '{}': {}", id, e);
            SourceTimeEntry {
                id,
                ..Default::default()
            }
        }
    }
}

/// ClickUpからtime entryを取得する条件。
#[derive(Clone, Debug, PartialEq)]
pub struct TimeEntryQuery {
    pub team_id: String,
    pub assignee_id: String,
    pub list_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// 取得期間をエポックミリ秒の範囲に変換する。
///
/// 開始日の00:00:00から終了日の23:59:59.999までを範囲とする。
pub fn query_window_millis<Tz: TimeZone>(
    query: &TimeEntryQuery,
    tz: &Tz,
) -> Result<(i64, i64), SyncError> {
    let start = local_midnight_millis(query.start_date, tz)?;
    let next_day = query.end_date.succ_opt().ok_or_else(|| {
        SyncError::parse(format!("date '{}'", query.end_date), "no following day")
    })?;
    let end = local_midnight_millis(next_day, tz)? - 1;

    Ok((start, end))
}

/// ClickUpのtime entryを取得するためのリポジトリ。
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ClickUpRepository: Send + Sync {
    /// 条件に一致するtime entryを取得する。
    async fn read_time_entries(
        &self,
        query: &TimeEntryQuery,
    ) -> Result<Vec<SourceTimeEntry>, SyncError>;
}

/// ClickUp APIと通信するためのクライアント。
///
/// # Examples
///
/// ```ignore
/// let client = ClickUpClient::new(DEFAULT_API_URL, &api_key, Duration::from_secs(30)).unwrap();
/// let time_entries = client.read_time_entries(&query).await.unwrap();
/// ```
pub struct ClickUpClient {
    client: Client,
    api_url: String,
    api_key: String,
}

impl ClickUpClient {
    /// 新しい`ClickUpClient`を返す。
    ///
    /// # Arguments
    ///
    /// * `api_url` - ClickUp APIのベースURL
    /// * `api_key` - ClickUpのAPIキー
    /// * `timeout` - 1リクエストあたりのタイムアウト
    pub fn new(api_url: &str, api_key: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client for ClickUp")?;

        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }
}

#[async_trait]
impl ClickUpRepository for ClickUpClient {
    async fn read_time_entries(
        &self,
        query: &TimeEntryQuery,
    ) -> Result<Vec<SourceTimeEntry>, SyncError> {
        let (start_millis, end_millis) = query_window_millis(query, &Local)?;
        let url = format!("{}/team/{}/time_entries", self.api_url, query.team_id);
        debug!(
            "Request ClickUp time entries: {} ({} - {})",
            url, start_millis, end_millis
        );

        let response = self
            .client
            .get(&url)
            .header(AUTHORIZATION, self.api_key.as_str())
            .header(CONTENT_TYPE, "application/json")
            .query(&[
                ("assignee", query.assignee_id.clone()),
                ("list_id", query.list_id.clone()),
                ("start_date", start_millis.to_string()),
                ("end_date", end_millis.to_string()),
            ])
            .send()
            .await
            .map_err(transport_error(&url))?;
        let body = read_success_body(&url, response).await?;
        let parsed: ClickUpTimeEntriesResponse = serde_json::from_str(&body)
            .map_err(|e| SyncError::parse("ClickUp time entries response", e))?;
        let data = parsed.data.unwrap_or_default();
        info!("length of ClickUp time entries: {}", data.len());

        Ok(data.into_iter().map(decode_time_entry).collect())
    }
}
