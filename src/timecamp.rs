use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use log::debug;
use reqwest::{
    header::{ACCEPT, CONTENT_TYPE},
    Client, StatusCode,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[cfg(test)]
use mockall::automock;

use crate::datetime::DATE_FORMAT;
use crate::error::SyncError;
use crate::http::{read_body, read_success_body, transport_error};
use crate::time_entry::{CreatedEntry, NewTimeEntry, SinkTimeEntry, TagRef};

pub const DEFAULT_API_URL: &str = "https://app.timecamp.com/third_party/api";

/// TimeCamp APIのtime entryをデシリアライズするための構造体。
#[derive(Debug, Deserialize)]
struct TimeCampTimeEntry {
    #[serde(default)]
    description: Option<String>,
}

/// TimeCamp APIにtime entryを登録するためのリクエストボディ。
///
/// `get_entries`はAPIが要求するため送信するが、同期処理には影響しない。
#[derive(Debug, Serialize)]
struct TimeCampNewTimeEntry<'a> {
    get_entries: u8,
    date: String,
    start: String,
    start_time: String,
    end: String,
    end_time: String,
    duration: i64,
    tags: &'a [TagRef],
    description: String,
}

impl<'a> From<&'a NewTimeEntry> for TimeCampNewTimeEntry<'a> {
    fn from(entry: &'a NewTimeEntry) -> Self {
        let start = entry.start_timestamp();
        let end = entry.end_timestamp();

        Self {
            get_entries: 0,
            date: entry.date().format(DATE_FORMAT).to_string(),
            start_time: start.clone(),
            start,
            end_time: end.clone(),
            end,
            duration: entry.duration_seconds,
            tags: &entry.tags,
            description: entry.stored_description(),
        }
    }
}

/// 作成結果から`entry_id`を取り出す。取り出せない場合は`None`とする。
fn parse_created(body: &str) -> CreatedEntry {
    let entry_id = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| value.get("entry_id").cloned())
        .and_then(|id| match id {
            Value::String(id) => Some(id),
            Value::Number(id) => Some(id.to_string()),
            _ => None,
        });

    CreatedEntry { entry_id }
}

/// TimeCampのtime entryを取得、登録するためのリポジトリ。
#[cfg_attr(test, automock)]
#[async_trait]
pub trait TimeCampRepository: Send + Sync {
    /// `from`から`to`まで（両端を含む）の日付のtime entryを取得する。
    async fn read_time_entries(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<SinkTimeEntry>, SyncError>;

    /// time entryを登録する。
    ///
    /// 同じtime entryで2回呼び出すと2件登録される。
    async fn create_time_entry(&self, entry: &NewTimeEntry) -> Result<CreatedEntry, SyncError>;
}

/// TimeCamp APIと通信するためのクライアント。
pub struct TimeCampClient {
    client: Client,
    api_url: String,
    api_key: String,
}

impl TimeCampClient {
    /// 新しい`TimeCampClient`を返す。
    ///
    /// # Arguments
    ///
    /// * `api_url` - TimeCamp APIのベースURL
    /// * `api_key` - TimeCampのAPIトークン
    /// * `timeout` - 1リクエストあたりのタイムアウト
    pub fn new(api_url: &str, api_key: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client for TimeCamp")?;

        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    fn entries_url(&self) -> String {
        format!("{}/entries", self.api_url)
    }
}

#[async_trait]
impl TimeCampRepository for TimeCampClient {
    async fn read_time_entries(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<SinkTimeEntry>, SyncError> {
        let url = self.entries_url();
        debug!("Request TimeCamp time entries: {} ({} - {})", url, from, to);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json")
            .query(&[
                ("from", from.format(DATE_FORMAT).to_string()),
                ("to", to.format(DATE_FORMAT).to_string()),
            ])
            .send()
            .await
            .map_err(transport_error(&url))?;
        let body = read_success_body(&url, response).await?;
        let entries: Vec<TimeCampTimeEntry> = serde_json::from_str(&body)
            .map_err(|e| SyncError::parse("TimeCamp time entries response", e))?;

        Ok(entries
            .into_iter()
            .map(|entry| SinkTimeEntry {
                description: entry.description.unwrap_or_default(),
            })
            .collect())
    }

    async fn create_time_entry(&self, entry: &NewTimeEntry) -> Result<CreatedEntry, SyncError> {
        let url = self.entries_url();
        let request = TimeCampNewTimeEntry::from(entry);
        debug!("Create TimeCamp time entry: {:?}", request);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .header(ACCEPT, "application/json")
            .json(&request)
            .send()
            .await
            .map_err(transport_error(&url))?;
        let body = read_body(&url, response, |status| status == StatusCode::CREATED).await?;

        Ok(parse_created(&body))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::NaiveDate;
    use mockito::Matcher;
    use rstest::rstest;
    use serde_json::json;

    use super::{parse_created, TimeCampClient, TimeCampRepository};
    use crate::error::SyncError;
    use crate::http::test_support::start_silent_server;
    use crate::time_entry::{CreatedEntry, NewTimeEntry, SinkTimeEntry, TagRef};

    fn client(url: &str) -> TimeCampClient {
        TimeCampClient::new(url, "tc_test", Duration::from_secs(5)).unwrap()
    }

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, 11, day).unwrap()
    }

    fn dummy_entry() -> NewTimeEntry {
        NewTimeEntry {
            source_id: "T1".to_string(),
            description: "T1/Design".to_string(),
            start: date(15).and_hms_opt(7, 13, 20).unwrap(),
            end: date(15).and_hms_opt(8, 13, 20).unwrap(),
            duration_seconds: 3600,
            tags: vec![TagRef {
                tag_id: "eng".to_string(),
            }],
        }
    }

    #[tokio::test]
    async fn test_read_time_entries() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/entries")
            .match_header("authorization", "Bearer tc_test")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("from".into(), "2023-11-14".into()),
                Matcher::UrlEncoded("to".into(), "2023-11-15".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"[
                    {"id": "101", "duration": "3600", "description": "Fix bug-abc123"},
                    {"id": "102", "duration": "60", "description": null}
                ]"#,
            )
            .create_async()
            .await;

        let entries = client(&server.url())
            .read_time_entries(date(14), date(15))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(
            entries,
            vec![
                SinkTimeEntry {
                    description: "Fix bug-abc123".to_string()
                },
                SinkTimeEntry {
                    description: "".to_string()
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_read_time_entries_error_status() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/entries")
            .match_query(Matcher::Any)
            .with_status(403)
            .with_body("Forbidden")
            .create_async()
            .await;

        let result = client(&server.url())
            .read_time_entries(date(14), date(14))
            .await;

        match result {
            Err(SyncError::Status { status, body, .. }) => {
                assert_eq!(status, 403);
                assert_eq!(body, "Forbidden");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_create_time_entry() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/entries")
            .match_header("authorization", "Bearer tc_test")
            .match_body(Matcher::Json(json!({
                "get_entries": 0,
                "date": "2023-11-15",
                "start": "2023-11-15 07:13:20",
                "start_time": "2023-11-15 07:13:20",
                "end": "2023-11-15 08:13:20",
                "end_time": "2023-11-15 08:13:20",
                "duration": 3600,
                "tags": [{"tagId": "eng"}],
                "description": "T1/Design-T1",
            })))
            .with_status(201)
            .with_body(r#"{"entry_id": 555}"#)
            .create_async()
            .await;

        let created = client(&server.url())
            .create_time_entry(&dummy_entry())
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(
            created,
            CreatedEntry {
                entry_id: Some("555".to_string())
            }
        );
    }

    /// 201以外は2xxであっても作成失敗とする。
    #[rstest]
    #[case::ok(200)]
    #[case::bad_request(400)]
    #[case::server_error(500)]
    #[tokio::test]
    async fn test_create_time_entry_not_created(#[case] status: usize) {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/entries")
            .with_status(status)
            .with_body("nope")
            .create_async()
            .await;

        let result = client(&server.url())
            .create_time_entry(&dummy_entry())
            .await;

        match result {
            Err(SyncError::Status { status: actual, .. }) => {
                assert_eq!(actual as usize, status)
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[rstest]
    #[case::number(r#"{"entry_id": 12}"#, Some("12"))]
    #[case::string(r#"{"entry_id": "12"}"#, Some("12"))]
    #[case::missing(r#"{}"#, None)]
    #[case::not_json("created", None)]
    fn test_parse_created(#[case] body: &str, #[case] expected: Option<&str>) {
        assert_eq!(
            parse_created(body),
            CreatedEntry {
                entry_id: expected.map(str::to_string)
            }
        );
    }

    /// 応答がない場合はタイムアウトしてTransportエラーになる。
    #[tokio::test]
    async fn test_timeout() {
        let url = start_silent_server().await;
        let client = TimeCampClient::new(&url, "tc_test", Duration::from_millis(200)).unwrap();

        let read = client.read_time_entries(date(14), date(14)).await;
        let create = client.create_time_entry(&dummy_entry()).await;

        assert!(matches!(read, Err(SyncError::Transport { .. })));
        assert!(matches!(create, Err(SyncError::Transport { .. })));
    }
}
