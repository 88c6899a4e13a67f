use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::datetime::format_timestamp;

/// ClickUpから取得したtime entry。
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SourceTimeEntry {
    pub id: String,
    pub description: String,
    pub task_id: String,
    pub task_name: String,
    pub tags: Vec<String>,
    pub start_millis: Option<i64>,
    pub end_millis: Option<i64>,
    pub duration_millis: i64,
}

impl SourceTimeEntry {
    /// TimeCampに登録する説明文を返す。
    ///
    /// 説明文が空の場合は`<task id>/<task name>`とする。
    pub fn label(&self) -> String {
        if self.description.is_empty() {
            format!("{}/{}", self.task_id, self.task_name)
        } else {
            self.description.clone()
        }
    }
}

/// TimeCampに登録済みのtime entry。
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SinkTimeEntry {
    pub description: String,
}

/// TimeCampのタグ参照。
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TagRef {
    #[serde(rename = "tagId")]
    pub tag_id: String,
}

/// TimeCampに新規登録するtime entry。
///
/// `start`と`end`はLocalタイムゾーンの日時。
#[derive(Clone, Debug, PartialEq)]
pub struct NewTimeEntry {
    pub source_id: String,
    pub description: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub duration_seconds: i64,
    pub tags: Vec<TagRef>,
}

impl NewTimeEntry {
    /// TimeCampの`date`として扱う日付。日をまたぐ場合も開始日とする。
    pub fn date(&self) -> NaiveDate {
        self.start.date()
    }

    pub fn start_timestamp(&self) -> String {
        format_timestamp(&self.start)
    }

    pub fn end_timestamp(&self) -> String {
        format_timestamp(&self.end)
    }

    /// 同期元のidを埋め込んだ、TimeCampに保存する説明文。
    pub fn stored_description(&self) -> String {
        format!("{}-{}", self.description, self.source_id)
    }
}

/// TimeCampに作成されたtime entry。
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CreatedEntry {
    pub entry_id: Option<String>,
}
