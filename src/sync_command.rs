use chrono::{Local, TimeZone};
use log::{debug, error, info, warn};

use crate::clickup::{ClickUpRepository, TimeEntryQuery};
use crate::datetime::{epoch_seconds_to_local, millis_to_seconds};
use crate::error::SyncError;
use crate::summary::{EntryOutcome, OutcomeKind, SyncSummary};
use crate::time_entry::{NewTimeEntry, SinkTimeEntry, SourceTimeEntry, TagRef};
use crate::timecamp::TimeCampRepository;

const TARGET_EMPTY: &str = "clickcamp::sync::empty";
const TARGET_SOURCE_FAILED: &str = "clickcamp::sync::source_failed";
const TARGET_LOOKUP_FAILED: &str = "clickcamp::sync::lookup_failed";

/// TimeCampの既存time entryのいずれかに、同期元のidが含まれているかを返す。
///
/// 説明文に埋め込んだidの部分文字列一致で判定するため、`abc12`は`...-abc123`に一致する。
pub fn contains_source_id(existing: &[SinkTimeEntry], source_id: &str) -> bool {
    existing
        .iter()
        .any(|entry| entry.description.contains(source_id))
}

/// ClickUpのtime entryをTimeCampに同期する。
///
/// 同期元の1件ごとに、TimeCampの既存time entryを取得して重複を確認してから登録する。
/// 1件の失敗で処理は中断せず、結果は`SyncSummary`にまとめて返す。
///
/// 同じTimeCampに対して同時に複数実行すると重複して登録される可能性がある。
pub struct SyncCommand<'a, C: ClickUpRepository, T: TimeCampRepository, Tz: TimeZone = Local> {
    clickup: &'a C,
    timecamp: &'a T,
    timezone: Tz,
}

impl<'a, C: ClickUpRepository, T: TimeCampRepository> SyncCommand<'a, C, T, Local> {
    /// 新しい`SyncCommand`を返す。
    ///
    /// # Arguments
    /// * `clickup` - 同期元のリポジトリ
    /// * `timecamp` - 同期先のリポジトリ
    pub fn new(clickup: &'a C, timecamp: &'a T) -> Self {
        Self {
            clickup,
            timecamp,
            timezone: Local,
        }
    }
}

impl<'a, C, T, Tz> SyncCommand<'a, C, T, Tz>
where
    C: ClickUpRepository,
    T: TimeCampRepository,
    Tz: TimeZone,
{
    /// 日時の変換に利用するタイムゾーンを変更する。
    pub fn with_timezone<Tz2: TimeZone>(self, timezone: Tz2) -> SyncCommand<'a, C, T, Tz2> {
        SyncCommand {
            clickup: self.clickup,
            timecamp: self.timecamp,
            timezone,
        }
    }

    /// 同期処理を行う。
    ///
    /// ClickUpから取得した順序のまま、1件ずつ順番に処理する。
    pub async fn run(&self, query: &TimeEntryQuery) -> SyncSummary {
        let mut summary = SyncSummary::default();

        let entries = match self.clickup.read_time_entries(query).await {
            Ok(entries) => entries,
            Err(e) => {
                error!(
                    target: TARGET_SOURCE_FAILED,
                    "Failed to fetch time entries from ClickUp: {}", e
                );
                summary.source_error = Some(e.to_string());
                return summary;
            }
        };
        summary.fetched = entries.len();

        if entries.is_empty() {
            info!(target: TARGET_EMPTY, "No time entries to sync.");
            return summary;
        }

        for entry in &entries {
            let outcome = self.sync_entry(entry, &mut summary).await;
            summary.record(outcome);
        }

        info!(
            "Sync finished: fetched={}, created={}, already_present={}, skipped_invalid={}, create_failed={}, lookup_failed={}",
            summary.fetched,
            summary.created,
            summary.already_present,
            summary.skipped_invalid,
            summary.create_failed,
            summary.lookup_failed,
        );

        summary
    }

    /// ClickUpのtime entryをTimeCampに登録する形に変換する。
    ///
    /// 開始または終了日時がない場合は`SyncError::Validation`を返す。
    pub fn to_new_time_entry(&self, entry: &SourceTimeEntry) -> Result<NewTimeEntry, SyncError> {
        let invalid = |reason: &str| SyncError::Validation {
            id: entry.id.clone(),
            reason: reason.to_string(),
        };

        if entry.id.is_empty() {
            return Err(invalid("missing id"));
        }
        // 0も未設定として扱う
        let start_millis = entry
            .start_millis
            .filter(|millis| *millis != 0)
            .ok_or_else(|| invalid("missing start"))?;
        let end_millis = entry
            .end_millis
            .filter(|millis| *millis != 0)
            .ok_or_else(|| invalid("missing end"))?;
        let start = epoch_seconds_to_local(millis_to_seconds(start_millis), &self.timezone)
            .ok_or_else(|| invalid("start out of range"))?;
        let end = epoch_seconds_to_local(millis_to_seconds(end_millis), &self.timezone)
            .ok_or_else(|| invalid("end out of range"))?;

        Ok(NewTimeEntry {
            source_id: entry.id.clone(),
            description: entry.label(),
            start,
            end,
            duration_seconds: millis_to_seconds(entry.duration_millis),
            tags: entry
                .tags
                .iter()
                .map(|name| TagRef {
                    tag_id: name.clone(),
                })
                .collect(),
        })
    }

    /// 1件のtime entryを同期する。
    async fn sync_entry(&self, entry: &SourceTimeEntry, summary: &mut SyncSummary) -> EntryOutcome {
        let outcome = |kind: OutcomeKind, message: Option<String>| EntryOutcome {
            source_id: entry.id.clone(),
            description: entry.label(),
            kind,
            message,
        };

        let new_entry = match self.to_new_time_entry(entry) {
            Ok(new_entry) => new_entry,
            Err(e) => {
                warn!(
                    target: OutcomeKind::SkippedInvalid.log_target(),
                    "Skipping time entry '{}': {}",
                    entry.label(),
                    e
                );
                return outcome(OutcomeKind::SkippedInvalid, Some(e.to_string()));
            }
        };

        let from = new_entry.date();
        let to = new_entry.end.date().max(from);
        let existing = match self.timecamp.read_time_entries(from, to).await {
            Ok(existing) => existing,
            Err(e) => {
                error!(
                    target: TARGET_LOOKUP_FAILED,
                    "Failed to fetch time entries from TimeCamp: {}", e
                );
                summary.lookup_failed += 1;
                vec![]
            }
        };

        if contains_source_id(&existing, &entry.id) {
            info!(
                target: OutcomeKind::AlreadyPresent.log_target(),
                "Time entry for '{}' already exists in TimeCamp. Skipping creation.",
                new_entry.description
            );
            return outcome(OutcomeKind::AlreadyPresent, None);
        }

        match self.timecamp.create_time_entry(&new_entry).await {
            Ok(created) => {
                debug!("TimeCamp entry id: {:?}", created.entry_id);
                info!(
                    target: OutcomeKind::Created.log_target(),
                    "Time entry '{}' successfully created in TimeCamp.",
                    new_entry.description
                );
                outcome(OutcomeKind::Created, None)
            }
            Err(e) => {
                error!(
                    target: OutcomeKind::CreateFailed.log_target(),
                    "Error creating time entry '{}' in TimeCamp: {}",
                    new_entry.description,
                    e
                );
                outcome(OutcomeKind::CreateFailed, Some(e.to_string()))
            }
        }
    }
}
