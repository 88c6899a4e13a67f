use std::fmt;

/// 1件のtime entryに対する同期結果の種類。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutcomeKind {
    /// 開始または終了日時がないためスキップした。
    SkippedInvalid,
    /// TimeCampに登録済みのためスキップした。
    AlreadyPresent,
    /// TimeCampに登録した。
    Created,
    /// TimeCampへの登録に失敗した。
    CreateFailed,
}

impl OutcomeKind {
    /// ログのtargetとして利用する名前。
    pub fn log_target(&self) -> &'static str {
        match self {
            OutcomeKind::SkippedInvalid => "clickcamp::sync::skipped_invalid",
            OutcomeKind::AlreadyPresent => "clickcamp::sync::already_present",
            OutcomeKind::Created => "clickcamp::sync::created",
            OutcomeKind::CreateFailed => "clickcamp::sync::create_failed",
        }
    }
}

impl fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            OutcomeKind::SkippedInvalid => "skipped (invalid)",
            OutcomeKind::AlreadyPresent => "already exists",
            OutcomeKind::Created => "created",
            OutcomeKind::CreateFailed => "create failed",
        };
        f.write_str(label)
    }
}

/// 1件のtime entryに対する同期結果。
#[derive(Clone, Debug, PartialEq)]
pub struct EntryOutcome {
    pub source_id: String,
    pub description: String,
    pub kind: OutcomeKind,
    /// 失敗時のエラーメッセージ。
    pub message: Option<String>,
}

/// 1回の同期処理の結果。
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SyncSummary {
    pub fetched: usize,
    pub skipped_invalid: usize,
    pub already_present: usize,
    pub created: usize,
    pub create_failed: usize,
    /// TimeCampの既存time entryの取得に失敗した件数。
    pub lookup_failed: usize,
    /// ClickUpからの取得に失敗した場合のエラーメッセージ。
    pub source_error: Option<String>,
    pub outcomes: Vec<EntryOutcome>,
}

impl SyncSummary {
    /// 結果を記録して件数を更新する。
    pub fn record(&mut self, outcome: EntryOutcome) {
        match outcome.kind {
            OutcomeKind::SkippedInvalid => self.skipped_invalid += 1,
            OutcomeKind::AlreadyPresent => self.already_present += 1,
            OutcomeKind::Created => self.created += 1,
            OutcomeKind::CreateFailed => self.create_failed += 1,
        }
        self.outcomes.push(outcome);
    }

    /// 失敗が1件もなかったかどうか。
    pub fn is_clean(&self) -> bool {
        self.source_error.is_none() && self.create_failed == 0 && self.lookup_failed == 0
    }
}
