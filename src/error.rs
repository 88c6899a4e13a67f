use thiserror::Error;

/// 同期処理で発生するエラー。
///
/// どのエラーもプロセスを終了させず、呼び出し側でログ出力して処理を継続する。
#[derive(Debug, Error)]
pub enum SyncError {
    /// 日付文字列やレスポンスボディのパースに失敗した。
    #[error("failed to parse {target}: {message}")]
    Parse { target: String, message: String },

    /// 通信に失敗した（タイムアウトを含む）。
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// APIが想定外のステータスコードを返した。
    #[error("{url} returned status {status}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    /// 同期元のtime entryが同期に必要な情報を持っていない。
    #[error("invalid time entry {id}: {reason}")]
    Validation { id: String, reason: String },
}

impl SyncError {
    pub fn parse(target: impl Into<String>, message: impl ToString) -> Self {
        Self::Parse {
            target: target.into(),
            message: message.to_string(),
        }
    }
}
