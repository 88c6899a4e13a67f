//! APIクライアント共通のレスポンス処理。

use reqwest::{Response, StatusCode};

use crate::error::SyncError;

/// ステータスコードを確認してレスポンスボディを返す。
///
/// `accept`が`false`を返すステータスコードの場合は`SyncError::Status`を返す。
pub async fn read_body(
    url: &str,
    response: Response,
    accept: fn(StatusCode) -> bool,
) -> Result<String, SyncError> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|source| SyncError::Transport {
            url: url.to_string(),
            source,
        })?;

    if !accept(status) {
        return Err(SyncError::Status {
            url: url.to_string(),
            status: status.as_u16(),
            body,
        });
    }

    Ok(body)
}

/// 2xxのレスポンスのボディを返す。
pub async fn read_success_body(url: &str, response: Response) -> Result<String, SyncError> {
    read_body(url, response, |status| status.is_success()).await
}

/// 通信エラーを`SyncError::Transport`に変換する。
pub fn transport_error(url: &str) -> impl FnOnce(reqwest::Error) -> SyncError + '_ {
    move |source| SyncError::Transport {
        url: url.to_string(),
        source,
    }
}
