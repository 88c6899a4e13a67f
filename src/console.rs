use std::io::{BufRead, Write};

use anyhow::{bail, Context, Result};

use crate::summary::SyncSummary;

/// Consoleに同期結果を表示するためのtrait。
pub trait ConsolePresenter {
    /// 同期結果を表示する。
    ///
    /// # Arguments
    ///
    /// * `summary` - 表示する同期結果
    fn show_summary(&mut self, summary: &SyncSummary) -> Result<()>;
}

/// 同期結果をMarkdownのlist形式で表示する。
pub struct ConsoleMarkdownList<'a, W: Write> {
    writer: &'a mut W,
}

impl<'a, W: Write> ConsoleMarkdownList<'a, W> {
    /// 新しい`ConsoleMarkdownList`を返す。
    pub fn new(writer: &'a mut W) -> Self {
        Self { writer }
    }
}

impl<'a, W: Write> ConsolePresenter for ConsoleMarkdownList<'a, W> {
    // 件数の後に、time entryごとの結果を取得順に表示する。
    fn show_summary(&mut self, summary: &SyncSummary) -> Result<()> {
        let counts = [
            ("fetched", summary.fetched),
            ("created", summary.created),
            ("already present", summary.already_present),
            ("skipped (invalid)", summary.skipped_invalid),
            ("create failed", summary.create_failed),
            ("lookup failed", summary.lookup_failed),
        ];
        for (label, count) in counts {
            writeln!(self.writer, "- {}: {}", label, count)
                .with_context(|| format!("Failed to write summary line: {}", label))?;
        }
        if let Some(source_error) = &summary.source_error {
            writeln!(self.writer, "- source error: {}", source_error)
                .context("Failed to write source error")?;
        }

        for outcome in &summary.outcomes {
            let message = outcome
                .message
                .as_ref()
                .map(|message| format!(" ({})", message))
                .unwrap_or_default();
            writeln!(
                self.writer,
                "  - [{}] {}: {}{}",
                outcome.source_id, outcome.kind, outcome.description, message
            )
            .with_context(|| format!("Failed to write outcome: {:?}", outcome))?;
        }

        Ok(())
    }
}

/// `label`を表示して1行読み込む。
///
/// 前後の空白は取り除く。入力が終端に達した場合、または空の場合はエラーを返す。
pub fn prompt<R: BufRead, W: Write>(reader: &mut R, writer: &mut W, label: &str) -> Result<String> {
    write!(writer, "{}: ", label).context("Failed to write prompt")?;
    writer.flush().context("Failed to flush prompt")?;

    let mut line = String::new();
    let read = reader
        .read_line(&mut line)
        .with_context(|| format!("Failed to read {}", label))?;
    if read == 0 {
        bail!("No input for {}", label);
    }
    let value = line.trim();
    if value.is_empty() {
        bail!("{} must not be empty", label);
    }

    Ok(value.to_string())
}
