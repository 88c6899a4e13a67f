use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;

use crate::clickup::{self, TimeEntryQuery};
use crate::datetime::parse_date;
use crate::timecamp;

pub const CLICKUP_API_KEY_ENV: &str = "CLICKUP_API_KEY";
pub const TIMECAMP_API_KEY_ENV: &str = "TIMECAMP_API_KEY";

/// `sync`サブコマンドの引数を表す構造体。
///
/// 指定されていない値は実行時に標準入力から入力する。
#[derive(Debug, clap::Args)]
pub struct SyncArgs {
    #[clap(long = "team-id", help = "ClickUp team ID")]
    team_id: Option<String>,

    #[clap(long = "assignee-id", help = "ClickUp assignee (user) ID")]
    assignee_id: Option<String>,

    #[clap(long = "list-id", help = "ClickUp list ID")]
    list_id: Option<String>,

    #[clap(
        short = 's',
        long = "start-date",
        help = "First day to sync in the format YYYY-MM-DD",
        parse(try_from_str = parse_date),
    )]
    start_date: Option<NaiveDate>,

    #[clap(
        short = 'e',
        long = "end-date",
        help = "Last day to sync (inclusive) in the format YYYY-MM-DD",
        parse(try_from_str = parse_date),
    )]
    end_date: Option<NaiveDate>,

    #[clap(
        long = "timeout",
        default_value = "30",
        help = "Timeout of each API request in seconds"
    )]
    timeout: u64,

    #[clap(long = "clickup-url", default_value = clickup::DEFAULT_API_URL, help = "ClickUp API base URL")]
    clickup_url: String,

    #[clap(long = "timecamp-url", default_value = timecamp::DEFAULT_API_URL, help = "TimeCamp API base URL")]
    timecamp_url: String,
}

/// 1回の同期処理に必要な設定。
pub struct SyncConfig {
    pub clickup_api_key: String,
    pub timecamp_api_key: String,
    pub clickup_url: String,
    pub timecamp_url: String,
    pub timeout: Duration,
    pub query: TimeEntryQuery,
}

impl SyncConfig {
    /// 引数、環境変数、入力から設定を組み立てる。
    ///
    /// APIキーは環境変数から、その他の値は引数から取得する。どちらにもない値は`prompt`で入力する。
    ///
    /// # Arguments
    ///
    /// * `args` - `sync`サブコマンドの引数
    /// * `env` - 環境変数を取得する関数
    /// * `prompt` - ラベルを表示して値を入力する関数
    pub fn resolve<E, P>(args: SyncArgs, env: E, mut prompt: P) -> Result<Self>
    where
        E: Fn(&str) -> Option<String>,
        P: FnMut(&str) -> Result<String>,
    {
        let mut value_or_prompt = |value: Option<String>, label: &str| -> Result<String> {
            match value.filter(|value| !value.trim().is_empty()) {
                Some(value) => Ok(value),
                None => prompt(label),
            }
        };

        let clickup_api_key =
            value_or_prompt(env(CLICKUP_API_KEY_ENV), "Enter your ClickUp API key")?;
        let timecamp_api_key =
            value_or_prompt(env(TIMECAMP_API_KEY_ENV), "Enter your TimeCamp API key")?;
        let team_id = value_or_prompt(args.team_id, "Enter your ClickUp Team ID")?;
        let assignee_id = value_or_prompt(args.assignee_id, "Enter the Assignee ID")?;
        let list_id = value_or_prompt(args.list_id, "Enter the List ID")?;
        let start_date = match args.start_date {
            Some(date) => date,
            None => parse_date(&value_or_prompt(None, "Enter the Start Date (YYYY-MM-DD)")?)
                .context("Invalid start date")?,
        };
        let end_date = match args.end_date {
            Some(date) => date,
            None => parse_date(&value_or_prompt(None, "Enter the End Date (YYYY-MM-DD)")?)
                .context("Invalid end date")?,
        };

        if end_date < start_date {
            bail!(
                "End date {} must not be before start date {}",
                end_date,
                start_date
            );
        }
        if args.timeout == 0 {
            bail!("Timeout must be at least 1 second");
        }

        Ok(Self {
            clickup_api_key,
            timecamp_api_key,
            clickup_url: args.clickup_url,
            timecamp_url: args.timecamp_url,
            timeout: Duration::from_secs(args.timeout),
            query: TimeEntryQuery {
                team_id,
                assignee_id,
                list_id,
                start_date,
                end_date,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use anyhow::anyhow;
    use chrono::NaiveDate;

    use super::{SyncArgs, SyncConfig, CLICKUP_API_KEY_ENV, TIMECAMP_API_KEY_ENV};

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, day).unwrap()
    }

    fn full_args() -> SyncArgs {
        SyncArgs {
            team_id: Some("team1".to_string()),
            assignee_id: Some("42".to_string()),
            list_id: Some("list1".to_string()),
            start_date: Some(date(1)),
            end_date: Some(date(31)),
            timeout: 10,
            clickup_url: "http://clickup.test".to_string(),
            timecamp_url: "http://timecamp.test".to_string(),
        }
    }

    fn env(key: &str) -> Option<String> {
        HashMap::from([
            (CLICKUP_API_KEY_ENV, "pk_test"),
            (TIMECAMP_API_KEY_ENV, "tc_test"),
        ])
        .get(key)
        .map(|value| value.to_string())
    }

    /// 全ての値が揃っている場合は入力を求めない。
    #[test]
    fn test_resolve_without_prompt() {
        let config = SyncConfig::resolve(full_args(), env, |label| {
            panic!("unexpected prompt: {}", label)
        })
        .unwrap();

        assert_eq!(config.clickup_api_key, "pk_test");
        assert_eq!(config.timecamp_api_key, "tc_test");
        assert_eq!(config.clickup_url, "http://clickup.test");
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.query.team_id, "team1");
        assert_eq!(config.query.end_date, date(31));
    }

    /// 足りない値は入力を求める。
    #[test]
    fn test_resolve_with_prompt() {
        let args = SyncArgs {
            list_id: None,
            start_date: None,
            ..full_args()
        };
        let mut labels = Vec::new();

        let config = SyncConfig::resolve(
            args,
            |_| None,
            |label| {
                labels.push(label.to_string());
                Ok(match label {
                    "Enter the Start Date (YYYY-MM-DD)" => "2024-05-02".to_string(),
                    _ => format!("input {}", labels.len()),
                })
            },
        )
        .unwrap();

        assert_eq!(
            labels,
            vec![
                "Enter your ClickUp API key",
                "Enter your TimeCamp API key",
                "Enter the List ID",
                "Enter the Start Date (YYYY-MM-DD)",
            ]
        );
        assert_eq!(config.clickup_api_key, "input 1");
        assert_eq!(config.query.list_id, "input 3");
        assert_eq!(config.query.start_date, date(2));
    }

    #[test]
    fn test_resolve_invalid_prompted_date() {
        let args = SyncArgs {
            end_date: None,
            ..full_args()
        };

        let result = SyncConfig::resolve(args, env, |_| Ok("31/05/2024".to_string()));

        assert!(result.is_err());
    }

    #[test]
    fn test_resolve_end_before_start() {
        let args = SyncArgs {
            start_date: Some(date(10)),
            end_date: Some(date(9)),
            ..full_args()
        };

        let result = SyncConfig::resolve(args, env, |_| Err(anyhow!("no input")));

        assert!(result.is_err());
    }

    #[test]
    fn test_resolve_zero_timeout() {
        let args = SyncArgs {
            timeout: 0,
            ..full_args()
        };

        let result = SyncConfig::resolve(args, env, |_| Err(anyhow!("no input")));

        assert!(result.is_err());
    }
}
