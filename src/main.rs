use std::{env, io};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;

use clickcamp::clickup::ClickUpClient;
use clickcamp::config::{SyncArgs, SyncConfig};
use clickcamp::console::{self, ConsoleMarkdownList, ConsolePresenter};
use clickcamp::logger;
use clickcamp::sync_command::SyncCommand;
use clickcamp::timecamp::TimeCampClient;

/// ClickUpのtime entryをTimeCampに同期するCLIアプリケーション。
///
/// 同じTimeCampに対して同時に複数実行しないこと。重複して登録される可能性がある。
///
/// # Examples
/// ```
/// $ CLICKUP_API_KEY=pk_xxx TIMECAMP_API_KEY=xxx cargo run -- sync --team-id 1 --assignee-id 2 --list-id 3 -s 2024-05-01 -e 2024-05-31
/// ```
#[derive(Debug, Parser)]
#[clap(version, about)]
struct Args {
    #[clap(short = 'v', long = "verbose", global = true, help = "Show debug logs")]
    verbose: bool,

    #[clap(subcommand)]
    subcommand: SubCommands,
}

/// サブコマンドを表す列挙型。
#[derive(Debug, Subcommand)]
enum SubCommands {
    /// Sync ClickUp time entries into TimeCamp
    Sync(SyncArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    logger::setup_logger(logger::level(args.verbose))?;

    match args.subcommand {
        SubCommands::Sync(sync) => sync_command(sync).await?,
    }

    Ok(())
}

/// `sync`サブコマンドの処理を行う。
///
/// 同期結果はMarkdownのlist形式で標準出力に表示する。
async fn sync_command(args: SyncArgs) -> Result<()> {
    let config = SyncConfig::resolve(
        args,
        |key| env::var(key).ok(),
        |label| {
            let stdin = io::stdin();
            let mut reader = stdin.lock();
            console::prompt(&mut reader, &mut io::stdout(), label)
        },
    )
    .context("Failed to resolve sync settings")?;
    info!(
        "Sync ClickUp team {} (assignee {}, list {}) from {} to {}",
        config.query.team_id,
        config.query.assignee_id,
        config.query.list_id,
        config.query.start_date,
        config.query.end_date
    );

    let clickup = ClickUpClient::new(&config.clickup_url, &config.clickup_api_key, config.timeout)
        .context("Failed to new ClickUp client")?;
    let timecamp = TimeCampClient::new(
        &config.timecamp_url,
        &config.timecamp_api_key,
        config.timeout,
    )
    .context("Failed to new TimeCamp client")?;

    let summary = SyncCommand::new(&clickup, &timecamp)
        .run(&config.query)
        .await;

    let mut stdout = io::stdout();
    ConsoleMarkdownList::new(&mut stdout)
        .show_summary(&summary)
        .context("Failed to show sync summary")?;

    Ok(())
}
