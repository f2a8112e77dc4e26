//! Career advisor console demo.
//!
//! Renders a Jinja-style prompt and a Handlebars message-block prompt, sends
//! each as a user turn to the configured Azure OpenAI deployment, then asks the
//! user for one follow-up question.
use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tracing_subscriber::EnvFilter;

use rig_prompt_turns::{ChatSession, CompletionBackend, Settings, career, providers::azure_openai};

#[derive(Debug, Parser)]
#[command(name = "career-advisor", about = "Chat with a career advisor through prompt templates")]
struct Cli {
    /// Directory holding appsettings.json and appsettings.local.json.
    #[arg(long, default_value = ".")]
    settings_dir: PathBuf,

    /// Do not wait for Enter between steps.
    #[arg(long)]
    no_pause: bool,

    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    let settings = Settings::load(&cli.settings_dir).with_context(|| {
        format!(
            "failed to load settings from {}",
            cli.settings_dir.display()
        )
    })?;

    let mut session = ChatSession::new(azure_openai::agent(&settings));
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();

    let reply = session
        .send_template(&career::role_recommendations())
        .await
        .context("role recommendation turn failed")?;
    print_reply(&reply);

    pause(&cli, &mut stdin, "Press Enter to continue to the Handlebars template...").await?;

    let reply = session
        .send_template(&career::missing_skills())
        .await
        .context("skill gap turn failed")?;
    print_reply(&reply);

    pause(&cli, &mut stdin, "Press Enter to continue...").await?;

    follow_up(&mut session, &mut stdin).await?;

    tracing::info!(turns = session.transcript().len(), "Session finished");
    Ok(())
}

fn init_tracing(verbose: bool) -> anyhow::Result<()> {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default))
        .context("invalid log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to set tracing subscriber: {e}"))
}

fn print_reply(reply: &str) {
    println!("Assistant: {reply}");
}

async fn pause<R>(cli: &Cli, stdin: &mut Lines<R>, message: &str) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    if cli.no_pause {
        return Ok(());
    }

    println!("{message}");
    stdin.next_line().await.context("failed to read from stdin")?;
    Ok(())
}

/// Ask for one question and send it. End of input ends the session without a turn.
async fn follow_up<B, R>(
    session: &mut ChatSession<B>,
    stdin: &mut Lines<R>,
) -> anyhow::Result<Option<String>>
where
    B: CompletionBackend,
    R: AsyncBufRead + Unpin,
{
    println!("Assistant: How can I help you?");
    print!("User: ");
    std::io::stdout().flush().context("failed to flush stdout")?;

    let Some(input) = stdin
        .next_line()
        .await
        .context("failed to read from stdin")?
    else {
        println!();
        tracing::info!("stdin closed, skipping the follow-up turn");
        return Ok(None);
    };

    let reply = session.send(&input).await.context("follow-up turn failed")?;
    print_reply(&reply);
    Ok(Some(reply))
}
