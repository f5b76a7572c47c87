//! Capfs CLI - talks to a capfs daemon.

use anyhow::{bail, Context, Result};
use capfs_core::WriteMode;
use capfs_proto::{Response, DEFAULT_PORT};
use capfs_server::Client;
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::{debug, Level};
use tracing_subscriber::FmtSubscriber;

/// Capfs command-line client.
#[derive(Parser)]
#[command(name = "capfs")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Server address
    #[arg(short, long, default_value_t = format!("127.0.0.1:{DEFAULT_PORT}"))]
    addr: String,

    /// Username to present
    #[arg(short, long)]
    user: String,

    /// Group to present (AOS-students or CSE-students)
    #[arg(short, long)]
    group: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a file
    Create {
        /// File name
        name: String,
        /// Permission mask, e.g. rwr---
        mask: String,
    },

    /// Change a file's permissions
    Mode {
        /// File name
        name: String,
        /// New permission mask
        mask: String,
    },

    /// Write lines to a file (reads stdin when no lines are given)
    Write {
        /// File name
        name: String,
        /// `o` to overwrite, `a` to append
        mode: WriteMode,
        /// Content lines
        lines: Vec<String>,
    },

    /// Print a file's content
    Read {
        /// File name
        name: String,
    },

    /// Interactive session: forwards stdin lines to the server
    Shell,
}

type StdinLines = Lines<BufReader<Stdin>>;

fn stdin_lines() -> StdinLines {
    BufReader::new(tokio::io::stdin()).lines()
}

fn write_prompt() -> String {
    Response::WritePrompt.to_string().trim_end().to_string()
}

/// Reads content lines from stdin up to an empty line or end of input.
async fn read_content(lines: &mut StdinLines) -> Result<Vec<String>> {
    let mut content = Vec::new();
    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        if line.is_empty() {
            break;
        }
        content.push(line);
    }
    Ok(content)
}

/// Forwards stdin to the server until `exit` or end of input.
async fn shell(client: &mut Client) -> Result<()> {
    let mut input = stdin_lines();
    let prompt = write_prompt();

    while let Some(line) = input.next_line().await.context("Failed to read stdin")? {
        let verb = line.split_whitespace().next().unwrap_or_default();
        match verb {
            "exit" => {
                client.send_line(&line).await?;
                return Ok(());
            }
            "read" => {
                client.send_line(&line).await?;
                let body = client.collect_stream().await?;
                println!("{}", body);
            }
            _ => {
                let reply = client.command(&line).await?;
                println!("{}", reply);
                if reply == prompt {
                    for piece in read_content(&mut input).await? {
                        client.send_line(&piece).await?;
                    }
                    println!("{}", client.finish_write().await?);
                }
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to set up logging")?;

    let mut client = Client::connect(cli.addr.as_str(), &cli.user, &cli.group)
        .await
        .with_context(|| format!("Failed to connect to {}", cli.addr))?;
    debug!(addr = %cli.addr, user = %cli.user, "Connected");

    match cli.command {
        Commands::Create { name, mask } => {
            println!("{}", client.create(&name, &mask).await?);
        }

        Commands::Mode { name, mask } => {
            println!("{}", client.mode(&name, &mask).await?);
        }

        Commands::Write { name, mode, lines } => {
            let lines = if lines.is_empty() {
                read_content(&mut stdin_lines()).await?
            } else {
                lines
            };
            if lines.iter().any(|l| l.is_empty()) {
                bail!("Content lines must not be empty");
            }
            println!("{}", client.write(&name, mode, &lines).await?);
        }

        Commands::Read { name } => {
            let body = client.read(&name).await?;
            println!("{}", body);
        }

        Commands::Shell => {
            shell(&mut client).await?;
            return Ok(());
        }
    }

    client.exit().await?;
    Ok(())
}
