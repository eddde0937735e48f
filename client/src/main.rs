use anyhow::Context;
use clap::Parser;
use distributed_fs::client::{GatewayClient, ItemReport, validate_command};
use distributed_fs::error::FsError;
use distributed_fs::gateway::CommandRequest;
use distributed_fs::paths::ROOT_TOKEN;
use std::io::Write;
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};

const PROMPT: &str = "dfs$ ";

/// Interactive client for the distributed file store
#[derive(Parser, Debug)]
#[command(name = "dfs-client")]
#[command(version, about, long_about = None)]
struct Args {
    /// Gateway address
    #[arg(long, env = "DFS_GATEWAY", default_value = "127.0.0.1:8080")]
    gateway: SocketAddr,

    /// Directory that downloads and archives are saved into
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,

    /// Root token of the remote namespace
    #[arg(long, default_value = ROOT_TOKEN)]
    token: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    print_usage();

    let mut client = GatewayClient::connect(args.gateway, args.token.clone())
        .await
        .with_context(|| format!("failed to connect to gateway at {}", args.gateway))?;
    println!("Connected to gateway at {}", args.gateway);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    prompt()?;

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            prompt()?;
            continue;
        }

        let request = match validate_command(line, client.token()) {
            Ok(request) => request,
            Err(e) => {
                println!("Error: {}", e);
                prompt()?;
                continue;
            }
        };

        if request == CommandRequest::Quit {
            println!("Disconnecting from gateway...");
            client.quit().await?;
            return Ok(());
        }

        match run(&mut client, request, &args.out_dir).await {
            Ok(()) => {}
            // Refused or failed commands leave the session usable.
            Err(e @ (FsError::Remote(_) | FsError::Validation(_) | FsError::NotFound(_))) => {
                println!("Error: {}", e)
            }
            Err(e) => return Err(e).context("lost the gateway session"),
        }
        prompt()?;
    }

    Ok(())
}

async fn run(
    client: &mut GatewayClient,
    request: CommandRequest,
    out_dir: &std::path::Path,
) -> Result<(), FsError> {
    match request {
        CommandRequest::Upload { files, destination } => {
            let reports = client.upload(&files, &destination).await?;
            print_reports("Uploaded", &reports, |_| String::new());
        }
        CommandRequest::Download { paths } => {
            let reports = client.download(&paths, out_dir).await?;
            print_reports("Downloaded", &reports, |saved| {
                format!(" -> {}", saved.display())
            });
        }
        CommandRequest::Remove { paths } => {
            let reports = client.remove(&paths).await?;
            print_reports("Removed", &reports, |_| String::new());
        }
        CommandRequest::Archive { class } => {
            let saved = client.download_tar(class, out_dir).await?;
            println!("Saved {}", saved.display());
        }
        CommandRequest::List { path } => {
            let names = client.list(&path).await?;
            println!("Files in the specified directory:");
            for name in names {
                println!("{}", name);
            }
        }
        CommandRequest::Quit => {}
    }
    Ok(())
}

fn print_reports<T>(verb: &str, reports: &[ItemReport<T>], detail: impl Fn(&T) -> String) {
    for report in reports {
        match &report.outcome {
            Ok(value) => println!("{} {}{}", verb, report.name, detail(value)),
            Err(e) => println!("Error: {}: {}", report.name, e),
        }
    }
}

fn print_usage() {
    println!("dfs-client - Distributed File Store Client");
    println!("Available commands:");
    println!("  uploadf filename1 [filename2 [filename3]] destination_path");
    println!("  downlf filename1 [filename2]");
    println!("  removef filename1 [filename2]");
    println!("  downltar filetype (.c/.pdf/.txt)");
    println!("  dispfnames pathname");
    println!("  quit");
    println!();
}

fn prompt() -> std::io::Result<()> {
    print!("{}", PROMPT);
    std::io::stdout().flush()
}
