//! CLI argument definitions using clap.

use clap::{Args, Parser, Subcommand};
use eyre::{bail, Result};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::rpc::{ClientConfig, HttpRpcClient};
use crate::submission::{
    AppConfig, BatchReport, FormatCatalogFetcher, FormatSelector, RpcClient,
    SubmissionConfig, SubmissionOrchestrator, SubmitOutcome,
};

#[derive(Debug, Parser)]
#[command(name = "webui-batch")]
#[command(about = "Submit download batches to a yt-dlp web UI server")]
#[command(version)]
pub struct Cli {
    /// Server root URL
    #[arg(long, default_value = "http://127.0.0.1:3033")]
    pub server: String,

    /// SOCKS5/HTTP proxy for reaching the server
    #[arg(long)]
    pub proxy: Option<String>,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 30)]
    pub timeout: u32,

    /// Settings and templates file
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Send one download per URL line
    Submit(SubmitArgs),

    /// Show the formats available for a URL
    Formats { url: String },

    /// List directories the server accepts as download paths
    Paths,

    /// Stop every running download on the server
    KillAll,

    /// Restart the server's service
    Restart,

    /// Manage saved argument templates
    #[command(subcommand)]
    Template(TemplateCommand),
}

#[derive(Debug, Args)]
pub struct SubmitArgs {
    /// URLs to download
    pub urls: Vec<String>,

    /// Text file with one URL per line
    #[arg(short, long)]
    pub file: Option<PathBuf>,

    /// Expand playlist URLs into all of their items
    #[arg(long)]
    pub playlist: bool,

    /// Server directory to download into
    #[arg(long)]
    pub path: Option<String>,

    /// Filename template sent as rename target
    #[arg(long)]
    pub filename: Option<String>,

    /// Extra yt-dlp arguments for every URL
    #[arg(long, allow_hyphen_values = true)]
    pub custom_args: Option<String>,

    /// Query formats first and submit with the picked codes
    #[arg(long)]
    pub select_format: bool,

    /// Combined format code
    #[arg(long, requires = "select_format", conflicts_with_all = ["video", "audio"])]
    pub best: Option<String>,

    /// Video stream code
    #[arg(long, requires = "select_format")]
    pub video: Option<String>,

    /// Audio stream code
    #[arg(long, requires = "select_format")]
    pub audio: Option<String>,

    /// Delay before each request, in milliseconds
    #[arg(long, default_value_t = 10)]
    pub pacing_ms: u64,
}

#[derive(Debug, Subcommand)]
pub enum TemplateCommand {
    /// List saved templates
    List,

    /// Save a named template
    Save {
        name: String,
        #[arg(allow_hyphen_values = true)]
        content: String,
    },

    /// Make a saved template the custom args
    Use { name: String },

    /// Delete a saved template
    Remove { name: String },
}

/// Execute CLI command - separated for testing.
pub async fn run(cli: Cli) -> Result<()> {
    tracing::debug!(?cli, "parsed arguments");

    let config_path = cli.config.clone().unwrap_or_else(AppConfig::default_path);
    let client_config = ClientConfig::default()
        .with_base_url(cli.server.clone())
        .with_proxy(cli.proxy.clone())
        .with_timeout(cli.timeout);

    match cli.command {
        Commands::Submit(args) => submit(args, client_config, config_path).await,
        Commands::Formats { url } => {
            let client = Arc::new(HttpRpcClient::new(client_config)?);
            let fetcher = FormatCatalogFetcher::new(client, CancellationToken::new());
            let catalog = fetcher.fetch(&url).await?;
            println!("{}", catalog.title);
            for option in FormatSelector::build_options(&catalog) {
                let kind = format!("{:?}", option.kind);
                println!(
                    "{:<6} {:<48} {:>9} {}",
                    kind,
                    option.label,
                    option.estimated_size.unwrap_or_default(),
                    option.codec_info.unwrap_or_default()
                );
            }
            Ok(())
        }
        Commands::Paths => {
            let client = HttpRpcClient::new(client_config)?;
            for path in client.directory_tree().await? {
                println!("{path}");
            }
            Ok(())
        }
        Commands::KillAll => {
            let client = HttpRpcClient::new(client_config)?;
            client.kill_all();
            client.flush().await?;
            println!("Requested stop of all downloads");
            Ok(())
        }
        Commands::Restart => {
            let client = HttpRpcClient::new(client_config)?;
            println!("{}", client.restart_service().await?);
            Ok(())
        }
        Commands::Template(command) => template(command, config_path),
    }
}

async fn submit(args: SubmitArgs, client_config: ClientConfig, config_path: PathBuf) -> Result<()> {
    let mut app = AppConfig::load(&config_path)?;
    let mut settings = app.settings.clone();

    if args.select_format {
        settings.format_selection = true;
    }
    if let Some(custom_args) = args.custom_args {
        settings.enable_custom_args = true;
        app.templates.custom_args = custom_args;
    }
    if let Some(filename) = args.filename {
        settings.file_renaming = true;
        app.templates.filename_template = filename;
    }
    if args.path.is_some() {
        settings.path_overriding = true;
    }

    let client = Arc::new(HttpRpcClient::new(client_config)?);
    let mut orchestrator = SubmissionOrchestrator::new(
        client.clone(),
        Arc::new(app.templates),
        SubmissionConfig::default().with_pacing(Duration::from_millis(args.pacing_ms)),
    );

    let cancel = orchestrator.cancel_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted; stopping batch");
            cancel.cancel();
        }
    });

    match (&args.file, args.urls.is_empty()) {
        (Some(file), _) => orchestrator.load_url_file(file).await?,
        (None, false) => orchestrator.set_input(args.urls.join("\n"))?,
        (None, true) => bail!("give at least one URL or --file"),
    }

    if let Some(path) = args.path.as_deref() {
        orchestrator.refresh_download_paths().await?;
        orchestrator.select_download_path(path)?;
    }
    orchestrator.set_playlist(args.playlist);

    let report = match orchestrator.submit(settings).await? {
        SubmitOutcome::Submitted(report) => report,
        SubmitOutcome::AwaitingChoice => {
            if let Some(catalog) = orchestrator.catalog() {
                println!("Formats for {}", catalog.title);
            }
            if let Some(best) = args.best.as_deref() {
                orchestrator.select_best(best)?;
            }
            if let Some(video) = args.video.as_deref() {
                orchestrator.select_video(video)?;
            }
            if let Some(audio) = args.audio.as_deref() {
                orchestrator.select_audio(audio)?;
            }
            orchestrator.confirm().await?
        }
    };

    client.flush().await?;
    print_report(&report);
    Ok(())
}

fn print_report(report: &BatchReport) {
    println!(
        "Sent {} request(s) (batch {})",
        report.dispatched.len(),
        report.batch_id
    );
    if report.cancelled {
        println!("Cancelled: {} item(s) not sent", report.skipped);
    }
}

fn template(command: TemplateCommand, config_path: PathBuf) -> Result<()> {
    let mut app = AppConfig::load(&config_path)?;

    match command {
        TemplateCommand::List => {
            for saved in &app.templates.saved_templates {
                println!("{:<20} {}", saved.name, saved.content);
            }
            return Ok(());
        }
        TemplateCommand::Save { name, content } => app.templates.save_template(name, content),
        TemplateCommand::Use { name } => {
            if !app.templates.apply_template(&name) {
                bail!("no saved template named {name}");
            }
            app.settings.enable_custom_args = true;
        }
        TemplateCommand::Remove { name } => {
            if !app.templates.remove_template(&name) {
                bail!("no saved template named {name}");
            }
        }
    }

    app.save(&config_path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_submit_with_urls() {
        let cli = Cli::parse_from([
            "webui-batch",
            "submit",
            "https://a",
            "https://b",
            "--playlist",
            "--custom-args",
            "-x --audio-format mp3",
        ]);

        match &cli.command {
            Commands::Submit(SubmitArgs {
                urls,
                playlist: true,
                custom_args: Some(custom),
                select_format: false,
                pacing_ms: 10,
                ..
            }) if urls.len() == 2 => assert_eq!(custom, "-x --audio-format mp3"),
            _ => panic!("unexpected command: {:?}", cli.command),
        }
        assert_eq!(cli.server, "http://127.0.0.1:3033");
    }

    #[test]
    fn parses_format_selection() {
        let cli = Cli::parse_from([
            "webui-batch",
            "--server",
            "http://nas:3033",
            "submit",
            "https://a",
            "--select-format",
            "--video",
            "137",
            "--audio",
            "140",
        ]);

        match &cli.command {
            Commands::Submit(SubmitArgs {
                select_format: true,
                video: Some(video),
                audio: Some(audio),
                best: None,
                ..
            }) => {
                assert_eq!(video, "137");
                assert_eq!(audio, "140");
            }
            _ => panic!("unexpected command: {:?}", cli.command),
        }
    }

    #[test]
    fn rejects_codes_without_format_selection() {
        assert!(Cli::try_parse_from(["webui-batch", "submit", "u", "--best", "18"]).is_err());
    }

    #[test]
    fn rejects_best_with_streams() {
        assert!(Cli::try_parse_from([
            "webui-batch",
            "submit",
            "u",
            "--select-format",
            "--best",
            "18",
            "--video",
            "137",
        ])
        .is_err());
    }

    #[test]
    fn template_commands_edit_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        template(
            TemplateCommand::Save {
                name: "audio".to_string(),
                content: "-x".to_string(),
            },
            path.clone(),
        )
        .unwrap();
        template(TemplateCommand::Use { name: "audio".to_string() }, path.clone()).unwrap();

        let app = AppConfig::load(&path).unwrap();
        assert_eq!(app.templates.custom_args, "-x");
        assert!(app.settings.enable_custom_args);

        assert!(template(TemplateCommand::Remove { name: "nope".to_string() }, path).is_err());
    }
}
