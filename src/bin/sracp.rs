use std::process::ExitCode;

use camino::Utf8Path;
use clap::Parser;
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use sracp::app::{App, CopyAction, CopyOptions, CopyResult};
use sracp::config::{ConfigLoader, ConfigOverrides};
use sracp::download::{CurlDownloader, Downloader, ToolInfo};
use sracp::error::SracpError;
use sracp::output::{JsonOutput, LogOutput, OutputMode};
use sracp::resolver::{NameResolverHttpClient, ResolveRequest};
use sracp::storage::{AwsS3Fetcher, HttpObjectReader};
use sracp::store::Destination;

#[derive(Parser)]
#[command(name = "sracp")]
#[command(about = "Resolve SRA accessions and copy their files into a local directory")]
#[command(version, author)]
struct Cli {
    #[arg(
        short,
        long = "accession",
        value_name = "ACC",
        help = "Accessions to copy, comma separated or repeated"
    )]
    accessions: Vec<String>,

    #[arg(long, help = "File listing accessions, one per line or comma separated")]
    accession_file: Option<String>,

    #[arg(long, help = "Name Resolver API endpoint")]
    endpoint: Option<String>,

    #[arg(long, help = "Cloud location hint, e.g. s3.us-east-1")]
    location: Option<String>,

    #[arg(long, help = "Path or S3 URL of an ngc file granting access to protected data")]
    ngc: Option<String>,

    #[arg(short, long, help = "Directory the accession folders are created in")]
    destination: Option<String>,

    #[arg(
        long,
        value_name = "TYPES",
        help = "Only copy files with these extensions, e.g. bam,crai"
    )]
    only: Vec<String>,

    #[arg(long)]
    config: Option<String>,

    #[arg(long)]
    dry_run: bool,

    #[arg(long, help = "Print the copy report as JSON")]
    json: bool,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(err) = report.downcast_ref::<SracpError>() {
            return ExitCode::from(map_exit_code(err));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &SracpError) -> u8 {
    match error {
        SracpError::NothingResolved { .. }
        | SracpError::NoAccessions
        | SracpError::InvalidAccession(_)
        | SracpError::InvalidFileType(_)
        | SracpError::InvalidCredentialUrl(_) => 2,
        SracpError::ResolverHttp(_)
        | SracpError::ResolverStatus(_)
        | SracpError::ResolverRejected { .. }
        | SracpError::ContentType(_)
        | SracpError::Undecodable
        | SracpError::StorageHttp(_)
        | SracpError::Unauthorized(_)
        | SracpError::NotFound(_)
        | SracpError::MethodNotSupported(_)
        | SracpError::ServerError { .. }
        | SracpError::StorageStatus { .. }
        | SracpError::MissingTool(_) => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Human
    };
    let dry_run = cli.dry_run;
    let config_path = cli.config.clone();

    let overrides = ConfigOverrides {
        endpoint: cli.endpoint,
        location: cli.location,
        ngc: cli.ngc,
        accessions: cli.accessions,
        accession_file: cli.accession_file,
        destination: cli.destination,
        only: cli.only,
    };
    let resolved = ConfigLoader::resolve(config_path.as_deref(), overrides)?;

    let ngc = match &resolved.ngc {
        Some(source) => {
            let reader = HttpObjectReader::new()?;
            let s3 = AwsS3Fetcher::new()?;
            Some(source.read(&reader, &s3)?)
        }
        None => None,
    };
    let request = ResolveRequest {
        endpoint: resolved.endpoint.clone(),
        location: resolved.location.clone(),
        ngc,
        accessions: resolved.accessions.clone(),
    };
    let destination = Destination::new(resolved.destination.clone());
    let resolver = NameResolverHttpClient::new()?;
    let options = CopyOptions { dry_run };

    let result = if dry_run {
        let app = App::new(resolver, NopDownloader);
        run_copy(&app, &request, &destination, &resolved.only, options, output_mode)?
    } else {
        let downloader = CurlDownloader::new()?;
        tracing::debug!("using curl: {:?}", downloader.tool_info().curl);
        let app = App::new(resolver, downloader);
        run_copy(&app, &request, &destination, &resolved.only, options, output_mode)?
    };

    if !result.diagnostics.is_empty() {
        eprintln!("{}", result.diagnostics.message());
    }
    match output_mode {
        OutputMode::Json => JsonOutput::print_copy(&result).into_diagnostic()?,
        OutputMode::Human => print_copy_summary(&result, destination.root()),
    }
    Ok(())
}

fn run_copy<D: Downloader>(
    app: &App<NameResolverHttpClient, D>,
    request: &ResolveRequest,
    destination: &Destination,
    only: &sracp::domain::FileTypeFilter,
    options: CopyOptions,
    output_mode: OutputMode,
) -> miette::Result<CopyResult> {
    let result = match output_mode {
        OutputMode::Json => app.copy(request, destination, only, options, &JsonOutput),
        OutputMode::Human => app.copy(request, destination, only, options, &LogOutput),
    };
    Ok(result?)
}

fn print_copy_summary(result: &CopyResult, root: &Utf8Path) {
    let green = "\x1b[32m";
    let yellow = "\x1b[33m";
    let cyan = "\x1b[36m";
    let red = "\x1b[31m";
    let reset = "\x1b[0m";

    println!("{cyan}sracp summary ({root}){reset}");
    println!("{green}accessions resolved: {}{reset}", result.accessions);
    println!(
        "{green}files copied: {}{reset}",
        result.count(CopyAction::Downloaded)
    );
    if result.count(CopyAction::Planned) > 0 {
        println!(
            "{cyan}files planned: {}{reset}",
            result.count(CopyAction::Planned)
        );
    }
    println!(
        "{yellow}files skipped by filter: {}{reset}",
        result.count(CopyAction::Filtered)
    );
    println!(
        "{red}files failed: {}{reset}",
        result.count(CopyAction::Failed)
    );

    for item in &result.items {
        let color = match item.action {
            CopyAction::Downloaded => green,
            CopyAction::Planned => cyan,
            CopyAction::Filtered => yellow,
            CopyAction::Failed => red,
        };
        println!(
            "{color}{} {}/{} ({}){reset}",
            item.action.as_str(),
            item.accession,
            item.file_name,
            item.size
        );
        if let Some(error) = &item.error {
            println!("{color}   {error}{reset}");
        }
    }
}

struct NopDownloader;

impl Downloader for NopDownloader {
    fn download(&self, _link: &str, _destination: &Utf8Path) -> Result<(), SracpError> {
        Err(SracpError::Download("downloader not configured".to_string()))
    }

    fn tool_info(&self) -> ToolInfo {
        ToolInfo { curl: None }
    }
}
