use clap::{Parser, Subcommand};
use rigsheet::{
    CancellationToken, ExportConfig, ExportError, ExportPipeline, ExportRequest, JobManager,
    JobStatus, RendererMode,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser, Debug)]
#[command(name = "rigsheet", version, about = "Vehicle inventory PDF export")]
struct Cli {
    /// TOML configuration file (defaults to $RIGSHEET_CONFIG or ./rigsheet.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render an export request to a PDF file.
    Render(RenderArgs),
    /// Print the page plan of an export request as JSON.
    Plan {
        /// Export request JSON.
        #[arg(long)]
        input: PathBuf,
    },
    /// Print the renderer capability report as JSON.
    Diagnostics,
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Export request JSON.
    #[arg(long)]
    input: PathBuf,

    /// Output PDF path. A directory gets the generated file name.
    #[arg(long)]
    output: PathBuf,

    /// Renderer override: auto, markup or vector.
    #[arg(long)]
    renderer: Option<RendererMode>,

    /// Run through the job manager and report progress until it finishes.
    #[arg(long, default_value_t = false)]
    background: bool,
}

fn main() -> Result<(), ExportError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = ExportConfig::load(cli.config.as_deref())?;

    match cli.cmd {
        Command::Render(args) => cmd_render(&config, args),
        Command::Plan { input } => {
            let pipeline = ExportPipeline::from_config(&config)?;
            let plan = pipeline.plan(&read_request(&input)?)?;
            println!("{}", serde_json::to_string_pretty(&plan.summary())?);
            Ok(())
        }
        Command::Diagnostics => {
            let pipeline = ExportPipeline::from_config(&config)?;
            println!("{}", serde_json::to_string_pretty(&pipeline.diagnostics())?);
            Ok(())
        }
    }
}

fn read_request(path: &Path) -> Result<ExportRequest, ExportError> {
    ExportRequest::from_json(&std::fs::read_to_string(path)?)
}

fn cmd_render(config: &ExportConfig, args: RenderArgs) -> Result<(), ExportError> {
    let request = read_request(&args.input)?;
    let mut pipeline = ExportPipeline::from_config(config)?;
    if let Some(mode) = args.renderer {
        pipeline = pipeline.with_mode(mode);
    }

    let document = if args.background {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?;
        let manager = JobManager::new(Arc::new(pipeline), &config.jobs);
        runtime.block_on(run_job(&manager, request))?
    } else {
        let progress = |step: &str, current: usize, total: usize| {
            eprintln!("[{}] {}/{}", step, current, total);
        };
        pipeline.export_with(&request, &CancellationToken::new(), &progress)?
    };

    let output = if args.output.is_dir() {
        args.output.join(&document.filename)
    } else {
        args.output
    };
    std::fs::write(&output, &document.bytes)?;
    println!(
        "Wrote {} ({} bytes, renderer={})",
        output.display(),
        document.bytes.len(),
        document.renderer
    );
    Ok(())
}

async fn run_job(
    manager: &JobManager,
    request: ExportRequest,
) -> Result<rigsheet::ExportedDocument, ExportError> {
    let id = manager.submit(request);
    let mut ticker = tokio::time::interval(Duration::from_millis(250));
    let snapshot = loop {
        tokio::select! {
            done = manager.wait(id) => break done?,
            _ = ticker.tick() => {
                let snapshot = manager.status(id)?;
                eprintln!(
                    "job {} {} {:.1}% {}",
                    id,
                    snapshot.status,
                    snapshot.progress.percent,
                    snapshot.progress.step.as_deref().unwrap_or("")
                );
            }
        }
    };

    if snapshot.status == JobStatus::Error
        && let Some(message) = &snapshot.error
    {
        eprintln!("job {} failed: {}", id, message);
    }
    Ok(manager.result(id)?)
}
