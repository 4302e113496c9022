use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use xyplot::{
    compile_svg_file, init_logging, list_ports, resolve_port, Config, DeliverySession,
    ProgramStreamer, RealSerialPort, BUILD_DATE, VERSION,
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file (.toml or .json); defaults to the platform config dir
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log as JSON lines instead of pretty text
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compile an SVG file and print the token stream
    Compile {
        /// SVG drawing
        svg: PathBuf,

        /// Write the stream to a file instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Compile an SVG file and deliver it to the plotter
    Send {
        /// SVG drawing
        svg: PathBuf,

        /// Serial port; auto-detected when omitted
        #[arg(short, long)]
        port: Option<String>,

        /// Baud rate
        #[arg(short, long)]
        baud: Option<u32>,
    },

    /// List serial ports that look like a plotter
    Ports,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_json)?;
    tracing::debug!("xyplot {} ({})", VERSION, BUILD_DATE);

    let config = Config::load_or_default(cli.config.as_deref())?;

    match cli.command {
        Command::Compile { svg, out } => {
            let program = compile_svg_file(&svg, &config)?;
            match out {
                Some(path) => std::fs::write(&path, program.wire_string())
                    .with_context(|| format!("Failed to write {}", path.display()))?,
                None => println!("{}", program.wire_string()),
            }
        }

        Command::Send { svg, port, baud } => {
            let program = compile_svg_file(&svg, &config)?;
            let port = resolve_port(port.as_deref(), &config)?;

            let mut params = config.connection.connection_params(port);
            if let Some(baud) = baud {
                params = params.with_baud_rate(baud);
            }
            let transport = RealSerialPort::open(&params)?;
            let session = DeliverySession::new(program, config.session.ready_policy);
            let streamer =
                ProgramStreamer::new(transport, session, config.connection.streamer_config());

            let (handle, task) = streamer.spawn();
            let cancel = handle.clone();
            let ctrl_c = tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::warn!("Interrupted, stopping delivery");
                    cancel.cancel();
                }
            });

            let result = task.await.context("Delivery task panicked")?;
            ctrl_c.abort();
            let report = result?;

            let progress = handle.progress();
            println!(
                "Delivered {}/{} tokens in {:.1}s ({} protocol violations)",
                progress.cursor,
                progress.total,
                report.elapsed.as_secs_f64(),
                report.violations
            );
        }

        Command::Ports => {
            let ports = list_ports()?;
            if ports.is_empty() {
                println!("No serial ports found");
            }
            for port in ports {
                println!("{}\t{}", port.port_name, port.description);
            }
        }
    }

    Ok(())
}
