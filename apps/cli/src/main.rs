use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use lin_core::{
    CancelToken, ChecksumVariant, Frame, LinEngine, LinMaster, NetworkManagement, NodeConfig,
    ObservableTransport, ResponseTable, ScheduleTable, SerialTransport, TracingObserver,
    run_monitor, run_schedule, run_slave,
};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(author, version, about = "LIN bus master/slave/monitor tool", long_about = None)]
struct Args {
    /// Node configuration (TOML)
    #[arg(short, long)]
    config: Option<String>,

    /// Serial device, overrides the config file
    #[arg(short, long)]
    device: Option<String>,

    /// Baud rate, overrides the config file
    #[arg(short, long)]
    baud: Option<u32>,

    /// Use the LIN 1.3 classic checksum for all identifiers
    #[arg(long)]
    classic: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Send a single frame, or run the configured schedule table
    Master {
        /// Frame identifier (0-63)
        #[arg(long)]
        id: Option<u8>,

        /// Response bytes to publish, hex, comma separated
        #[arg(long, value_delimiter = ',', value_parser = parse_byte)]
        data: Vec<u8>,

        /// Response length to receive
        #[arg(long)]
        length: Option<usize>,

        /// Schedule cycles to run, forever when omitted
        #[arg(long)]
        cycles: Option<usize>,
    },
    /// Answer headers from the configured response table
    Slave,
    /// Print every header seen on the bus, never transmit
    Monitor,
    /// Send the wake-up pulse
    Wake,
    /// Send the goto-sleep command
    Sleep,
}

fn parse_byte(s: &str) -> Result<u8, String> {
    let digits = s.trim().trim_start_matches("0x").trim_start_matches("0X");
    u8::from_str_radix(digits, 16).map_err(|e| format!("invalid byte '{}': {}", s, e))
}

fn load_config(args: &Args) -> Result<NodeConfig> {
    let mut config = match &args.config {
        Some(path) => NodeConfig::load_from_file(path)?,
        None => NodeConfig::default(),
    };
    if let Some(device) = &args.device {
        config.device = device.clone();
    }
    if let Some(baud) = args.baud {
        config.baud_rate = baud;
    }
    if args.classic {
        config.checksum = ChecksumVariant::Classic;
    }
    config.validate()?;
    Ok(config)
}

type Engine = LinEngine<ObservableTransport<SerialTransport, TracingObserver>>;

fn open_engine(config: &NodeConfig) -> Result<Engine> {
    let serial = SerialTransport::open(&config.device, config.baud_rate, config.read_timeout())
        .with_context(|| format!("opening {}", config.device))?
        .with_echo(config.echo);
    let observer = Arc::new(TracingObserver);
    let transport = ObservableTransport::new(serial, observer.clone());
    Ok(LinEngine::with_observer(
        transport,
        config.engine_config(),
        observer,
    ))
}

fn run(args: Args) -> Result<()> {
    let config = load_config(&args)?;
    let cancel = CancelToken::new();
    let interrupt = cancel.clone();
    ctrlc::set_handler(move || interrupt.cancel()).context("installing Ctrl-C handler")?;
    let mut engine = open_engine(&config)?;

    match args.command {
        Command::Master {
            id,
            data,
            length,
            cycles,
        } => {
            if let Some(id) = id {
                let frame = engine.send(Frame::with_payload(id, length, data)?)?;
                println!("{}", frame);
                return Ok(());
            }
            let table = ScheduleTable::from_entries(&config.schedule)?;
            if table.is_empty() {
                bail!("no --id given and the config has no schedule");
            }
            info!(slots = table.len(), "Running schedule table");
            let report = run_schedule(&mut engine, &table, cycles, &cancel)?;
            info!(
                cycles = report.cycles,
                sent = report.sent,
                received = report.received,
                checksum_errors = report.checksum_errors,
                transport_errors = report.transport_errors,
                "Schedule finished"
            );
        }
        Command::Slave => {
            let mut table = ResponseTable::from_entries(&config.responses)?;
            info!(entries = table.len(), "Serving response table");
            let timeout = config.header_timeout();
            let report = run_slave(&mut engine, &mut table, timeout, &cancel)?;
            info!(
                headers = report.headers,
                checksum_errors = report.checksum_errors,
                transport_errors = report.transport_errors,
                idle_periods = report.idle_periods,
                "Slave stopped"
            );
        }
        Command::Monitor => {
            let started = Instant::now();
            let report = run_monitor(&mut engine, &cancel, |frame| {
                let at = started.elapsed().as_secs_f64();
                println!("{:>10.4}  {}", at, frame);
            })?;
            info!(headers = report.headers, "Monitor stopped");
        }
        Command::Wake => {
            let ready = engine.wake_up()?;
            // Slaves need up to 100 ms after the pulse.
            std::thread::sleep(ready.saturating_duration_since(Instant::now()));
            info!("Bus awake");
        }
        Command::Sleep => {
            engine.goto_sleep()?;
            std::thread::sleep(Duration::from_millis(10));
        }
    }
    Ok(())
}

fn main() {
    let args = Args::parse();

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(if args.verbose {
                    tracing::Level::DEBUG.into()
                } else {
                    tracing::Level::INFO.into()
                })
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    if let Err(e) = run(args) {
        error!("Error: {:#}", e);
        std::process::exit(1);
    }
}
