use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use log::{debug, warn};

use tftpc::stream::{ReadSource, WriteSink};
use tftpc::{client, Direction, Error, FinalAck, RetransmissionConfig, TransferSummary};

/// Trivial File Transfer Protocol client
#[derive(Debug, Parser)]
#[command(name = "tftpc", version, about)]
struct Cli {
    /// Server host name or IP address
    host: String,

    /// Download (get) or upload (put)
    #[arg(value_enum)]
    action: Action,

    /// Name of the file on the server
    filename: String,

    /// Server request port
    #[arg(short, long, default_value_t = 69)]
    port: u16,

    /// Seconds to wait for each reply
    #[arg(short, long, default_value_t = 10)]
    timeout: u64,

    /// Retransmissions before giving up
    #[arg(short, long, default_value_t = RetransmissionConfig::DEFAULT_MAX_RETRANSMISSIONS)]
    retries: usize,

    /// Local file path, or `-` for standard input/output (defaults to the remote file name)
    #[arg(short, long)]
    local: Option<PathBuf>,

    /// Treat an upload as complete only once the server acknowledges the last block
    #[arg(long)]
    await_final_ack: bool,

    /// Log every protocol step
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Action {
    Get,
    Put,
}

impl From<Action> for Direction {
    fn from(action: Action) -> Direction {
        match action {
            Action::Get => Direction::Get,
            Action::Put => Direction::Put,
        }
    }
}

impl Cli {
    fn local_path(&self) -> PathBuf {
        if let Some(local) = &self.local {
            return local.clone();
        }

        match self.action {
            // Don't recreate the server's directory layout locally.
            Action::Get => Path::new(&self.filename)
                .file_name()
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(&self.filename)),
            Action::Put => PathBuf::from(&self.filename),
        }
    }

    fn uses_stdio(&self) -> bool {
        self.local.as_deref() == Some(Path::new("-"))
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let cancel = Arc::new(AtomicBool::new(false));
    let flag = cancel.clone();
    if let Err(e) = ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst)) {
        warn!("could not install Ctrl-C handler: {}", e);
    }

    let local = cli.local_path();
    match run(&cli, &local, cancel) {
        Ok(summary) => {
            debug!("{:?}", summary);
            if cli.uses_stdio() {
                eprintln!("success");
            } else {
                println!("success");
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("tftpc: {}", describe(&err, &local));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli, local: &Path, cancel: Arc<AtomicBool>) -> Result<TransferSummary, Error> {
    let config = RetransmissionConfig::new(Duration::from_secs(cli.timeout), cli.retries);
    let final_ack = if cli.await_final_ack {
        FinalAck::Await
    } else {
        FinalAck::Optimistic
    };

    let client = client::Builder::new()
        .with_retransmission_config(config)
        .with_final_ack(final_ack)
        .with_cancel_flag(cancel)
        .connect_to((cli.host.as_str(), cli.port))?
        .build()?;
    debug!("talking to {}", client.server());

    if cli.uses_stdio() {
        return match cli.action {
            Action::Get => client.get(&cli.filename, WriteSink::new(std::io::stdout().lock())),
            Action::Put => client.put(&cli.filename, ReadSource::new(std::io::stdin().lock())),
        };
    }

    client.run(cli.action.into(), &cli.filename, local)
}

fn describe(err: &Error, local: &Path) -> String {
    match err {
        Error::LocalIo(e) if e.kind() == ErrorKind::NotFound => {
            format!("{}: file not found", local.display())
        }
        Error::TimeoutExceeded { .. } => format!("{} (server not responding)", err),
        _ => err.to_string(),
    }
}
