use clap::Parser;
use crossbeam_channel::bounded;
use log::{LevelFilter, error, info, warn};
use log4rs::{
    append::rolling_file::{
        RollingFileAppender,
        policy::compound::{
            CompoundPolicy, roll::fixed_window::FixedWindowRoller, trigger::size::SizeTrigger,
        },
    },
    config::{Appender, Config as LogConfig, Logger, Root},
    encode::pattern::PatternEncoder,
};
use network::{EVENT_CHANNEL_LEN, NetworkLink};
use scoreboard_common::subscriber::Subscriber;
use std::{
    io::Write,
    net::{IpAddr, Ipv4Addr, SocketAddr},
    path::PathBuf,
    time::Duration,
};

mod network;
mod render;

const APP_NAME: &str = "overlay";
const FRAME_INTERVAL: Duration = Duration::from_millis(100);

#[derive(serde::Serialize, serde::Deserialize, Debug)]
pub struct AppConfig {
    control_ip: IpAddr,
    control_port: u16,
    reconnect_delay_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            control_ip: IpAddr::V4(Ipv4Addr::LOCALHOST),
            control_port: 8000,
            reconnect_delay_ms: 1000,
        }
    }
}

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Cli {
    #[clap(long, short, action(clap::ArgAction::Count))]
    /// Increase the log verbosity
    verbose: u8,

    #[clap(long)]
    /// Directory within which log files will be placed, default is platform dependent
    log_location: Option<PathBuf>,

    #[clap(long, default_value = "5000000")]
    /// Max size in bytes that a log file is allowed to reach before being rolled over
    log_max_file_size: u64,

    #[clap(long, default_value = "3")]
    /// Number of archived logs to keep
    num_old_logs: u32,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging(Cli::parse())?;

    let config: AppConfig = match confy::load(APP_NAME, None) {
        Ok(config) => config,
        Err(e) => {
            warn!("Failed to read config file, overwriting with default. Error: {e}");
            let config = AppConfig::default();
            confy::store(APP_NAME, None, &config)?;
            config
        }
    };

    let (tx, rx) = bounded(EVENT_CHANNEL_LEN);
    let addr = SocketAddr::new(config.control_ip, config.control_port);
    let retry_delay = Duration::from_millis(config.reconnect_delay_ms);

    let net_worker = std::thread::spawn(move || {
        network::networking_thread(tx, addr, retry_delay);
    });

    let mut link = NetworkLink::new(rx);
    let (subscriber, _) = Subscriber::attach(&mut link);
    let mut last_drawn = None;

    info!("Display started");
    loop {
        if net_worker.is_finished() {
            error!("Networking thread stopped");
            return Err("Networking thread stopped".into());
        }

        link.pump(FRAME_INTERVAL)?;

        let mirror = subscriber.borrow();
        let frame = render::render(mirror.view(), mirror.is_stale());
        if last_drawn.as_ref() != Some(&frame) {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "\x1b[2J\x1b[H{frame}")?;
            stdout.flush()?;
            last_drawn = Some(frame);
        }
    }
}

fn init_logging(args: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let log_level = match args.verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    let log_base_path = match args.log_location {
        Some(path) => path,
        None => {
            let mut path = directories::BaseDirs::new()
                .ok_or("Could not find a directory to store logs")?
                .data_local_dir()
                .to_path_buf();
            path.push("scoreboard-logs");
            path
        }
    };
    let mut log_path = log_base_path.clone();
    let mut archived_log_path = log_base_path.clone();
    log_path.push(format!("{APP_NAME}-log.txt"));
    archived_log_path.push(format!("{APP_NAME}-log-{{}}.txt.gz"));

    // Setup the file log roller
    let roller = FixedWindowRoller::builder().build(
        archived_log_path
            .as_os_str()
            .to_str()
            .ok_or("The log path is not valid unicode")?,
        args.num_old_logs,
    )?;
    let file_policy = CompoundPolicy::new(
        Box::new(SizeTrigger::new(args.log_max_file_size)),
        Box::new(roller),
    );
    let file_appender = RollingFileAppender::builder()
        .append(true)
        .encoder(Box::new(PatternEncoder::new("[{d} {l:5} {M}] {m}{n}")))
        .build(log_path, Box::new(file_policy))?;

    // Setup the logging from all locations to use `LevelFilter::Error`. Stdout belongs to the
    // display, so nothing is logged to the console.
    let root = Root::builder()
        .appender("file_appender")
        .build(LevelFilter::Error);

    // Setup the top level logging config
    let log_config = LogConfig::builder()
        .appender(Appender::builder().build("file_appender", Box::new(file_appender)));

    let log_config = log_config
        .logger(Logger::builder().build(APP_NAME, log_level)) // Setup the logging from the overlay to use `log_level`
        .logger(Logger::builder().build("scoreboard_common", log_level))
        .build(root)?;

    log4rs::init_config(log_config)?;
    log_panics::init();

    Ok(())
}
