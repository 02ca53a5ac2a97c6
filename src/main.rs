use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;
use anyhow::anyhow;
use clap::Parser;
use clap_derive::{Args, Parser, Subcommand};
use delayprobe::probe::clock::SystemWallClock;
use delayprobe::probe::endpoint::{accept_one, connect, DEFAULT_PORT};
use delayprobe::probe::probe_config::{ProbeConfig, ReadMode, DEFAULT_SEGMENT_LEN};
use delayprobe::probe::receiver::SegmentReceiver;
use delayprobe::probe::record_log::RecordLog;
use delayprobe::probe::sender::SegmentSender;
use tracing::{info, Level};

#[derive(Parser)]
#[clap(about = "one-way delay measurement with counter-stamped stream segments")]
struct Cli {
    #[clap(subcommand)]
    command: Command,

    /// print debug output while running
    #[clap(short, long, global = true, default_value_t = false)]
    debug: bool,

    #[clap(long, global = true, default_value_t = false)]
    very_verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// connect to a receiver and send segments
    Send {
        /// receiver address
        #[clap(short = 'c', long)]
        peer: IpAddr,

        #[clap(long, default_value_t = 100)]
        count: u64,

        /// minimum time between two segments
        #[clap(long, default_value_t = 10)]
        interval_millis: u64,

        /// first counter value, digits A to E (values below 2 are raised to 2)
        #[clap(long, value_delimiter = ',')]
        start_counter: Option<Vec<u8>>,

        #[clap(flatten)]
        common: CommonArgs,
    },
    /// wait for a sender and log the arrival of its segments
    Receive {
        #[clap(long, default_value = "0.0.0.0")]
        bind: IpAddr,

        /// read full segments before scanning instead of scanning every read as it comes
        #[clap(long, default_value_t = false)]
        segment_reads: bool,

        /// number of leading bytes of every read that are not scanned
        #[clap(long, default_value_t = 0)]
        leading_skip: usize,

        /// receive buffer size, defaults to the segment length
        #[clap(long)]
        read_buffer: Option<usize>,

        #[clap(flatten)]
        common: CommonArgs,
    },
}

#[derive(Args)]
struct CommonArgs {
    #[clap(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    #[clap(short, long)]
    log: PathBuf,

    /// free text written as the first line of the log
    #[clap(short, long)]
    annotation: Option<String>,

    #[clap(long, default_value_t = DEFAULT_SEGMENT_LEN)]
    segment_len: usize,

    /// offset of the marker window, defaults to the middle of the segment
    #[clap(long)]
    marker_offset: Option<usize>,

    #[clap(long, default_value_t = 1)]
    sentinel: u8,

    /// fsync the log after every record
    #[clap(long, default_value_t = false)]
    sync: bool,
}

impl CommonArgs {
    fn probe_config(&self) -> ProbeConfig {
        let mut config = ProbeConfig::new(&self.log)
            .with_segment_len(self.segment_len);
        config.layout.sentinel = self.sentinel;
        if let Some(offset) = self.marker_offset {
            config.layout.marker_offset = offset;
        }
        config.annotation = self.annotation.clone();
        config.sync_log_to_disk = self.sync;
        config
    }
}

#[tokio::main(flavor = "current_thread")]
pub async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match (cli.debug, cli.very_verbose) {
        (_, true) => Level::TRACE,
        (true, _) => Level::DEBUG,
        (false, false) => Level::INFO,
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .try_init()
        .ok();

    match cli.command {
        Command::Send { peer, count, interval_millis, start_counter, common } => {
            let mut config = common.probe_config();
            config.num_segments = count;
            config.send_interval = Duration::from_millis(interval_millis);
            if let Some(digits) = start_counter {
                config.start_counter = digits.try_into()
                    .map_err(|d: Vec<u8>| anyhow!("start counter needs exactly 5 digits, got {}", d.len()))?;
            }
            config.validate()?;

            let log = RecordLog::open(&config.log_path, config.annotation.as_deref(), config.sync_log_to_disk, SystemWallClock {})?;
            let stream = connect(SocketAddr::new(peer, common.port)).await?;

            let mut sender = SegmentSender::new(&config, stream, log)?;
            let summary = sender.run().await?;
            info!("sent {} segments ({} bytes)", summary.num_segments, summary.num_bytes);
        }
        Command::Receive { bind, segment_reads, leading_skip, read_buffer, common } => {
            let mut config = common.probe_config();
            config.leading_skip = leading_skip;
            if let Some(read_buffer) = read_buffer {
                config.read_buffer_len = read_buffer;
            }
            if segment_reads {
                config.read_mode = ReadMode::Segment;
            }
            config.validate()?;

            let log = RecordLog::open(&config.log_path, config.annotation.as_deref(), config.sync_log_to_disk, SystemWallClock {})?;
            let (stream, _) = accept_one(SocketAddr::new(bind, common.port)).await?;

            let mut receiver = SegmentReceiver::new(&config, stream, log)?;
            let summary = receiver.run().await?;
            info!("logged {} of {} markers found in {} bytes", summary.num_logged(), summary.num_markers, summary.num_bytes);
        }
    }
    Ok(())
}
