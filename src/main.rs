use clap::Parser;
use dir_tailer::{Encoding, LogTailer, TailStream, TailerConfig};
use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration;
use tokio_stream::StreamExt;
use tracing_subscriber::EnvFilter;

/// Follow every log file in a folder, surviving rotation.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Folder to watch
    folder: PathBuf,

    /// Only watch files with this name (repeatable)
    #[arg(long = "file", value_name = "NAME")]
    files: Vec<String>,

    /// Print the last N lines of each file before following
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    tail_lines: i64,

    /// Milliseconds between polls
    #[arg(long, default_value_t = 100)]
    interval_ms: u64,

    /// Maximum bytes read per batch
    #[arg(long, default_value_t = dir_tailer::DEFAULT_SIZE_HINT)]
    size_hint: usize,

    /// File encoding label, e.g. utf-8, gbk, latin1
    #[arg(long, default_value = "utf-8")]
    encoding: Encoding,

    /// Poll once and exit
    #[arg(long)]
    once: bool,

    /// Poll early when the folder reports a change
    #[arg(long)]
    wake_on_change: bool,
}

fn print_lines(path: &Path, lines: Vec<String>) {
    for line in lines {
        println!("{} ---> {}", path.display(), line);
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let interval = Duration::from_millis(args.interval_ms);
    let config = TailerConfig::new(&args.folder)
        .file_names(args.files)
        .encoding(args.encoding)
        .tail_lines(args.tail_lines)
        .size_hint(args.size_hint)
        .wake_on_change(args.wake_on_change);

    if args.once {
        let result = LogTailer::new(config, print_lines)
            .and_then(|mut tailer| tailer.run(interval, false));
        if let Err(e) = result {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
        return;
    }

    let mut stream = match TailStream::new(config, interval).await {
        Ok(stream) => stream,
        Err(e) => {
            eprintln!("Error setting up tailer: {}", e);
            process::exit(1);
        }
    };

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            batch = stream.next() => match batch {
                Some(Ok(batch)) => print_lines(&batch.path, batch.lines),
                Some(Err(e)) => {
                    eprintln!("Error reading folder: {}", e);
                    process::exit(1);
                }
                None => break,
            },
        }
    }
}
