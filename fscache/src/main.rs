mod output;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use fscache_core::{Cache, CacheConfig, DEFAULT_APP_NAME, FilenameStrategy};
use output::{
    CleanOutput, GetOutput, OutputWriter, PathOutput, PurgeOutput, PutOutput, RmOutput,
    StatOutput, format_timestamp,
};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Exit code for a cache miss.
const EXIT_MISS: u8 = 1;

/// Exit code for a failed command.
const EXIT_ERROR: u8 = 2;

/// fscache - A filesystem-backed key-value cache
#[derive(Parser)]
#[command(name = "fscache")]
#[command(about = "Filesystem-backed key-value cache with expiration", long_about = None)]
#[command(version)]
struct Cli {
    /// Application name; entries live in <dir>/<app>
    #[arg(long, global = true, env = "FSCACHE_APP", default_value = DEFAULT_APP_NAME)]
    app: String,

    /// Base cache directory (defaults to the per-user cache directory)
    #[arg(short, long, global = true, env = "FSCACHE_DIR")]
    dir: Option<PathBuf>,

    /// Use keys as filenames instead of hashing them
    #[arg(long, global = true)]
    plain_names: bool,

    /// Default lifetime of new entries in seconds (0 = never expire)
    #[arg(long, global = true, env = "FSCACHE_TTL", default_value_t = 0)]
    ttl: u64,

    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Store a file (or stdin) under a key
    Put {
        /// Cache key
        key: String,

        /// File to store (reads stdin if omitted)
        file: Option<PathBuf>,

        /// Lifetime in seconds for this entry, overriding --ttl
        #[arg(long)]
        expire: Option<u64>,
    },

    /// Print the payload stored under a key
    Get {
        /// Cache key
        key: String,

        /// Write the payload to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Remove an entry
    Rm {
        /// Cache key
        key: String,
    },

    /// Show an entry's header without loading it
    Stat {
        /// Cache key
        key: String,
    },

    /// Remove expired and unreadable entries
    Clean {
        /// Dry run - show what would be deleted without deleting
        #[arg(long)]
        dry_run: bool,
    },

    /// Remove every entry and the cache directory
    Purge,

    /// Print the cache directory, or the entry path for a key
    Path {
        /// Cache key
        key: Option<String>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let output = OutputWriter::new(cli.json);

    match run(cli, &output) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            output.write_error(&e, EXIT_ERROR);
            ExitCode::from(EXIT_ERROR)
        }
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli, output: &OutputWriter) -> Result<u8> {
    let cache = open_cache(&cli)?;

    match cli.command {
        Commands::Put { key, file, expire } => cmd_put(&cache, output, &key, file, expire),
        Commands::Get { key, output: dest } => cmd_get(&cache, output, &key, dest.as_deref()),
        Commands::Rm { key } => cmd_rm(&cache, output, &key),
        Commands::Stat { key } => cmd_stat(&cache, output, &key),
        Commands::Clean { dry_run } => cmd_clean(&cache, output, dry_run),
        Commands::Purge => cmd_purge(&cache, output),
        Commands::Path { key } => cmd_path(&cache, output, key),
    }
}

fn open_cache(cli: &Cli) -> Result<Cache> {
    let strategy = if cli.plain_names {
        FilenameStrategy::Plain
    } else {
        FilenameStrategy::Hashed
    };

    let mut config = CacheConfig::new(cli.app.as_str())
        .with_context(|| format!("Invalid app name: {:?}", cli.app))?
        .with_filename_strategy(strategy)
        .with_default_expiration(cli.ttl);
    if let Some(dir) = &cli.dir {
        config = config.with_base_dir(dir);
    }

    Cache::open(config).with_context(|| format!("Failed to open cache for app {}", cli.app))
}

fn read_input(file: Option<&Path>) -> Result<Vec<u8>> {
    match file {
        Some(path) => {
            std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))
        }
        None => {
            if atty::is(atty::Stream::Stdin) {
                anyhow::bail!("No input file given and stdin is a terminal");
            }
            let mut buf = Vec::new();
            std::io::stdin()
                .read_to_end(&mut buf)
                .context("Failed to read stdin")?;
            Ok(buf)
        }
    }
}

fn cmd_put(
    cache: &Cache,
    output: &OutputWriter,
    key: &str,
    file: Option<PathBuf>,
    expire: Option<u64>,
) -> Result<u8> {
    let payload = read_input(file.as_deref())?;
    if u32::try_from(payload.len()).is_err() {
        anyhow::bail!("Payload of {} bytes is too large to cache", payload.len());
    }

    let expiration_secs = expire.unwrap_or(cache.config().default_expiration());
    cache.save_with_expiration(key, &payload, expiration_secs)?;

    let data = PutOutput {
        success: true,
        result_code: 0,
        key: key.to_string(),
        size: payload.len(),
        expiration_secs,
    };
    output.write(&data, || {
        if expiration_secs == 0 {
            format!("Stored {} ({} bytes)\n", key, payload.len())
        } else {
            format!(
                "Stored {} ({} bytes, expires in {}s)\n",
                key,
                payload.len(),
                expiration_secs
            )
        }
    })?;

    Ok(0)
}

fn cmd_get(cache: &Cache, output: &OutputWriter, key: &str, dest: Option<&Path>) -> Result<u8> {
    let Some(payload) = cache.load(key)? else {
        let data = GetOutput {
            success: false,
            result_code: EXIT_MISS,
            key: key.to_string(),
            found: false,
            size: None,
            destination: None,
        };
        if output.is_json() {
            output.write(&data, String::new)?;
        } else {
            eprintln!("Cache miss: {}", key);
        }
        return Ok(EXIT_MISS);
    };

    match dest {
        Some(path) => {
            std::fs::write(path, &payload)
                .with_context(|| format!("Failed to write {}", path.display()))?;

            let data = GetOutput {
                success: true,
                result_code: 0,
                key: key.to_string(),
                found: true,
                size: Some(payload.len()),
                destination: Some(path.display().to_string()),
            };
            output.write(&data, || {
                format!("Wrote {} bytes to {}\n", payload.len(), path.display())
            })?;
        }
        None => output.write_raw(&payload)?,
    }

    Ok(0)
}

fn cmd_rm(cache: &Cache, output: &OutputWriter, key: &str) -> Result<u8> {
    let removed = cache
        .remove(key)
        .with_context(|| format!("Failed to remove entry: {}", key))?;

    let data = RmOutput {
        success: true,
        result_code: 0,
        key: key.to_string(),
        removed,
    };
    output.write(&data, || {
        if removed {
            format!("Removed {}\n", key)
        } else {
            format!("No entry for {}\n", key)
        }
    })?;

    Ok(0)
}

fn cmd_stat(cache: &Cache, output: &OutputWriter, key: &str) -> Result<u8> {
    let Some(info) = cache.stat(key)? else {
        anyhow::bail!("No entry for {}", key);
    };

    let data = StatOutput::new(key, info);
    output.write(&data, || {
        let header = &data.header;
        let mut text = String::new();
        text.push_str(&format!("Key: {}\n", data.key));
        text.push_str(&format!("Path: {}\n", data.path));
        text.push_str(&format!("Version: {}\n", header.version));
        text.push_str(&format!("Created: {}\n", format_timestamp(header.created_at)));
        text.push_str(&format!("Expires: {}\n", format_timestamp(header.expiration_at)));
        text.push_str(&format!("Size: {} bytes\n", header.data_length));
        text.push_str(&format!("Size (on disk): {} bytes\n", data.size_on_disk));
        if data.expired {
            text.push_str("Status: expired\n");
        } else if !data.complete {
            text.push_str("Status: truncated\n");
        } else {
            text.push_str("Status: valid\n");
        }
        text
    })?;

    Ok(0)
}

fn cmd_clean(cache: &Cache, output: &OutputWriter, dry_run: bool) -> Result<u8> {
    let stats = cache.sweep(dry_run);

    let data = CleanOutput::new(dry_run, stats);
    output.write(&data, || {
        let mut text = String::new();
        if dry_run {
            text.push_str("Dry run - no entries deleted\n");
            text.push_str(&format!("Would delete {} entries\n", data.entries_removed));
            text.push_str(&format!("Would free {} bytes\n", data.bytes_freed));
        } else {
            text.push_str(&format!("Deleted {} entries\n", data.entries_removed));
            text.push_str(&format!("Freed {} bytes\n", data.bytes_freed));
        }
        for failure in &data.failures {
            text.push_str(&format!(
                "Skipped {}: {}\n",
                failure.path.display(),
                failure.reason
            ));
        }
        text
    })?;

    Ok(0)
}

fn cmd_purge(cache: &Cache, output: &OutputWriter) -> Result<u8> {
    cache
        .clean_all()
        .with_context(|| format!("Failed to remove {}", cache.dir().display()))?;

    let data = PurgeOutput {
        success: true,
        result_code: 0,
        directory: cache.dir().display().to_string(),
    };
    output.write(&data, || format!("Removed {}\n", data.directory))?;

    Ok(0)
}

fn cmd_path(cache: &Cache, output: &OutputWriter, key: Option<String>) -> Result<u8> {
    let path = match &key {
        Some(key) => cache
            .entry_path(key)
            .with_context(|| format!("Invalid key: {}", key))?,
        None => cache.dir().to_path_buf(),
    };

    let data = PathOutput {
        success: true,
        result_code: 0,
        key,
        path: path.display().to_string(),
    };
    output.write(&data, || format!("{}\n", data.path))?;

    Ok(0)
}
