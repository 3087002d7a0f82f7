use clap::{Parser, Subcommand};
use shorturl_generator::DEFAULT_TOKEN_LENGTH;
use shorturl_shortener::{DEFAULT_BASE_URL, DEFAULT_BATCH_SIZE};
use std::path::PathBuf;

pub const BASE_URL_ENV: &str = "BASE_URL";
pub const FILE_STORAGE_PATH_ENV: &str = "FILE_STORAGE_PATH";
pub const DATABASE_DSN_ENV: &str = "DATABASE_DSN";
pub const BATCH_SIZE_ENV: &str = "SHORTENER_BATCH_SIZE";
pub const TOKEN_LENGTH_ENV: &str = "SHORTENER_TOKEN_LENGTH";
pub const LOG_FORMAT_ENV: &str = "SHORTENER_LOG_FORMAT";

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "shortener", about = "Reduce long URLs to short tokens")]
pub struct CLI {
    /// Prefix of the printed short URLs.
    #[arg(short = 'b', long, env = BASE_URL_ENV, default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Append-only JSON-lines file used when no database is configured.
    #[arg(short = 'f', long, env = FILE_STORAGE_PATH_ENV)]
    pub file_storage_path: Option<PathBuf>,

    /// PostgreSQL connection string; takes precedence over the file.
    #[arg(short = 'd', long, env = DATABASE_DSN_ENV)]
    pub database_dsn: Option<String>,

    #[arg(long, env = BATCH_SIZE_ENV, default_value_t = DEFAULT_BATCH_SIZE)]
    pub batch_size: usize,

    #[arg(long, env = TOKEN_LENGTH_ENV, default_value_t = DEFAULT_TOKEN_LENGTH)]
    pub token_length: usize,

    #[arg(long, env = LOG_FORMAT_ENV, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print one short URL per argument.
    Reduce {
        #[arg(required = true)]
        urls: Vec<String>,
    },
    /// Read a JSON array of `{correlation_id, original_url}` from stdin and
    /// print the reduced array.
    Batch,
    /// Print the original URL behind a short token.
    Resolve { token: String },
}
