use clap::Parser;
use common::codec::DEFAULT_MAX_LINE_LENGTH;

use crate::channel_registry::{DEFAULT_CHANNEL_CAPACITY, MAX_CHANNEL_CAPACITY};

/// A small key-value server with named channels.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about = "A small key-value server with named channels", long_about = None)]
pub struct ServerArgs {
    /// Address to bind to.
    #[clap(long, default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on.
    #[clap(short, long, default_value = "6380")]
    pub port: u16,

    /// Records a channel buffers before SETTOCHAN starts failing.
    #[clap(long, default_value_t = DEFAULT_CHANNEL_CAPACITY, value_parser = parse_channel_capacity)]
    pub channel_capacity: usize,

    /// Reply `ERR <reason>` to failed channel commands instead of `OK`, and
    /// return the record read by READFROMCHAN.
    #[clap(long)]
    pub report_channel_errors: bool,

    /// Longest accepted request line, in bytes.
    #[clap(long, default_value_t = DEFAULT_MAX_LINE_LENGTH)]
    pub max_line_length: usize,
}

fn parse_channel_capacity(s: &str) -> Result<usize, String> {
    let capacity: usize = s.parse().map_err(|e| format!("{e}"))?;
    if (1..=MAX_CHANNEL_CAPACITY).contains(&capacity) {
        Ok(capacity)
    } else {
        Err(format!(
            "channel capacity must be between 1 and {MAX_CHANNEL_CAPACITY}"
        ))
    }
}

impl ServerArgs {
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn connection_options(&self) -> ConnectionOptions {
        ConnectionOptions {
            report_channel_errors: self.report_channel_errors,
            max_line_length: self.max_line_length,
        }
    }
}

/// Per-connection behaviour, copied into every connection task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionOptions {
    pub report_channel_errors: bool,
    pub max_line_length: usize,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            report_channel_errors: false,
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
        }
    }
}
