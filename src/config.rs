//! Server configuration
//!
//! Command line options for the relay binary, parsed with clap.

use std::time::Duration;

use clap::Parser;

use crate::session::{SessionConfig, DEFAULT_OUTBOUND_BUFFER};
use crate::types::RoomCreation;

/// In-memory WebSocket chat-room relay
#[derive(Parser, Debug, Clone)]
#[command(name = "room_relay")]
#[command(about = "In-memory WebSocket chat-room relay", long_about = None)]
pub struct ServerConfig {
    /// Host address to bind the server to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    pub host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, default_value_t = 8080)]
    pub port: u16,

    /// Whether joining an unknown room id creates it or is rejected
    #[arg(long, value_enum, default_value_t = RoomCreation::Explicit)]
    pub room_creation: RoomCreation,

    /// Disconnect clients that send nothing for this many seconds
    #[arg(long)]
    pub idle_timeout_secs: Option<u64>,

    /// Frames buffered per client before it is dropped as too slow
    #[arg(long, default_value_t = DEFAULT_OUTBOUND_BUFFER)]
    pub outbound_buffer: usize,
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            idle_timeout: self.idle_timeout_secs.map(Duration::from_secs),
            outbound_buffer: self.outbound_buffer,
        }
    }
}
