// SPDX-License-Identifier: MIT OR Apache-2.0
//! Wire encoding: single-packet JSON and line-delimited episode logs.

pub mod episode_log;
pub mod error;
pub mod wire;

pub use episode_log::{read_episode_log, write_episode_log};
pub use error::ProtocolError;
pub use wire::{decode_packet, encode_packet};
