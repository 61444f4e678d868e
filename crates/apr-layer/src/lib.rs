// SPDX-License-Identifier: MIT OR Apache-2.0
//! Layer contracts (the fixed `can_emit`/`can_receive` sets and the
//! external `invoke` function signature) and the northbound/southbound
//! packet buses that connect them.

pub mod bus;
pub mod contract;

pub use bus::{Bus, BusMessage, BusStats, BusSubscriber};
pub use contract::{can_emit, can_receive, filter_emitted, filter_received, may_emit, may_receive, Layer, StepContext};
