// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-fnirs project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Pipeline worker configuration

use serde::{Deserialize, Serialize};

/// Channel capacities of the background pipeline worker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Capacity of the bounded command queue feeding the pipeline
    pub queue_capacity: usize,
    /// Capacity of the broadcast channel carrying pipeline events
    pub event_capacity: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 256,
            event_capacity: 1024,
        }
    }
}
