// SPDX-FileCopyrightText: 2026 Worklink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait definitions for the Worklink chat client.

pub mod transport;

pub use transport::Transport;
