// SPDX-FileCopyrightText: 2026 Worklink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Worklink integration tests.

pub mod mock_transport;

pub use mock_transport::{make_message, make_typing, MockTransport};
