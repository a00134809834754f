// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Outbound command dispatch.
//!
//! Power commands go out immediately. Brightness changes pass through a
//! [`Debouncer`] so that dragging a slider produces a single
//! `SET_LASER_PWM` once the user pauses.

mod debounce;
mod dispatcher;

pub use debounce::Debouncer;
pub(crate) use dispatcher::CommandDispatcher;
