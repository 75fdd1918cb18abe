// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

pub mod amortization;
pub mod bills;
pub mod calc;
pub mod cli;
pub mod commands;
pub mod config;
pub mod db;
pub mod errors;
pub mod loans;
pub mod models;
pub mod pnl;
pub mod records;
pub mod recurrence;
pub mod schedule;
pub mod sync;
pub mod trading;
pub mod utils;
