// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::config::{KEYS, get_setting, set_setting};
use crate::utils::{pretty_table, req_arg};
use anyhow::Result;
use rusqlite::Connection;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("get", sub)) => {
            let key = req_arg(sub, "key");
            match get_setting(conn, &key)? {
                Some(v) => println!("{}", v),
                None => println!("{} is not set", key),
            }
        }
        Some(("set", sub)) => {
            let key = req_arg(sub, "key");
            let value = req_arg(sub, "value");
            set_setting(conn, &key, &value)?;
            println!("Set {} = {}", key, value);
        }
        Some(("list", _)) => {
            let mut data = Vec::new();
            for key in KEYS {
                data.push(vec![
                    key.to_string(),
                    get_setting(conn, key)?.unwrap_or_else(|| "(default)".into()),
                ]);
            }
            println!("{}", pretty_table(&["Key", "Value"], data));
        }
        _ => {}
    }
    Ok(())
}
