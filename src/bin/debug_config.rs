// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-fnirs project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

// Load a configuration file and print what the pipeline would run with
use anyhow::Result;
use rust_fnirs::config::Config;
use std::path::PathBuf;

fn main() -> Result<()> {
    env_logger::init();

    let path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.yaml"));

    println!("Testing file: {:?}", path);
    println!("File exists: {}", path.exists());

    match Config::from_file(&path) {
        Ok(config) => {
            println!("Validation succeeded");
            println!("{:#?}", config.pipeline_config());
        }
        Err(e) => println!("Validation failed: {:#}", e),
    }

    Ok(())
}
