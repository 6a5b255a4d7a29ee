// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-fnirs project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use anyhow::Result;
use rust_fnirs::config;

#[test]
fn test_config_schema_output() -> Result<()> {
    // The schema goes to stdout; this only checks that it parses and prints
    config::output_config_schema()?;
    Ok(())
}

#[test]
fn test_default_config_matches_schema() -> Result<()> {
    let schema: serde_json::Value = serde_json::from_str(include_str!(
        "../resources/config.schema.json"
    ))?;
    let validator = jsonschema::draft202012::options()
        .should_validate_formats(true)
        .build(&schema)?;

    let json = serde_json::to_value(config::Config::default())?;
    assert!(validator.is_valid(&json));
    Ok(())
}
