// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Print the sphere neighborhood of one voxel.
//!
//! Diameter defaults to `neighborhood.default_diameter` from
//! `voxquery_configuration.toml` (or its environment overrides); the extent
//! defaults to unbounded. One coordinate is printed per line as `x y z`.

use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::process;

use anyhow::{bail, Context, Result};
use tracing::info;

use voxquery::config::{
    apply_cli_overrides, apply_environment_overrides, load_config, validate_config, ConfigError,
    VoxqueryConfig,
};
use voxquery::neighborhood::{Extent, Point3, Sphere};
use voxquery::observability::{debug_flags_help, init_logging_from_config, parse_debug_flags};

fn usage_and_exit() -> ! {
    eprintln!(
        "Usage: sphere_query [--config <path>] [--diameter <d>] [--extent x,y,z] x y z [--debug-all]\n\n\
         Defaults:\n\
         - diameter: neighborhood.default_diameter from the configuration\n\
         - extent: unbounded\n\n\
         {}",
        debug_flags_help()
    );
    process::exit(2);
}

#[derive(Debug, Default)]
struct Args {
    config: Option<PathBuf>,
    overrides: HashMap<String, String>,
    extent: Option<Vec<i64>>,
    center: Vec<i64>,
}

fn parse_int_list(value: &str) -> Result<Vec<i64>> {
    value
        .split(',')
        .map(|part| {
            part.trim()
                .parse::<i64>()
                .with_context(|| format!("'{}' is not an integer", part))
        })
        .collect()
}

fn parse_args() -> Result<Args> {
    let mut parsed = Args::default();

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let v = args.next().unwrap_or_else(|| usage_and_exit());
                parsed.config = Some(PathBuf::from(v));
            }
            "--diameter" => {
                let v = args.next().unwrap_or_else(|| usage_and_exit());
                parsed.overrides.insert("default_diameter".to_string(), v);
            }
            "--extent" => {
                let v = args.next().unwrap_or_else(|| usage_and_exit());
                parsed.extent = Some(parse_int_list(&v)?);
            }
            "-h" | "--help" => usage_and_exit(),
            other if other.starts_with("--debug-") => {}
            other => {
                let value = other
                    .parse::<i64>()
                    .with_context(|| format!("Unexpected argument: {}", other))?;
                parsed.center.push(value);
            }
        }
    }

    if parsed.center.len() != 3 {
        bail!("Expected exactly 3 center coordinates, got {}", parsed.center.len());
    }
    Ok(parsed)
}

/// Load the configuration file, or fall back to defaults when none exists
fn resolve_config(args: &Args) -> Result<VoxqueryConfig> {
    let config = match load_config(args.config.as_deref(), Some(&args.overrides)) {
        Ok(config) => config,
        Err(ConfigError::FileNotFound(_)) if args.config.is_none() => {
            let mut config = VoxqueryConfig::default();
            apply_environment_overrides(&mut config);
            apply_cli_overrides(&mut config, &args.overrides);
            config
        }
        Err(e) => return Err(e).context("Failed to load configuration"),
    };

    validate_config(&config).context("Invalid configuration")?;
    Ok(config)
}

fn main() -> Result<()> {
    let args = parse_args().unwrap_or_else(|e| {
        eprintln!("{:#}", e);
        usage_and_exit();
    });

    let config = resolve_config(&args)?;
    let _log_guard = init_logging_from_config(&parse_debug_flags(), &config)?;

    let diameter = config.neighborhood.default_diameter;
    let extent = match &args.extent {
        Some(values) => Extent::try_from(values.as_slice())?,
        None => Extent::UNBOUNDED,
    };
    let sphere = Sphere::with_extent(diameter, extent)?;
    let center = Point3::try_from(args.center.as_slice())?;

    info!(
        target: "voxquery",
        "Querying sphere of diameter {} around {} ({} stencil offsets)",
        diameter,
        center,
        sphere.template_len()
    );

    let mut count = 0usize;
    for p in sphere.iter_neighbors(center) {
        println!("{} {} {}", p.x, p.y, p.z);
        count += 1;
    }

    info!(target: "voxquery", "Printed {} neighbor coordinate(s)", count);
    Ok(())
}
