//! Config command - inspect and edit `config.ini`.
//!
//! Values are addressed as `section.key`. Edits to the overlay section are
//! checked against the optimizer's limits before anything is written, so a
//! saved file always yields a usable profile.

use std::path::Path;

use clap::Subcommand;
use lidarlayer::config::{config_file_path, ConfigFile, ConfigKey};

use crate::error::CliError;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Print one value (e.g. overlay.max_pixels)
    Get { key: String },

    /// Change one value and save the file
    Set { key: String, value: String },

    /// Print settings, optionally for a single section
    List {
        /// backend, processing, overlay or logging
        section: Option<String>,
    },

    /// Print the location of the config file
    Path,
}

/// Run a config subcommand against the default config file.
pub fn run(command: ConfigCommands) -> Result<(), CliError> {
    let output = run_at(command, &config_file_path())?;
    print!("{}", output);
    Ok(())
}

fn run_at(command: ConfigCommands, path: &Path) -> Result<String, CliError> {
    match command {
        ConfigCommands::Get { key } => get(path, &key),
        ConfigCommands::Set { key, value } => set(path, &key, &value),
        ConfigCommands::List { section } => list(path, section.as_deref()),
        ConfigCommands::Path => Ok(format!("{}\n", path.display())),
    }
}

fn section_summary(section: &str) -> &'static str {
    match section {
        "backend" => "processing service connection",
        "processing" => "raster generation parameters",
        "overlay" => "overlay image limits and display",
        _ => "log output",
    }
}

fn sections() -> Vec<&'static str> {
    let mut sections: Vec<&'static str> = Vec::new();
    for key in ConfigKey::all() {
        if !sections.contains(&key.section()) {
            sections.push(key.section());
        }
    }
    sections
}

fn parse_key(key: &str) -> Result<ConfigKey, CliError> {
    key.parse().map_err(|_| {
        CliError::Config(format!(
            "'{}' is not a setting; 'lidarlayer config list' shows them all",
            key
        ))
    })
}

fn get(path: &Path, key: &str) -> Result<String, CliError> {
    let key = parse_key(key)?;
    let value = key.get(&ConfigFile::load_from(path)?);
    Ok(format!("{}\n", display_value(&value)))
}

fn set(path: &Path, key: &str, value: &str) -> Result<String, CliError> {
    let key = parse_key(key)?;

    // An unreadable file is replaced rather than blocking the repair.
    let mut config = ConfigFile::load_from(path).unwrap_or_default();
    let previous = key.get(&config);
    key.set(&mut config, value)?;

    if key.section() == "overlay" {
        config
            .optimization_profile()
            .validate()
            .map_err(|e| CliError::Config(format!("{} rejected: {}", key.name(), e)))?;
    }
    config.save_to(path)?;

    Ok(format!(
        "{}: {} -> {}\n",
        key.name(),
        display_value(&previous),
        display_value(&key.get(&config))
    ))
}

fn list(path: &Path, only: Option<&str>) -> Result<String, CliError> {
    let known = sections();
    if let Some(section) = only {
        if !known.contains(&section) {
            return Err(CliError::Config(format!(
                "Unknown section '{}' (expected one of: {})",
                section,
                known.join(", ")
            )));
        }
    }

    let config = ConfigFile::load_from(path)?;
    let defaults = ConfigFile::default();
    let width = ConfigKey::all()
        .iter()
        .map(|k| k.key_name().len())
        .max()
        .unwrap_or(0);

    let mut out = String::new();
    let mut changed = false;
    for section in known.into_iter().filter(|s| only.map_or(true, |o| o == *s)) {
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(&format!("[{}]  {}\n", section, section_summary(section)));

        for key in ConfigKey::all().iter().filter(|k| k.section() == section) {
            let value = key.get(&config);
            let marker = if value != key.get(&defaults) {
                changed = true;
                '*'
            } else {
                ' '
            };
            out.push_str(&format!(
                " {} {:<width$} = {}\n",
                marker,
                key.key_name(),
                display_value(&value),
                width = width
            ));
        }

        if section == "overlay" {
            if let Err(e) = config.optimization_profile().validate() {
                out.push_str(&format!("   warning: {}\n", e));
            }
        }
    }

    if changed {
        out.push_str("\n* differs from the built-in default\n");
    }
    Ok(out)
}

fn display_value(value: &str) -> &str {
    if value.is_empty() {
        "(not set)"
    } else {
        value
    }
}
