use anyhow::{bail, Result};
use clap::{Args, Subcommand};
use serde_json::Value as JsonValue;

use crate::cli::context::CliContext;

#[derive(Args, Clone, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Clone, Debug)]
pub enum ConfigAction {
    /// Show the effective configuration (file, environment and defaults)
    Show,

    /// Get configuration value
    Get {
        /// Dotted key, e.g. `wait.poll_interval_ms`
        key: String,
    },

    /// Validate configuration
    Validate,
}

pub async fn cmd_config(args: ConfigArgs, ctx: &CliContext) -> Result<()> {
    let config = ctx.config();
    match args.action {
        ConfigAction::Show => {
            println!("# Effective configuration ({})", ctx.config_path().display());
            print!("{}", serde_yaml::to_string(config)?);
        }
        ConfigAction::Get { key } => {
            let json = serde_json::to_value(config)?;
            let segments = split_key(&key)?;
            match get_json_value(&json, &segments) {
                Some(value) => print!("{}", serde_yaml::to_string(value)?),
                None => bail!("{} not found in configuration", key),
            }
        }
        ConfigAction::Validate => {
            config.validate()?;
            println!("Configuration {} is valid", ctx.config_path().display());
        }
    }

    Ok(())
}

fn split_key(key: &str) -> Result<Vec<&str>> {
    let segments: Vec<&str> = key
        .split('.')
        .filter(|segment| !segment.is_empty())
        .collect();
    if segments.is_empty() {
        bail!("configuration key cannot be empty");
    }
    Ok(segments)
}

fn get_json_value<'a>(value: &'a JsonValue, path: &[&str]) -> Option<&'a JsonValue> {
    let mut current = value;
    for segment in path {
        match current {
            JsonValue::Object(map) => {
                current = map.get(*segment)?;
            }
            _ => return None,
        }
    }
    Some(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn nested_keys_resolve() {
        let json = serde_json::to_value(Config::default()).unwrap();
        assert_eq!(
            get_json_value(&json, &split_key("wait.poll_interval_ms").unwrap()),
            Some(&JsonValue::from(250))
        );
        assert_eq!(
            get_json_value(&json, &split_key("browser.viewport.width").unwrap()),
            Some(&JsonValue::from(1920))
        );
        assert!(get_json_value(&json, &["wait", "missing"]).is_none());
        assert!(split_key("..").is_err());
    }
}
