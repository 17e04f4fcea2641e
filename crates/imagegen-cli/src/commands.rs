use std::path::PathBuf;

use anyhow::{Context, Result, anyhow, bail};
use imagegen_core::config::api_key_env_var;
use imagegen_core::options::{
    SUPPORTED_MODELS, SUPPORTED_QUALITIES, SUPPORTED_SIZES, SUPPORTED_STYLES,
};
use imagegen_core::save::save_image;
use imagegen_core::{
    BackendKind, FileConfig, GenerationRequest, ImageService, config_path, load_config, save_config,
    service_from_config,
};
use rpassword::prompt_password;
use strsim::jaro_winkler;
use tracing::info;

use crate::cli_args::{Cli, Command, ConfigurationsCommand, GenerateArgs};

const SUGGESTION_THRESHOLD: f64 = 0.8;

/// Run one parsed command.
pub async fn dispatch(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Generate(args) => run_generate(args).await,
        Command::Configurations(command) => handle_configurations_command(command),
        Command::Options => {
            print_options();
            Ok(())
        }
    }
}

/// The candidate most similar to `name`, if any is similar enough to suggest.
pub fn closest_match<'a>(name: &str, candidates: &'a [String]) -> Option<&'a str> {
    candidates
        .iter()
        .map(|candidate| (candidate, jaro_winkler(name, candidate)))
        .filter(|(_, score)| *score >= SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(candidate, _)| candidate.as_str())
}

fn load_config_with_warnings() -> FileConfig {
    let load = load_config();
    for warning in load.warnings {
        eprintln!("Warning: {warning}");
    }
    load.config
}

fn require_configuration(config: &FileConfig, name: &str) -> Result<()> {
    let names = config.configuration_names();
    if names.iter().any(|candidate| candidate == name) {
        return Ok(());
    }
    match closest_match(name, &names) {
        Some(suggestion) => bail!(
            "Unknown configuration '{name}'. Did you mean '{suggestion}'?"
        ),
        None => bail!(
            "Unknown configuration '{name}'. Known configurations: {}",
            names.join(", ")
        ),
    }
}

async fn run_generate(args: GenerateArgs) -> Result<()> {
    let config = load_config_with_warnings();

    let configuration = match args.configuration.clone() {
        Some(name) => name,
        None => config.configuration_names().into_iter().next().ok_or_else(|| {
            anyhow!(
                "No image model configurations are defined in {}",
                config_path().display()
            )
        })?,
    };
    require_configuration(&config, &configuration)?;

    let request = GenerationRequest {
        configuration,
        model_name: args.model.clone(),
        prompt: args.prompt_text(),
        size: args.size.clone(),
        quality: args.quality.clone(),
        style: args.style.clone(),
    };
    info!(
        configuration = %request.configuration,
        model = %request.model_name,
        "generating image from command line"
    );

    let service = service_from_config(&config);
    let image = service
        .generate(request)
        .await
        .map_err(|err| anyhow!("Image generation failed: {}", err.notification_message()))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&image)?);
        return Ok(());
    }

    let out_dir = PathBuf::from(shellexpand::tilde(&args.out).as_ref());
    let path = save_image(&image, &out_dir)
        .await
        .with_context(|| format!("Failed to save image into {}", out_dir.display()))?;
    println!("{}", path.display());
    if let Some(revised) = &image.revised_prompt {
        eprintln!("Revised prompt: {revised}");
    }
    Ok(())
}

fn handle_configurations_command(command: ConfigurationsCommand) -> Result<()> {
    let mut config = load_config_with_warnings();

    match command {
        ConfigurationsCommand::List => {
            print!("{}", describe_configurations(&config));
            Ok(())
        }
        ConfigurationsCommand::SetKey { name, key } => {
            require_configuration(&config, &name)?;
            let value = match key {
                Some(v) => v,
                None => prompt_password(format!("Enter API key for '{name}': "))
                    .context("Failed to read API key")?,
            };
            config
                .configuration_mut(&name)
                .ok_or_else(|| anyhow!("Unknown configuration '{name}'"))?
                .set_api_key(&name, &value)?;
            save_config(&config)?;
            println!("API key for '{name}' saved securely.");
            Ok(())
        }
        ConfigurationsCommand::ClearKey { name } => {
            require_configuration(&config, &name)?;
            config
                .configuration_mut(&name)
                .ok_or_else(|| anyhow!("Unknown configuration '{name}'"))?
                .clear_api_key()?;
            save_config(&config)?;
            println!("Cleared saved API key for '{name}'.");
            Ok(())
        }
    }
}

fn describe_configurations(config: &FileConfig) -> String {
    let mut out = String::new();
    match config.backend.kind {
        BackendKind::Direct => out.push_str("Backend: direct\n"),
        BackendKind::JsonRpc => out.push_str(&format!(
            "Backend: json-rpc {} ({})\n",
            config.backend.endpoint.as_deref().unwrap_or("-"),
            config.backend.method
        )),
    }

    let names = config.configuration_names();
    if names.is_empty() {
        out.push_str("No configurations defined.\n");
        return out;
    }

    out.push_str("Name                  Key     Base URL\n");
    for name in names {
        let Some(configuration) = config.configuration(&name) else {
            continue;
        };
        let key_status = if configuration.has_api_key() {
            "stored"
        } else if std::env::var(api_key_env_var(&name)).is_ok() {
            "env"
        } else {
            "-"
        };
        out.push_str(&format!(
            "{name:<20}  {key_status:<6}  {}\n",
            configuration.base_url
        ));
    }
    out
}

fn print_options() {
    let sections = [
        ("Models", SUPPORTED_MODELS),
        ("Sizes", SUPPORTED_SIZES),
        ("Qualities", SUPPORTED_QUALITIES),
        ("Styles", SUPPORTED_STYLES),
    ];
    for (title, values) in sections {
        println!("{title}: {}", values.join(", "));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use imagegen_core::ImageModelConfiguration;

    #[test]
    fn suggests_close_configuration_names() {
        let names = vec!["default".to_string(), "azure-east".to_string()];
        assert_eq!(closest_match("azure-eats", &names), Some("azure-east"));
        assert_eq!(closest_match("zzz", &names), None);
    }

    #[test]
    fn unknown_configuration_mentions_suggestion() {
        let config = FileConfig::default();
        let err = require_configuration(&config, "defualt").unwrap_err();
        assert!(err.to_string().contains("Did you mean 'default'?"));
        assert!(require_configuration(&config, "default").is_ok());
    }

    #[test]
    fn describes_configurations_table() {
        let mut config = FileConfig::default();
        config.configurations.insert(
            "local".to_string(),
            ImageModelConfiguration {
                base_url: "http://localhost:8080/v1/".to_string(),
                ..ImageModelConfiguration::default()
            },
        );

        let listing = describe_configurations(&config);

        assert!(listing.starts_with("Backend: direct\n"));
        let default_line = listing.lines().position(|line| line.starts_with("default"));
        let local_line = listing.lines().position(|line| line.starts_with("local"));
        assert!(default_line.is_some() && local_line.is_some());
        assert!(default_line < local_line);
        assert!(listing.contains("http://localhost:8080/v1/"));
    }
}
