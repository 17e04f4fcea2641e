use clap::builder::PossibleValuesParser;
use clap::{ArgAction, Args, Parser, Subcommand, ValueHint};
use imagegen_core::options::{
    SUPPORTED_MODELS, SUPPORTED_QUALITIES, SUPPORTED_SIZES, SUPPORTED_STYLES,
};

/// Top-level CLI entrypoint.
#[derive(Parser, Debug, Clone)]
#[command(name = "imagegen", version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// Supported subcommands.
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Generate one image and save it to disk.
    #[command(alias = "gen")]
    Generate(GenerateArgs),
    /// Inspect image model configurations and manage their API keys.
    #[command(subcommand, alias = "config")]
    Configurations(ConfigurationsCommand),
    /// Print the selectable models, sizes, qualities and styles.
    Options,
}

/// Configuration subcommands.
#[derive(Debug, Clone, Subcommand)]
pub enum ConfigurationsCommand {
    /// List configured names with their endpoint and key status.
    #[command(alias = "ls")]
    List,
    /// Store an API key for a configuration in the OS keychain.
    SetKey {
        /// Configuration name.
        name: String,
        /// Key value; prompted for when omitted.
        #[arg(long)]
        key: Option<String>,
    },
    /// Remove the stored API key of a configuration.
    ClearKey {
        /// Configuration name.
        name: String,
    },
}

/// Arguments for `generate`. Defaults match the first entry of each panel list.
#[derive(Debug, Clone, Args)]
pub struct GenerateArgs {
    /// Image model configuration (defaults to the first configured name).
    #[arg(short, long, value_name = "NAME")]
    pub configuration: Option<String>,

    #[arg(
        short,
        long,
        value_parser = PossibleValuesParser::new(SUPPORTED_MODELS.iter().copied()),
        default_value = SUPPORTED_MODELS[0]
    )]
    pub model: String,

    #[arg(
        short,
        long,
        value_parser = PossibleValuesParser::new(SUPPORTED_SIZES.iter().copied()),
        default_value = SUPPORTED_SIZES[0]
    )]
    pub size: String,

    #[arg(
        short,
        long,
        value_parser = PossibleValuesParser::new(SUPPORTED_QUALITIES.iter().copied()),
        default_value = SUPPORTED_QUALITIES[0]
    )]
    pub quality: String,

    #[arg(
        long,
        value_parser = PossibleValuesParser::new(SUPPORTED_STYLES.iter().copied()),
        default_value = SUPPORTED_STYLES[0]
    )]
    pub style: String,

    /// Directory the image is written to.
    #[arg(short, long, value_name = "DIR", value_hint = ValueHint::DirPath, default_value = ".")]
    pub out: String,

    /// Print the result as JSON instead of saving it.
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Text description of the image.
    #[arg(value_name = "PROMPT", required = true, num_args = 1..)]
    pub prompt: Vec<String>,
}

impl GenerateArgs {
    pub fn prompt_text(&self) -> String {
        self.prompt.join(" ")
    }
}
