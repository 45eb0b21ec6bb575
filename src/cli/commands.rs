use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Composes data-platform providers into a runnable project skeleton
#[derive(Parser, Debug)]
#[command(
    name = "antigravity",
    about = "Composes data-platform providers into a runnable project skeleton",
    version,
    author,
    long_about = "antigravity takes a stack (one provider per category: ingestion, storage, \
                  transformation, orchestration, visualization, quality, monitoring, \
                  infrastructure), checks that the providers fit together, wires them to \
                  each other and writes a docker-compose project with configuration for \
                  every component."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, value_name = "LEVEL", help = "Set logging level")]
    pub log_level: Option<String>,

    #[arg(short = 'v', long, global = true, help = "Enable debug logging")]
    pub verbose: bool,

    #[arg(
        short = 'q',
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Quiet mode - suppress non-error output"
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(
        about = "Generate a project from a stack",
        long_about = "Validates the stack, resolves dependencies between components and writes \
                      the generated project. Running it again on an existing project updates it \
                      in place.\n\n\
                      Examples:\n  \
                      antigravity generate acme --stack storage=PostgreSQL --stack transformation=dbt\n  \
                      antigravity generate acme --profile analytics_starter\n  \
                      antigravity generate acme --profile analytics_starter --stack orchestration=Dagster"
    )]
    Generate(GenerateArgs),

    #[command(
        about = "Check a stack without generating anything",
        long_about = "Runs the compatibility rules and prints errors, warnings and suggested \
                      providers.\n\n\
                      Examples:\n  \
                      antigravity validate --stack storage=MongoDB,transformation=dbt"
    )]
    Validate(ValidateArgs),

    #[command(about = "List registered providers per category")]
    Providers(ProvidersArgs),

    #[command(about = "Manage saved stack profiles")]
    Profiles(ProfilesArgs),

    #[command(
        about = "Show how a stack differs from an existing project",
        long_about = "Reads the project's .antigravity.yml and compares its stack with the \
                      given one.\n\n\
                      Examples:\n  \
                      antigravity diff ./generated/acme --stack storage=DuckDB"
    )]
    Diff(DiffArgs),
}

/// Where a stack comes from: a profile, explicit pairs, or a profile with
/// explicit overrides.
#[derive(Args, Debug, Clone, Default)]
pub struct StackSelection {
    #[arg(
        short = 's',
        long = "stack",
        value_name = "CATEGORY=PROVIDER",
        help = "Provider selection; repeatable or comma separated. An empty provider skips the category"
    )]
    pub stack: Vec<String>,

    #[arg(short = 'p', long, value_name = "NAME", help = "Start from a saved or built-in profile")]
    pub profile: Option<String>,
}

impl StackSelection {
    pub fn is_empty(&self) -> bool {
        self.stack.is_empty() && self.profile.is_none()
    }
}

#[derive(Parser, Debug, Clone)]
pub struct GenerateArgs {
    #[arg(value_name = "NAME", help = "Project name")]
    pub name: String,

    #[command(flatten)]
    pub selection: StackSelection,

    #[arg(
        short = 'o',
        long,
        value_name = "DIR",
        help = "Project directory (defaults to <output dir>/<NAME>)"
    )]
    pub output: Option<PathBuf>,

    #[arg(long, value_name = "FILE", help = "Also write a .tar.gz of the project")]
    pub archive: Option<PathBuf>,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,
}

#[derive(Parser, Debug, Clone)]
pub struct ValidateArgs {
    #[command(flatten)]
    pub selection: StackSelection,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,
}

#[derive(Parser, Debug, Clone)]
pub struct ProvidersArgs {
    #[arg(short = 'c', long, value_name = "CATEGORY", help = "Only list one category")]
    pub category: Option<String>,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,
}

#[derive(Parser, Debug, Clone)]
pub struct ProfilesArgs {
    #[command(subcommand)]
    pub action: Option<ProfileAction>,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        global = true,
        help = "Output format"
    )]
    pub format: OutputFormatArg,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ProfileAction {
    #[command(about = "List or search profiles")]
    List {
        #[arg(value_name = "QUERY", help = "Match against name or description")]
        query: Option<String>,

        #[arg(short = 't', long = "tag", value_name = "TAG", help = "Filter by tag; repeatable")]
        tags: Vec<String>,
    },

    #[command(about = "Show one profile")]
    Show {
        #[arg(value_name = "NAME")]
        name: String,
    },

    #[command(about = "Save a stack as a profile")]
    Save {
        #[arg(value_name = "NAME")]
        name: String,

        #[command(flatten)]
        selection: StackSelection,

        #[arg(short = 'd', long, value_name = "TEXT")]
        description: Option<String>,

        #[arg(short = 't', long = "tag", value_name = "TAG")]
        tags: Vec<String>,

        #[arg(long, help = "Replace an existing profile")]
        overwrite: bool,
    },

    #[command(about = "Delete a saved profile")]
    Delete {
        #[arg(value_name = "NAME")]
        name: String,
    },
}

#[derive(Parser, Debug, Clone)]
pub struct DiffArgs {
    #[arg(value_name = "PROJECT_DIR", help = "Directory of a generated project")]
    pub project_dir: PathBuf,

    #[command(flatten)]
    pub selection: StackSelection,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormatArg {
    Json,
    Yaml,
    Human,
}

impl From<OutputFormatArg> for super::output::OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Json => super::output::OutputFormat::Json,
            OutputFormatArg::Yaml => super::output::OutputFormat::Yaml,
            OutputFormatArg::Human => super::output::OutputFormat::Human,
        }
    }
}
