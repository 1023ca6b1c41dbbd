use clap::{crate_description, ArgAction, Args, Parser, Subcommand, ValueEnum};
use std::io::IsTerminal;
use std::path::PathBuf;

use osm_matcher::distance::DistanceUnits;
use osm_matcher::query::MatcherConfig;

const DEFAULT_PLANET: &str = "planet.sqlite";
const DEFAULT_PREFIX: &str = "planet";

// -----------------------------------------------------------------------------
// command-line args
// -----------------------------------------------------------------------------
#[derive(Parser, Debug)]
#[command(
    name("osm-matcher"),
    bin_name("osm-matcher"),

    author,   // retrieved from Cargo.toml `authors`
    version,  // retrieved from Cargo.toml `version`
    about,    // retrieved from Cargo.toml `description`

    long_about = concat!(
        crate_description!(),
    ),
)]
#[deny(missing_docs)]
/// Match Wikidata items to OpenStreetMap features
pub struct CommandLineArgs {
    #[command(subcommand)]
    pub command: Command,

    #[command(flatten)]
    pub global_args: GlobalArgs,
}

impl CommandLineArgs {
    pub fn parse_args() -> Self {
        let mut args = <Self as Parser>::parse();

        // If `NO_COLOR` is set in the environment, disable colored output
        //
        // https://no-color.org/
        if std::env::var("NO_COLOR").is_ok() {
            args.global_args.color = Mode::Never
        }

        args
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Manage local planet snapshots
    ///
    /// A planet snapshot is a sqlite database holding the point, line, and polygon tables that
    /// osm2pgsql would produce, under one or more table prefixes.
    Planet(PlanetArgs),

    /// Print the spatial queries that would be run for items
    ///
    /// The queries are rendered as PostGIS SQL against an osm2pgsql planet database.
    Sql(SqlArgs),

    /// Find the OpenStreetMap features that correspond to items
    ///
    /// Each item is searched for in a planet snapshot, and every plausible candidate is reported
    /// with its identifier, address, name, and tag evidence.
    ///
    /// If matching fails for any item, the remaining items are still processed, and the program
    /// exits with a nonzero exit code.
    Match(MatchArgs),

    /// Manage match rules
    Rules(RulesArgs),
}

// -----------------------------------------------------------------------------
// global options
// -----------------------------------------------------------------------------
#[derive(Args, Debug)]
#[command(next_help_heading = "Global Options")]
pub struct GlobalArgs {
    /// Enable verbose output
    ///
    /// This can be repeated up to 3 times to enable successively more output.
    #[arg(global=true, long, short, action=ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error feedback messages
    ///
    /// This silences WARNING-level messages and below.
    #[arg(global=true, long, short)]
    pub quiet: bool,

    /// Enable or disable colored output
    ///
    /// When this is "auto", colors are enabled for stdout and stderr when they are terminals.
    ///
    /// If the `NO_COLOR` environment variable is set, it takes precedence and is equivalent to `--color=never`.
    #[arg(global=true, long, default_value_t=Mode::Auto, value_name="MODE")]
    pub color: Mode,
}

impl GlobalArgs {
    pub fn use_color<T: IsTerminal>(&self, out: T) -> bool {
        match self.color {
            Mode::Never => false,
            Mode::Always => true,
            Mode::Auto => out.is_terminal(),
        }
    }
}

#[derive(Copy, Clone, Debug, ValueEnum, PartialEq, Eq)]
#[clap(rename_all = "lower")]
pub enum Mode {
    Auto,
    Never,
    Always,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Mode::Auto => "auto",
            Mode::Never => "never",
            Mode::Always => "always",
        };
        write!(f, "{s}")
    }
}

// -----------------------------------------------------------------------------
// `planet` command
// -----------------------------------------------------------------------------
#[derive(Args, Debug)]
pub struct PlanetArgs {
    #[command(subcommand)]
    pub command: PlanetCommand,
}

#[derive(Subcommand, Debug)]
pub enum PlanetCommand {
    /// Import OSM elements into a planet snapshot
    ///
    /// Inputs are JSON Lines files, one element per line, shaped like
    /// `{"type": "way", "id": 123, "tags": {...}, "lat": 51.5, "lon": -0.1, "geom": "..."}`.
    /// An element already present is replaced.
    Import(PlanetImportArgs),

    /// Summarize the contents of a planet snapshot
    Summarize(PlanetSummarizeArgs),
}

#[derive(Args, Debug)]
pub struct PlanetImportArgs {
    #[command(flatten)]
    pub planet_args: PlanetStoreArgs,

    /// Table prefix to import into
    #[arg(long, value_name = "PREFIX", default_value = DEFAULT_PREFIX)]
    pub prefix: String,

    /// JSON Lines files of OSM elements to import
    #[arg(num_args(1..), required(true), value_name = "INPUT")]
    pub inputs: Vec<PathBuf>,
}

#[derive(Args, Debug)]
pub struct PlanetSummarizeArgs {
    #[command(flatten)]
    pub planet_args: PlanetStoreArgs,

    #[command(flatten)]
    pub output_args: OutputArgs<SummarizeOutputFormat>,
}

#[derive(Args, Debug)]
pub struct PlanetStoreArgs {
    /// Use the specified planet snapshot
    #[arg(long, short, value_name = "PATH", env("OSM_MATCHER_PLANET"), default_value = DEFAULT_PLANET)]
    pub planet: PathBuf,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum SummarizeOutputFormat {
    /// A text-based format designed for humans
    Human,

    /// Pretty-printed JSON format
    Json,
}

// -----------------------------------------------------------------------------
// `sql` command
// -----------------------------------------------------------------------------
#[derive(Args, Debug)]
pub struct SqlArgs {
    /// Planet table prefix to query
    #[arg(long, value_name = "PREFIX", default_value = DEFAULT_PREFIX)]
    pub prefix: String,

    /// Print both the tag-filtered and the unfiltered query for each item
    #[arg(long)]
    pub all: bool,

    #[command(flatten)]
    pub config_args: MatcherConfigArgs,

    #[command(flatten)]
    pub item_args: ItemInputArgs,
}

// -----------------------------------------------------------------------------
// `match` command
// -----------------------------------------------------------------------------
#[derive(Args, Debug)]
pub struct MatchArgs {
    #[command(flatten)]
    pub planet_args: PlanetStoreArgs,

    /// Planet table prefix to search
    #[arg(long, value_name = "PREFIX", default_value = DEFAULT_PREFIX)]
    pub prefix: String,

    /// Use N parallel matching jobs
    #[arg(long("jobs"), short('j'), value_name="N", default_value_t=default_num_jobs())]
    pub num_jobs: usize,

    /// Attach scoring detail to each match
    ///
    /// This does not change which matches are reported.
    #[arg(long)]
    pub debug: bool,

    /// Units for distances in human-format output
    #[arg(long, value_name = "UNITS", default_value_t = UnitsArg::KmAndMetres)]
    pub units: UnitsArg,

    #[command(flatten)]
    pub config_args: MatcherConfigArgs,

    #[command(flatten)]
    pub rules: RuleSpecifierArgs,

    #[command(flatten)]
    pub item_args: ItemInputArgs,

    #[command(flatten)]
    pub output_args: OutputArgs<MatchOutputFormat>,
}

fn default_num_jobs() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum MatchOutputFormat {
    /// A text-based format designed for humans
    Human,

    /// Pretty-printed JSON format
    Json,

    /// JSON Lines format
    ///
    /// This is a sequence of JSON objects, one per line.
    Jsonl,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
#[clap(rename_all = "snake_case")]
pub enum UnitsArg {
    Metres,
    Km,
    KmAndMetres,
    MilesAndFeet,
    MilesAndYards,
    MilesAndMetres,
}

impl std::fmt::Display for UnitsArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            UnitsArg::Metres => "metres",
            UnitsArg::Km => "km",
            UnitsArg::KmAndMetres => "km_and_metres",
            UnitsArg::MilesAndFeet => "miles_and_feet",
            UnitsArg::MilesAndYards => "miles_and_yards",
            UnitsArg::MilesAndMetres => "miles_and_metres",
        };
        write!(f, "{s}")
    }
}

impl From<UnitsArg> for DistanceUnits {
    fn from(units: UnitsArg) -> Self {
        match units {
            UnitsArg::Metres => DistanceUnits::Metres,
            UnitsArg::Km => DistanceUnits::Km,
            UnitsArg::KmAndMetres => DistanceUnits::KmAndMetres,
            UnitsArg::MilesAndFeet => DistanceUnits::MilesAndFeet,
            UnitsArg::MilesAndYards => DistanceUnits::MilesAndYards,
            UnitsArg::MilesAndMetres => DistanceUnits::MilesAndMetres,
        }
    }
}

// -----------------------------------------------------------------------------
// `rules` command
// -----------------------------------------------------------------------------
#[derive(Args, Debug)]
pub struct RulesArgs {
    #[command(subcommand)]
    pub command: RulesCommand,
}

#[derive(Subcommand, Debug)]
pub enum RulesCommand {
    /// Check rules for problems
    ///
    /// If errors are detected or if warnings are detected and `--warnings-as-errors` is specified, the program will exit with a nonzero exit code.
    Check(RulesCheckArgs),

    /// List the loaded rule tables
    List(RulesListArgs),
}

#[derive(Args, Debug)]
pub struct RulesCheckArgs {
    #[arg(long, short = 'W')]
    /// Treat warnings as errors
    pub warnings_as_errors: bool,

    #[command(flatten)]
    pub rules: RuleSpecifierArgs,
}

#[derive(Args, Debug)]
pub struct RulesListArgs {
    #[command(flatten)]
    pub rules: RuleSpecifierArgs,

    #[command(flatten)]
    pub output_args: OutputArgs<RulesListOutputFormat>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum RulesListOutputFormat {
    /// A text-based format designed for humans
    Human,

    /// Pretty-printed JSON format
    Json,
}

// -----------------------------------------------------------------------------
// rule specifiers
// -----------------------------------------------------------------------------
#[derive(Args, Debug, Clone)]
#[command(next_help_heading = "Rule Selection Options")]
pub struct RuleSpecifierArgs {
    /// Load additional rules from the specified file or directory
    ///
    /// The paths can be either files or directories.
    /// Directories are recursively walked and all discovered YAML files of rules are loaded.
    /// Tables from additional rules extend the built-in ones.
    ///
    /// This option can be repeated.
    #[arg(long, value_name = "PATH")]
    pub rules: Vec<PathBuf>,

    /// Load the built-in rules
    #[arg(
        long,
        default_value_t=true,
        action=ArgAction::Set,
        value_name="BOOL",
    )]
    pub load_builtins: bool,
}

// -----------------------------------------------------------------------------
// matcher configuration
// -----------------------------------------------------------------------------
#[derive(Args, Debug, Clone)]
#[command(next_help_heading = "Matching Options")]
pub struct MatcherConfigArgs {
    /// Search radius of the tag-filtered query, in metres
    #[arg(long, value_name = "METRES", default_value_t = MatcherConfig::default().radius)]
    pub radius: f64,

    /// Search radius of the unfiltered query, in metres
    #[arg(long, value_name = "METRES", default_value_t = MatcherConfig::default().broad_radius)]
    pub broad_radius: f64,

    /// Maximum number of rows returned by each query
    #[arg(long, value_name = "N", default_value_t = MatcherConfig::default().limit)]
    pub limit: usize,

    /// Drop candidates further than this from the item, in metres
    #[arg(long, value_name = "METRES", default_value_t = MatcherConfig::default().max_distance)]
    pub max_distance: f64,
}

impl MatcherConfigArgs {
    pub fn to_config(&self) -> MatcherConfig {
        MatcherConfig {
            radius: self.radius,
            broad_radius: self.broad_radius,
            limit: self.limit,
            max_distance: self.max_distance,
        }
    }
}

// -----------------------------------------------------------------------------
// item input
// -----------------------------------------------------------------------------
#[derive(Args, Debug)]
#[command(next_help_heading = "Item Options")]
pub struct ItemInputArgs {
    /// Files of items to read
    ///
    /// A file ending in `.jsonl` holds one item per line; any other file holds a single JSON
    /// item. An item is shaped like
    /// `{"entity": <Wikidata entity>, "tags": ["amenity=pub"], "extract": "...", "location": {"lat": 51.5, "lon": -0.1}}`;
    /// only `entity` is required.
    #[arg(num_args(1..), required(true), value_name = "ITEMS")]
    pub inputs: Vec<PathBuf>,
}

// -----------------------------------------------------------------------------
// output options
// -----------------------------------------------------------------------------
#[derive(Args, Debug)]
#[command(next_help_heading = "Output Options")]
pub struct OutputArgs<Format: ValueEnum + Send + Sync + 'static> {
    /// Write output to the specified path
    ///
    /// If this argument is not provided, stdout will be used.
    #[arg(long, short, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Write output in the specified format
    #[arg(long, short, value_name = "FORMAT", default_value = "human")]
    pub format: Format,
}

impl<Format: ValueEnum + Send + Sync> OutputArgs<Format> {
    /// Get a writer for the specified output destination.
    pub fn get_writer(&self) -> std::io::Result<Box<dyn std::io::Write>> {
        use std::fs::File;
        use std::io::BufWriter;

        match &self.output {
            None => Ok(Box::new(BufWriter::new(std::io::stdout()))),
            Some(p) => {
                let f = File::create(p)?;
                Ok(Box::new(BufWriter::new(f)))
            }
        }
    }
}
