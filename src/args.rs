use clap::Parser;

/// Computes per-commune election scores from polling station results.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path, optional) The JSON file describing the geocoding reference and the datasets.
    /// Relative paths in this file are resolved against its directory. If not provided, the
    /// built-in description of the historical datasets is used, relative to the current directory.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,

    /// (file path or 'stdout') If specified, the communes will be written in JSON format to the given
    /// location. Setting this option overrides the path that may be specified in the configuration.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (file path) A reference file of communes in JSON format. If provided, the output is compared
    /// to it and any difference is reported as an error.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
