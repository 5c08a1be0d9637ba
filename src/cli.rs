use clap::Parser;
use flate2::Compression;

#[derive(Parser, Debug)]
#[command(name = "streamzip")]
#[command(version)]
#[command(about = "Create ZIP archives, streaming files as they are read", long_about = None)]
#[command(after_help = "Examples:\n  \
  streamzip out.zip docs README.md     archive the docs folder and README.md\n  \
  streamzip -b -l 9 out.zip src        build in memory with best compression\n  \
  streamzip -C build out.zip dist      archive build/dist as dist/")]
pub struct Cli {
    /// Archive to create
    #[arg(value_name = "ARCHIVE")]
    pub archive: String,

    /// Files and folders to add (folders recursively)
    #[arg(value_name = "PATHS", required = true)]
    pub paths: Vec<String>,

    /// Read PATHS relative to DIR and name entries relative to it
    #[arg(short = 'C', long = "directory", value_name = "DIR")]
    pub directory: Option<String>,

    /// Build the whole archive in memory before writing it
    #[arg(short = 'b', long)]
    pub buffered: bool,

    /// Deflate level, 0 (store) to 9 (best)
    #[arg(short = 'l', long, value_name = "LEVEL", default_value_t = 6,
          value_parser = clap::value_parser!(u32).range(0..=9))]
    pub level: u32,

    /// Verbose output
    #[arg(short = 'v')]
    pub verbose: bool,

    /// Quiet mode (-qq => quieter)
    #[arg(short = 'q', action = clap::ArgAction::Count)]
    pub quiet: u8,
}

impl Cli {
    pub fn compression(&self) -> Compression {
        Compression::new(self.level)
    }

    pub fn is_quiet(&self) -> bool {
        self.quiet > 0
    }

    /// Default log filter when `RUST_LOG` is not set
    pub fn log_level(&self) -> &'static str {
        match (self.verbose, self.quiet) {
            (_, 2..) => "error",
            (_, 1) => "warn",
            (true, 0) => "debug",
            (false, 0) => "info",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_flags() {
        let cli = Cli::try_parse_from([
            "streamzip", "-b", "-l", "9", "-qq", "-C", "base", "out.zip", "a", "b",
        ])
        .unwrap();
        assert_eq!(cli.archive, "out.zip");
        assert_eq!(cli.paths, ["a", "b"]);
        assert!(cli.buffered);
        assert_eq!(cli.directory.as_deref(), Some("base"));
        assert_eq!(cli.compression(), Compression::best());
        assert_eq!(cli.log_level(), "error");
    }

    #[test]
    fn defaults() {
        let cli = Cli::try_parse_from(["streamzip", "out.zip", "dir"]).unwrap();
        assert!(!cli.buffered);
        assert!(cli.directory.is_none());
        assert_eq!(cli.level, 6);
        assert_eq!(cli.log_level(), "info");
        assert!(!cli.is_quiet());
    }

    #[test]
    fn rejects_bad_level_and_missing_paths() {
        assert!(Cli::try_parse_from(["streamzip", "-l", "10", "out.zip", "a"]).is_err());
        assert!(Cli::try_parse_from(["streamzip", "out.zip"]).is_err());
    }
}
