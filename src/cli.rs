use crate::config::Config;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone, Default)]
#[command(name = "flacjack", version, about = "Convert a FLAC library to MP3 in parallel")]
pub struct Cli {
    /// Directory of FLAC files
    #[arg(short = 'i', long)]
    pub input_path: Option<PathBuf>,
    /// Directory for MP3 output
    #[arg(short = 'o', long)]
    pub output_path: Option<PathBuf>,
    /// Concurrent conversions
    #[arg(short = 'j', long)]
    pub workers: Option<usize>,
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,
    /// List pending files and exit
    #[arg(long)]
    pub dry_run: bool,
}

impl Cli {
    pub fn apply(&self, config: &mut Config) {
        if let Some(path) = &self.input_path {
            config.input_path = path.clone();
        }
        if let Some(path) = &self.output_path {
            config.output_path = path.clone();
        }
        if let Some(workers) = self.workers {
            config.workers = Some(workers);
        }
    }
}
