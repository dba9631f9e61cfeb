use clap::Parser;
use std::path::PathBuf;

use crate::config::ClientConfig;
use crate::error::WandError;
use crate::launch::LaunchParams;

#[derive(Parser)]
#[command(name = "creative-wand")]
#[command(version)]
#[command(about = "Terminal client for Creative Wand co-creative writing sessions")]
pub struct Args {
    /// Experiment link, e.g. "http://host:3000/?mode=2&pid=P017"
    #[arg(long)]
    pub url: Option<String>,

    /// Experiment condition, passed to the backend as-is (overrides the link)
    #[arg(long)]
    pub mode: Option<String>,

    /// Participant identifier (overrides the link)
    #[arg(long)]
    pub pid: Option<String>,

    /// Session code; defaults to the participant identifier
    #[arg(long)]
    pub code: Option<String>,

    /// Backend base URL; skips deriving it from the link origin
    #[arg(long)]
    pub backend: Option<String>,

    /// TOML config file
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,
}

impl Args {
    /// Launch parameters from `--url`, with `--mode`/`--pid` taking priority.
    pub fn launch_params(&self) -> Result<LaunchParams, WandError> {
        let mut params = match self.url.as_deref() {
            Some(url) => LaunchParams::from_url(url)?,
            None => LaunchParams::default(),
        };
        if let Some(mode) = &self.mode {
            params.mode = Some(mode.clone());
        }
        if let Some(pid) = &self.pid {
            params.pid = Some(pid.clone());
        }
        Ok(params)
    }

    /// Fold flag overrides into a loaded config.
    pub fn apply_to(&self, config: &mut ClientConfig, launch: &LaunchParams) {
        if let Some(origin) = &launch.origin {
            config.backend.page_origin = origin.clone();
        }
        if let Some(backend) = &self.backend {
            config.backend.url = Some(backend.clone());
        }
        if self.no_color {
            config.render.color = false;
        }
    }
}
