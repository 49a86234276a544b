use super::Parser;

#[derive(Parser, Debug)]
#[command(name = "tokenpair", about = "Issues and rotates bound access/refresh token pairs")]
pub struct Cli {
    /// Path to a settings file; defaults to settings/dev.toml in debug builds.
    #[arg(long)]
    pub settings: Option<String>,
}
