use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::toolchain::SharedArgs;

/// Development container provisioning
///
/// devbox installs language toolchains inside a distrobox container, exports
/// their binaries to the host, configures VS Code and persists the
/// environment variables each toolchain needs to a shell-sourced file.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Also write logs to this file
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Use an alternative config file
    #[arg(long, global = true, value_name = "PATH", env = "DEVBOX_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub shared: SharedFlags,

    #[command(subcommand)]
    pub command: Commands,
}

/// Flags every install phase reads.
#[derive(Args, Debug, Clone, Copy, Default)]
pub struct SharedFlags {
    /// Skip editor extensions and settings
    #[arg(long, global = true)]
    pub skip_ide: bool,

    /// Do not export binaries or applications to the host
    #[arg(long, global = true)]
    pub no_export: bool,
}

impl From<SharedFlags> for SharedArgs {
    fn from(flags: SharedFlags) -> Self {
        SharedArgs {
            skip_ide: flags.skip_ide,
            no_export: flags.no_export,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Install the baseline tools and editor setup
    Setup,

    /// Install one or more toolchains
    Install {
        /// Read additional toolchain names from a file, one per line
        #[arg(short, long, value_name = "PATH")]
        file: Option<PathBuf>,

        /// Toolchain names (see `devbox list`)
        #[arg(value_name = "TOOLCHAIN")]
        toolchains: Vec<String>,
    },

    /// Install system packages and export them to the host
    Share {
        /// Package names, also used as the exported binary names
        #[arg(value_name = "PACKAGE", required = true)]
        packages: Vec<String>,
    },

    /// List available toolchains
    List,
}
