use clap::{Parser, Subcommand};

use crate::context::DEFAULT_ASSET_BASE;

#[derive(Parser)]
#[command(name = "piptool", about = "Picture-in-picture controls for video sites")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the page host for one hostname
    Host {
        /// Hostname of the page, used to pick the site adapter
        #[arg(long)]
        hostname: String,

        /// Base URI that icon paths are resolved against
        #[arg(long, default_value = DEFAULT_ASSET_BASE)]
        asset_base: String,
    },

    /// Send a request to the running host
    Client {
        #[command(subcommand)]
        action: ClientAction,
    },

    /// List the built-in site adapters
    Adapters {
        /// Show one adapter in full
        id: Option<String>,
    },

    /// Show which adapter a hostname resolves to
    Resolve { hostname: String },
}

#[derive(Subcommand)]
pub enum ClientAction {
    /// Arm the PiP toggle, or disarm it if armed
    Toggle,

    /// Fire a window event on the page
    Fire {
        /// Event name, e.g. load, DOMContentLoaded, spfdone
        name: String,
    },

    /// Click the first element matching a selector
    Click { selector: String },

    /// Append an element chain under the first match of a selector
    Mount {
        /// Parent selector
        parent: String,

        /// Descendant chain, outermost first, e.g. "div.player video"
        chain: String,
    },

    /// Print page state and the element outline
    Snapshot,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_defaults_asset_base() {
        let cli = Cli::try_parse_from(["piptool", "host", "--hostname", "www.youtube.com"]).unwrap();
        match cli.command {
            Command::Host {
                hostname,
                asset_base,
            } => {
                assert_eq!(hostname, "www.youtube.com");
                assert_eq!(asset_base, DEFAULT_ASSET_BASE);
            }
            _ => panic!("expected host command"),
        }
    }

    #[test]
    fn client_mount_takes_parent_and_chain() {
        let cli = Cli::try_parse_from([
            "piptool",
            "client",
            "mount",
            "#plex",
            "div.video-player video",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Command::Client {
                action: ClientAction::Mount { ref parent, ref chain }
            } if parent == "#plex" && chain == "div.video-player video"
        ));
    }
}
