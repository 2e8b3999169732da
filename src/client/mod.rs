//! CLI client for host operations.
//!
//! Provides one-shot commands that connect to the host, perform a
//! single request, print the result, and exit. The `adapters` and
//! `resolve` commands read the built-in table locally and need no host.

mod format;
mod host_client;

use crate::adapter::{AdapterError, Registry};
use crate::cli::ClientAction;
use crate::dom::{NodeSpec, Selector, SelectorError};
use host_client::HostClient;

/// Client error type.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("host: {0}")]
    Host(String),
    #[error("invalid selector: {0}")]
    Selector(#[from] SelectorError),
    #[error("unknown adapter: {0}")]
    UnknownAdapter(String),
    #[error("adapter table: {0}")]
    Adapter(#[from] AdapterError),
}

/// Run the client command.
///
/// Connects to the host, performs the requested action, prints the
/// result, and returns. Called from `main.rs` for `Command::Client`.
pub async fn run(action: ClientAction) -> Result<(), ClientError> {
    // Parse locally first so a bad chain fails without a round trip.
    let mount = match &action {
        ClientAction::Mount { chain, .. } => Some(mount_node(chain)?),
        _ => None,
    };

    let mut host = HostClient::connect().await?;

    match action {
        ClientAction::Toggle => {
            let state = host.toggle().await?;
            format::print_toggle(&state);
        }
        ClientAction::Fire { name } => {
            let listeners = host.fire(&name).await?;
            format::print_fire(&name, listeners);
        }
        ClientAction::Click { selector } => {
            let prevented = host.click(&selector).await?;
            format::print_click(&selector, prevented);
        }
        ClientAction::Mount { parent, .. } => {
            if let Some(node) = mount {
                host.mount(&parent, node).await?;
                format::print_mount(&parent);
            }
        }
        ClientAction::Snapshot => {
            let snapshot = host.snapshot().await?;
            format::print_snapshot(&snapshot);
        }
    }

    Ok(())
}

/// Print the adapter table, or one adapter in full.
pub fn adapters(id: Option<&str>) -> Result<(), ClientError> {
    let registry = Registry::builtin()?;
    match id {
        Some(id) => {
            let adapter = registry
                .get(id)
                .ok_or_else(|| ClientError::UnknownAdapter(id.to_string()))?;
            format::print_adapter(adapter);
        }
        None => format::print_adapters(&registry),
    }
    Ok(())
}

/// Print which adapter `hostname` resolves to.
pub fn resolve(hostname: &str) -> Result<(), ClientError> {
    let registry = Registry::builtin()?;
    format::print_resolution(hostname, registry.find(hostname));
    Ok(())
}

/// Build the subtree for `mount` from a descendant chain such as
/// `div.html5-video-player video.html5-main-video`.
fn mount_node(chain: &str) -> Result<NodeSpec, ClientError> {
    let selector = Selector::parse(chain)?;
    Ok(NodeSpec::from_chain(&selector))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mount_chain_nests_outermost_first() {
        let node = mount_node("div#plex div.video-player").unwrap();
        assert_eq!(node.tag, "div");
        assert_eq!(node.id.as_deref(), Some("plex"));
        assert_eq!(node.children.len(), 1);
        assert_eq!(node.children[0].classes, vec!["video-player".to_string()]);
    }

    #[test]
    fn mount_chain_rejects_bad_selector() {
        let err = mount_node("div > video").unwrap_err();
        assert!(matches!(err, ClientError::Selector(_)));
    }

    #[test]
    fn unknown_adapter_reported() {
        let err = adapters(Some("vimeo")).unwrap_err();
        assert!(err.to_string().contains("vimeo"));
    }
}
