//! Address dialability check command.

use libp2p::PeerId;
use peerkeep_net::{build_dial_target, AddressFilter, TransportProfile};
use tracing::debug;

use crate::cli::ProfileArg;
use crate::config::CliConfig;
use crate::error::{CliError, CliResult};
use crate::output::{AddressCheck, CheckOutput, OutputFormat, Render};

/// Resolve the transport profile from the command line, falling back to
/// the configured one.
fn resolve_profile(
    config: &CliConfig,
    profile: Option<ProfileArg>,
    transports: Vec<String>,
) -> TransportProfile {
    match profile {
        Some(ProfileArg::Browser) => TransportProfile::Browser,
        Some(ProfileArg::Native) => TransportProfile::Native,
        None if !transports.is_empty() => TransportProfile::Custom(transports),
        None => config.discovery.transport_profile.clone(),
    }
}

fn profile_name(profile: &TransportProfile) -> &'static str {
    match profile {
        TransportProfile::Browser => "browser",
        TransportProfile::Native => "native",
        TransportProfile::Custom(_) => "custom",
    }
}

/// Execute the check command.
pub fn check(
    config: &CliConfig,
    format: OutputFormat,
    peer: &str,
    addresses: &[String],
    profile: Option<ProfileArg>,
    transports: Vec<String>,
) -> CliResult<String> {
    let peer_id: PeerId = peer
        .parse()
        .map_err(|_| CliError::InvalidPeerId(peer.to_string()))?;

    let profile = resolve_profile(config, profile, transports);
    let filter = AddressFilter::new(&profile);
    debug!("Checking {} addresses for {}", addresses.len(), peer_id);

    let checks = addresses
        .iter()
        .map(|address| {
            let dialable = filter.is_dialable(address);
            let dial_target = if dialable {
                build_dial_target(address, &peer_id).map(|target| target.to_string())
            } else {
                None
            };
            AddressCheck {
                address: address.clone(),
                dialable,
                dial_target,
            }
        })
        .collect();

    let output = CheckOutput {
        peer_id: peer_id.to_string(),
        profile: profile_name(&profile).to_string(),
        supported_transports: profile.supported_transports(),
        addresses: checks,
        undialable_reason: filter
            .dial_candidates(addresses)
            .err()
            .map(|reason| reason.to_string()),
    };

    Ok(output.render(format))
}
