//! Namespace filtering over listed mesh configuration objects.

use crate::{networking::DestinationRule, security::PeerAuthentication};
use kube::ResourceExt;

pub fn peer_authentications_in_namespace(
    namespace: &str,
    pas: &[PeerAuthentication],
) -> Vec<PeerAuthentication> {
    pas.iter()
        .filter(|pa| pa.namespace().as_deref() == Some(namespace))
        .cloned()
        .collect()
}

pub fn destination_rules_in_namespaces(
    namespaces: &[String],
    drs: &[DestinationRule],
) -> Vec<DestinationRule> {
    drs.iter()
        .filter(|dr| {
            dr.namespace()
                .map_or(false, |ns| namespaces.iter().any(|n| *n == ns))
        })
        .cloned()
        .collect()
}
