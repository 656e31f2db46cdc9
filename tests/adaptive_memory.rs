//! Per-destination rejected-group memory.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::thread;

use mimic::fingerprint::tls::{group, ClientHelloSpec, Extension, KeyShare};
use mimic::transport::FingerprintMemory;

fn spec_with(groups: &[u16], shares: &[u16]) -> ClientHelloSpec {
    let mut spec = ClientHelloSpec::new();
    spec.extensions = vec![
        Extension::SupportedGroups(groups.to_vec()),
        Extension::KeyShare(shares.iter().map(|g| KeyShare::new(*g)).collect()),
    ];
    spec
}

#[test]
fn test_record_reports_growth() {
    let memory = FingerprintMemory::new();
    assert!(memory.record_rejected_group("a.test", group::SECP384R1));
    assert!(!memory.record_rejected_group("a.test", group::SECP384R1));
    assert!(memory.record_rejected_group("a.test", group::X25519));
    assert_eq!(
        memory.rejected_groups("a.test"),
        BTreeSet::from([group::SECP384R1, group::X25519])
    );
}

#[test]
fn test_concurrent_first_records_create_one_entry() {
    let memory = Arc::new(FingerprintMemory::new());
    let handles: Vec<_> = (0..16)
        .map(|_| {
            let memory = Arc::clone(&memory);
            thread::spawn(move || memory.record_rejected_group("new.test", group::SECP384R1))
        })
        .collect();

    let grew = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|grew| *grew)
        .count();

    assert_eq!(grew, 1);
    assert_eq!(memory.len(), 1);
    assert_eq!(memory.get("new.test").unwrap().len(), 1);
}

#[test]
fn test_prune_removes_groups_and_shares() {
    let memory = FingerprintMemory::new();
    memory.record_rejected_group("b.test", group::SECP384R1);

    let mut spec = spec_with(
        &[group::SECP256R1, group::SECP384R1, group::X25519],
        &[group::X25519, group::SECP384R1],
    );
    assert!(memory.prune("b.test", &mut spec));
    assert_eq!(
        spec.supported_groups().unwrap(),
        &[group::SECP256R1, group::X25519]
    );
    assert_eq!(spec.key_share_groups().unwrap(), vec![group::X25519]);

    // Nothing left to remove
    assert!(!memory.prune("b.test", &mut spec));
}

#[test]
fn test_prune_unknown_destination_is_noop() {
    let memory = FingerprintMemory::new();
    memory.record_rejected_group("b.test", group::X25519);

    let mut spec = spec_with(&[group::X25519], &[group::X25519]);
    assert!(!memory.prune("c.test", &mut spec));
    assert_eq!(spec.supported_groups().unwrap(), &[group::X25519]);
}

#[test]
fn test_prune_may_empty_lists() {
    let memory = FingerprintMemory::new();
    memory.record_rejected_group("d.test", group::X25519);

    let mut spec = spec_with(&[group::X25519], &[group::X25519]);
    assert!(memory.prune("d.test", &mut spec));
    assert!(spec.supported_groups().unwrap().is_empty());
    assert!(spec.key_share_groups().unwrap().is_empty());
}

#[test]
fn test_instances_are_independent() {
    let first = FingerprintMemory::new();
    let second = FingerprintMemory::new();
    first.record_rejected_group("e.test", group::X25519);

    assert!(first.contains("e.test", group::X25519));
    assert!(!second.contains("e.test", group::X25519));
    assert!(second.destinations().is_empty());
}
