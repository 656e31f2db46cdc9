//! QUIC profile selection.

use mimic::fingerprint::quic::{QuicId, QuicProfile, QuicSelector};
use mimic::Error;

#[test]
fn test_boolean_selection() {
    assert_eq!(QuicProfile::resolve(false).unwrap(), QuicProfile::Empty);

    let enabled = QuicProfile::resolve(true).unwrap();
    assert_eq!(enabled.id(), Some(QuicId::DEFAULT));
    assert_eq!(enabled.parameters(), Some(&QuicId::DEFAULT.parameters()));
}

#[test]
fn test_named_selection() {
    let chrome = QuicProfile::resolve("chrome_115").unwrap();
    assert_eq!(chrome.id(), Some(QuicId::Chrome115));
    assert!(chrome.parameters().unwrap().grease);

    assert_eq!(QuicProfile::resolve(QuicId::Firefox116).unwrap().id(), Some(QuicId::Firefox116));
}

#[test]
fn test_explicit_profile_passes_through() {
    let mut custom = QuicId::Chrome115.parameters();
    custom.initial_max_streams_bidi = 7;
    let profile = QuicProfile::Profile {
        id: QuicId::Chrome115,
        parameters: custom,
    };
    assert_eq!(QuicProfile::resolve(QuicSelector::Profile(profile)).unwrap(), profile);
}

#[test]
fn test_unknown_name_is_input_kind_error() {
    assert!(matches!(
        QuicProfile::resolve("opera_1"),
        Err(Error::InputKind(_))
    ));
}

#[test]
fn test_empty_profile_is_default() {
    let profile = QuicProfile::default();
    assert!(profile.is_empty());
    assert!(profile.id().is_none());
}

#[test]
fn test_quiche_config() {
    for selector in [QuicSelector::from(true), QuicSelector::from(false)] {
        let profile = QuicProfile::resolve(selector).unwrap();
        assert!(profile.config().is_ok());
    }
}
