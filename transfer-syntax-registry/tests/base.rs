//! Registry tests, to ensure that the standard transfer syntaxes
//! are registered with the expected properties.

use dcmstream_encoding::transfer_syntax::{Endianness, TransferSyntaxIndex};
use dcmstream_transfer_syntax_registry::TransferSyntaxRegistry;

fn assert_parseable<T>(registry: T, mut uid: &'static str)
where
    T: TransferSyntaxIndex,
{
    let ts = registry.get(uid);
    assert!(ts.is_some(), "{} should be registered", uid);
    let ts = ts.unwrap();
    uid = uid.trim_end_matches(|c: char| c == '\0' || c == ' ');
    assert_eq!(ts.uid(), uid);
    assert!(ts.can_parse());
}

#[test]
fn contains_base_ts() {
    let registry = TransferSyntaxRegistry::default_registry();

    // contains implicit VR little endian and is fully supported
    assert_parseable(registry, "1.2.840.10008.1.2");

    // should work the same for trailing null characters
    assert_parseable(registry, "1.2.840.10008.1.2\0");
    // and trailing spaces
    assert_parseable(registry, "1.2.840.10008.1.2 ");

    // contains explicit VR little endian and is fully supported
    assert_parseable(registry, "1.2.840.10008.1.2.1");

    // contains explicit VR big endian and is fully supported
    assert_parseable(registry, "1.2.840.10008.1.2.2");

    let ts = registry.get("1.2.840.10008.1.2").unwrap();
    assert!(!ts.explicit_vr());
    let ts = registry.get("1.2.840.10008.1.2.2").unwrap();
    assert_eq!(ts.endianness(), Endianness::Big);
}

#[test]
fn contains_encapsulated_ts() {
    let registry = TransferSyntaxRegistry::with_standard_entries();
    for uid in [
        "1.2.840.10008.1.2.1.98",
        "1.2.840.10008.1.2.4.50",
        "1.2.840.10008.1.2.4.51",
        "1.2.840.10008.1.2.4.57",
        "1.2.840.10008.1.2.4.70",
        "1.2.840.10008.1.2.4.80",
        "1.2.840.10008.1.2.4.81",
        "1.2.840.10008.1.2.4.90",
        "1.2.840.10008.1.2.4.91",
        "1.2.840.10008.1.2.5",
    ] {
        assert_parseable(&registry, uid);
        let ts = registry.get(uid).unwrap();
        assert!(ts.is_encapsulated_pixel_data());
        assert!(ts.explicit_vr());
        assert_eq!(ts.endianness(), Endianness::Little);
    }
}

#[test]
fn deflated_is_known_but_not_parseable() {
    let registry = TransferSyntaxRegistry::with_standard_entries();
    let ts = registry
        .get("1.2.840.10008.1.2.1.99")
        .expect("deflated transfer syntax should be registered");
    assert!(ts.is_deflated());
    assert!(!ts.can_parse());
}
