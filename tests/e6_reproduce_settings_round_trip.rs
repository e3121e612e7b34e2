//! Reproduce-settings tokens round-trip through encode/decode, and garbage
//! tokens decode to an error rather than panicking (spec.md §8 E6:
//! "`ReproduceSettings::decode` on a token that is not valid base64, e.g.
//! `!!not-base64!!`, returns an error").

use actorcheck::seed::ReproduceSettings;

#[test]
fn encode_then_decode_recovers_the_seed() {
    let settings = ReproduceSettings::new(0xDEAD_BEEF_u64);
    let token = settings.encode();
    let decoded = ReproduceSettings::decode(&token).unwrap();
    assert_eq!(decoded, settings);
}

#[test]
fn decode_rejects_non_base64_tokens() {
    let result = ReproduceSettings::decode("!!not-base64!!");
    assert!(result.is_err());
}

#[test]
fn display_renders_the_same_string_as_encode() {
    let settings = ReproduceSettings::new(42);
    assert_eq!(settings.to_string(), settings.encode());
}
