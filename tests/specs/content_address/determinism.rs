// SPDX-License-Identifier: MIT

//! P6 / scenario 2: for a fixed `(extractor, source_id)`, `id` and
//! `object_path` are byte-identical across runs, and match the
//! `md5(extractor + "__" + source_id)` scheme.

use md5::{Digest, Md5};
use mediabin_core::ContentAddress;

#[test]
fn address_is_stable_across_calls() {
    let a = ContentAddress::new("example", "v1");
    let b = ContentAddress::new("example", "v1");
    assert_eq!(a.id(), b.id());
    assert_eq!(a.object_path(), b.object_path());
}

#[test]
fn address_matches_the_documented_hash_scheme() {
    let address = ContentAddress::new("example", "v1");
    let mut hasher = Md5::new();
    hasher.update(b"example__v1");
    let expected = hex::encode(hasher.finalize());
    assert_eq!(address.id(), expected);
    assert_eq!(address.id().len(), 32);
}

#[test]
fn object_path_fans_out_by_the_first_eight_hex_characters() {
    let address = ContentAddress::new("example", "v1");
    let id = address.id().to_string();
    let expected = std::path::PathBuf::from(&id[0..4]).join(&id[4..8]).join(&id);
    assert_eq!(address.object_path(), expected);
}
