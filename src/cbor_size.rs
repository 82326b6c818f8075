//! Canonical CBOR size computation without materializing the encoded bytes
//! (spec.md §9 design note: "re-architect lazy serialization caching").
//!
//! Several validators only need the *byte length* of a canonical CBOR
//! encoding (max-tx-size, max-value-size, the size component of the min-fee
//! formula). Rather than encode to a `Vec<u8>` and discard it — which the
//! teacher's code is flagged as doing in more than one place — this module
//! encodes into a sink that only counts bytes written.

use pallas::codec::minicbor::encode::Write;

/// A `minicbor::encode::Write` sink that discards bytes and only counts
/// them. Infallible: counting can never fail.
#[derive(Default)]
pub struct ByteCounter(pub usize);

impl Write for ByteCounter {
    type Error = std::convert::Infallible;

    fn write_all(&mut self, buf: &[u8]) -> Result<(), Self::Error> {
        self.0 += buf.len();
        Ok(())
    }
}

/// Encode `value` with minicbor into a counting sink and return the number
/// of bytes a real encode would have produced.
pub fn encoded_len<T>(value: &T) -> usize
where
    T: pallas::codec::minicbor::Encode<()>,
{
    let mut counter = ByteCounter::default();
    let mut encoder = pallas::codec::minicbor::Encoder::new(&mut counter);
    encoder
        .encode(value)
        .expect("encoding into a byte counter is infallible");
    counter.0
}
