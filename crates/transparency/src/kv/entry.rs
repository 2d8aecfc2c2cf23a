use arbor_crypto::{ByteVisitor, VisitBytes};
use serde::{Deserialize, Serialize};

/// A single key/value record, stored as one Merkle leaf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry<K, V> {
    key: K,
    value: V,
}

impl<K, V> Entry<K, V> {
    pub(crate) fn new(key: K, value: V) -> Self {
        Self { key, value }
    }

    /// The key this entry was written under.
    pub fn key(&self) -> &K {
        &self.key
    }

    /// The value written.
    pub fn value(&self) -> &V {
        &self.value
    }
}

// The envelope length-prefixes both fields (big-endian u64), so distinct
// (key, value) pairs can never stream to the same bytes.
impl<K: AsRef<[u8]>, V: AsRef<[u8]>> VisitBytes for Entry<K, V> {
    fn visit<BV: ?Sized + ByteVisitor>(&self, visitor: &mut BV) {
        let key = self.key.as_ref();
        let value = self.value.as_ref();

        visitor.visit_nested(key.len() as u64);
        visitor.visit_bytes(key);
        visitor.visit_nested(value.len() as u64);
        visitor.visit_bytes(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Collector(Vec<u8>);

    impl ByteVisitor for Collector {
        fn visit_bytes(&mut self, bytes: impl AsRef<[u8]>) {
            self.0.extend_from_slice(bytes.as_ref());
        }
    }

    fn envelope(entry: &Entry<&str, &str>) -> Vec<u8> {
        let mut collector = Collector(Vec::new());
        entry.visit(&mut collector);
        collector.0
    }

    #[test]
    fn test_envelope_layout() {
        let entry = Entry::new("ab", "c");
        let mut expected = vec![0, 0, 0, 0, 0, 0, 0, 2];
        expected.extend_from_slice(b"ab");
        expected.extend_from_slice(&[0, 0, 0, 0, 0, 0, 0, 1]);
        expected.extend_from_slice(b"c");
        assert_eq!(envelope(&entry), expected);
    }

    #[test]
    fn test_envelope_is_injective_at_the_boundary() {
        // Without the length prefixes these pairs would stream identically.
        assert_ne!(
            envelope(&Entry::new("ab", "c")),
            envelope(&Entry::new("a", "bc"))
        );
        assert_ne!(envelope(&Entry::new("", "a")), envelope(&Entry::new("a", "")));
    }
}
