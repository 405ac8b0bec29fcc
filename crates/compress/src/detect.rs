//! Working out which [`Compression`] a file uses.

use crate::Compression;
use std::path::Path;

struct Signature {
    format: Compression,
    magic: &'static [u8],
    /// Accepted names; the first is also the file extension.
    names: &'static [&'static str],
}

const SIGNATURES: [Signature; 2] = [
    Signature {
        format: Compression::Bzip2,
        magic: b"BZh",
        names: &["bz2", "bzip2"],
    },
    Signature {
        format: Compression::Gzip,
        magic: &[0x1F, 0x8B],
        names: &["gz", "gzip"],
    },
];

fn by_name(name: &str) -> Option<Compression> {
    SIGNATURES
        .iter()
        .find(|signature| signature.names.iter().any(|known| known.eq_ignore_ascii_case(name)))
        .map(|signature| signature.format)
}

impl Compression {
    /// File extension for this format, dot included; empty for [`None`](Self::None).
    #[must_use]
    pub fn extension(&self) -> &'static str {
        match self {
            Compression::None => "",
            Compression::Bzip2 => ".bz2",
            Compression::Gzip => ".gz",
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Compression::None => "none",
            Compression::Bzip2 => "bzip2",
            Compression::Gzip => "gzip",
        }
    }

    /// Guess the format from the last extension of `path`.
    #[must_use]
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        path.as_ref().extension().and_then(|ext| ext.to_str()).and_then(by_name).unwrap_or_default()
    }

    /// Identify the format from the first bytes of its data.
    ///
    /// Anything unrecognised, including input too short to tell, is
    /// reported as [`None`](Self::None).
    #[must_use]
    pub fn from_magic_bytes(bytes: &[u8]) -> Self {
        SIGNATURES
            .iter()
            .find(|signature| bytes.starts_with(signature.magic))
            .map(|signature| signature.format)
            .unwrap_or_default()
    }

    /// Detect compression from the head of a file, falling back to the
    /// file's extension when the bytes aren't recognised.
    #[must_use]
    pub fn detect(head: &[u8], path: impl AsRef<Path>) -> Self {
        match Self::from_magic_bytes(head) {
            Compression::None => Self::from_path(path),
            found => found,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::Compression;
    use rstest::rstest;

    #[rstest]
    #[case("online.db", Compression::None)]
    #[case("online.db.BZ2", Compression::Bzip2)]
    #[case(".bz2", Compression::None)]
    #[case("online.db.bz2", Compression::Bzip2)]
    #[case("/var/lib/setsync/online.db.gz", Compression::Gzip)]
    #[case("https://assets.example.com/client/online.db.bz2", Compression::Bzip2)]
    fn test_from_path(#[case] test: &str, #[case] expected: Compression) {
        assert_eq!(Compression::from_path(test), expected);
    }

    #[rstest]
    #[case(b"SQLite format 3\0", Compression::None)]
    #[case(b"", Compression::None)]
    #[case(&[0x42, 0x5A, 0x68, 0x39], Compression::Bzip2)]
    #[case(&[0x1F, 0x8B, 0x08, 0x00], Compression::Gzip)]
    fn test_from_magic_bytes(#[case] bytes: &[u8], #[case] expected: Compression) {
        assert_eq!(Compression::from_magic_bytes(bytes), expected);
    }

    #[rstest]
    // Bytes win when they're conclusive, even against a misleading extension.
    #[case(&[0x1F, 0x8B, 0x08], "online.db.bz2", Compression::Gzip)]
    #[case(b"BZh91AY", "download.tmp", Compression::Bzip2)]
    // Otherwise the extension is all there is to go on.
    #[case(b"", "online.db.bz2", Compression::Bzip2)]
    #[case(b"SQLite format 3\0", "online.db", Compression::None)]
    fn test_detect(#[case] head: &[u8], #[case] path: &str, #[case] expected: Compression) {
        assert_eq!(Compression::detect(head, path), expected);
    }
}
