//! Compression Operations

use crate::Compression;
use crate::error::{ErrorKind, Result};
use bzip2::{Compression as BzCompression, read::MultiBzDecoder, write::BzEncoder};
use exn::ResultExt;
use flate2::{Compression as GzCompression, read::MultiGzDecoder, write::GzEncoder};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, ErrorKind as IoErrorKind, Read, Write};
use std::path::Path;
use tracing::instrument;

const BUFFER_SIZE: usize = 64 * 1024;

impl Compression {
    /// Compress a byte slice in memory.
    ///
    /// # Examples
    ///
    /// ```
    /// use setsync_compress::Compression;
    ///
    /// let compressed = Compression::Bzip2.compress(b"Hello, world!").unwrap();
    /// assert!(compressed.starts_with(b"BZh"));
    /// ```
    pub fn compress(&self, input: &[u8]) -> Result<Vec<u8>> {
        let mut output = Vec::new();
        match self {
            Compression::None => output.extend_from_slice(input),
            Compression::Bzip2 => {
                let mut encoder = BzEncoder::new(&mut output, BzCompression::best());
                encoder.write_all(input).or_raise(|| ErrorKind::Io)?;
                encoder.finish().or_raise(|| ErrorKind::Io)?;
            },
            Compression::Gzip => {
                let mut encoder = GzEncoder::new(&mut output, GzCompression::best());
                encoder.write_all(input).or_raise(|| ErrorKind::Io)?;
                encoder.finish().or_raise(|| ErrorKind::Io)?;
            },
        }
        Ok(output)
    }

    /// Wrap a reader with the appropriate decompression layer.
    ///
    /// Multi-stream decoders are used for both formats: parallel compressors
    /// (`pbzip2`, `pigz`) emit concatenated streams that the single-stream
    /// decoders would silently truncate.
    pub fn wrap_reader<'a, R: Read + 'a>(&self, reader: R) -> Box<dyn Read + 'a> {
        match self {
            Compression::None => Box::new(reader),
            Compression::Bzip2 => Box::new(MultiBzDecoder::new(reader)),
            Compression::Gzip => Box::new(MultiGzDecoder::new(reader)),
        }
    }

    /// Decompress from a reader to a writer, returning bytes written.
    ///
    /// Failing to read (decode) is reported as [`ErrorKind::InvalidData`],
    /// failing to write as [`ErrorKind::Io`].
    ///
    /// # Examples
    ///
    /// ```
    /// use std::io::Cursor;
    /// use setsync_compress::Compression;
    ///
    /// let compressed = Compression::Gzip.compress(b"Hello, world!").unwrap();
    /// let mut output = Vec::new();
    /// let bytes = Compression::Gzip.decompress_stream(Cursor::new(compressed), &mut output).unwrap();
    /// assert_eq!(output, b"Hello, world!");
    /// assert_eq!(bytes, 13);
    /// ```
    pub fn decompress_stream<R: Read, W: Write>(&self, reader: R, mut writer: W) -> Result<u64> {
        let mut reader = self.wrap_reader(reader);
        let mut buffer = vec![0u8; BUFFER_SIZE];
        let mut total: u64 = 0;
        loop {
            let read = match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == IoErrorKind::Interrupted => continue,
                Err(e) => return Err(e).or_raise(|| ErrorKind::InvalidData),
            };
            writer.write_all(&buffer[..read]).or_raise(|| ErrorKind::Io)?;
            total += read as u64;
        }
        writer.flush().or_raise(|| ErrorKind::Io)?;
        Ok(total)
    }
}

/// Decompress the file at `source` into a new file at `destination`.
///
/// The format is sniffed from the first bytes of `source`, falling back to
/// its extension. Any existing file at `destination` is truncated. On error,
/// `destination` may be left partially written; cleaning it up is the
/// caller's responsibility.
#[instrument(fields(format, bytes))]
pub fn extract_file(source: &Path, destination: &Path) -> Result<(Compression, u64)> {
    let mut reader = BufReader::with_capacity(BUFFER_SIZE, File::open(source).or_raise(|| ErrorKind::Io)?);
    let head = reader.fill_buf().or_raise(|| ErrorKind::Io)?;
    let format = Compression::detect(head, source);
    tracing::Span::current().record("format", format.as_str());
    let writer = BufWriter::with_capacity(BUFFER_SIZE, File::create(destination).or_raise(|| ErrorKind::Io)?);
    let bytes = format.decompress_stream(reader, writer)?;
    tracing::Span::current().record("bytes", bytes);
    Ok((format, bytes))
}
