//! # Byte Reader
//!
//! Positionable byte source with a switchable byte order.
//!
//! [`Reader`] wraps anything that is `Read + Seek` (a `File`, a `Cursor` over
//! an in-memory buffer, ...) and exposes the fixed-width reads the decoder
//! needs. The byte order is state on the reader because Mach containers switch
//! it mid-stream: the universal directory is always big-endian while each slice
//! carries its own order.
//!
//! Every read returns a [`DecodeResult`]. Running out of input is reported as
//! [`DecodeError::TruncatedInput`] with the absolute offset of the failed read.
//!
//! Section content is not copied out per section. The first
//! [`Reader::shared_bytes`] call reads the source once into a shared buffer
//! and every section becomes a window into it, so memory stays proportional
//! to the input however many headers point at the same bytes.

use std::fmt;
use std::io::{Read, Seek, SeekFrom};
use std::sync::Arc;

use byteorder::{BigEndian, LittleEndian, ReadBytesExt};

use crate::error::{DecodeError, DecodeResult};
use crate::types::{Bitness, Endian, SectionData};

/// Endian-aware reader over a seekable byte source.
///
/// ## Example
///
/// ```rust
/// use std::io::Cursor;
///
/// use machscope_core::reader::Reader;
/// use machscope_core::types::Endian;
///
/// let mut reader = Reader::new(Cursor::new(vec![0x12, 0x34, 0x56, 0x78]));
/// reader.set_endian(Endian::Big);
/// assert_eq!(reader.read_u32().unwrap(), 0x1234_5678);
/// ```
pub struct Reader<R>
{
    inner: R,
    endian: Endian,
    image: Option<Arc<[u8]>>,
}

impl<R: fmt::Debug> fmt::Debug for Reader<R>
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.debug_struct("Reader")
            .field("inner", &self.inner)
            .field("endian", &self.endian)
            .field("image_len", &self.image.as_ref().map(|image| image.len()))
            .finish()
    }
}

impl<R: Read + Seek> Reader<R>
{
    /// Wrap a byte source. The initial byte order is little-endian.
    pub fn new(inner: R) -> Self
    {
        Self {
            inner,
            endian: Endian::Little,
            image: None,
        }
    }

    /// Byte order used by the integer reads.
    pub fn endian(&self) -> Endian
    {
        self.endian
    }

    /// Switch the byte order for all following integer reads.
    pub fn set_endian(&mut self, endian: Endian)
    {
        self.endian = endian;
    }

    /// Current absolute position in the stream.
    pub fn position(&mut self) -> DecodeResult<u64>
    {
        Ok(self.inner.stream_position()?)
    }

    /// Move to an absolute position. Seeking past the end is allowed; the next
    /// read reports the truncation.
    pub fn seek(&mut self, offset: u64) -> DecodeResult<()>
    {
        self.inner.seek(SeekFrom::Start(offset))?;
        Ok(())
    }

    pub fn read_u8(&mut self) -> DecodeResult<u8>
    {
        self.read_with(1, |inner, _| inner.read_u8())
    }

    pub fn read_u16(&mut self) -> DecodeResult<u16>
    {
        self.read_with(2, |inner, endian| match endian {
            Endian::Little => inner.read_u16::<LittleEndian>(),
            Endian::Big => inner.read_u16::<BigEndian>(),
        })
    }

    pub fn read_u32(&mut self) -> DecodeResult<u32>
    {
        self.read_with(4, |inner, endian| match endian {
            Endian::Little => inner.read_u32::<LittleEndian>(),
            Endian::Big => inner.read_u32::<BigEndian>(),
        })
    }

    pub fn read_u64(&mut self) -> DecodeResult<u64>
    {
        self.read_with(8, |inner, endian| match endian {
            Endian::Little => inner.read_u64::<LittleEndian>(),
            Endian::Big => inner.read_u64::<BigEndian>(),
        })
    }

    /// Read an address-sized field: 4 bytes on 32-bit slices, 8 on 64-bit ones.
    pub fn read_word(&mut self, bitness: Bitness) -> DecodeResult<u64>
    {
        match bitness {
            Bitness::Bits32 => self.read_u32().map(u64::from),
            Bitness::Bits64 => self.read_u64(),
        }
    }

    /// Read exactly `len` raw bytes.
    ///
    /// The buffer grows with the data actually present instead of being
    /// allocated up front, so a hostile length cannot force a huge allocation.
    pub fn read_bytes(&mut self, len: u64) -> DecodeResult<Vec<u8>>
    {
        let offset = self.position()?;
        let mut buf = Vec::new();
        (&mut self.inner).take(len).read_to_end(&mut buf)?;
        if (buf.len() as u64) < len {
            return Err(DecodeError::TruncatedInput { offset, wanted: len });
        }
        Ok(buf)
    }

    /// Read a fixed 16-byte name field (segment and section names), cut at the
    /// first NUL.
    pub fn read_name16(&mut self) -> DecodeResult<String>
    {
        let offset = self.position()?;
        let mut raw = [0u8; 16];
        self.inner
            .read_exact(&mut raw)
            .map_err(|err| DecodeError::from_read(err, offset, 16))?;
        Ok(c_string(&raw))
    }

    /// View `len` bytes at the absolute `offset` without copying them.
    ///
    /// Fails with [`DecodeError::TruncatedInput`] when the range runs past the
    /// end of the input. The stream position is left unchanged.
    pub fn shared_bytes(&mut self, offset: u64, len: u64) -> DecodeResult<SectionData>
    {
        let image = self.image()?;
        let truncated = || DecodeError::TruncatedInput { offset, wanted: len };

        let start = usize::try_from(offset).map_err(|_| truncated())?;
        let end = offset
            .checked_add(len)
            .and_then(|end| usize::try_from(end).ok())
            .filter(|&end| end <= image.len())
            .ok_or_else(truncated)?;
        Ok(SectionData::new(image, start..end))
    }

    /// The whole input, read on first use and kept for later views.
    fn image(&mut self) -> DecodeResult<Arc<[u8]>>
    {
        if let Some(image) = &self.image {
            return Ok(Arc::clone(image));
        }

        let position = self.position()?;
        self.seek(0)?;
        let mut buf = Vec::new();
        self.inner.read_to_end(&mut buf)?;
        self.seek(position)?;

        let image: Arc<[u8]> = Arc::from(buf);
        self.image = Some(Arc::clone(&image));
        Ok(image)
    }

    fn read_with<T>(&mut self, wanted: u64, read: impl FnOnce(&mut R, Endian) -> std::io::Result<T>) -> DecodeResult<T>
    {
        let offset = self.position()?;
        read(&mut self.inner, self.endian).map_err(|err| DecodeError::from_read(err, offset, wanted))
    }
}

/// Decode a NUL-terminated (or unterminated) byte run as text.
///
/// Invalid UTF-8 is replaced rather than rejected; names in hostile files are
/// still worth showing.
pub(crate) fn c_string(bytes: &[u8]) -> String
{
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}
