use byteorder::{ByteOrder, LittleEndian};
use chrono::{Datelike, NaiveDateTime, Timelike};

use crate::error::{Error, Result};

/// Version needed to extract: 2.0 (deflate, folders)
pub const VERSION_NEEDED: u16 = 20;

/// Version made by: Unix host, spec version 2.0
pub const VERSION_MADE_BY: u16 = 0x0314;

/// General purpose flag bit 3: crc32 and sizes follow in a data descriptor
pub const FLAG_DATA_DESCRIPTOR: u16 = 1 << 3;

/// General purpose flag bit 11: file name is UTF-8
pub const FLAG_UTF8: u16 = 1 << 11;

/// ZIP compression methods
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionMethod {
    Stored,
    Deflate,
    Unknown(u16),
}

impl CompressionMethod {
    pub fn from_u16(value: u16) -> Self {
        match value {
            0 => CompressionMethod::Stored,
            8 => CompressionMethod::Deflate,
            _ => CompressionMethod::Unknown(value),
        }
    }

    pub fn as_u16(&self) -> u16 {
        match self {
            CompressionMethod::Stored => 0,
            CompressionMethod::Deflate => 8,
            CompressionMethod::Unknown(v) => *v,
        }
    }
}

/// Packed MS-DOS date and time, 2-second resolution, years 1980..=2107.
///
/// Fields outside their nominal range are masked, not rejected: a year before
/// 1980 or after 2107 silently wraps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DosDateTime {
    pub date: u16,
    pub time: u16,
}

impl DosDateTime {
    pub fn from_datetime(dt: &NaiveDateTime) -> Self {
        let year = (dt.year() - 1980) as u16 & 0x7F;
        let date = (year << 9) | ((dt.month() as u16 & 0x0F) << 5) | (dt.day() as u16 & 0x1F);
        let time = ((dt.hour() as u16 & 0x1F) << 11)
            | ((dt.minute() as u16 & 0x3F) << 5)
            | ((dt.second() as u16 / 2) & 0x1F);
        Self { date, time }
    }

    /// Parse modification date to (year, month, day)
    pub fn date_parts(&self) -> (u16, u8, u8) {
        let day = (self.date & 0x1F) as u8;
        let month = ((self.date >> 5) & 0x0F) as u8;
        let year = ((self.date >> 9) & 0x7F) + 1980;
        (year, month, day)
    }

    /// Parse modification time to (hour, minute, second)
    pub fn time_parts(&self) -> (u8, u8, u8) {
        let second = ((self.time & 0x1F) * 2) as u8;
        let minute = ((self.time >> 5) & 0x3F) as u8;
        let hour = ((self.time >> 11) & 0x1F) as u8;
        (hour, minute, second)
    }
}

impl From<NaiveDateTime> for DosDateTime {
    fn from(dt: NaiveDateTime) -> Self {
        Self::from_datetime(&dt)
    }
}

/// Fields shared by the local file header and the central directory header,
/// from "version needed" through "uncompressed size".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHeader {
    pub version_needed: u16,
    pub flags: u16,
    pub compression_method: CompressionMethod,
    pub modified: DosDateTime,
    pub crc32: u32,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
}

impl FileHeader {
    const SIZE: usize = 22;

    fn write(&self, buf: &mut [u8]) {
        LittleEndian::write_u16(&mut buf[0..2], self.version_needed);
        LittleEndian::write_u16(&mut buf[2..4], self.flags);
        LittleEndian::write_u16(&mut buf[4..6], self.compression_method.as_u16());
        LittleEndian::write_u16(&mut buf[6..8], self.modified.time);
        LittleEndian::write_u16(&mut buf[8..10], self.modified.date);
        LittleEndian::write_u32(&mut buf[10..14], self.crc32);
        LittleEndian::write_u32(&mut buf[14..18], self.compressed_size);
        LittleEndian::write_u32(&mut buf[18..22], self.uncompressed_size);
    }

    fn read(buf: &[u8]) -> Self {
        Self {
            version_needed: LittleEndian::read_u16(&buf[0..2]),
            flags: LittleEndian::read_u16(&buf[2..4]),
            compression_method: CompressionMethod::from_u16(LittleEndian::read_u16(&buf[4..6])),
            modified: DosDateTime {
                time: LittleEndian::read_u16(&buf[6..8]),
                date: LittleEndian::read_u16(&buf[8..10]),
            },
            crc32: LittleEndian::read_u32(&buf[10..14]),
            compressed_size: LittleEndian::read_u32(&buf[14..18]),
            uncompressed_size: LittleEndian::read_u32(&buf[18..22]),
        }
    }
}

fn check_record(data: &[u8], signature: &[u8], size: usize, what: &str) -> Result<()> {
    if data.len() < size {
        return Err(Error::Framing(format!("{what} truncated")));
    }
    if &data[0..4] != signature {
        return Err(Error::Framing(format!("{what} signature mismatch")));
    }
    Ok(())
}

fn read_name(data: &[u8], start: usize, len: usize, what: &str) -> Result<Vec<u8>> {
    data.get(start..start + len)
        .map(<[u8]>::to_vec)
        .ok_or_else(|| Error::Framing(format!("{what} file name truncated")))
}

/// Local File Header (LFH) - 30 bytes plus name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFileHeader {
    pub header: FileHeader,
    pub file_name: Vec<u8>,
}

impl LocalFileHeader {
    pub const SIGNATURE: &'static [u8] = b"PK\x03\x04";
    pub const SIZE: usize = 30;

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = [0u8; Self::SIZE];
        buf[0..4].copy_from_slice(Self::SIGNATURE);
        self.header.write(&mut buf[4..4 + FileHeader::SIZE]);
        LittleEndian::write_u16(&mut buf[26..28], self.file_name.len() as u16);
        // extra field length stays zero

        let mut out = Vec::with_capacity(Self::SIZE + self.file_name.len());
        out.extend_from_slice(&buf);
        out.extend_from_slice(&self.file_name);
        out
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        check_record(data, Self::SIGNATURE, Self::SIZE, "Local File Header")?;

        let name_len = LittleEndian::read_u16(&data[26..28]) as usize;
        let extra_len = LittleEndian::read_u16(&data[28..30]) as usize;
        if extra_len != 0 {
            return Err(Error::Framing("Local File Header carries extra fields".into()));
        }

        Ok(Self {
            header: FileHeader::read(&data[4..4 + FileHeader::SIZE]),
            file_name: read_name(data, Self::SIZE, name_len, "Local File Header")?,
        })
    }

    /// Total encoded length including the name
    pub fn encoded_len(&self) -> usize {
        Self::SIZE + self.file_name.len()
    }
}

/// Central Directory File Header (CDFH) - 46 bytes plus name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CentralDirectoryHeader {
    pub version_made_by: u16,
    pub header: FileHeader,
    pub external_attributes: u32,
    pub lfh_offset: u32,
    pub file_name: Vec<u8>,
}

impl CentralDirectoryHeader {
    pub const SIGNATURE: &'static [u8] = b"PK\x01\x02";
    pub const MIN_SIZE: usize = 46;

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = [0u8; Self::MIN_SIZE];
        buf[0..4].copy_from_slice(Self::SIGNATURE);
        LittleEndian::write_u16(&mut buf[4..6], self.version_made_by);
        self.header.write(&mut buf[6..6 + FileHeader::SIZE]);
        LittleEndian::write_u16(&mut buf[28..30], self.file_name.len() as u16);
        // extra length, comment length, disk number start and internal
        // attributes (bytes 30..38) stay zero
        LittleEndian::write_u32(&mut buf[38..42], self.external_attributes);
        LittleEndian::write_u32(&mut buf[42..46], self.lfh_offset);

        let mut out = Vec::with_capacity(Self::MIN_SIZE + self.file_name.len());
        out.extend_from_slice(&buf);
        out.extend_from_slice(&self.file_name);
        out
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        check_record(data, Self::SIGNATURE, Self::MIN_SIZE, "Central Directory File Header")?;

        let name_len = LittleEndian::read_u16(&data[28..30]) as usize;

        Ok(Self {
            version_made_by: LittleEndian::read_u16(&data[4..6]),
            header: FileHeader::read(&data[6..6 + FileHeader::SIZE]),
            external_attributes: LittleEndian::read_u32(&data[38..42]),
            lfh_offset: LittleEndian::read_u32(&data[42..46]),
            file_name: read_name(data, Self::MIN_SIZE, name_len, "Central Directory File Header")?,
        })
    }

    pub fn encoded_len(&self) -> usize {
        Self::MIN_SIZE + self.file_name.len()
    }
}

/// Data descriptor with signature - 16 bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataDescriptor {
    pub crc32: u32,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
}

impl DataDescriptor {
    pub const SIGNATURE: &'static [u8] = b"PK\x07\x08";
    pub const SIZE: usize = 16;

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut buf = [0u8; Self::SIZE];
        buf[0..4].copy_from_slice(Self::SIGNATURE);
        LittleEndian::write_u32(&mut buf[4..8], self.crc32);
        LittleEndian::write_u32(&mut buf[8..12], self.compressed_size);
        LittleEndian::write_u32(&mut buf[12..16], self.uncompressed_size);
        buf
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        check_record(data, Self::SIGNATURE, Self::SIZE, "Data Descriptor")?;

        Ok(Self {
            crc32: LittleEndian::read_u32(&data[4..8]),
            compressed_size: LittleEndian::read_u32(&data[8..12]),
            uncompressed_size: LittleEndian::read_u32(&data[12..16]),
        })
    }
}

/// End of Central Directory (EOCD) - 22 bytes, no comment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndOfCentralDirectory {
    pub disk_number: u16,
    pub disk_with_cd: u16,
    pub disk_entries: u16,
    pub total_entries: u16,
    pub cd_size: u32,
    pub cd_offset: u32,
    pub comment_len: u16,
}

impl EndOfCentralDirectory {
    pub const SIGNATURE: &'static [u8] = b"PK\x05\x06";
    pub const SIZE: usize = 22;

    /// Single-disk record for `entries` central directory headers
    pub fn new(entries: u16, cd_size: u32, cd_offset: u32) -> Self {
        Self {
            disk_number: 0,
            disk_with_cd: 0,
            disk_entries: entries,
            total_entries: entries,
            cd_size,
            cd_offset,
            comment_len: 0,
        }
    }

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut buf = [0u8; Self::SIZE];
        buf[0..4].copy_from_slice(Self::SIGNATURE);
        LittleEndian::write_u16(&mut buf[4..6], self.disk_number);
        LittleEndian::write_u16(&mut buf[6..8], self.disk_with_cd);
        LittleEndian::write_u16(&mut buf[8..10], self.disk_entries);
        LittleEndian::write_u16(&mut buf[10..12], self.total_entries);
        LittleEndian::write_u32(&mut buf[12..16], self.cd_size);
        LittleEndian::write_u32(&mut buf[16..20], self.cd_offset);
        LittleEndian::write_u16(&mut buf[20..22], self.comment_len);
        buf
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        check_record(data, Self::SIGNATURE, Self::SIZE, "End of Central Directory")?;

        Ok(Self {
            disk_number: LittleEndian::read_u16(&data[4..6]),
            disk_with_cd: LittleEndian::read_u16(&data[6..8]),
            disk_entries: LittleEndian::read_u16(&data[8..10]),
            total_entries: LittleEndian::read_u16(&data[10..12]),
            cd_size: LittleEndian::read_u32(&data[12..16]),
            cd_offset: LittleEndian::read_u32(&data[16..20]),
            comment_len: LittleEndian::read_u16(&data[20..22]),
        })
    }
}
