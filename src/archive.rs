use std::{
    fs,
    io::{self, BufReader, Read, Seek, SeekFrom},
    path::Path,
};
use crate::status::ManagerError;
use tracing::{debug, warn};

pub const ARCHIVE_MAGIC: &[u8; 4] = b"BTDX";
pub const HEADER_LEN: usize = 24;

const VERSION_OFFSET: usize = 4;
const KIND_OFFSET: usize = 8;
const COUNT_OFFSET: usize = 12;
const NAME_TABLE_OFFSET: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexStatus {
    Complete,
    NotAnArchive,
    Truncated,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveIndex {
    pub version: u32,
    pub kind: [u8; 4],
    pub expected: u32,
    pub paths: Vec<String>,
    pub status: IndexStatus,
}

impl ArchiveIndex {
    fn not_an_archive() -> Self {
        Self {
            version: 0,
            kind: [0; 4],
            expected: 0,
            paths: Vec::new(),
            status: IndexStatus::NotAnArchive,
        }
    }

    pub fn kind_label(&self) -> String {
        String::from_utf8_lossy(&self.kind).trim_end_matches('\0').to_string()
    }
}

/// Lists the virtual paths stored in a `.ba2` archive.
///
/// Never fails: an unreadable file or a foreign signature yields an empty
/// list, and a truncated name table yields the names decoded before the cut.
/// The second value is the problem that cut the listing short. A foreign
/// signature is not a problem; an unopenable file or a name table that ends
/// early is.
pub fn index(path: &Path) -> (Vec<String>, Option<ManagerError>) {
    let file = match fs::File::open(path) {
        Ok(file) => file,
        Err(err) => {
            warn!(archive = %path.display(), "open archive failed: {err}");
            return (Vec::new(), Some(ManagerError::io("open archive", path, err)));
        }
    };

    let index = read_index(BufReader::new(file));
    let problem = match index.status {
        IndexStatus::Complete => {
            debug!(
                archive = %path.display(),
                kind = %index.kind_label(),
                entries = index.paths.len(),
                "indexed archive"
            );
            None
        }
        IndexStatus::NotAnArchive => {
            debug!(archive = %path.display(), "not a BTDX archive, skipped");
            None
        }
        IndexStatus::Truncated => {
            warn!(
                archive = %path.display(),
                decoded = index.paths.len(),
                expected = index.expected,
                "archive name table truncated, using partial listing"
            );
            Some(ManagerError::Format {
                path: path.to_path_buf(),
                reason: format!(
                    "name table ends after {} of {} entries",
                    index.paths.len(),
                    index.expected
                ),
            })
        }
    };
    (index.paths, problem)
}

pub fn read_index<R: Read + Seek>(mut reader: R) -> ArchiveIndex {
    let mut header = [0u8; HEADER_LEN];
    if reader.read_exact(&mut header).is_err() {
        return ArchiveIndex::not_an_archive();
    }
    if &header[..4] != ARCHIVE_MAGIC {
        return ArchiveIndex::not_an_archive();
    }

    let version = le_u32(&header, VERSION_OFFSET);
    let mut kind = [0u8; 4];
    kind.copy_from_slice(&header[KIND_OFFSET..KIND_OFFSET + 4]);
    let expected = le_u32(&header, COUNT_OFFSET);
    let name_table = le_u64(&header, NAME_TABLE_OFFSET);

    let mut index = ArchiveIndex {
        version,
        kind,
        expected,
        paths: Vec::new(),
        status: IndexStatus::Complete,
    };
    if expected == 0 {
        return index;
    }

    if read_name_table(&mut reader, name_table, expected, &mut index.paths).is_err() {
        index.status = IndexStatus::Truncated;
    }
    index
}

fn read_name_table<R: Read + Seek>(
    reader: &mut R,
    offset: u64,
    count: u32,
    out: &mut Vec<String>,
) -> io::Result<()> {
    reader.seek(SeekFrom::Start(offset))?;
    for _ in 0..count {
        let len = read_u16(reader)? as usize;
        let mut name = vec![0u8; len];
        reader.read_exact(&mut name)?;
        out.push(String::from_utf8_lossy(&name).into_owned());
    }
    Ok(())
}

fn read_u16<R: Read>(reader: &mut R) -> io::Result<u16> {
    let mut bytes = [0u8; 2];
    reader.read_exact(&mut bytes)?;
    Ok(u16::from_le_bytes(bytes))
}

fn le_u32(buf: &[u8], at: usize) -> u32 {
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(&buf[at..at + 4]);
    u32::from_le_bytes(bytes)
}

fn le_u64(buf: &[u8], at: usize) -> u64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&buf[at..at + 8]);
    u64::from_le_bytes(bytes)
}

/// Builds a minimal archive image: header, an opaque payload, then the name
/// table. Test helper shared with the resolver and deployment tests.
#[cfg(test)]
pub(crate) fn build_archive(names: &[&str]) -> Vec<u8> {
    let payload = b"payload-bytes";
    let table_offset = (HEADER_LEN + payload.len()) as u64;
    let mut out = Vec::new();
    out.extend_from_slice(ARCHIVE_MAGIC);
    out.extend_from_slice(&1u32.to_le_bytes());
    out.extend_from_slice(b"GNRL");
    out.extend_from_slice(&(names.len() as u32).to_le_bytes());
    out.extend_from_slice(&table_offset.to_le_bytes());
    out.extend_from_slice(payload);
    for name in names {
        out.extend_from_slice(&(name.len() as u16).to_le_bytes());
        out.extend_from_slice(name.as_bytes());
    }
    out
}
