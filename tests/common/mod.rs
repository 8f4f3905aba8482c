//! Minimal raw directory reader used to verify written files.

#![allow(dead_code)]

pub struct RawFile {
    bytes: Vec<u8>,
    le: bool,
    pub big: bool,
}

pub struct RawDir {
    pub offset: u64,
    pub entries: Vec<RawEntry>,
    pub next: u64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RawEntry {
    pub offset: u64,
    pub tag: u16,
    pub type_: u16,
    pub count: u64,
    pub value_field: Vec<u8>,
}

fn type_size(type_: u16) -> u64 {
    match type_ {
        0 => 0,
        1 | 2 | 6 | 7 => 1,
        3 | 8 => 2,
        4 | 9 | 11 | 13 => 4,
        5 | 10 | 12 | 16 | 17 | 18 => 8,
        other => panic!("unexpected wire type {other}"),
    }
}

impl RawFile {
    pub fn parse(bytes: Vec<u8>) -> Self {
        let le = match &bytes[0..2] {
            b"II" => true,
            b"MM" => false,
            other => panic!("bad byte order mark {other:?}"),
        };
        let mut raw = RawFile {
            bytes,
            le,
            big: false,
        };
        raw.big = match raw.u16(2) {
            42 => false,
            43 => true,
            v => panic!("bad version {v}"),
        };
        if raw.big {
            assert_eq!(raw.u16(4), 8);
            assert_eq!(raw.u16(6), 0);
        }
        raw
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn u16(&self, off: usize) -> u16 {
        let b: [u8; 2] = self.bytes[off..off + 2].try_into().unwrap();
        if self.le {
            u16::from_le_bytes(b)
        } else {
            u16::from_be_bytes(b)
        }
    }

    pub fn u32(&self, off: usize) -> u32 {
        let b: [u8; 4] = self.bytes[off..off + 4].try_into().unwrap();
        if self.le {
            u32::from_le_bytes(b)
        } else {
            u32::from_be_bytes(b)
        }
    }

    pub fn u64(&self, off: usize) -> u64 {
        let b: [u8; 8] = self.bytes[off..off + 8].try_into().unwrap();
        if self.le {
            u64::from_le_bytes(b)
        } else {
            u64::from_be_bytes(b)
        }
    }

    pub fn first_dir(&self) -> u64 {
        if self.big {
            self.u64(8)
        } else {
            u64::from(self.u32(4))
        }
    }

    pub fn dir_at(&self, offset: u64) -> RawDir {
        let base = usize::try_from(offset).unwrap();
        let (count, mut pos) = if self.big {
            (usize::try_from(self.u64(base)).unwrap(), base + 8)
        } else {
            (usize::from(self.u16(base)), base + 2)
        };
        let (entry_size, count_size, value_size) = if self.big { (20, 8, 8) } else { (12, 4, 4) };
        let mut entries = Vec::with_capacity(count);
        for _ in 0..count {
            let entry_count = if self.big {
                self.u64(pos + 4)
            } else {
                u64::from(self.u32(pos + 4))
            };
            let vpos = pos + 4 + count_size;
            entries.push(RawEntry {
                offset: pos as u64,
                tag: self.u16(pos),
                type_: self.u16(pos + 2),
                count: entry_count,
                value_field: self.bytes[vpos..vpos + value_size].to_vec(),
            });
            pos += entry_size;
        }
        let next = if self.big {
            self.u64(pos)
        } else {
            u64::from(self.u32(pos))
        };
        RawDir {
            offset,
            entries,
            next,
        }
    }

    /// All directories in the main chain, in link order.
    pub fn dirs(&self) -> Vec<RawDir> {
        let mut dirs = Vec::new();
        let mut offset = self.first_dir();
        while offset != 0 {
            let dir = self.dir_at(offset);
            offset = dir.next;
            dirs.push(dir);
        }
        dirs
    }

    pub fn entry<'a>(&self, dir: &'a RawDir, tag: u16) -> &'a RawEntry {
        dir.entries
            .iter()
            .find(|e| e.tag == tag)
            .unwrap_or_else(|| panic!("tag {tag} missing"))
    }

    pub fn value_offset(&self, entry: &RawEntry) -> u64 {
        if self.big {
            let b: [u8; 8] = entry.value_field[..8].try_into().unwrap();
            if self.le {
                u64::from_le_bytes(b)
            } else {
                u64::from_be_bytes(b)
            }
        } else {
            let b: [u8; 4] = entry.value_field[..4].try_into().unwrap();
            u64::from(if self.le {
                u32::from_le_bytes(b)
            } else {
                u32::from_be_bytes(b)
            })
        }
    }

    /// The entry's value bytes, whether inline or out of line.
    pub fn data(&self, entry: &RawEntry) -> Vec<u8> {
        let size = type_size(entry.type_) * entry.count;
        let inline_cap = if self.big { 8 } else { 4 };
        if size <= inline_cap {
            entry.value_field[..usize::try_from(size).unwrap()].to_vec()
        } else {
            let off = usize::try_from(self.value_offset(entry)).unwrap();
            self.bytes[off..off + usize::try_from(size).unwrap()].to_vec()
        }
    }

    /// Integer values of an entry of SHORT, LONG, IFD, LONG8 or IFD8
    /// type.
    pub fn values(&self, entry: &RawEntry) -> Vec<u64> {
        let data = self.data(entry);
        match type_size(entry.type_) {
            2 => data
                .chunks_exact(2)
                .map(|c| {
                    let b: [u8; 2] = c.try_into().unwrap();
                    u64::from(if self.le {
                        u16::from_le_bytes(b)
                    } else {
                        u16::from_be_bytes(b)
                    })
                })
                .collect(),
            4 => data
                .chunks_exact(4)
                .map(|c| {
                    let b: [u8; 4] = c.try_into().unwrap();
                    u64::from(if self.le {
                        u32::from_le_bytes(b)
                    } else {
                        u32::from_be_bytes(b)
                    })
                })
                .collect(),
            8 => data
                .chunks_exact(8)
                .map(|c| {
                    let b: [u8; 8] = c.try_into().unwrap();
                    if self.le {
                        u64::from_le_bytes(b)
                    } else {
                        u64::from_be_bytes(b)
                    }
                })
                .collect(),
            other => panic!("no integer decoding for element size {other}"),
        }
    }

    /// Numerator and denominator pairs of a RATIONAL entry.
    pub fn rationals(&self, entry: &RawEntry) -> Vec<(u32, u32)> {
        assert_eq!(entry.type_, 5);
        let data = self.data(entry);
        data.chunks_exact(8)
            .map(|c| {
                let num: [u8; 4] = c[..4].try_into().unwrap();
                let den: [u8; 4] = c[4..].try_into().unwrap();
                if self.le {
                    (u32::from_le_bytes(num), u32::from_le_bytes(den))
                } else {
                    (u32::from_be_bytes(num), u32::from_be_bytes(den))
                }
            })
            .collect()
    }

    /// Number of places in the file that reference `offset` as a
    /// directory: the header slot, chain next pointers and sub-IFD
    /// entries.
    pub fn references_to(&self, offset: u64) -> usize {
        let mut refs = 0;
        if self.first_dir() == offset {
            refs += 1;
        }
        for dir in self.dirs() {
            if dir.next == offset {
                refs += 1;
            }
            for entry in &dir.entries {
                if matches!(entry.type_, 13 | 18) && self.values(entry).contains(&offset) {
                    refs += 1;
                }
            }
        }
        refs
    }
}
