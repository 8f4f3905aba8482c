//! Directory chain maintenance: relocation and sub-IFD linking.

mod common;

use std::io::Cursor;

use common::RawFile;
use tiffwrite::tags::Tag;
use tiffwrite::{ByteOrder, TiffFileBig, TiffFileStandard, Value};

fn classic() -> TiffFileStandard<Cursor<Vec<u8>>> {
    TiffFileStandard::with_byte_order(Cursor::new(Vec::new()), ByteOrder::LittleEndian).unwrap()
}

fn minimal_fields<W, K>(tiff: &mut tiffwrite::TiffFile<W, K>, width: u32)
where
    W: std::io::Read + std::io::Write + std::io::Seek,
    K: tiffwrite::TiffKind,
{
    let fields = tiff.fields_mut();
    fields.image_width = Some(width);
    fields.image_length = Some(8);
    fields.bits_per_sample = Some(8);
    fields.rows_per_strip = Some(8);
    fields.strile_offsets = Some(vec![8]);
    fields.strile_byte_counts = Some(vec![u64::from(width) * 8]);
}

#[test]
fn grown_directory_relocates_with_a_single_reference() {
    let mut tiff = classic();
    minimal_fields(&mut tiff, 64);
    let old = tiff.checkpoint_directory().unwrap();

    // More fields than the checkpointed block has room for; move it.
    minimal_fields(&mut tiff, 64);
    tiff.fields_mut()
        .insert(Tag::Unknown(305), Value::Ascii("relocated".into()));
    let new = tiff.rewrite_directory().unwrap();
    assert_ne!(old, new);

    let raw = RawFile::parse(tiff.into_inner().into_inner());
    assert_eq!(raw.references_to(new), 1);
    assert_eq!(raw.references_to(old), 0);
    let dirs = raw.dirs();
    assert_eq!(dirs.len(), 1);
    assert_eq!(dirs[0].offset, new);
    raw.entry(&dirs[0], 305);
}

#[test]
fn relocating_the_tail_of_a_longer_chain() {
    let mut tiff = classic();
    minimal_fields(&mut tiff, 16);
    let first = tiff.write_directory().unwrap();
    minimal_fields(&mut tiff, 32);
    let second = tiff.write_directory().unwrap();

    minimal_fields(&mut tiff, 64);
    let old_third = tiff.checkpoint_directory().unwrap();
    minimal_fields(&mut tiff, 64);
    tiff.fields_mut()
        .insert(Tag::Unknown(305), Value::Ascii("tail".into()));
    let new_third = tiff.rewrite_directory().unwrap();

    let raw = RawFile::parse(tiff.into_inner().into_inner());
    let dirs = raw.dirs();
    assert_eq!(
        dirs.iter().map(|d| d.offset).collect::<Vec<_>>(),
        vec![first, second, new_third]
    );
    assert_eq!(raw.references_to(old_third), 0);
}

#[test]
fn children_fill_the_parent_sub_ifd_slots() {
    let mut tiff = classic();
    minimal_fields(&mut tiff, 64);
    tiff.fields_mut().sub_ifd = Some(vec![0, 0]);
    let parent = tiff.write_directory().unwrap();

    minimal_fields(&mut tiff, 8);
    let child_a = tiff.write_directory().unwrap();
    minimal_fields(&mut tiff, 8);
    let child_b = tiff.write_directory().unwrap();

    // With the slots used up the chain gets the next directory.
    minimal_fields(&mut tiff, 16);
    let sibling = tiff.write_directory().unwrap();

    let raw = RawFile::parse(tiff.into_inner().into_inner());
    let dirs = raw.dirs();
    assert_eq!(
        dirs.iter().map(|d| d.offset).collect::<Vec<_>>(),
        vec![parent, sibling]
    );

    let sub = raw.entry(&dirs[0], 330);
    assert_eq!(sub.type_, 13);
    assert_eq!(sub.count, 2);
    assert_eq!(raw.values(sub), vec![child_a, child_b]);

    // The children are proper directories of their own, outside the
    // main chain.
    assert_eq!(raw.dir_at(child_a).next, 0);
    assert_eq!(raw.dir_at(child_b).next, 0);
}

#[test]
fn single_child_sub_ifd_is_patched_inline() {
    let mut tiff = classic();
    minimal_fields(&mut tiff, 64);
    tiff.fields_mut().sub_ifd = Some(vec![0]);
    let parent = tiff.write_directory().unwrap();

    minimal_fields(&mut tiff, 8);
    let child = tiff.write_directory().unwrap();

    let raw = RawFile::parse(tiff.into_inner().into_inner());
    let dirs = raw.dirs();
    assert_eq!(dirs.len(), 1);
    assert_eq!(dirs[0].offset, parent);
    let sub = raw.entry(&dirs[0], 330);
    assert_eq!(sub.count, 1);
    assert_eq!(raw.values(sub), vec![child]);
}

#[test]
fn bigtiff_sub_ifds_use_ifd8() {
    let mut tiff =
        TiffFileBig::with_byte_order(Cursor::new(Vec::new()), ByteOrder::LittleEndian).unwrap();
    minimal_fields(&mut tiff, 64);
    tiff.fields_mut().sub_ifd = Some(vec![0, 0]);
    tiff.write_directory().unwrap();

    minimal_fields(&mut tiff, 8);
    let child_a = tiff.write_directory().unwrap();
    minimal_fields(&mut tiff, 8);
    let child_b = tiff.write_directory().unwrap();

    let raw = RawFile::parse(tiff.into_inner().into_inner());
    let dirs = raw.dirs();
    assert_eq!(dirs.len(), 1);
    let sub = raw.entry(&dirs[0], 330);
    assert_eq!(sub.type_, 18);
    assert_eq!(raw.values(sub), vec![child_a, child_b]);
}

#[test]
fn header_points_at_the_first_directory() {
    let mut tiff = classic();
    minimal_fields(&mut tiff, 16);
    let first = tiff.write_directory().unwrap();
    let raw = RawFile::parse(tiff.into_inner().into_inner());
    assert_eq!(raw.first_dir(), first);
    // Classic headers reserve exactly eight bytes.
    assert_eq!(first, 8);
}
