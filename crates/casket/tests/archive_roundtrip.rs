//! Pack a directory, unpack it somewhere else, compare the trees.

mod common;

use std::fs::{self, File};
use std::io::Write;

use casket::archive::{pack, unpack};
use casket::CasketError;
use common::{read_tree, write_tree};
use tempfile::TempDir;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

#[test]
fn photos_scenario() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let photos = temp_dir.path().join("photos");
    let jpeg = [0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F'];
    write_tree(&photos, &[("a.jpg", &jpeg)]);

    let archive = temp_dir.path().join("photos.zip");
    pack(&photos, &archive)?;

    let extract = TempDir::new()?;
    let out = unpack(&archive, Some(extract.path()))?;

    assert_eq!(out, extract.path());
    assert_eq!(fs::read(extract.path().join("photos/a.jpg"))?, jpeg);
    Ok(())
}

#[test]
fn nested_tree_round_trips() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let src = temp_dir.path().join("project");
    let big: Vec<u8> = (0..100_000u32).map(|i| (i * 31 % 256) as u8).collect();
    write_tree(
        &src,
        &[
            ("README.md", b"# project\n"),
            ("src/main.rs", b"fn main() {}\n"),
            ("src/nested/deep/mod.rs", b""),
            ("assets/blob.bin", &big),
        ],
    );

    let archive = temp_dir.path().join("project.zip");
    assert_eq!(pack(&src, &archive)?, 4);

    let extract = TempDir::new()?;
    unpack(&archive, Some(extract.path()))?;

    assert_eq!(read_tree(&src), read_tree(&extract.path().join("project")));
    Ok(())
}

#[test]
fn crafted_traversal_is_rejected() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let archive = temp_dir.path().join("evil.zip");
    {
        let mut zip = ZipWriter::new(File::create(&archive)?);
        zip.start_file("../../evil", SimpleFileOptions::default())?;
        zip.write_all(b"owned")?;
        zip.finish()?;
    }

    let root = temp_dir.path().join("x/y");
    let dest = root.join("dest");
    let err = unpack(&archive, Some(&dest)).unwrap_err();

    assert!(matches!(err, CasketError::PathTraversal { .. }));
    assert!(!temp_dir.path().join("x/evil").exists());
    assert!(read_tree(temp_dir.path())
        .iter()
        .all(|(path, _)| path == "evil.zip"));
    Ok(())
}

#[test]
fn absolute_entry_is_rejected() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let archive = temp_dir.path().join("abs.zip");
    let target = temp_dir.path().join("absolute-target.txt");
    {
        let mut zip = ZipWriter::new(File::create(&archive)?);
        zip.start_file(target.to_string_lossy().to_string(), SimpleFileOptions::default())?;
        zip.write_all(b"owned")?;
        zip.finish()?;
    }

    let err = unpack(&archive, Some(&temp_dir.path().join("dest"))).unwrap_err();
    assert!(err.is_path_traversal());
    assert!(!target.exists());
    Ok(())
}

#[test]
fn repack_of_unpacked_tree_matches() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let src = temp_dir.path().join("docs");
    write_tree(&src, &[("a.txt", b"alpha"), ("b/c.txt", b"gamma")]);

    let first = temp_dir.path().join("first.zip");
    pack(&src, &first)?;
    let out = TempDir::new()?;
    unpack(&first, Some(out.path()))?;

    let second = temp_dir.path().join("second.zip");
    pack(out.path().join("docs"), &second)?;
    let out2 = TempDir::new()?;
    unpack(&second, Some(out2.path()))?;

    assert_eq!(read_tree(out.path()), read_tree(out2.path()));
    Ok(())
}
