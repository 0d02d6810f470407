//! NSIS file sections generated from a staged manifest.

use std::fs;
use viewer_bundler::bundler::{
    ManifestBuilder, Scope,
    platform::windows::nsis::{FileCommandMode, nsi_file_commands},
};

fn staged() -> (tempfile::TempDir, ManifestBuilder) {
    let tmp = tempfile::tempdir().unwrap();
    let source = tmp.path().join("source");
    for rel in [
        "skins/default/xui/en/floater_about.xml",
        "Firestorm.exe",
        "llplugin/libcef.dll",
        "SLVoice.exe",
        "Firestorm.pdb",
    ] {
        let path = source.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, rel).unwrap();
    }

    let mut m = ManifestBuilder::new(&source, &source, tmp.path().join("dest"));
    m.with_prefix(Scope::src_dst("skins"), |m| m.require("default"))
        .unwrap();
    m.require("Firestorm.exe").unwrap();
    m.require("llplugin").unwrap();
    m.require("SLVoice.exe").unwrap();
    m.require("Firestorm.pdb").unwrap();
    (tmp, m)
}

#[test]
fn output_paths_are_set_deepest_first() {
    let (_tmp, m) = staged();
    let out = nsi_file_commands(m.entries(), m.dest_base(), FileCommandMode::Install);

    let out_paths: Vec<&str> = out.lines().filter(|l| l.starts_with("SetOutPath")).collect();
    assert_eq!(
        out_paths,
        [
            r#"SetOutPath "$INSTDIR\skins\default\xui\en""#,
            r#"SetOutPath "$INSTDIR\llplugin""#,
            r#"SetOutPath "$INSTDIR""#,
        ]
    );
    assert_eq!(out.lines().filter(|l| l.starts_with("File")).count(), 4);
    assert!(!out.contains(".pdb"));
}

#[test]
fn uninstall_deletes_files_then_each_directory_once() {
    let (_tmp, m) = staged();
    let out = nsi_file_commands(m.entries(), m.dest_base(), FileCommandMode::Uninstall);
    let lines: Vec<&str> = out.lines().collect();

    let first_rmdir = lines.iter().position(|l| l.starts_with("RMDir")).unwrap();
    assert!(lines[..first_rmdir].iter().all(|l| l.starts_with("Delete")));
    assert_eq!(
        &lines[first_rmdir..],
        [
            r#"RMDir "$INSTDIR\skins\default\xui\en""#,
            r#"RMDir "$INSTDIR\skins\default\xui""#,
            r#"RMDir "$INSTDIR\skins\default""#,
            r#"RMDir "$INSTDIR\llplugin""#,
            r#"RMDir "$INSTDIR\skins""#,
        ]
    );
}

#[test]
fn regenerating_gives_identical_text() {
    let (_tmp, m) = staged();
    let first = nsi_file_commands(m.entries(), m.dest_base(), FileCommandMode::Install);
    let mut reversed = m.entries().to_vec();
    reversed.reverse();
    assert_eq!(
        first,
        nsi_file_commands(&reversed, m.dest_base(), FileCommandMode::Install)
    );
}
