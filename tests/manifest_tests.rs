//! Copy rules, prefix scoping and exclusions against real temporary trees.

use std::{
    fs,
    path::{Path, PathBuf},
};
use viewer_bundler::bundler::{Error, ManifestBuilder, Scope};

struct Tree {
    _tmp: tempfile::TempDir,
    source: PathBuf,
    build: PathBuf,
    dest: PathBuf,
}

impl Tree {
    fn new() -> Self {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("source");
        let build = tmp.path().join("build");
        let dest = tmp.path().join("dest");
        fs::create_dir_all(&source).unwrap();
        fs::create_dir_all(&build).unwrap();
        Self {
            _tmp: tmp,
            source,
            build,
            dest,
        }
    }

    fn touch(&self, root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, rel).unwrap();
    }

    fn manifest(&self) -> ManifestBuilder {
        ManifestBuilder::new(&self.source, &self.build, &self.dest)
    }
}

fn sorted(mut paths: Vec<PathBuf>) -> Vec<PathBuf> {
    paths.sort();
    paths
}

#[test]
fn nested_scopes_compose_and_restore() {
    let tree = Tree::new();
    let mut m = tree.manifest();
    let root = m.current().clone();
    {
        let mut skins = m.prefix(Scope::src_dst("skins"));
        assert_eq!(skins.current().dest_root, tree.dest.join("skins"));
        {
            let textures = skins.prefix(Scope::src("default/textures").and_dst("default/tex"));
            assert_eq!(
                textures.current().source_root,
                tree.source.join("skins/default/textures")
            );
            assert_eq!(textures.current().dest_root, tree.dest.join("skins/default/tex"));
            assert_eq!(textures.depth(), 3);
        }
        assert_eq!(skins.current().dest_root, tree.dest.join("skins"));
    }
    assert_eq!(m.current(), &root);
}

#[test]
fn failing_scope_still_restores_enclosing_frame() {
    let tree = Tree::new();
    let mut m = tree.manifest();
    let root = m.current().clone();

    let result = m.with_prefix(Scope::src_dst("app_settings"), |m| {
        m.require("does-not-exist.xml")
    });
    assert!(matches!(result, Err(Error::MissingSource { .. })));
    assert_eq!(m.current(), &root);
    assert_eq!(m.depth(), 1);
}

#[test]
fn popping_the_root_frame_is_an_error() {
    let tree = Tree::new();
    let mut m = tree.manifest();
    assert!(matches!(m.pop(), Err(Error::PrefixUnderflow)));
    assert_eq!(m.depth(), 1);
}

#[test]
fn optional_miss_is_reported_not_raised() {
    let tree = Tree::new();
    let mut m = tree.manifest();
    let res = m.path("fmod.dll").unwrap();
    assert!(res.is_missing());
    assert_eq!(res.count(), 0);
    assert!(m.entries().is_empty());
}

#[test]
fn app_settings_rule_skips_excluded_log_control() {
    let tree = Tree::new();
    for rel in [
        "app_settings/foo.xml",
        "app_settings/logcontrol.xml",
        "app_settings/bar.ini",
    ] {
        tree.touch(&tree.source, rel);
    }

    let mut m = tree.manifest();
    m.with_prefix(Scope::src_dst("app_settings"), |m| {
        m.exclude("logcontrol.xml")?;
        m.path("*.xml")?;
        m.path("*.ini")?;
        Ok(())
    })
    .unwrap();

    assert_eq!(
        sorted(m.relative_dests()),
        [
            PathBuf::from("app_settings/bar.ini"),
            PathBuf::from("app_settings/foo.xml")
        ]
    );
    assert!(!tree.dest.join("app_settings/logcontrol.xml").exists());
}

#[test]
fn exclusions_do_not_leak_into_sibling_scopes() {
    let tree = Tree::new();
    tree.touch(&tree.source, "a/settings.xml");
    tree.touch(&tree.source, "a/readme.txt");
    tree.touch(&tree.source, "b/settings.xml");

    let mut m = tree.manifest();
    m.with_prefix(Scope::src_dst("a"), |m| {
        m.exclude("*.xml")?;
        m.path("*")?;
        Ok(())
    })
    .unwrap();
    m.with_prefix(Scope::src_dst("b"), |m| m.require("*.xml")).unwrap();

    assert_eq!(
        sorted(m.relative_dests()),
        [PathBuf::from("a/readme.txt"), PathBuf::from("b/settings.xml")]
    );
}

#[test]
fn wildcards_carry_over_to_destination() {
    let tree = Tree::new();
    tree.touch(&tree.source, "skins/default/html/btn.png");
    tree.touch(&tree.source, "skins/starlight/html/index.html");

    let mut m = tree.manifest();
    let res = m.path_to("skins/*/html", "skins/*/html.old").unwrap();

    assert_eq!(res.count(), 2);
    assert!(tree.dest.join("skins/default/html.old/btn.png").is_file());
    assert!(tree.dest.join("skins/starlight/html.old/index.html").is_file());
    assert!(!tree.dest.join("skins/default/html").exists());
}

#[test]
fn compiled_files_are_found_under_the_build_root() {
    let tree = Tree::new();
    tree.touch(&tree.build, "Release/firestorm-bin.exe");

    let mut m = tree.manifest();
    let res = m
        .require_to("Release/firestorm-bin.exe", "Firestorm.exe")
        .unwrap();

    assert_eq!(res.dests(), [tree.dest.join("Firestorm.exe")]);
    assert_eq!(
        fs::read_to_string(tree.dest.join("Firestorm.exe")).unwrap(),
        "Release/firestorm-bin.exe"
    );
}

#[test]
fn build_root_can_be_narrowed_separately() {
    let tree = Tree::new();
    tree.touch(&tree.build, "media_plugins/cef/Release/media_plugin_cef.dll");

    let mut m = tree.manifest();
    m.with_prefix(
        Scope::src("llplugin")
            .and_build("media_plugins/cef/Release")
            .and_dst("llplugin"),
        |m| m.require("media_plugin_cef.dll"),
    )
    .unwrap();

    assert!(tree.dest.join("llplugin/media_plugin_cef.dll").is_file());
}

#[test]
fn directories_are_copied_whole_and_recorded_per_file() {
    let tree = Tree::new();
    tree.touch(&tree.source, "fonts/DejaVuSans.ttf");
    tree.touch(&tree.source, "fonts/extra/Noto.ttf");

    let mut m = tree.manifest();
    let res = m.require("fonts").unwrap();

    assert_eq!(res.count(), 2);
    assert_eq!(m.entries().len(), 2);
    assert!(tree.dest.join("fonts/extra/Noto.ttf").is_file());
}

#[test]
fn basename_copy_flattens_the_directory() {
    let tree = Tree::new();
    tree.touch(&tree.source, "../scripts/messages/message_template.msg");
    let mut m = tree.manifest();
    m.path2basename("../scripts/messages", "message_template.msg")
        .unwrap();
    assert!(tree.dest.join("message_template.msg").is_file());
}

#[cfg(unix)]
#[test]
fn symlinked_sources_stay_symlinks() {
    let tree = Tree::new();
    tree.touch(&tree.build, "lib/libvlc.so.5.6.0");
    std::os::unix::fs::symlink("libvlc.so.5.6.0", tree.build.join("lib/libvlc.so")).unwrap();

    let mut m = tree.manifest();
    m.with_prefix(Scope::src_dst("lib"), |m| m.require("libvlc.so*"))
        .unwrap();

    let staged = tree.dest.join("lib/libvlc.so");
    assert!(fs::symlink_metadata(&staged).unwrap().file_type().is_symlink());
    assert_eq!(fs::read_link(&staged).unwrap(), PathBuf::from("libvlc.so.5.6.0"));
}

#[test]
fn literal_names_resolve_inside_wildcard_scopes() {
    let tree = Tree::new();
    for rel in [
        "skins/default/textures/textures.xml",
        "skins/default/textures/a.png",
        "skins/starlight/textures/textures.xml",
    ] {
        tree.touch(&tree.source, rel);
    }

    let mut m = tree.manifest();
    {
        let mut skins = m.prefix(Scope::src_dst("skins"));
        let mut textures = skins.prefix(Scope::src_dst("*/textures"));
        assert_eq!(textures.path("*.png").unwrap().count(), 1);
        assert_eq!(textures.require("textures.xml").unwrap().count(), 2);
    }

    assert!(tree.dest.join("skins/default/textures/a.png").is_file());
    assert!(tree.dest.join("skins/default/textures/textures.xml").is_file());
    assert!(tree.dest.join("skins/starlight/textures/textures.xml").is_file());
}

#[test]
fn nested_images_are_staged_through_a_wildcard_scope() {
    let tree = Tree::new();
    tree.touch(&tree.source, "skins/default/textures/icons/go.png");
    tree.touch(&tree.source, "skins/default/textures/icons/go.tga");

    let mut m = tree.manifest();
    m.with_prefix(Scope::src_dst("skins"), |skins| {
        skins.with_prefix(Scope::src_dst("*/textures"), |textures| {
            textures.require("*/*.png")
        })
    })
    .unwrap();

    assert_eq!(
        m.relative_dests(),
        [PathBuf::from("skins/default/textures/icons/go.png")]
    );
}

#[test]
fn html_scope_renames_through_wildcards() {
    let tree = Tree::new();
    tree.touch(&tree.source, "skins/default/html/btn.png");
    tree.touch(&tree.source, "skins/default/html/en-us/help/index.html");

    let mut m = tree.manifest();
    {
        let mut skins = m.prefix(Scope::src_dst("skins"));
        let mut html = skins.prefix(Scope::src("*/html").and_dst("*/html.old"));
        html.require("*.png").unwrap();
        html.require("*/*/*.html").unwrap();
    }

    assert_eq!(
        sorted(m.relative_dests()),
        [
            PathBuf::from("skins/default/html.old/btn.png"),
            PathBuf::from("skins/default/html.old/en-us/help/index.html"),
        ]
    );
}

#[test]
fn path_exclusions_apply_inside_wildcard_scopes() {
    let tree = Tree::new();
    tree.touch(&tree.source, "skins/default/html/en-us/help/index.html");
    tree.touch(&tree.source, "skins/default/html/de/help/index.html");

    let mut m = tree.manifest();
    m.with_prefix(Scope::src_dst("skins/*/html"), |html| {
        html.exclude("de/*/*.html")?;
        html.require("*/*/*.html")
    })
    .unwrap();

    assert_eq!(
        m.relative_dests(),
        [PathBuf::from("skins/default/html/en-us/help/index.html")]
    );
}
