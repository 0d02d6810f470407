//! NSIS installer script generation.
//!
//! The checked-in `installer_template.nsi` carries `%%KEY%%` markers.
//! Version defines and installer variables are rendered with Handlebars,
//! file sections come from the staged manifest, and the result is written
//! next to the staged files with the UTF-8 BOM NSIS expects.

use super::{
    file_commands::{FileCommandMode, nsi_file_commands},
    template, utils,
};
use crate::bundler::{
    error::{Error, Result},
    manifest::ManifestBuilder,
    settings::{AddressSize, ChannelType, Settings},
};
use handlebars::Handlebars;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Installer template, relative to the source tree.
pub const TEMPLATE_PATH: &str = "installers/windows/installer_template.nsi";

/// Generated script, relative to the staging tree.
pub const SCRIPT_NAME: &str = "firestorm_setup_tmp.nsi";

/// Values substituted into the script fragments.
#[derive(Clone, Debug, Serialize)]
pub struct InstallerVars {
    pub version: String,
    /// First three version parts
    pub version_short: String,
    pub version_dashes: String,
    /// `<version>(<address size>)`
    pub version_registry: String,
    pub final_exe: String,
    pub app_name: String,
    pub app_name_oneword: String,
    pub installer_file: String,
    pub is64bit: u8,
    pub caption: String,
}

impl InstallerVars {
    pub fn new(settings: &Settings, final_exe: &str) -> Self {
        let version = settings.version();
        let parts = version.0;
        let app_name = settings.app_name();
        let version_dashes = version.dashed();
        let caption = if settings.channel_type() == ChannelType::Release {
            settings.vendor_base().to_string()
        } else {
            format!("{app_name} ${{VERSION}}")
        };
        Self {
            version: version.to_string(),
            version_short: format!("{}.{}.{}", parts[0], parts[1], parts[2]),
            version_registry: format!("{version}({})", settings.address_size().bits()),
            final_exe: final_exe.to_string(),
            app_name_oneword: settings.app_name_oneword(),
            installer_file: format!("Phoenix-{app_name}-{version_dashes}_Setup.exe"),
            is64bit: u8::from(settings.address_size() == AddressSize::Bits64),
            caption,
            app_name,
            version_dashes,
        }
    }

    /// Renders the `%%VERSION%%` and `%%INST_VARS%%` fragments.
    pub fn render(&self) -> Result<(String, String)> {
        let mut handlebars = Handlebars::new();
        handlebars.register_escape_fn(handlebars::no_escape);
        for (name, source) in [
            ("version_vars", template::VERSION_VARS),
            ("inst_vars", template::INST_VARS),
        ] {
            handlebars
                .register_template_string(name, source)
                .map_err(|e| Error::Template(format!("failed to register {name}: {e}")))?;
        }
        let render = |name: &str| {
            handlebars
                .render(name, self)
                .map_err(|e| Error::Template(format!("failed to render {name}: {e}")))
        };
        Ok((render("version_vars")?, render("inst_vars")?))
    }
}

/// `SetRegView` command and install root for the address size.
pub fn registry_view(size: AddressSize) -> (&'static str, &'static str) {
    match size {
        AddressSize::Bits64 => ("SetRegView 64", "$PROGRAMFILES64"),
        AddressSize::Bits32 => ("SetRegView 32", "$PROGRAMFILES32"),
    }
}

/// Fills the installer template from the manifest and writes
/// [`SCRIPT_NAME`] into the staging tree.
pub fn write_installer_script(
    settings: &Settings,
    vars: &InstallerVars,
    manifest: &mut ManifestBuilder,
) -> Result<PathBuf> {
    let (version_vars, inst_vars) = vars.render()?;
    let install_files =
        nsi_file_commands(manifest.entries(), manifest.dest_base(), FileCommandMode::Install);
    let delete_files =
        nsi_file_commands(manifest.entries(), manifest.dest_base(), FileCommandMode::Uninstall);
    let source = manifest.current().source_root.display().to_string();
    let (engage_registry, program_files) = registry_view(settings.address_size());

    let script = manifest.replace_in(
        TEMPLATE_PATH,
        Some(Path::new(SCRIPT_NAME)),
        [
            ("%%VERSION%%", version_vars.as_str()),
            ("%%SOURCE%%", source.as_str()),
            ("%%INST_VARS%%", inst_vars.as_str()),
            ("%%INSTALL_FILES%%", install_files.as_str()),
            ("%%PROGRAMFILES%%", program_files),
            ("%%ENGAGEREGISTRY%%", engage_registry),
            ("%%DELETE_FILES%%", delete_files.as_str()),
        ],
    )?;
    utils::add_utf8_bom(&script)?;
    log::debug!("Wrote NSIS script {}", script.display());
    Ok(script)
}
