//! Handlebars templates for the script fragments spliced into the NSIS
//! installer template.

/// Replaces `%%VERSION%%`.
pub const VERSION_VARS: &str = r#"
!define INSTEXE "SL_Launcher.exe"
!define VERSION "{{version_short}}"
!define VERSION_LONG "{{version}}"
!define VERSION_DASHES "{{version_dashes}}"
!define VERSION_REGISTRY "{{version_registry}}"
!define VIEWER_EXE "{{final_exe}}"
"#;

/// Replaces `%%INST_VARS%%`.
pub const INST_VARS: &str = r#"
OutFile "{{installer_file}}"
!define INSTNAME   "{{app_name_oneword}}"
!define SHORTCUT   "{{app_name}}"
!define URLNAME   "secondlife"
!define IS64BIT   "{{is64bit}}"
Caption "{{caption}}"
"#;
