//! Defconfig discovery and the single-key feature toggle.
//!
//! The toggle fails closed: when the conflicting key is enabled the document is
//! left byte-for-byte untouched and nothing is written.

use std::fs;
use std::path::{Path, PathBuf};
use regex::Regex;
use crate::error::ConfigError;
use crate::models::ToggleSpec;

/// What a toggle did to the document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    /// Existing key line rewritten in place
    Replaced,
    /// Key was absent; a commented block was appended
    Appended,
    /// Key already had the requested value
    Unchanged,
}

/// In-memory defconfig
#[derive(Debug, Clone)]
pub struct Defconfig {
    path: PathBuf,
    content: String,
}

impl Defconfig {
    pub fn new(path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        Defconfig {
            path: path.into(),
            content: content.into(),
        }
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound(path.display().to_string())
            } else {
                ConfigError::IoError(e)
            }
        })?;
        Ok(Defconfig::new(path, content))
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        fs::write(&self.path, &self.content).map_err(ConfigError::IoError)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// Whether `KEY=y` appears as a whole line
    pub fn is_enabled(&self, key: &str) -> Result<bool, ConfigError> {
        let regex = compile(&format!(r"(?m)^{}=y$", regex::escape(key)))?;
        Ok(regex.is_match(&self.content))
    }

    /// Value of the first `KEY=value` line
    pub fn value_of(&self, key: &str) -> Result<Option<String>, ConfigError> {
        let regex = compile(&format!(r"(?m)^{}=(.*)$", regex::escape(key)))?;
        Ok(regex
            .captures(&self.content)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string()))
    }

    /// Set `spec.key` to `y`/`n`.
    ///
    /// The first existing `KEY=...` or `# KEY is not set` line is rewritten in
    /// place and later duplicates are dropped, so exactly one key line remains.
    pub fn toggle(&mut self, spec: &ToggleSpec, enable: bool) -> Result<ToggleOutcome, ConfigError> {
        if self.is_enabled(&spec.conflict)? {
            return Err(ConfigError::ConflictDetected(format!(
                "{} is enabled in {}; {} cannot be integrated alongside it",
                spec.conflict,
                self.path.display(),
                spec.key
            )));
        }

        let key = regex::escape(&spec.key);
        let key_line = compile(&format!(r"(?m)^(?:{key}=.*|# {key} is not set)$"))?;
        let new_line = format!("{}={}", spec.key, if enable { "y" } else { "n" });

        let ranges: Vec<(usize, usize)> = key_line
            .find_iter(&self.content)
            .map(|m| (m.start(), m.end()))
            .collect();

        let Some(&(first_start, first_end)) = ranges.first() else {
            self.content = format!("{}\n\n# {}\n{}\n", self.content, spec.label, new_line);
            return Ok(ToggleOutcome::Appended);
        };

        let mut updated = String::with_capacity(self.content.len() + 2);
        updated.push_str(&self.content[..first_start]);
        updated.push_str(&new_line);
        let mut cursor = first_end;
        for &(start, end) in &ranges[1..] {
            updated.push_str(&self.content[cursor..start]);
            // Drop the duplicate together with its line break
            cursor = if self.content[end..].starts_with('\n') { end + 1 } else { end };
        }
        updated.push_str(&self.content[cursor..]);

        if updated == self.content {
            return Ok(ToggleOutcome::Unchanged);
        }
        self.content = updated;
        Ok(ToggleOutcome::Replaced)
    }
}

/// Resolve the defconfig to edit.
///
/// `requested` is used directly when it names an existing file (absolute or
/// relative to `kernel_dir`). Otherwise the toggle's directories are scanned in
/// order, files in lexical order: a file named like `requested` wins, then the
/// first file ending in the suffix.
pub fn locate(requested: &Path, kernel_dir: &Path, spec: &ToggleSpec) -> Result<PathBuf, ConfigError> {
    let direct = if requested.is_absolute() {
        requested.to_path_buf()
    } else {
        kernel_dir.join(requested)
    };
    if direct.is_file() {
        return Ok(direct);
    }

    let wanted = requested.file_name();
    let mut fallback: Option<PathBuf> = None;

    for dir in &spec.config_dirs {
        let dir = kernel_dir.join(dir);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) => {
                log::debug!("[Config] [LOCATE] Skipping {}: {}", dir.display(), e);
                continue;
            }
        };

        let mut candidates: Vec<PathBuf> = entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .filter(|path| {
                path.file_name()
                    .map_or(false, |n| n.to_string_lossy().ends_with(&spec.suffix))
            })
            .collect();
        candidates.sort();

        if let Some(exact) = candidates.iter().find(|p| p.file_name() == wanted) {
            return Ok(exact.clone());
        }
        if fallback.is_none() {
            fallback = candidates.into_iter().next();
        }
    }

    fallback.ok_or_else(|| {
        let dirs: Vec<String> = spec
            .config_dirs
            .iter()
            .map(|d| d.display().to_string())
            .collect();
        ConfigError::FileNotFound(format!(
            "no *{} file found in {} (under {})",
            spec.suffix,
            dirs.join(", "),
            kernel_dir.display()
        ))
    })
}

/// Locate, toggle and (unless `dry_run`) persist the defconfig.
pub fn apply_toggle(
    requested: &Path,
    kernel_dir: &Path,
    spec: &ToggleSpec,
    enable: bool,
    dry_run: bool,
) -> Result<(PathBuf, ToggleOutcome), ConfigError> {
    let path = locate(requested, kernel_dir, spec)?;
    let mut defconfig = Defconfig::load(&path)?;
    let outcome = defconfig.toggle(spec, enable)?;

    if outcome != ToggleOutcome::Unchanged && !dry_run {
        defconfig.save()?;
    }

    log::info!(
        "[Config] [TOGGLE] {} {} in {} ({:?}{})",
        if enable { "Enabled" } else { "Disabled" },
        spec.key,
        path.display(),
        outcome,
        if dry_run { ", dry run" } else { "" }
    );
    Ok((path, outcome))
}

fn compile(pattern: &str) -> Result<Regex, ConfigError> {
    Regex::new(pattern)
        .map_err(|e| ConfigError::ValidationFailed(format!("Invalid key pattern: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::TempDir;

    fn doc(content: &str) -> Defconfig {
        Defconfig::new("avicii_defconfig", content)
    }

    #[test]
    fn test_toggle_replaces_in_place() {
        let mut d = doc("CONFIG_A=y\nCONFIG_KSU=n\nCONFIG_B=m\n");
        let outcome = d.toggle(&ToggleSpec::default(), true).unwrap();
        assert_eq!(outcome, ToggleOutcome::Replaced);
        assert_eq!(d.content(), "CONFIG_A=y\nCONFIG_KSU=y\nCONFIG_B=m\n");
    }

    #[test]
    fn test_toggle_appends_when_missing() {
        let mut d = doc("CONFIG_A=y\n");
        let outcome = d.toggle(&ToggleSpec::default(), false).unwrap();
        assert_eq!(outcome, ToggleOutcome::Appended);
        assert_eq!(d.content(), "CONFIG_A=y\n\n\n# KernelSU\nCONFIG_KSU=n\n");
    }

    #[test]
    fn test_toggle_rewrites_not_set_comment() {
        let mut d = doc("CONFIG_A=y\n# CONFIG_KSU is not set\nCONFIG_B=y\n");
        d.toggle(&ToggleSpec::default(), true).unwrap();
        assert_eq!(d.content(), "CONFIG_A=y\nCONFIG_KSU=y\nCONFIG_B=y\n");
    }

    #[test]
    fn test_toggle_collapses_duplicates() {
        let mut d = doc("CONFIG_KSU=n\nCONFIG_A=y\nCONFIG_KSU=m\nCONFIG_B=y\n");
        d.toggle(&ToggleSpec::default(), true).unwrap();
        assert_eq!(d.content(), "CONFIG_KSU=y\nCONFIG_A=y\nCONFIG_B=y\n");
    }

    #[test]
    fn test_toggle_same_state_is_unchanged() {
        let mut d = doc("CONFIG_KSU=y\n");
        assert_eq!(d.toggle(&ToggleSpec::default(), true).unwrap(), ToggleOutcome::Unchanged);
        assert_eq!(d.content(), "CONFIG_KSU=y\n");
    }

    #[test]
    fn test_conflict_leaves_document_untouched() {
        let original = "CONFIG_KPROBES=y\nCONFIG_KSU=n\n";
        let mut d = doc(original);
        let err = d.toggle(&ToggleSpec::default(), true).unwrap_err();
        assert!(matches!(err, ConfigError::ConflictDetected(_)));
        assert_eq!(d.content(), original);
    }

    #[test]
    fn test_conflict_requires_exact_line() {
        let mut d = doc("CONFIG_KPROBES_ON_FTRACE=y\n# CONFIG_KPROBES is not set\n");
        assert!(d.toggle(&ToggleSpec::default(), true).is_ok());
    }

    #[test]
    fn test_key_prefix_is_not_matched() {
        let mut d = doc("CONFIG_KSU_DEBUG=y\n");
        assert_eq!(d.toggle(&ToggleSpec::default(), true).unwrap(), ToggleOutcome::Appended);
        assert_eq!(d.value_of("CONFIG_KSU_DEBUG").unwrap().as_deref(), Some("y"));
        assert_eq!(d.value_of("CONFIG_KSU").unwrap().as_deref(), Some("y"));
    }

    fn touch(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        let mut file = File::create(path).unwrap();
        write!(file, "{}", content).unwrap();
    }

    #[test]
    fn test_locate_scans_directories_in_order() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        touch(&root.join("arch/arm64/configs/vendor/a_defconfig"), "");
        touch(&root.join("arch/arm64/configs/z_defconfig"), "");
        touch(&root.join("arch/arm64/configs/m_defconfig"), "");
        touch(&root.join("arch/arm64/configs/README"), "");

        let found = locate(Path::new("unknown"), root, &ToggleSpec::default()).unwrap();
        assert_eq!(found, root.join("arch/arm64/configs/m_defconfig"));
    }

    #[test]
    fn test_locate_prefers_named_file() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        touch(&root.join("arch/arm64/configs/a_defconfig"), "");
        touch(&root.join("arch/arm64/configs/vendor/avicii_defconfig"), "");

        let found = locate(Path::new("avicii_defconfig"), root, &ToggleSpec::default()).unwrap();
        assert_eq!(found, root.join("arch/arm64/configs/vendor/avicii_defconfig"));
    }

    #[test]
    fn test_locate_direct_path() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        touch(&root.join("out/.config"), "");
        let found = locate(Path::new("out/.config"), root, &ToggleSpec::default()).unwrap();
        assert_eq!(found, root.join("out/.config"));
    }

    #[test]
    fn test_locate_missing() {
        let temp_dir = TempDir::new().unwrap();
        let err = locate(Path::new("x_defconfig"), temp_dir.path(), &ToggleSpec::default()).unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound(_)));
    }

    #[test]
    fn test_apply_toggle_writes_file() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let path = root.join("arch/arm64/configs/avicii_defconfig");
        touch(&path, "CONFIG_KSU=n\n");

        let (found, outcome) =
            apply_toggle(Path::new("avicii_defconfig"), root, &ToggleSpec::default(), true, false).unwrap();
        assert_eq!(found, path);
        assert_eq!(outcome, ToggleOutcome::Replaced);
        assert_eq!(fs::read_to_string(&path).unwrap(), "CONFIG_KSU=y\n");
    }

    #[test]
    fn test_apply_toggle_dry_run_does_not_write() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let path = root.join("arch/arm64/configs/avicii_defconfig");
        touch(&path, "CONFIG_KSU=n\n");

        apply_toggle(Path::new("avicii_defconfig"), root, &ToggleSpec::default(), true, true).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "CONFIG_KSU=n\n");
    }
}
