//! Turns raw rows into a validated [`Manifest`](super::Manifest).
//!
//! Every check runs before any side effect. The first violation aborts the
//! load; no partially built manifest escapes.
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::model::{
    AppMetadata, FileEntry, FileOverrides, InstallDefaults, RunEntry, RunEntryFlags,
    ShortcutEntry,
};
use super::parse::{RawManifest, RawRow, Section, SyntaxError};
use super::template::{Anchor, Template, TemplateError, TemplateUse};
use super::Manifest;
use crate::types::{OverwritePolicy, Placement};

/// Identity of the manifest entry a validation failure refers to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntryRef {
    pub section: &'static str,
    pub line: Option<usize>,
    /// Human identity such as the `Source` or `Name` value.
    pub ident: String,
}

impl fmt::Display for EntryRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.section)?;
        if let Some(l) = self.line {
            write!(f, " line {l}")?;
        }
        if !self.ident.is_empty() {
            write!(f, " ({})", self.ident)?;
        }
        Ok(())
    }
}

/// The rule a manifest violated.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum Rule {
    #[error("syntax: {0}")]
    Syntax(String),
    #[error("missing required key `{0}`")]
    MissingKey(&'static str),
    #[error("unknown key `{0}`")]
    UnknownKey(String),
    #[error("unknown flag `{0}`")]
    UnknownFlag(String),
    #[error("flags `{0}` and `{1}` contradict each other")]
    ConflictingFlags(String, String),
    #[error("invalid value `{value}` for `{key}`")]
    BadValue { key: &'static str, value: String },
    #[error("version `{0}` is not a valid version")]
    BadVersion(String),
    #[error("path `{path}`: {reason}")]
    BadTemplate { path: String, reason: TemplateError },
    #[error("shortcut must be placed under {{group}} or a desktop placeholder, found `{0}`")]
    BadPlacement(String),
    #[error("`{0}` does not match any [Files] destination")]
    DanglingTarget(String),
    #[error("`{dest}` is also declared at line {other_line} with different options")]
    ConflictingDestination { dest: String, other_line: usize },
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("manifest validation failed at {entry}: {rule}")]
pub struct ValidationError {
    pub entry: EntryRef,
    pub rule: Rule,
}

impl ValidationError {
    fn at(section: Section, line: Option<usize>, ident: impl Into<String>, rule: Rule) -> Self {
        Self {
            entry: EntryRef {
                section: section.as_str(),
                line,
                ident: ident.into(),
            },
            rule,
        }
    }
}

impl From<SyntaxError> for ValidationError {
    fn from(e: SyntaxError) -> Self {
        Self {
            entry: EntryRef {
                section: e.section.map(Section::as_str).unwrap_or("manifest"),
                line: Some(e.line),
                ident: String::new(),
            },
            rule: Rule::Syntax(e.msg),
        }
    }
}

type VResult<T> = std::result::Result<T, ValidationError>;

/// Accepts 1-4 numeric components with optional `-pre` / `+build`, the shape
/// installer manifests use (`1.0`, `2.1.3`, `1.0.0.7`).
pub fn parse_version(raw: &str) -> Option<semver::Version> {
    let raw = raw.trim();
    let (core, build) = match raw.split_once('+') {
        Some((c, b)) => (c, Some(b)),
        None => (raw, None),
    };
    let (nums, pre) = match core.split_once('-') {
        Some((n, p)) => (n, Some(p)),
        None => (core, None),
    };
    let parts: Vec<&str> = nums.split('.').collect();
    if parts.is_empty()
        || parts.len() > 4
        || parts
            .iter()
            .any(|p| p.is_empty() || !p.bytes().all(|b| b.is_ascii_digit()))
    {
        return None;
    }
    let mut norm = String::new();
    for i in 0..3 {
        if i > 0 {
            norm.push('.');
        }
        let p = parts.get(i).copied().unwrap_or("0");
        // semver rejects leading zeros; manifests commonly write `1.05`.
        let trimmed = p.trim_start_matches('0');
        norm.push_str(if trimmed.is_empty() { "0" } else { trimmed });
    }
    if let Some(p) = pre {
        norm.push('-');
        norm.push_str(p);
    }
    let mut build_parts: Vec<String> = Vec::new();
    if let Some(fourth) = parts.get(3) {
        build_parts.push(format!("r{fourth}"));
    }
    if let Some(b) = build {
        build_parts.push(b.to_string());
    }
    if !build_parts.is_empty() {
        norm.push('+');
        norm.push_str(&build_parts.join("."));
    }
    semver::Version::parse(&norm).ok()
}

pub(crate) fn build(raw: RawManifest, base_dir: &Path) -> VResult<Manifest> {
    let (app, defaults) = build_setup(&raw.setup)?;

    let mut files: Vec<FileEntry> = Vec::new();
    let mut by_dest: HashMap<String, usize> = HashMap::new();
    for row in &raw.files {
        let entry = build_file(row, base_dir)?;
        let key = entry.destination().key();
        if let Some(&idx) = by_dest.get(&key) {
            let prev = &files[idx];
            if prev.source == entry.source
                && prev.overrides.merge(&defaults) == entry.overrides.merge(&defaults)
            {
                log::warn!(
                    "manifest: [Files] line {} duplicates line {}; ignoring",
                    entry.line,
                    prev.line
                );
                continue;
            }
            return Err(ValidationError::at(
                Section::Files,
                Some(entry.line),
                entry.source.display().to_string(),
                Rule::ConflictingDestination {
                    dest: entry.destination().to_string(),
                    other_line: prev.line,
                },
            ));
        }
        by_dest.insert(key, files.len());
        files.push(entry);
    }

    let mut shortcuts: Vec<ShortcutEntry> = Vec::new();
    let mut by_link: HashMap<String, usize> = HashMap::new();
    for row in &raw.icons {
        let sc = build_shortcut(row)?;
        let ident = sc.location.to_string();
        let link_key = sc.location.key();
        if let Some(&idx) = by_dest.get(&link_key) {
            return Err(ValidationError::at(
                Section::Icons,
                Some(sc.line),
                ident,
                Rule::ConflictingDestination {
                    dest: sc.location.to_string(),
                    other_line: files[idx].line,
                },
            ));
        }
        if !by_dest.contains_key(&sc.target.key()) {
            return Err(ValidationError::at(
                Section::Icons,
                Some(sc.line),
                ident,
                Rule::DanglingTarget(sc.target.to_string()),
            ));
        }
        if let Some(&idx) = by_link.get(&link_key) {
            let prev: &ShortcutEntry = &shortcuts[idx];
            if prev.target.key() == sc.target.key() && prev.args == sc.args {
                log::warn!(
                    "manifest: [Icons] line {} duplicates line {}; ignoring",
                    sc.line,
                    prev.line
                );
                continue;
            }
            return Err(ValidationError::at(
                Section::Icons,
                Some(sc.line),
                ident,
                Rule::ConflictingDestination {
                    dest: sc.location.to_string(),
                    other_line: prev.line,
                },
            ));
        }
        by_link.insert(link_key, shortcuts.len());
        shortcuts.push(sc);
    }

    let mut runs = Vec::new();
    for row in &raw.run {
        let run = build_run(row)?;
        if !by_dest.contains_key(&run.target.key()) {
            return Err(ValidationError::at(
                Section::Run,
                Some(run.line),
                run.target.to_string(),
                Rule::DanglingTarget(run.target.to_string()),
            ));
        }
        runs.push(run);
    }

    Ok(Manifest {
        app,
        defaults,
        files,
        shortcuts,
        runs,
        base_dir: base_dir.to_path_buf(),
    })
}

fn build_setup(setup: &[(usize, String, String)]) -> VResult<(AppMetadata, InstallDefaults)> {
    let mut values: BTreeMap<String, (usize, String)> = BTreeMap::new();
    for (line, k, v) in setup {
        if values.insert(k.clone(), (*line, v.clone())).is_some() {
            log::warn!("manifest: [Setup] key `{k}` repeated at line {line}; last value wins");
        }
    }
    let mut take = |key: &str| values.remove(key);

    let require = |v: Option<(usize, String)>, key: &'static str| -> VResult<(usize, String)> {
        match v {
            Some((l, s)) if !s.trim().is_empty() => Ok((l, s)),
            Some((l, _)) => Err(ValidationError::at(
                Section::Setup,
                Some(l),
                key,
                Rule::MissingKey(key),
            )),
            None => Err(ValidationError::at(Section::Setup, None, key, Rule::MissingKey(key))),
        }
    };

    let (_, name) = require(take("appname"), "AppName")?;
    let (vline, version) = require(take("appversion"), "AppVersion")?;
    let semver = parse_version(&version).ok_or_else(|| {
        ValidationError::at(
            Section::Setup,
            Some(vline),
            "AppVersion",
            Rule::BadVersion(version.clone()),
        )
    })?;
    let (dline, dir_raw) = require(take("defaultdirname"), "DefaultDirName")?;
    let default_dir = Template::parse(&dir_raw, TemplateUse::InstallDir).map_err(|reason| {
        ValidationError::at(
            Section::Setup,
            Some(dline),
            "DefaultDirName",
            Rule::BadTemplate {
                path: dir_raw.clone(),
                reason,
            },
        )
    })?;
    let default_group = match take("defaultgroupname") {
        Some((_, g)) if !g.trim().is_empty() => g.trim().to_string(),
        _ => name.clone(),
    };
    let publisher = take("apppublisher").map(|(_, p)| p);

    let mut defaults = InstallDefaults::default();
    if let Some((l, v)) = take("overwrite") {
        defaults.overwrite = match v.to_ascii_lowercase().as_str() {
            "always" => OverwritePolicy::Always,
            "ifnewer" => OverwritePolicy::IfNewer,
            "never" => OverwritePolicy::Never,
            _ => {
                return Err(ValidationError::at(
                    Section::Setup,
                    Some(l),
                    "Overwrite",
                    Rule::BadValue {
                        key: "Overwrite",
                        value: v,
                    },
                ))
            }
        };
    }
    if let Some((l, v)) = take("uninstallkeepfiles") {
        defaults.keep_on_uninstall = parse_yes_no(&v).ok_or_else(|| {
            ValidationError::at(
                Section::Setup,
                Some(l),
                "UninstallKeepFiles",
                Rule::BadValue {
                    key: "UninstallKeepFiles",
                    value: v.clone(),
                },
            )
        })?;
    }

    let extra = values.into_iter().map(|(k, (_, v))| (k, v)).collect();
    Ok((
        AppMetadata {
            name: name.trim().to_string(),
            version: version.trim().to_string(),
            semver,
            publisher,
            default_dir,
            default_group,
            extra,
        },
        defaults,
    ))
}

fn parse_yes_no(v: &str) -> Option<bool> {
    match v.trim().to_ascii_lowercase().as_str() {
        "yes" | "true" | "1" => Some(true),
        "no" | "false" | "0" => Some(false),
        _ => None,
    }
}

fn check_keys(row: &RawRow, section: Section, allowed: &[&str], ident: &str) -> VResult<()> {
    for (k, _) in &row.params {
        if !allowed.contains(&k.as_str()) {
            return Err(ValidationError::at(
                section,
                Some(row.line),
                ident,
                Rule::UnknownKey(k.clone()),
            ));
        }
    }
    Ok(())
}

fn required<'a>(
    row: &'a RawRow,
    section: Section,
    key: &'static str,
    ident: &str,
) -> VResult<&'a str> {
    match row.get(&key.to_ascii_lowercase()) {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ValidationError::at(
            section,
            Some(row.line),
            ident,
            Rule::MissingKey(key),
        )),
    }
}

fn entry_template(raw: &str, section: Section, line: usize, ident: &str) -> VResult<Template> {
    Template::parse(raw, TemplateUse::Entry).map_err(|reason| {
        ValidationError::at(
            section,
            Some(line),
            ident,
            Rule::BadTemplate {
                path: raw.to_string(),
                reason,
            },
        )
    })
}

fn flags_of(row: &RawRow) -> Vec<String> {
    row.get("flags")
        .map(|f| f.split_whitespace().map(str::to_ascii_lowercase).collect())
        .unwrap_or_default()
}

fn split_args(row: &RawRow, section: Section, ident: &str) -> VResult<Vec<String>> {
    match row.get("parameters") {
        None => Ok(Vec::new()),
        Some(p) => shell_words::split(p).map_err(|_| {
            ValidationError::at(
                section,
                Some(row.line),
                ident,
                Rule::BadValue {
                    key: "Parameters",
                    value: p.to_string(),
                },
            )
        }),
    }
}

fn build_file(row: &RawRow, base_dir: &Path) -> VResult<FileEntry> {
    let ident = row.get("source").unwrap_or("").to_string();
    check_keys(row, Section::Files, &["source", "destdir", "destname", "flags"], &ident)?;
    let source_raw = required(row, Section::Files, "Source", &ident)?;
    let dest_raw = required(row, Section::Files, "DestDir", &ident)?;

    let mut source = PathBuf::new();
    let mut last = None;
    for (i, seg) in source_raw.split(['\\', '/']).enumerate() {
        if i == 0 && seg.is_empty() {
            source.push(std::path::MAIN_SEPARATOR_STR);
            continue;
        }
        if seg.is_empty() || seg == "." {
            continue;
        }
        source.push(seg);
        last = Some(seg);
    }
    let Some(file_name) = last else {
        return Err(ValidationError::at(
            Section::Files,
            Some(row.line),
            &ident,
            Rule::BadValue {
                key: "Source",
                value: source_raw.to_string(),
            },
        ));
    };
    let source = if source.is_absolute() {
        source
    } else {
        base_dir.join(source)
    };

    let dest_dir = entry_template(dest_raw, Section::Files, row.line, &ident)?;
    let dest_name = match row.get("destname") {
        Some(n) if n.contains(['\\', '/']) || n.trim().is_empty() || n.trim() == ".." => {
            return Err(ValidationError::at(
                Section::Files,
                Some(row.line),
                &ident,
                Rule::BadValue {
                    key: "DestName",
                    value: n.to_string(),
                },
            ))
        }
        Some(n) => n.trim().to_string(),
        None => file_name.to_string(),
    };

    let mut overrides = FileOverrides::default();
    let mut overwrite_flag: Option<&str> = None;
    for flag in flags_of(row) {
        let policy = match flag.as_str() {
            "ignoreversion" => Some(OverwritePolicy::Always),
            "comparetimestamp" => Some(OverwritePolicy::IfNewer),
            "onlyifdoesntexist" => Some(OverwritePolicy::Never),
            "uninsneveruninstall" => {
                overrides.keep_on_uninstall = Some(true);
                None
            }
            other => {
                return Err(ValidationError::at(
                    Section::Files,
                    Some(row.line),
                    &ident,
                    Rule::UnknownFlag(other.to_string()),
                ))
            }
        };
        if let Some(p) = policy {
            if let Some(prev) = overwrite_flag {
                if overrides.overwrite != Some(p) {
                    return Err(ValidationError::at(
                        Section::Files,
                        Some(row.line),
                        &ident,
                        Rule::ConflictingFlags(prev.to_string(), flag.clone()),
                    ));
                }
            }
            overrides.overwrite = Some(p);
            overwrite_flag = Some(match p {
                OverwritePolicy::Always => "ignoreversion",
                OverwritePolicy::IfNewer => "comparetimestamp",
                OverwritePolicy::Never => "onlyifdoesntexist",
            });
        }
    }

    Ok(FileEntry {
        source,
        dest_dir,
        dest_name,
        overrides,
        line: row.line,
    })
}

fn build_shortcut(row: &RawRow) -> VResult<ShortcutEntry> {
    let ident = row.get("name").unwrap_or("").to_string();
    check_keys(
        row,
        Section::Icons,
        &["name", "filename", "parameters", "comment"],
        &ident,
    )?;
    let name_raw = required(row, Section::Icons, "Name", &ident)?;
    let target_raw = required(row, Section::Icons, "Filename", &ident)?;
    let location = entry_template(name_raw, Section::Icons, row.line, &ident)?;
    let placement = match location.anchor() {
        Some(Anchor::Group) => Placement::StartMenu,
        Some(Anchor::Desktop) => Placement::Desktop,
        _ => {
            return Err(ValidationError::at(
                Section::Icons,
                Some(row.line),
                &ident,
                Rule::BadPlacement(name_raw.to_string()),
            ))
        }
    };
    let Some(name) = location.file_name().map(str::to_string) else {
        return Err(ValidationError::at(
            Section::Icons,
            Some(row.line),
            &ident,
            Rule::BadValue {
                key: "Name",
                value: name_raw.to_string(),
            },
        ));
    };
    let target = entry_template(target_raw, Section::Icons, row.line, &ident)?;
    let args = split_args(row, Section::Icons, &ident)?;
    Ok(ShortcutEntry {
        name,
        placement,
        location,
        target,
        args,
        comment: row.get("comment").map(str::to_string),
        line: row.line,
    })
}

fn build_run(row: &RawRow) -> VResult<RunEntry> {
    let ident = row.get("filename").unwrap_or("").to_string();
    check_keys(
        row,
        Section::Run,
        &["filename", "description", "parameters", "workingdir", "flags"],
        &ident,
    )?;
    let target_raw = required(row, Section::Run, "Filename", &ident)?;
    let target = entry_template(target_raw, Section::Run, row.line, &ident)?;
    let working_dir = row
        .get("workingdir")
        .map(|w| entry_template(w, Section::Run, row.line, &ident))
        .transpose()?;
    let args = split_args(row, Section::Run, &ident)?;

    let mut flags = RunEntryFlags::default();
    for flag in flags_of(row) {
        match flag.as_str() {
            "postinstall" => flags.postinstall = true,
            "nowait" => flags.nowait = true,
            "skipifsilent" => flags.skip_if_silent = true,
            "skipifnotsilent" => flags.skip_if_not_silent = true,
            other => {
                return Err(ValidationError::at(
                    Section::Run,
                    Some(row.line),
                    &ident,
                    Rule::UnknownFlag(other.to_string()),
                ))
            }
        }
    }
    if flags.skip_if_silent && flags.skip_if_not_silent {
        return Err(ValidationError::at(
            Section::Run,
            Some(row.line),
            &ident,
            Rule::ConflictingFlags("skipifsilent".into(), "skipifnotsilent".into()),
        ));
    }
    let description = row
        .get("description")
        .map(str::to_string)
        .unwrap_or_else(|| target.file_name().unwrap_or_default().to_string());

    Ok(RunEntry {
        target,
        description,
        args,
        working_dir,
        flags,
        line: row.line,
    })
}
