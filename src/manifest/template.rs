//! Directory templates such as `{app}\bin` or `{autopf}\System Monitor`.
//!
//! A template is an optional leading placeholder (the anchor) followed by plain
//! relative components. Both `\` and `/` separate components. Parent (`..`) and
//! absolute components are rejected, so a resolved template can never escape
//! its anchor directory.
use std::fmt;
use std::path::{Path, PathBuf};

use crate::constants::{ENTRY_PLACEHOLDERS, ROOT_PLACEHOLDERS};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Anchor {
    /// `{app}`: the resolved install directory.
    App,
    /// `{group}`: the start-menu group directory.
    Group,
    /// `{userdesktop}`, `{commondesktop}`, `{autodesktop}`, `{desktop}`.
    Desktop,
    /// `{pf}`, `{autopf}`, `{commonpf}`: the environment's install root.
    ProgramFiles,
}

impl Anchor {
    fn from_placeholder(name: &str) -> Option<Self> {
        match name {
            "app" => Some(Anchor::App),
            "group" => Some(Anchor::Group),
            "userdesktop" | "commondesktop" | "autodesktop" | "desktop" => Some(Anchor::Desktop),
            "pf" | "autopf" | "commonpf" => Some(Anchor::ProgramFiles),
            _ => None,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Anchor::App => "{app}",
            Anchor::Group => "{group}",
            Anchor::Desktop => "{desktop}",
            Anchor::ProgramFiles => "{pf}",
        }
    }
}

/// Where a template may appear; decides which placeholders are legal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TemplateUse {
    /// `DefaultDirName`: only program-files placeholders, anchor optional.
    InstallDir,
    /// `Files`/`Icons`/`Run` entries: entry placeholders, anchor required.
    Entry,
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    #[error("unknown placeholder {{{0}}}")]
    UnknownPlaceholder(String),
    #[error("placeholder {{{0}}} not allowed here")]
    MisplacedPlaceholder(String),
    #[error("parent directory components are not allowed")]
    ParentDir,
    #[error("absolute paths are not allowed; start with a placeholder")]
    Absolute,
    #[error("path must start with a placeholder such as {{app}}")]
    MissingAnchor,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Template {
    anchor: Option<Anchor>,
    rel: Vec<String>,
}

/// Concrete directories the anchors resolve to. Built once per plan.
#[derive(Clone, Debug)]
pub struct Anchors {
    pub install_root: PathBuf,
    pub app: PathBuf,
    pub group: PathBuf,
    pub desktop: PathBuf,
}

impl Template {
    pub fn parse(raw: &str, usage: TemplateUse) -> Result<Self, TemplateError> {
        let trimmed = raw.trim();
        if trimmed.starts_with('\\') || trimmed.starts_with('/') {
            return Err(TemplateError::Absolute);
        }
        let mut anchor = None;
        let mut rel = Vec::new();
        for (idx, seg) in trimmed.split(['\\', '/']).enumerate() {
            let seg = seg.trim();
            if seg.is_empty() || seg == "." {
                continue;
            }
            if seg == ".." {
                return Err(TemplateError::ParentDir);
            }
            if let Some(name) = placeholder_name(seg) {
                let lower = name.to_ascii_lowercase();
                let allowed = match usage {
                    TemplateUse::InstallDir => ROOT_PLACEHOLDERS.contains(&lower.as_str()),
                    TemplateUse::Entry => ENTRY_PLACEHOLDERS.contains(&lower.as_str()),
                };
                let known = Anchor::from_placeholder(&lower);
                match known {
                    None => return Err(TemplateError::UnknownPlaceholder(name.to_string())),
                    Some(_) if !allowed || idx != 0 => {
                        return Err(TemplateError::MisplacedPlaceholder(name.to_string()))
                    }
                    Some(a) => anchor = Some(a),
                }
                continue;
            }
            if seg.contains('{') || seg.contains('}') {
                let inner = seg.trim_matches(|c| c != '{' && c != '}');
                return Err(TemplateError::UnknownPlaceholder(
                    inner.trim_matches(['{', '}']).to_string(),
                ));
            }
            if idx == 0 && seg.len() == 2 && seg.ends_with(':') {
                return Err(TemplateError::Absolute);
            }
            rel.push(seg.to_string());
        }
        if anchor.is_none() && usage == TemplateUse::Entry {
            return Err(TemplateError::MissingAnchor);
        }
        Ok(Self { anchor, rel })
    }

    #[must_use]
    pub fn anchor(&self) -> Option<Anchor> {
        self.anchor
    }

    /// Relative components below the anchor.
    #[must_use]
    pub fn components(&self) -> &[String] {
        &self.rel
    }

    /// Append a single plain component.
    #[must_use]
    pub fn join(&self, name: &str) -> Self {
        let mut rel = self.rel.clone();
        rel.push(name.to_string());
        Self {
            anchor: self.anchor,
            rel,
        }
    }

    /// Last component, if any.
    #[must_use]
    pub fn file_name(&self) -> Option<&str> {
        self.rel.last().map(String::as_str)
    }

    /// Template without its last component.
    #[must_use]
    pub fn parent(&self) -> Self {
        let mut rel = self.rel.clone();
        rel.pop();
        Self {
            anchor: self.anchor,
            rel,
        }
    }

    /// Case-insensitive identity used to match references across sections.
    #[must_use]
    pub fn key(&self) -> String {
        let mut s = self.anchor.map(Anchor::as_str).unwrap_or("").to_string();
        for c in &self.rel {
            s.push('/');
            s.push_str(&c.to_ascii_lowercase());
        }
        s
    }

    /// Join the components onto the directory the anchor resolves to.
    #[must_use]
    pub fn resolve(&self, anchors: &Anchors) -> PathBuf {
        let base: &Path = match self.anchor {
            Some(Anchor::App) => &anchors.app,
            Some(Anchor::Group) => &anchors.group,
            Some(Anchor::Desktop) => &anchors.desktop,
            Some(Anchor::ProgramFiles) | None => &anchors.install_root,
        };
        let mut out = base.to_path_buf();
        for c in &self.rel {
            out.push(c);
        }
        out
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<&str> = Vec::new();
        if let Some(a) = self.anchor {
            parts.push(a.as_str());
        }
        parts.extend(self.rel.iter().map(String::as_str));
        f.write_str(&parts.join("\\"))
    }
}

fn placeholder_name(seg: &str) -> Option<&str> {
    let inner = seg.strip_prefix('{')?.strip_suffix('}')?;
    if inner.is_empty() || inner.contains(['{', '}']) {
        return None;
    }
    Some(inner)
}
