//! Line-level reader for the manifest text format.
//!
//! ```text
//! [Setup]
//! AppName=System Monitor
//! [Files]
//! Source: "dist\SystemMonitor.exe"; DestDir: "{app}"; Flags: ignoreversion
//! ```
//!
//! Section names and keys are ASCII case-insensitive and returned lowercased.
//! Sections the engine does not consume are skipped wholesale.

/// Sections with rows the engine interprets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Section {
    Setup,
    Files,
    Icons,
    Run,
}

impl Section {
    fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "setup" => Some(Section::Setup),
            "files" => Some(Section::Files),
            "icons" => Some(Section::Icons),
            "run" => Some(Section::Run),
            _ => None,
        }
    }

    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Section::Setup => "Setup",
            Section::Files => "Files",
            Section::Icons => "Icons",
            Section::Run => "Run",
        }
    }
}

/// `Key: value; Key: value` row with its 1-based line number.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct RawRow {
    pub line: usize,
    pub params: Vec<(String, String)>,
}

impl RawRow {
    pub(crate) fn get(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Clone, Debug, Default)]
pub(crate) struct RawManifest {
    pub setup: Vec<(usize, String, String)>,
    pub files: Vec<RawRow>,
    pub icons: Vec<RawRow>,
    pub run: Vec<RawRow>,
}

/// Syntax problem with its section (if known) and line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct SyntaxError {
    pub section: Option<Section>,
    pub line: usize,
    pub msg: String,
}

pub(crate) fn read(text: &str) -> Result<RawManifest, SyntaxError> {
    let mut out = RawManifest::default();
    // Outer Option: inside any section yet; inner: a section we consume.
    let mut current: Option<Option<Section>> = None;
    for (idx, raw_line) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw_line.trim().trim_start_matches('\u{feff}');
        if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
            continue;
        }
        if line.starts_with('[') {
            let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) else {
                return Err(SyntaxError {
                    section: None,
                    line: line_no,
                    msg: format!("malformed section header `{line}`"),
                });
            };
            let sec = Section::from_name(name.trim());
            if sec.is_none() {
                log::debug!("manifest: skipping section [{}] at line {line_no}", name.trim());
            }
            current = Some(sec);
            continue;
        }
        match current {
            None => {
                return Err(SyntaxError {
                    section: None,
                    line: line_no,
                    msg: "content before the first section header".to_string(),
                })
            }
            Some(None) => {}
            Some(Some(Section::Setup)) => {
                let Some((k, v)) = line.split_once('=') else {
                    return Err(SyntaxError {
                        section: Some(Section::Setup),
                        line: line_no,
                        msg: format!("expected `Key=Value`, found `{line}`"),
                    });
                };
                out.setup
                    .push((line_no, k.trim().to_ascii_lowercase(), unquote(v.trim())));
            }
            Some(Some(sec)) => {
                let row = read_row(line, line_no).map_err(|msg| SyntaxError {
                    section: Some(sec),
                    line: line_no,
                    msg,
                })?;
                match sec {
                    Section::Files => out.files.push(row),
                    Section::Icons => out.icons.push(row),
                    Section::Run => out.run.push(row),
                    Section::Setup => unreachable!("setup handled above"),
                }
            }
        }
    }
    Ok(out)
}

/// Strip one pair of surrounding double quotes, collapsing `""` escapes.
fn unquote(v: &str) -> String {
    match v.strip_prefix('"').and_then(|s| s.strip_suffix('"')) {
        Some(inner) if v.len() >= 2 => inner.replace("\"\"", "\""),
        _ => v.to_string(),
    }
}

fn read_row(line: &str, line_no: usize) -> Result<RawRow, String> {
    let mut params = Vec::new();
    for part in split_params(line)? {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let Some((k, v)) = part.split_once(':') else {
            return Err(format!("expected `Key: value`, found `{part}`"));
        };
        let key = k.trim().to_ascii_lowercase();
        if key.is_empty() {
            return Err(format!("empty parameter name in `{part}`"));
        }
        if params.iter().any(|(existing, _)| *existing == key) {
            return Err(format!("parameter `{}` given twice", k.trim()));
        }
        params.push((key, unquote(v.trim())));
    }
    Ok(RawRow {
        line: line_no,
        params,
    })
}

/// Split on `;` outside double quotes.
fn split_params(line: &str) -> Result<Vec<String>, String> {
    let mut parts = Vec::new();
    let mut cur = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                cur.push('"');
                cur.push('"');
                chars.next();
            }
            '"' => {
                in_quotes = !in_quotes;
                cur.push(c);
            }
            ';' if !in_quotes => parts.push(std::mem::take(&mut cur)),
            _ => cur.push(c),
        }
    }
    if in_quotes {
        return Err("unterminated quoted value".to_string());
    }
    parts.push(cur);
    Ok(parts)
}
