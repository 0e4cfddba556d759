//! Project file inspection
//!
//! Reads the target framework(s), SDK and package references out of an
//! MSBuild project file.

use crate::error::{DotpubError, DotpubResult};
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use semver::Version;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

const PROJECT_EXTENSIONS: &[&str] = &["csproj", "fsproj", "vbproj"];

/// A `PackageReference` item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageReference {
    pub name: String,
    pub version: Option<String>,
}

/// Metadata declared by a project file
#[derive(Debug, Clone)]
pub struct ProjectMetadata {
    /// Path to the project file
    pub project_file: PathBuf,
    /// Target framework monikers in declaration order
    pub target_frameworks: Vec<String>,
    /// MSBuild SDK from `<Project Sdk="...">`
    pub sdk: Option<String>,
    pub package_references: Vec<PackageReference>,
}

impl ProjectMetadata {
    /// Locate and parse the project file under `root/project_path`
    pub async fn discover(root: &Path, project_path: Option<&Path>) -> DotpubResult<Self> {
        let dir = match project_path {
            Some(rel) => root.join(rel),
            None => root.to_path_buf(),
        };

        let mut entries = tokio::fs::read_dir(&dir)
            .await
            .map_err(|e| DotpubError::manifest(&dir, e))?;

        let mut candidates = vec![];
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| DotpubError::manifest(&dir, e))?
        {
            let path = entry.path();
            let is_project = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|ext| PROJECT_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()));
            if is_project && path.is_file() {
                candidates.push(path);
            }
        }
        candidates.sort();

        let project_file = match candidates.len() {
            0 => {
                return Err(DotpubError::manifest(
                    &dir,
                    "no project file (.csproj, .fsproj, .vbproj) found",
                ))
            }
            1 => candidates.remove(0),
            n => {
                return Err(DotpubError::manifest(
                    &dir,
                    format!("found {} project files, expected exactly one", n),
                ))
            }
        };

        debug!("Using project file: {}", project_file.display());
        let content = tokio::fs::read_to_string(&project_file)
            .await
            .map_err(|e| DotpubError::manifest(&project_file, e))?;
        Self::parse(&project_file, &content)
    }

    /// Parse project file XML
    pub fn parse(project_file: &Path, content: &str) -> DotpubResult<Self> {
        let xml_error = |reason: String| DotpubError::manifest(project_file, reason);

        let mut metadata = Self {
            project_file: project_file.to_path_buf(),
            target_frameworks: vec![],
            sdk: None,
            package_references: vec![],
        };

        let mut reader = Reader::from_str(content);
        reader.trim_text(true);
        let mut stack: Vec<String> = vec![];

        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) => {
                    let name = element_name(&e);
                    metadata.visit_element(&name, &e).map_err(xml_error)?;
                    stack.push(name);
                }
                Ok(Event::Empty(e)) => {
                    let name = element_name(&e);
                    metadata.visit_element(&name, &e).map_err(xml_error)?;
                }
                Ok(Event::Text(t)) => {
                    let text = t.unescape().map_err(|e| xml_error(e.to_string()))?;
                    metadata.visit_text(&stack, text.trim());
                }
                Ok(Event::End(_)) => {
                    stack.pop();
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(xml_error(format!(
                        "invalid XML at byte {}: {}",
                        reader.buffer_position(),
                        e
                    )))
                }
                _ => {}
            }
        }

        Ok(metadata)
    }

    fn visit_element(&mut self, name: &str, e: &BytesStart<'_>) -> Result<(), String> {
        match name {
            "Project" => self.sdk = attribute(e, "Sdk")?,
            "PackageReference" => {
                if let Some(include) = attribute(e, "Include")? {
                    self.package_references.push(PackageReference {
                        name: include,
                        version: attribute(e, "Version")?,
                    });
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn visit_text(&mut self, stack: &[String], text: &str) {
        if text.is_empty() {
            return;
        }
        let current = stack.last().map(String::as_str);
        let parent = stack.len().checked_sub(2).map(|i| stack[i].as_str());

        match (parent, current) {
            (Some("PropertyGroup"), Some("TargetFramework")) => {
                self.target_frameworks.push(text.to_string());
            }
            (Some("PropertyGroup"), Some("TargetFrameworks")) => {
                self.target_frameworks.extend(
                    text.split(';')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(str::to_string),
                );
            }
            (Some("PackageReference"), Some("Version")) => {
                if let Some(package) = self.package_references.last_mut() {
                    package.version = Some(text.to_string());
                }
            }
            _ => {}
        }
    }

    /// First declared target framework, parsed
    pub fn target_framework(&self) -> DotpubResult<TargetFramework> {
        let moniker = self.target_frameworks.first().ok_or_else(|| {
            DotpubError::manifest(&self.project_file, "no TargetFramework declared")
        })?;
        moniker.parse()
    }
}

fn element_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

fn attribute(e: &BytesStart<'_>, key: &str) -> Result<Option<String>, String> {
    for attr in e.attributes() {
        let attr = attr.map_err(|e| e.to_string())?;
        if attr.key.as_ref() == key.as_bytes() {
            let value = attr.unescape_value().map_err(|e| e.to_string())?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

/// A .NET (Core) target framework moniker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetFramework {
    moniker: String,
    version: Version,
}

impl TargetFramework {
    /// Runtime version, with patch always 0
    pub fn version(&self) -> &Version {
        &self.version
    }

    pub fn moniker(&self) -> &str {
        &self.moniker
    }
}

impl std::str::FromStr for TargetFramework {
    type Err = DotpubError;

    /// Accepts `netcoreappX.Y` and `netX.Y[-platform]` (X >= 5).
    /// .NET Framework (`net48`) and `netstandard` are not publishable apps.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let moniker = s.trim().to_ascii_lowercase();
        let base = moniker.split('-').next().unwrap_or(&moniker);

        let (digits, min_major) = if let Some(rest) = base.strip_prefix("netcoreapp") {
            (rest, 1)
        } else if base.starts_with("netstandard") {
            return Err(DotpubError::unsupported(s, "netstandard targets are libraries"));
        } else if let Some(rest) = base.strip_prefix("net") {
            (rest, 5)
        } else {
            return Err(DotpubError::unsupported(s, "unrecognized target framework"));
        };

        let (major, minor) = digits
            .split_once('.')
            .and_then(|(major, minor)| {
                Some((major.parse::<u64>().ok()?, minor.parse::<u64>().ok()?))
            })
            .ok_or_else(|| {
                DotpubError::unsupported(s, ".NET Framework targets are not supported")
            })?;

        if major < min_major {
            return Err(DotpubError::unsupported(s, "unrecognized target framework version"));
        }

        Ok(Self {
            moniker,
            version: Version::new(major, minor, 0),
        })
    }
}

impl fmt::Display for TargetFramework {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.moniker)
    }
}
