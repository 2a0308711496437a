//! Output layout: where generated code lands and how it is framed

use crate::error::RunError;
use crate::fingerprint::fingerprint;
use flex_config::OutputLayout;
use flex_plugin_api::{CapabilityTag, GeneratedCode, SourceLocation};
use std::path::{Component, Path, PathBuf};

/// One block of strategy output together with its origin
#[derive(Debug, Clone)]
pub struct Section {
    pub plugin_id: String,
    pub plugin_version: String,
    pub capability: CapabilityTag,
    /// Qualified name of the originating declaration
    pub declaration: String,
    pub location: SourceLocation,
    pub code: GeneratedCode,
}

impl Section {
    /// Human description used in collision reports
    pub fn origin(&self) -> String {
        format!(
            "{} [{}] {}",
            self.plugin_id, self.capability, self.declaration
        )
    }

    /// Deterministic first line of every generated section
    pub fn header(&self) -> String {
        format!(
            "// Generated by flextool: {} {} [{}] {}. Do not edit.",
            self.plugin_id, self.plugin_version, self.capability, self.declaration
        )
    }

    fn render(&self) -> String {
        let mut text = self.header();
        text.push('\n');
        text.push_str(&self.code.contents);
        if !text.ends_with('\n') {
            text.push('\n');
        }
        text
    }
}

/// Generated text bound to one output file.
///
/// Created by the engine, consumed exactly once by the writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFragment {
    /// Source file the fragment was generated from
    pub input: PathBuf,
    /// Output path relative to the output directory
    pub output: PathBuf,
    pub contents: String,
    pub fingerprint: String,
    /// Who produced the fragment (first section for per-file outputs)
    pub origin: String,
}

impl GeneratedFragment {
    fn new(input: &Path, output: PathBuf, contents: String, origin: String) -> Self {
        Self {
            input: input.to_path_buf(),
            fingerprint: fingerprint(contents.as_bytes()),
            output,
            contents,
            origin,
        }
    }
}

/// Maps sections to output paths
#[derive(Debug, Clone)]
pub struct Layout {
    mode: OutputLayout,
    in_dir: Option<PathBuf>,
    default_extension: String,
}

impl Layout {
    pub fn new(mode: OutputLayout, in_dir: Option<PathBuf>, default_extension: impl Into<String>) -> Self {
        Self {
            mode,
            in_dir,
            default_extension: default_extension.into().trim_start_matches('.').to_string(),
        }
    }

    pub fn mode(&self) -> OutputLayout {
        self.mode
    }

    /// Input path relative to the input directory, or its file name when it
    /// lies elsewhere
    pub fn source_rel_path(&self, input: &Path) -> PathBuf {
        if let Some(rel) = self
            .in_dir
            .as_deref()
            .and_then(|dir| input.strip_prefix(dir).ok())
            .filter(|rel| !rel.as_os_str().is_empty())
        {
            return rel.to_path_buf();
        }
        input
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_else(|| input.to_path_buf())
    }

    /// Output path of a section, relative to the output directory
    pub fn target(&self, input: &Path, section: &Section) -> Result<PathBuf, String> {
        if let Some(name) = &section.code.file_name {
            return explicit_target(name);
        }

        let rel = self.source_rel_path(input);
        let file_name = rel
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let parent = rel.parent().map(Path::to_path_buf).unwrap_or_default();
        let extension = section
            .code
            .extension
            .as_deref()
            .filter(|ext| !ext.is_empty())
            .unwrap_or(&self.default_extension);

        Ok(match self.mode {
            OutputLayout::PerFile => {
                parent.join(format!("{}.{}.{}", file_name, section.capability, extension))
            }
            OutputLayout::PerDeclaration => parent.join(format!("{}.d", file_name)).join(format!(
                "{}.{}.{}",
                file_component(&section.declaration),
                section.capability,
                extension
            )),
        })
    }

    /// Group the sections of one file into fragments.
    ///
    /// Layout-derived targets concatenate their sections in scanner order;
    /// every explicitly named section is a fragment of its own. Sections with
    /// an unusable explicit file name are returned as recoverable errors.
    pub fn assemble(&self, input: &Path, sections: Vec<Section>) -> (Vec<GeneratedFragment>, Vec<RunError>) {
        struct Pending {
            output: PathBuf,
            text: String,
            origin: String,
            explicit: bool,
        }

        let mut pending: Vec<Pending> = Vec::new();
        let mut errors = Vec::new();

        for section in sections {
            let output = match self.target(input, &section) {
                Ok(output) => output,
                Err(message) => {
                    errors.push(RunError::GenerationError {
                        plugin: section.plugin_id.clone(),
                        capability: section.capability.clone(),
                        declaration: section.declaration.clone(),
                        location: section.location.clone(),
                        message,
                    });
                    continue;
                }
            };
            let explicit = section.code.file_name.is_some();

            if !explicit {
                if let Some(existing) = pending
                    .iter_mut()
                    .find(|p| !p.explicit && p.output == output)
                {
                    existing.text.push('\n');
                    existing.text.push_str(&section.render());
                    continue;
                }
            }

            pending.push(Pending {
                output,
                text: section.render(),
                origin: section.origin(),
                explicit,
            });
        }

        let fragments = pending
            .into_iter()
            .map(|p| GeneratedFragment::new(input, p.output, p.text, p.origin))
            .collect();
        (fragments, errors)
    }
}

fn explicit_target(name: &str) -> Result<PathBuf, String> {
    let path = Path::new(name);
    let mut normal = 0;
    for component in path.components() {
        match component {
            Component::Normal(_) => normal += 1,
            Component::CurDir => {}
            _ => {
                return Err(format!(
                    "output file name '{}' must be relative and stay inside the output directory",
                    name
                ))
            }
        }
    }
    if normal == 0 {
        return Err(format!("output file name '{}' is empty", name));
    }
    Ok(path.components().filter(|c| *c != Component::CurDir).collect())
}

/// `ns::Outer::Name` -> `ns.Outer.Name`, other unsafe characters -> `_`
fn file_component(qualified_name: &str) -> String {
    qualified_name
        .replace("::", ".")
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-' | '~') {
                c
            } else {
                '_'
            }
        })
        .collect()
}
