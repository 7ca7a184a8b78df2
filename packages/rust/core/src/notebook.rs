//! Notebook kernel normalization.
//!
//! Every notebook in the examples tree is rewritten so its
//! `metadata.kernelspec` points at the same kernel. The rest of the
//! document is preserved, including key order. Output uses one-space
//! indentation and escapes non-ASCII characters, which keeps rewritten
//! notebooks byte-stable with the files already checked in.

use std::io;
use std::path::Path;

use serde::Serialize;
use serde_json::Value;
use serde_json::ser::{Formatter, PrettyFormatter};
use tracing::{debug, info, instrument};

use examplegen_shared::{ExampleGenError, KernelSpec, Result};

/// Indentation used when writing notebooks back.
const NOTEBOOK_INDENT: &[u8] = b" ";

/// Normalize every notebook at the given root-relative paths.
///
/// Returns the number of files whose content changed. Any unreadable or
/// malformed notebook aborts the whole run.
#[instrument(skip_all, fields(notebooks = notebooks.len()))]
pub fn normalize_notebooks(
    root: &Path,
    notebooks: &[String],
    kernelspec: &KernelSpec,
) -> Result<usize> {
    let mut changed = 0;
    for rel in notebooks {
        if normalize_notebook(&root.join(rel), kernelspec)? {
            changed += 1;
        }
    }
    info!(total = notebooks.len(), changed, "notebooks normalized");
    Ok(changed)
}

/// Rewrite one notebook in place. Returns whether the file changed.
pub fn normalize_notebook(path: &Path, kernelspec: &KernelSpec) -> Result<bool> {
    let original = std::fs::read_to_string(path).map_err(|e| ExampleGenError::io(path, e))?;
    let updated = set_kernelspec(path, &original, kernelspec)?;

    if updated == original {
        debug!(path = %path.display(), "notebook already normalized");
        return Ok(false);
    }

    std::fs::write(path, &updated).map_err(|e| ExampleGenError::io(path, e))?;
    debug!(path = %path.display(), "notebook rewritten");
    Ok(true)
}

/// Replace `metadata.kernelspec` in a notebook document and serialize it.
/// `path` only labels errors.
pub fn set_kernelspec(path: &Path, document: &str, kernelspec: &KernelSpec) -> Result<String> {
    let mut data: Value = serde_json::from_str(document)
        .map_err(|e| ExampleGenError::notebook(path, format!("invalid JSON: {e}")))?;

    let metadata = data
        .get_mut("metadata")
        .and_then(Value::as_object_mut)
        .ok_or_else(|| ExampleGenError::notebook(path, "missing metadata section"))?;

    let spec = serde_json::to_value(kernelspec)
        .map_err(|e| ExampleGenError::notebook(path, e.to_string()))?;
    metadata.insert("kernelspec".to_string(), spec);

    to_notebook_string(&data).map_err(|e| ExampleGenError::notebook(path, e.to_string()))
}

/// Serialize with one-space indentation and ASCII-only output.
fn to_notebook_string(value: &Value) -> io::Result<String> {
    let mut buf = Vec::new();
    let formatter = AsciiFormatter(PrettyFormatter::with_indent(NOTEBOOK_INDENT));
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut ser).map_err(io::Error::other)?;
    String::from_utf8(buf).map_err(io::Error::other)
}

// ---------------------------------------------------------------------------
// Formatter
// ---------------------------------------------------------------------------

/// Pretty formatter that escapes every non-ASCII character as `\uXXXX`
/// (surrogate pairs above the BMP).
struct AsciiFormatter<'a>(PrettyFormatter<'a>);

impl Formatter for AsciiFormatter<'_> {
    fn write_string_fragment<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        fragment: &str,
    ) -> io::Result<()> {
        let mut start = 0;
        for (idx, ch) in fragment.char_indices() {
            if ch.is_ascii() {
                continue;
            }
            writer.write_all(&fragment.as_bytes()[start..idx])?;
            let mut units = [0u16; 2];
            for unit in ch.encode_utf16(&mut units) {
                write!(writer, "\\u{unit:04x}")?;
            }
            start = idx + ch.len_utf8();
        }
        writer.write_all(&fragment.as_bytes()[start..])
    }

    fn begin_array<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.0.begin_array(writer)
    }

    fn end_array<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.0.end_array(writer)
    }

    fn begin_array_value<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()> {
        self.0.begin_array_value(writer, first)
    }

    fn end_array_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.0.end_array_value(writer)
    }

    fn begin_object<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.0.begin_object(writer)
    }

    fn end_object<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.0.end_object(writer)
    }

    fn begin_object_key<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()> {
        self.0.begin_object_key(writer, first)
    }

    fn begin_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.0.begin_object_value(writer)
    }

    fn end_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.0.end_object_value(writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "examplegen-notebook-test-{}",
            uuid::Uuid::now_v7()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    const NOTEBOOK: &str = r##"{"cells": [{"cell_type": "markdown", "metadata": {}, "source": ["# Café"]}], "metadata": {"language_info": {"name": "python"}, "kernelspec": {"name": "old"}}, "nbformat": 4, "nbformat_minor": 2}"##;

    #[test]
    fn kernelspec_is_replaced_and_order_preserved() {
        let out = set_kernelspec(Path::new("a.ipynb"), NOTEBOOK, &KernelSpec::default())
            .unwrap();

        let cells = out.find("\"cells\"").unwrap();
        let metadata = out.rfind("\"metadata\"").unwrap();
        let nbformat = out.find("\"nbformat\"").unwrap();
        assert!(cells < metadata && metadata < nbformat);

        let language_info = out.find("\"language_info\"").unwrap();
        let kernelspec = out.find("\"kernelspec\"").unwrap();
        assert!(language_info < kernelspec, "existing key keeps its position");

        let parsed: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed["metadata"]["kernelspec"]["name"], "python38-azureml");
        assert_eq!(
            parsed["metadata"]["kernelspec"]["display_name"],
            "Python 3.8 - AzureML"
        );
    }

    #[test]
    fn output_uses_single_space_indent() {
        let out = set_kernelspec(Path::new("a.ipynb"), r#"{"metadata": {}}"#, &KernelSpec::default())
            .unwrap();
        let expected = "{\n \"metadata\": {\n  \"kernelspec\": {\n   \"display_name\": \"Python 3.8 - AzureML\",\n   \"language\": \"python\",\n   \"name\": \"python38-azureml\"\n  }\n }\n}";
        assert_eq!(out, expected);
    }

    #[test]
    fn non_ascii_is_escaped() {
        let out = set_kernelspec(Path::new("a.ipynb"), NOTEBOOK, &KernelSpec::default())
            .unwrap();
        assert!(out.contains(r"# Caf\u00e9"));
        assert!(out.is_ascii());

        let emoji = set_kernelspec(
            Path::new("a.ipynb"),
            "{\"metadata\": {}, \"x\": \"\u{1F600}\"}",
            &KernelSpec::default(),
        )
        .unwrap();
        assert!(emoji.contains(r"\ud83d\ude00"));
    }

    #[test]
    fn missing_metadata_is_an_error() {
        let err = set_kernelspec(Path::new("a.ipynb"), r#"{"cells": []}"#, &KernelSpec::default())
            .unwrap_err();
        assert!(matches!(err, ExampleGenError::Notebook { .. }));
        assert!(err.to_string().contains("missing metadata section"));
    }

    #[test]
    fn malformed_notebook_aborts() {
        let tmp = temp_dir();
        std::fs::write(tmp.join("good.ipynb"), r#"{"metadata": {}}"#).unwrap();
        std::fs::write(tmp.join("bad.ipynb"), "{ not json").unwrap();

        let notebooks = vec!["bad.ipynb".to_string(), "good.ipynb".to_string()];
        let err = normalize_notebooks(&tmp, &notebooks, &KernelSpec::default()).unwrap_err();
        assert!(matches!(err, ExampleGenError::Notebook { .. }));
        assert!(err.to_string().contains("bad.ipynb"));

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn second_pass_changes_nothing() {
        let tmp = temp_dir();
        std::fs::write(tmp.join("a.ipynb"), NOTEBOOK).unwrap();
        let notebooks = vec!["a.ipynb".to_string()];

        assert_eq!(normalize_notebooks(&tmp, &notebooks, &KernelSpec::default()).unwrap(), 1);
        let first = std::fs::read_to_string(tmp.join("a.ipynb")).unwrap();

        assert_eq!(normalize_notebooks(&tmp, &notebooks, &KernelSpec::default()).unwrap(), 0);
        let second = std::fs::read_to_string(tmp.join("a.ipynb")).unwrap();
        assert_eq!(first, second);

        let _ = std::fs::remove_dir_all(&tmp);
    }
}
