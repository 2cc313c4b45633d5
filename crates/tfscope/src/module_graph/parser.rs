//! Module call extraction from Terraform configuration.
//!
//! `.tf` files are parsed with tree-sitter, `.tf.json` files with serde_json.
//! Only `module` blocks are inspected; everything else in the configuration
//! is ignored.

use super::classify::is_local;
use super::discovery::list_config_files;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tree_sitter::{Node, Parser};

/// Severity of a parser diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

/// A problem found while loading a module directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub summary: String,
    pub detail: String,
    pub file: Option<PathBuf>,
    /// 1-based line, when the format carries positions.
    pub line: Option<usize>,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.file, self.line) {
            (Some(file), Some(line)) => write!(f, "{}:{line}: ", file.display())?,
            (Some(file), None) => write!(f, "{}: ", file.display())?,
            _ => {}
        }
        write!(f, "{}; {}", self.summary, self.detail)
    }
}

/// A `module "<name>" { ... }` declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleCall {
    pub name: String,
    pub source: String,
    pub version: Option<String>,
    pub file: PathBuf,
    pub line: Option<usize>,
}

/// Module calls declared in one directory, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadedModule {
    pub calls: Vec<ModuleCall>,
    pub diagnostics: Vec<Diagnostic>,
}

impl LoadedModule {
    /// Check if any diagnostic has error severity.
    pub fn has_errors(&self) -> bool {
        self.errors().next().is_some()
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Warning)
    }

    /// All error diagnostics joined into one line.
    pub fn error_summary(&self) -> String {
        self.errors()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Extracts module calls from a configuration directory.
pub trait ConfigParser {
    /// Load every module call declared directly in `dir`.
    ///
    /// Failures are reported as error diagnostics rather than a `Result`
    /// so that one bad file does not hide problems in its siblings.
    fn load_module(&self, dir: &Path) -> LoadedModule;
}

/// Parser for native (`.tf`) and JSON (`.tf.json`) Terraform syntax.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerraformParser;

impl ConfigParser for TerraformParser {
    fn load_module(&self, dir: &Path) -> LoadedModule {
        let mut loader = ModuleLoader::default();

        let files = match list_config_files(dir) {
            Ok(files) => files,
            Err(e) => {
                loader.error(
                    None,
                    None,
                    "Failed to read module directory",
                    format!("Module directory {} does not exist or cannot be read: {e}", dir.display()),
                );
                return loader.finish();
            }
        };

        for file in files.iter().filter(|f| !is_ignored_file(f)) {
            let content = match std::fs::read_to_string(file) {
                Ok(c) => c,
                Err(e) => {
                    loader.error(Some(file), None, "Failed to read file", e.to_string());
                    continue;
                }
            };
            if file.to_string_lossy().ends_with(".json") {
                loader.load_json(file, &content);
            } else {
                loader.load_hcl(file, &content);
            }
        }

        loader.finish()
    }
}

/// Editor backups, hidden files and emacs lock files are skipped.
fn is_ignored_file(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return true;
    };
    name.starts_with('.') || name.ends_with('~') || (name.starts_with('#') && name.ends_with('#'))
}

#[derive(Default)]
struct ModuleLoader {
    module: LoadedModule,
    declared: HashMap<String, (PathBuf, Option<usize>)>,
}

impl ModuleLoader {
    fn finish(self) -> LoadedModule {
        self.module
    }

    fn error(&mut self, file: Option<&Path>, line: Option<usize>, summary: &str, detail: String) {
        self.diagnostic(Severity::Error, file, line, summary, detail);
    }

    fn diagnostic(
        &mut self,
        severity: Severity,
        file: Option<&Path>,
        line: Option<usize>,
        summary: &str,
        detail: String,
    ) {
        self.module.diagnostics.push(Diagnostic {
            severity,
            summary: summary.to_string(),
            detail,
            file: file.map(Path::to_path_buf),
            line,
        });
    }

    fn push_call(&mut self, call: ModuleCall) {
        if let Some((file, line)) = self.declared.get(&call.name) {
            let location = match line {
                Some(line) => format!("{}:{line}", file.display()),
                None => file.display().to_string(),
            };
            let detail = format!(
                "A module call named \"{}\" was already declared at {location}. Module calls must have unique names within a module.",
                call.name
            );
            let (file, line) = (call.file.clone(), call.line);
            self.error(Some(&file), line, "Duplicate module call", detail);
            return;
        }

        if call.version.is_some() && is_local(&call.source) {
            let detail = format!(
                "Module \"{}\" has a local source; its version constraint is ignored.",
                call.name
            );
            let (file, line) = (call.file.clone(), call.line);
            self.diagnostic(Severity::Warning, Some(&file), line, "Version on local module", detail);
        }

        self.declared
            .insert(call.name.clone(), (call.file.clone(), call.line));
        self.module.calls.push(call);
    }

    fn load_hcl(&mut self, path: &Path, content: &str) {
        let mut parser = Parser::new();
        let language: tree_sitter::Language = tree_sitter_hcl::LANGUAGE.into();
        if let Err(e) = parser.set_language(&language) {
            self.error(Some(path), None, "Failed to load HCL grammar", e.to_string());
            return;
        }

        let Some(tree) = parser.parse(content, None) else {
            self.error(Some(path), None, "Failed to parse file", "parser returned no tree".to_string());
            return;
        };

        let root = tree.root_node();
        if root.has_error() {
            let line = first_error_row(root).map(|row| row + 1);
            self.error(
                Some(path),
                line,
                "Invalid HCL syntax",
                "The file could not be parsed as Terraform configuration.".to_string(),
            );
            return;
        }

        let bytes = content.as_bytes();
        let mut cursor = root.walk();
        for body in root.named_children(&mut cursor).filter(|n| n.kind() == "body") {
            let mut body_cursor = body.walk();
            for block in body
                .named_children(&mut body_cursor)
                .filter(|n| n.kind() == "block")
            {
                self.load_module_block(path, bytes, block);
            }
        }
    }

    fn load_module_block(&mut self, path: &Path, bytes: &[u8], block: Node<'_>) {
        let children = named_children(block);
        let Some(block_type) = children.first() else {
            return;
        };
        if block_type.kind() != "identifier" || node_text(*block_type, bytes) != "module" {
            return;
        }

        let line = Some(block.start_position().row + 1);
        let labels: Vec<String> = children[1..]
            .iter()
            .take_while(|n| matches!(n.kind(), "string_lit" | "identifier"))
            .map(|n| label_text(*n, bytes))
            .collect();
        let [name] = labels.as_slice() else {
            self.error(
                Some(path),
                line,
                "Invalid module block",
                format!("A module block requires exactly one label, found {}.", labels.len()),
            );
            return;
        };

        let mut source = None;
        let mut version = None;
        if let Some(body) = children.iter().find(|n| n.kind() == "body") {
            for attribute in named_children(*body)
                .into_iter()
                .filter(|n| n.kind() == "attribute")
            {
                let parts = named_children(attribute);
                let Some(key) = parts.first() else { continue };
                let Some(value) = parts[1..].iter().find(|n| n.kind() != "comment") else {
                    continue;
                };
                let attr_line = Some(attribute.start_position().row + 1);
                let literal = parse_string_literal(node_text(*value, bytes));
                match node_text(*key, bytes) {
                    "source" => source = Some((literal, attr_line)),
                    "version" => version = Some((literal, attr_line)),
                    _ => {}
                }
            }
        }

        let source = match source {
            Some((Some(s), _)) => s,
            Some((None, attr_line)) => {
                self.error(
                    Some(path),
                    attr_line,
                    "Invalid module source",
                    format!("The source of module \"{name}\" must be a literal string."),
                );
                return;
            }
            None => {
                self.error(
                    Some(path),
                    line,
                    "Missing required argument",
                    format!("The argument \"source\" is required in module \"{name}\", but no definition was found."),
                );
                return;
            }
        };

        let version = match version {
            Some((Some(v), _)) => Some(v),
            Some((None, attr_line)) => {
                self.error(
                    Some(path),
                    attr_line,
                    "Invalid version constraint",
                    format!("The version of module \"{name}\" must be a literal string."),
                );
                return;
            }
            None => None,
        };

        self.push_call(ModuleCall {
            name: name.clone(),
            source,
            version: version.filter(|v| !v.is_empty()),
            file: path.to_path_buf(),
            line,
        });
    }

    fn load_json(&mut self, path: &Path, content: &str) {
        let value: Value = match serde_json::from_str(content) {
            Ok(v) => v,
            Err(e) => {
                self.error(Some(path), Some(e.line()), "Invalid JSON", e.to_string());
                return;
            }
        };
        let Some(root) = value.as_object() else {
            self.error(
                Some(path),
                None,
                "Invalid JSON configuration",
                "The root value must be an object.".to_string(),
            );
            return;
        };
        let Some(modules) = root.get("module") else {
            return;
        };

        for (name, body) in json_entries(modules) {
            let Some((name, body)) = name.zip(body) else {
                self.error(
                    Some(path),
                    None,
                    "Invalid module block",
                    "The \"module\" property must map module names to objects.".to_string(),
                );
                continue;
            };
            self.load_json_call(path, name, body);
        }
    }

    fn load_json_call(&mut self, path: &Path, name: &str, body: &Value) {
        let bodies: Vec<&Value> = match body {
            Value::Array(items) => items.iter().collect(),
            other => vec![other],
        };
        for body in bodies {
            let Some(body) = body.as_object() else {
                self.error(
                    Some(path),
                    None,
                    "Invalid module block",
                    format!("Module \"{name}\" must be described by an object."),
                );
                continue;
            };
            let source = match body.get("source") {
                Some(Value::String(s)) => s.clone(),
                Some(_) => {
                    self.error(
                        Some(path),
                        None,
                        "Invalid module source",
                        format!("The source of module \"{name}\" must be a string."),
                    );
                    continue;
                }
                None => {
                    self.error(
                        Some(path),
                        None,
                        "Missing required argument",
                        format!("The argument \"source\" is required in module \"{name}\", but no definition was found."),
                    );
                    continue;
                }
            };
            let version = match body.get("version") {
                Some(Value::String(v)) => Some(v.clone()),
                None | Some(Value::Null) => None,
                Some(_) => {
                    self.error(
                        Some(path),
                        None,
                        "Invalid version constraint",
                        format!("The version of module \"{name}\" must be a string."),
                    );
                    continue;
                }
            };
            self.push_call(ModuleCall {
                name: name.to_string(),
                source,
                version: version.filter(|v| !v.is_empty()),
                file: path.to_path_buf(),
                line: None,
            });
        }
    }
}

/// Flatten the `module` property of a JSON config into `(name, body)` pairs.
///
/// Accepts an object or an array of objects. Entries that do not fit either
/// shape come back as `(None, None)`.
fn json_entries(modules: &Value) -> Vec<(Option<&str>, Option<&Value>)> {
    match modules {
        Value::Object(map) => map.iter().map(|(k, v)| (Some(k.as_str()), Some(v))).collect(),
        Value::Array(items) => items
            .iter()
            .flat_map(|item| match item.as_object() {
                Some(map) => map
                    .iter()
                    .map(|(k, v)| (Some(k.as_str()), Some(v)))
                    .collect::<Vec<_>>(),
                None => vec![(None, None)],
            })
            .collect(),
        _ => vec![(None, None)],
    }
}

fn named_children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    let children: Vec<_> = node.named_children(&mut cursor).collect();
    children
}

fn node_text<'a>(node: Node<'_>, bytes: &'a [u8]) -> &'a str {
    node.utf8_text(bytes).unwrap_or("")
}

fn label_text(node: Node<'_>, bytes: &[u8]) -> String {
    let text = node_text(node, bytes);
    if node.kind() == "string_lit" {
        parse_string_literal(text).unwrap_or_else(|| text.trim_matches('"').to_string())
    } else {
        text.to_string()
    }
}

fn first_error_row(node: Node<'_>) -> Option<usize> {
    if node.is_error() || node.is_missing() {
        return Some(node.start_position().row);
    }
    let mut cursor = node.walk();
    let children: Vec<_> = node.children(&mut cursor).collect();
    children
        .into_iter()
        .filter(Node::has_error)
        .find_map(first_error_row)
}

/// Decode a quoted HCL string with no interpolation.
///
/// Returns `None` for anything that is not a plain literal: unquoted
/// expressions, `${...}` interpolation and `%{...}` directives.
fn parse_string_literal(text: &str) -> Option<String> {
    let inner = text.strip_prefix('"')?.strip_suffix('"')?;
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next()? {
                'n' => out.push('\n'),
                't' => out.push('\t'),
                'r' => out.push('\r'),
                '"' => out.push('"'),
                '\\' => out.push('\\'),
                other => {
                    out.push('\\');
                    out.push(other);
                }
            },
            '$' | '%' => {
                if chars.peek() == Some(&'{') {
                    return None;
                }
                // `$${` and `%%{` escape a literal `${` / `%{`
                if chars.peek() == Some(&c) {
                    chars.next();
                    if chars.peek() != Some(&'{') {
                        out.push(c);
                    }
                }
                out.push(c);
            }
            _ => out.push(c),
        }
    }

    Some(out)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn load(files: &[(&str, &str)]) -> LoadedModule {
        let dir = tempdir().unwrap();
        for (name, content) in files {
            fs::write(dir.path().join(name), content).unwrap();
        }
        TerraformParser.load_module(dir.path())
    }

    fn names(module: &LoadedModule) -> Vec<&str> {
        module.calls.iter().map(|c| c.name.as_str()).collect()
    }

    #[test]
    fn extracts_module_calls_with_versions() {
        let module = load(&[(
            "main.tf",
            r#"
module "vpc" {
  source = "../modules/vpc"
}

module "eks" {
  source  = "terraform-aws-modules/eks/aws"
  version = "~> 19.0"
}
"#,
        )]);

        assert!(!module.has_errors(), "{}", module.error_summary());
        assert_eq!(names(&module), vec!["vpc", "eks"]);
        assert_eq!(module.calls[0].source, "../modules/vpc");
        assert_eq!(module.calls[0].version, None);
        assert_eq!(module.calls[0].line, Some(2));
        assert_eq!(module.calls[1].source, "terraform-aws-modules/eks/aws");
        assert_eq!(module.calls[1].version.as_deref(), Some("~> 19.0"));
    }

    #[test]
    fn ignores_non_module_blocks() {
        let module = load(&[(
            "main.tf",
            r#"
resource "aws_vpc" "main" {
  cidr_block = "10.0.0.0/16"
}

variable "vpc_id" {}

locals {
  source = "./not-a-module"
}
"#,
        )]);

        assert!(!module.has_errors());
        assert!(module.calls.is_empty());
    }

    #[test]
    fn calls_follow_file_then_block_order() {
        let module = load(&[
            ("b.tf", "module \"second\" {\n  source = \"./b\"\n}\n"),
            ("a.tf", "module \"first\" {\n  source = \"./a\"\n}\n"),
            (
                "c.tf.json",
                r#"{"module": {"zeta": {"source": "./z"}, "alpha": {"source": "./y"}}}"#,
            ),
        ]);

        assert!(!module.has_errors(), "{}", module.error_summary());
        assert_eq!(names(&module), vec!["first", "second", "zeta", "alpha"]);
    }

    #[test]
    fn empty_file_has_no_calls() {
        let module = load(&[("variables.tf", "")]);
        assert!(module.diagnostics.is_empty());
        assert!(module.calls.is_empty());
    }

    #[test]
    fn syntax_error_is_reported() {
        let module = load(&[("main.tf", "module \"vpc\" {\n  source = \n")]);
        assert!(module.has_errors());
        let error = module.errors().next().unwrap();
        assert_eq!(error.summary, "Invalid HCL syntax");
        assert!(error.file.as_ref().unwrap().ends_with("main.tf"));
    }

    #[test]
    fn missing_source_is_an_error() {
        let module = load(&[("main.tf", "module \"vpc\" {\n  version = \"1.0\"\n}\n")]);
        assert!(module.has_errors());
        assert_eq!(module.errors().next().unwrap().summary, "Missing required argument");
        assert!(module.calls.is_empty());
    }

    #[test]
    fn interpolated_source_is_an_error() {
        let module = load(&[(
            "main.tf",
            "module \"vpc\" {\n  source = \"./modules/${var.name}\"\n}\n",
        )]);
        assert!(module.has_errors());
        assert_eq!(module.errors().next().unwrap().summary, "Invalid module source");
    }

    #[test]
    fn duplicate_module_names_are_an_error() {
        let module = load(&[
            ("a.tf", "module \"vpc\" {\n  source = \"./a\"\n}\n"),
            ("b.tf", "module \"vpc\" {\n  source = \"./b\"\n}\n"),
        ]);
        assert!(module.has_errors());
        let error = module.errors().next().unwrap();
        assert_eq!(error.summary, "Duplicate module call");
        assert!(error.detail.contains("a.tf:1"));
        assert_eq!(names(&module), vec!["vpc"]);
    }

    #[test]
    fn module_block_without_label_is_an_error() {
        let module = load(&[("main.tf", "module {\n  source = \"./a\"\n}\n")]);
        assert!(module.has_errors());
        assert_eq!(module.errors().next().unwrap().summary, "Invalid module block");
    }

    #[test]
    fn version_on_local_source_is_a_warning() {
        let module = load(&[(
            "main.tf",
            "module \"vpc\" {\n  source  = \"./vpc\"\n  version = \"1.0.0\"\n}\n",
        )]);
        assert!(!module.has_errors());
        assert_eq!(module.warnings().count(), 1);
        assert_eq!(module.calls.len(), 1);
    }

    #[test]
    fn empty_version_is_treated_as_absent() {
        let module = load(&[(
            "main.tf",
            "module \"eks\" {\n  source  = \"terraform-aws-modules/eks/aws\"\n  version = \"\"\n}\n",
        )]);
        assert_eq!(module.calls[0].version, None);
    }

    #[test]
    fn json_module_calls_are_extracted() {
        let module = load(&[(
            "main.tf.json",
            r#"{
  "module": {
    "network": {"source": "../network"},
    "eks": {"source": "terraform-aws-modules/eks/aws", "version": "19.0.0"}
  }
}"#,
        )]);

        assert!(!module.has_errors(), "{}", module.error_summary());
        assert_eq!(names(&module), vec!["network", "eks"]);
        assert_eq!(module.calls[1].version.as_deref(), Some("19.0.0"));
        assert_eq!(module.calls[1].line, None);
    }

    #[test]
    fn json_module_array_form_is_accepted() {
        let module = load(&[(
            "main.tf.json",
            r#"{"module": [{"a": {"source": "./a"}}, {"b": [{"source": "./b"}]}]}"#,
        )]);
        assert!(!module.has_errors(), "{}", module.error_summary());
        assert_eq!(names(&module), vec!["a", "b"]);
    }

    #[test]
    fn invalid_json_is_an_error() {
        let module = load(&[("main.tf.json", "{\"module\": ")]);
        assert!(module.has_errors());
        assert_eq!(module.errors().next().unwrap().summary, "Invalid JSON");
    }

    #[test]
    fn json_source_must_be_a_string() {
        let module = load(&[("main.tf.json", r#"{"module": {"a": {"source": 3}}}"#)]);
        assert!(module.has_errors());
        assert_eq!(module.errors().next().unwrap().summary, "Invalid module source");
    }

    #[test]
    fn editor_and_hidden_files_are_skipped() {
        let module = load(&[
            (".hidden.tf", "this is not hcl {"),
            ("main.tf~", "module \"x\" {}"),
            ("#main.tf#", "module \"x\" {}"),
            ("main.tf", "module \"ok\" {\n  source = \"./ok\"\n}\n"),
        ]);
        assert!(!module.has_errors(), "{}", module.error_summary());
        assert_eq!(names(&module), vec!["ok"]);
    }

    #[test]
    fn missing_directory_is_an_error() {
        let dir = tempdir().unwrap();
        let module = TerraformParser.load_module(&dir.path().join("missing"));
        assert!(module.has_errors());
        assert_eq!(
            module.errors().next().unwrap().summary,
            "Failed to read module directory"
        );
    }

    #[test]
    fn parse_string_literal_handles_escapes() {
        assert_eq!(parse_string_literal(r#""./a""#).as_deref(), Some("./a"));
        assert_eq!(parse_string_literal(r#""a\"b""#).as_deref(), Some("a\"b"));
        assert_eq!(parse_string_literal(r#""$${x}""#).as_deref(), Some("${x}"));
        assert_eq!(parse_string_literal(r#""$$x""#).as_deref(), Some("$$x"));
        assert_eq!(parse_string_literal(r#""${x}""#), None);
        assert_eq!(parse_string_literal(r#""%{ if x }""#), None);
        assert_eq!(parse_string_literal("var.source"), None);
    }

    #[test]
    fn diagnostic_display_includes_location() {
        let diag = Diagnostic {
            severity: Severity::Error,
            summary: "Invalid HCL syntax".to_string(),
            detail: "bad".to_string(),
            file: Some(PathBuf::from("/m/main.tf")),
            line: Some(3),
        };
        assert_eq!(diag.to_string(), "/m/main.tf:3: Invalid HCL syntax; bad");
    }
}
