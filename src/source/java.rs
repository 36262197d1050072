use std::collections::HashSet;
use std::path::Path;

use miette::{IntoDiagnostic, Result};
use tracing::debug;
use tree_sitter::{Node, Parser as TsParser};

/// One import statement, split into the three shapes the reference rules
/// care about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportStatement {
    /// Dotted path as written, without any trailing `.*`.
    pub path: String,
    pub is_static: bool,
    pub is_wildcard: bool,
}

/// Facts extracted from one parsed compilation unit. The unit itself is
/// discarded after extraction; reference resolution only needs these.
#[derive(Debug, Default)]
pub struct SourceUnit {
    pub package: Option<String>,
    pub imports: Vec<ImportStatement>,
    /// Simple names of the top-level types declared in this unit.
    pub declared_types: Vec<String>,
    /// Dotted scope chains occurring in the expression forest: the scope of
    /// every field access plus the type of every class literal.
    pub access_chains: HashSet<String>,
}

impl SourceUnit {
    /// Qualified name of the unit's first declared type, if any.
    pub fn primary_type(&self) -> Option<String> {
        let simple = self.declared_types.first()?;
        Some(match &self.package {
            Some(package) => format!("{}.{}", package, simple),
            None => simple.clone(),
        })
    }

    /// Whether `qualified` names a type declared in this unit (or a member
    /// of one).
    pub fn declares(&self, qualified: &str) -> bool {
        self.declared_types.iter().any(|simple| {
            let fqn = match &self.package {
                Some(package) => format!("{}.{}", package, simple),
                None => simple.clone(),
            };
            qualified == fqn || qualified.starts_with(&format!("{}.", fqn))
        })
    }
}

/// Java source reader using tree-sitter
pub struct JavaUnitReader;

impl JavaUnitReader {
    pub fn new() -> Self {
        Self
    }

    /// Parse one `.java` file into the facts needed for reference
    /// resolution. Parse failure is an error for this unit only.
    pub fn parse(&self, path: &Path, contents: &str) -> Result<SourceUnit> {
        let mut parser = TsParser::new();
        parser
            .set_language(&tree_sitter_java::language())
            .into_diagnostic()?;

        let tree = parser
            .parse(contents, None)
            .ok_or_else(|| miette::miette!("Failed to parse Java file: {}", path.display()))?;

        let root = tree.root_node();
        let mut unit = SourceUnit::default();

        unit.package = extract_package(root, contents);
        unit.imports = extract_imports(root, contents);
        unit.declared_types = extract_declared_types(root, contents);
        collect_access_chains(root, contents, &mut unit.access_chains);

        debug!(
            "Parsed {}: package {:?}, {} imports, {} access chains",
            path.display(),
            unit.package,
            unit.imports.len(),
            unit.access_chains.len()
        );

        Ok(unit)
    }
}

impl Default for JavaUnitReader {
    fn default() -> Self {
        Self::new()
    }
}

fn node_text<'a>(node: Node<'a>, source: &'a str) -> &'a str {
    &source[node.start_byte()..node.end_byte()]
}

fn extract_package(root: Node, source: &str) -> Option<String> {
    let mut cursor = root.walk();
    for child in root.children(&mut cursor) {
        if child.kind() == "package_declaration" {
            let mut pkg_cursor = child.walk();
            for pkg_child in child.children(&mut pkg_cursor) {
                if pkg_child.kind() == "scoped_identifier" || pkg_child.kind() == "identifier" {
                    return Some(node_text(pkg_child, source).to_string());
                }
            }
        }
    }
    None
}

fn extract_imports(root: Node, source: &str) -> Vec<ImportStatement> {
    let mut imports = Vec::new();
    let mut cursor = root.walk();

    for child in root.children(&mut cursor) {
        if child.kind() != "import_declaration" {
            continue;
        }

        let mut path = None;
        let mut is_static = false;
        let mut is_wildcard = false;

        let mut import_cursor = child.walk();
        for import_child in child.children(&mut import_cursor) {
            match import_child.kind() {
                "static" => is_static = true,
                "asterisk" => is_wildcard = true,
                "scoped_identifier" | "identifier" => {
                    if path.is_none() {
                        path = Some(node_text(import_child, source).to_string());
                    }
                }
                _ => {}
            }
        }

        if let Some(path) = path {
            imports.push(ImportStatement {
                path,
                is_static,
                is_wildcard,
            });
        }
    }

    imports
}

fn extract_declared_types(root: Node, source: &str) -> Vec<String> {
    let mut types = Vec::new();
    let mut cursor = root.walk();

    for child in root.children(&mut cursor) {
        match child.kind() {
            "class_declaration"
            | "interface_declaration"
            | "enum_declaration"
            | "record_declaration"
            | "annotation_type_declaration" => {
                if let Some(name) = child.child_by_field_name("name") {
                    types.push(node_text(name, source).to_string());
                }
            }
            _ => {}
        }
    }

    types
}

/// Walk the whole tree recording the scope chain of every field access and
/// the named type of every class literal. Chains are only recorded when the
/// scope is a pure dotted identifier chain; anything flowing through a call
/// or a local expression is not a name reference.
fn collect_access_chains(root: Node, source: &str, chains: &mut HashSet<String>) {
    let mut cursor = root.walk();

    loop {
        let current = cursor.node();

        match current.kind() {
            "field_access" => {
                if let Some(object) = current.child_by_field_name("object") {
                    if let Some(chain) = dotted_chain(object, source) {
                        chains.insert(chain);
                    }
                }
            }
            "class_literal" => {
                let text = node_text(current, source);
                if let Some(named) = text.strip_suffix(".class") {
                    let named = named.trim();
                    if is_dotted_name(named) {
                        chains.insert(named.to_string());
                    }
                }
            }
            _ => {}
        }

        if cursor.goto_first_child() {
            continue;
        }
        while !cursor.goto_next_sibling() {
            if !cursor.goto_parent() {
                return;
            }
        }
    }
}

fn dotted_chain(node: Node, source: &str) -> Option<String> {
    match node.kind() {
        "identifier" => Some(node_text(node, source).to_string()),
        "field_access" => {
            let object = node.child_by_field_name("object")?;
            let field = node.child_by_field_name("field")?;
            let head = dotted_chain(object, source)?;
            Some(format!("{}.{}", head, node_text(field, source)))
        }
        _ => None,
    }
}

fn is_dotted_name(text: &str) -> bool {
    !text.is_empty()
        && text.split('.').all(|segment| {
            !segment.is_empty()
                && segment
                    .chars()
                    .all(|c| c.is_alphanumeric() || c == '_' || c == '$')
                && !segment.chars().next().unwrap_or('0').is_ascii_digit()
        })
}
