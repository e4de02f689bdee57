//! Structural parser backends.
//!
//! [`TreeSitterParser`] walks the syntax tree of the languages it bundles a
//! grammar for and returns [`CodeBlock`]s. [`UnavailableParser`] is the
//! degraded backend: it supports nothing, so every file goes through line
//! windows.

use crate::block::{BlockSpan, ClassBlock, CodeBlock, FunctionBlock, GenericBlock, MethodBlock};
use crate::error::ChunkerError;
use crate::language::Language;
use log::debug;
use tree_sitter::{Node, Parser};

/// Given file text and its language, produce named code blocks.
pub trait StructuralParser: Send + Sync {
    fn name(&self) -> &'static str;

    fn supports(&self, language: Language) -> bool;

    fn parse(&self, content: &str, language: Language) -> Result<Vec<CodeBlock>, ChunkerError>;
}

/// Backend selection made once when a splitter is built.
pub fn default_parser(enable_parsing: bool) -> Box<dyn StructuralParser> {
    if enable_parsing {
        Box::new(TreeSitterParser)
    } else {
        Box::new(UnavailableParser)
    }
}

/// Reports every language as unsupported.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableParser;

impl StructuralParser for UnavailableParser {
    fn name(&self) -> &'static str {
        "unavailable"
    }

    fn supports(&self, _language: Language) -> bool {
        false
    }

    fn parse(&self, _content: &str, language: Language) -> Result<Vec<CodeBlock>, ChunkerError> {
        Err(ChunkerError::UnsupportedLanguage(language.name().to_string()))
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TreeSitterParser;

impl TreeSitterParser {
    fn grammar(language: Language) -> Option<tree_sitter::Language> {
        let grammar: tree_sitter::Language = match language {
            Language::Python => tree_sitter_python::LANGUAGE.into(),
            Language::JavaScript => tree_sitter_javascript::LANGUAGE.into(),
            Language::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            Language::Java => tree_sitter_java::LANGUAGE.into(),
            Language::Rust => tree_sitter_rust::LANGUAGE.into(),
            Language::Go => tree_sitter_go::LANGUAGE.into(),
            _ => return None,
        };
        Some(grammar)
    }
}

impl StructuralParser for TreeSitterParser {
    fn name(&self) -> &'static str {
        "tree-sitter"
    }

    fn supports(&self, language: Language) -> bool {
        language.has_tree_sitter_support()
    }

    fn parse(&self, content: &str, language: Language) -> Result<Vec<CodeBlock>, ChunkerError> {
        let grammar = Self::grammar(language)
            .ok_or_else(|| ChunkerError::UnsupportedLanguage(language.name().to_string()))?;

        let mut parser = Parser::new();
        parser.set_language(&grammar).map_err(|e| {
            ChunkerError::ParseError(format!("failed to load {} grammar: {e}", language.name()))
        })?;

        let tree = parser
            .parse(content, None)
            .ok_or_else(|| ChunkerError::ParseError("parser produced no tree".to_string()))?;
        let root = tree.root_node();
        if root.has_error() {
            debug!(
                "{} source has syntax errors; keeping the blocks that parsed",
                language.name()
            );
        }

        let extractor = Extractor { source: content };
        let mut blocks = Vec::new();
        match language {
            Language::Python => extractor.python_items(root, &mut blocks),
            Language::JavaScript | Language::TypeScript => extractor.js_items(root, &mut blocks),
            Language::Java => extractor.java_items(root, &mut blocks),
            Language::Rust => extractor.rust_items(root, &mut blocks),
            Language::Go => extractor.go_items(root, &mut blocks),
            _ => {}
        }
        Ok(blocks)
    }
}

fn named_children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|child| child.kind() != "comment")
        .collect()
}

fn has_token(node: Node<'_>, kind: &str) -> bool {
    let mut cursor = node.walk();
    node.children(&mut cursor).any(|child| child.kind() == kind)
}

fn start_line(node: Node<'_>) -> usize {
    node.start_position().row + 1
}

fn end_line(node: Node<'_>) -> usize {
    let start = node.start_position();
    let end = node.end_position();
    // A node that swallows its trailing newline ends at column 0 of the next row.
    if end.column == 0 && end.row > start.row {
        end.row
    } else {
        end.row + 1
    }
}

/// Split `extends A implements B, C` style text into type names.
fn heritage_names(text: &str) -> Vec<String> {
    text.split(|c: char| c.is_whitespace() || c == ',')
        .filter(|word| !word.is_empty() && !matches!(*word, "extends" | "implements"))
        .map(str::to_string)
        .collect()
}

struct Extractor<'a> {
    source: &'a str,
}

impl<'a> Extractor<'a> {
    fn text(&self, node: Node<'_>) -> &'a str {
        node.utf8_text(self.source.as_bytes()).unwrap_or("")
    }

    fn field_text(&self, node: Node<'_>, field: &str) -> Option<String> {
        node.child_by_field_name(field)
            .map(|child| self.text(child).to_string())
    }

    fn span(&self, node: Node<'_>, name: String) -> BlockSpan {
        BlockSpan {
            name,
            start_line: start_line(node),
            end_line: end_line(node),
            start_byte: node.start_byte(),
            end_byte: node.end_byte(),
        }
    }

    fn parameters(&self, node: Node<'_>) -> Vec<String> {
        let Some(params) = node.child_by_field_name("parameters") else {
            return Vec::new();
        };
        named_children(params)
            .into_iter()
            .map(|param| {
                ["name", "pattern", "left"]
                    .iter()
                    .find_map(|field| param.child_by_field_name(field))
                    .map_or_else(|| self.text(param), |n| self.text(n))
                    .to_string()
            })
            .collect()
    }

    fn decorators(&self, node: Node<'_>) -> Vec<String> {
        named_children(node)
            .into_iter()
            .filter(|child| child.kind() == "decorator")
            .map(|child| self.text(child).trim_start_matches('@').trim().to_string())
            .collect()
    }

    // Python

    fn python_items(&self, node: Node<'_>, out: &mut Vec<CodeBlock>) {
        for child in named_children(node) {
            let (definition, decorators) = self.python_unwrap(child);
            match definition.kind() {
                "class_definition" => {
                    if let Some((class, nested)) = self.python_class(child, definition, decorators)
                    {
                        out.push(CodeBlock::Class(class));
                        out.extend(nested);
                    }
                }
                "function_definition" => {
                    if let Some(function) = self.python_function(child, definition, decorators) {
                        out.push(CodeBlock::Function(function));
                    }
                }
                _ => {}
            }
        }
    }

    /// Peel a `decorated_definition` into its definition and decorator texts.
    fn python_unwrap<'t>(&self, node: Node<'t>) -> (Node<'t>, Vec<String>) {
        if node.kind() != "decorated_definition" {
            return (node, Vec::new());
        }
        match node.child_by_field_name("definition") {
            Some(definition) => (definition, self.decorators(node)),
            None => (node, Vec::new()),
        }
    }

    fn python_function(
        &self,
        outer: Node<'_>,
        definition: Node<'_>,
        decorators: Vec<String>,
    ) -> Option<FunctionBlock> {
        let name = self.field_text(definition, "name")?;
        let is_static = decorators.iter().any(|d| d == "staticmethod");
        Some(FunctionBlock {
            span: self.span(outer, name),
            parameters: self.parameters(definition),
            is_async: has_token(definition, "async"),
            is_static,
            decorators,
        })
    }

    fn python_class(
        &self,
        outer: Node<'_>,
        definition: Node<'_>,
        decorators: Vec<String>,
    ) -> Option<(ClassBlock, Vec<CodeBlock>)> {
        let name = self.field_text(definition, "name")?;
        let base_classes = definition
            .child_by_field_name("superclasses")
            .map(|args| {
                named_children(args)
                    .into_iter()
                    .map(|arg| self.text(arg).to_string())
                    .collect()
            })
            .unwrap_or_default();

        let body = definition.child_by_field_name("body");
        let header_end_line = match body.and_then(|b| named_children(b).into_iter().next()) {
            Some(first) if Self::is_docstring(first) => end_line(first),
            Some(first) => (start_line(first) - 1).max(start_line(definition)),
            None => end_line(definition),
        };

        let mut methods = Vec::new();
        let mut nested = Vec::new();
        for member in body.map(named_children).unwrap_or_default() {
            let (member_def, member_decorators) = self.python_unwrap(member);
            match member_def.kind() {
                "function_definition" => {
                    if let Some(method) = self.python_function(member, member_def, member_decorators)
                    {
                        methods.push(method);
                    }
                }
                "class_definition" => {
                    if let Some((class, inner)) =
                        self.python_class(member, member_def, member_decorators)
                    {
                        nested.push(CodeBlock::Class(class));
                        nested.extend(inner);
                    }
                }
                _ => {}
            }
        }

        let class = ClassBlock {
            span: self.span(outer, name),
            header_end_line,
            base_classes,
            decorators,
            methods,
        };
        Some((class, nested))
    }

    fn is_docstring(node: Node<'_>) -> bool {
        node.kind() == "expression_statement"
            && node
                .named_child(0)
                .is_some_and(|child| child.kind() == "string")
    }

    // JavaScript / TypeScript

    fn js_items(&self, node: Node<'_>, out: &mut Vec<CodeBlock>) {
        for child in named_children(node) {
            self.js_item(child, child, out);
        }
    }

    fn js_item(&self, outer: Node<'_>, node: Node<'_>, out: &mut Vec<CodeBlock>) {
        match node.kind() {
            "export_statement" => {
                if let Some(declaration) = node.child_by_field_name("declaration") {
                    self.js_item(outer, declaration, out);
                }
            }
            "class_declaration" | "abstract_class_declaration" => {
                if let Some(class) = self.js_class(outer, node) {
                    out.push(CodeBlock::Class(class));
                }
            }
            "function_declaration" | "generator_function_declaration" => {
                if let Some(name) = self.field_text(node, "name") {
                    out.push(CodeBlock::Function(FunctionBlock {
                        span: self.span(outer, name),
                        parameters: self.parameters(node),
                        decorators: Vec::new(),
                        is_async: has_token(node, "async"),
                        is_static: false,
                    }));
                }
            }
            "lexical_declaration" | "variable_declaration" => {
                let declarators: Vec<Node<'_>> = named_children(node)
                    .into_iter()
                    .filter(|d| d.kind() == "variable_declarator")
                    .collect();
                let single = declarators.len() == 1;
                for declarator in declarators {
                    let Some(value) = declarator.child_by_field_name("value") else {
                        continue;
                    };
                    if !matches!(
                        value.kind(),
                        "arrow_function" | "function_expression" | "function"
                    ) {
                        continue;
                    }
                    let Some(name) = self.field_text(declarator, "name") else {
                        continue;
                    };
                    let span_node = if single { outer } else { declarator };
                    out.push(CodeBlock::Function(FunctionBlock {
                        span: self.span(span_node, name),
                        parameters: self.parameters(value),
                        decorators: Vec::new(),
                        is_async: has_token(value, "async"),
                        is_static: false,
                    }));
                }
            }
            "interface_declaration" => self.push_generic(outer, node, "interface", out),
            "type_alias_declaration" => self.push_generic(outer, node, "type", out),
            "enum_declaration" => self.push_generic(outer, node, "enum", out),
            _ => {}
        }
    }

    fn js_class(&self, outer: Node<'_>, node: Node<'_>) -> Option<ClassBlock> {
        let name = self.field_text(node, "name")?;
        let base_classes = named_children(node)
            .into_iter()
            .find(|child| child.kind() == "class_heritage")
            .map(|heritage| heritage_names(self.text(heritage)))
            .unwrap_or_default();

        let body = node.child_by_field_name("body");
        let header_end_line = body.map_or_else(|| end_line(node), start_line);

        let methods = body
            .map(named_children)
            .unwrap_or_default()
            .into_iter()
            .filter(|member| member.kind() == "method_definition")
            .filter_map(|member| {
                let name = self.field_text(member, "name")?;
                Some(FunctionBlock {
                    span: self.span(member, name),
                    parameters: self.parameters(member),
                    decorators: self.decorators(member),
                    is_async: has_token(member, "async"),
                    is_static: has_token(member, "static"),
                })
            })
            .collect();

        Some(ClassBlock {
            span: self.span(outer, name),
            header_end_line,
            base_classes,
            decorators: self.decorators(node),
            methods,
        })
    }

    fn push_generic(
        &self,
        outer: Node<'_>,
        node: Node<'_>,
        kind: &'static str,
        out: &mut Vec<CodeBlock>,
    ) {
        if let Some(name) = self.field_text(node, "name") {
            out.push(CodeBlock::Generic(GenericBlock {
                span: self.span(outer, name),
                kind,
            }));
        }
    }

    // Java

    fn java_items(&self, node: Node<'_>, out: &mut Vec<CodeBlock>) {
        for child in named_children(node) {
            if matches!(
                child.kind(),
                "class_declaration"
                    | "interface_declaration"
                    | "enum_declaration"
                    | "record_declaration"
            ) {
                self.java_class(child, out);
            }
        }
    }

    fn java_class(&self, node: Node<'_>, out: &mut Vec<CodeBlock>) {
        let Some(name) = self.field_text(node, "name") else {
            return;
        };
        let mut base_classes = Vec::new();
        for field in ["superclass", "interfaces"] {
            if let Some(clause) = node.child_by_field_name(field) {
                base_classes.extend(heritage_names(self.text(clause)));
            }
        }
        let (decorators, _) = self.java_modifiers(node);

        let body = node.child_by_field_name("body");
        let header_end_line = body.map_or_else(|| end_line(node), start_line);

        let mut methods = Vec::new();
        let mut nested = Vec::new();
        if let Some(body) = body {
            self.java_members(body, &mut methods, &mut nested);
        }

        out.push(CodeBlock::Class(ClassBlock {
            span: self.span(node, name),
            header_end_line,
            base_classes,
            decorators,
            methods,
        }));
        out.extend(nested);
    }

    fn java_members(
        &self,
        body: Node<'_>,
        methods: &mut Vec<FunctionBlock>,
        nested: &mut Vec<CodeBlock>,
    ) {
        for member in named_children(body) {
            match member.kind() {
                "method_declaration" | "constructor_declaration" => {
                    let Some(name) = self.field_text(member, "name") else {
                        continue;
                    };
                    let (decorators, is_static) = self.java_modifiers(member);
                    methods.push(FunctionBlock {
                        span: self.span(member, name),
                        parameters: self.parameters(member),
                        decorators,
                        is_async: false,
                        is_static,
                    });
                }
                "enum_body_declarations" => self.java_members(member, methods, nested),
                "class_declaration"
                | "interface_declaration"
                | "enum_declaration"
                | "record_declaration" => self.java_class(member, nested),
                _ => {}
            }
        }
    }

    /// Annotation texts and whether `static` is present.
    fn java_modifiers(&self, node: Node<'_>) -> (Vec<String>, bool) {
        let Some(modifiers) = named_children(node)
            .into_iter()
            .find(|child| child.kind() == "modifiers")
        else {
            return (Vec::new(), false);
        };
        let annotations = named_children(modifiers)
            .into_iter()
            .filter(|m| matches!(m.kind(), "marker_annotation" | "annotation"))
            .map(|m| self.text(m).trim_start_matches('@').to_string())
            .collect();
        let is_static = self
            .text(modifiers)
            .split_whitespace()
            .any(|word| word == "static");
        (annotations, is_static)
    }

    // Rust

    fn rust_items(&self, node: Node<'_>, out: &mut Vec<CodeBlock>) {
        for child in named_children(node) {
            match child.kind() {
                "function_item" => {
                    if let Some(function) = self.rust_function(child) {
                        out.push(CodeBlock::Function(function));
                    }
                }
                "impl_item" => {
                    let Some(parent) = self.field_text(child, "type") else {
                        continue;
                    };
                    let Some(body) = child.child_by_field_name("body") else {
                        continue;
                    };
                    for item in named_children(body) {
                        if item.kind() != "function_item" {
                            continue;
                        }
                        if let Some(function) = self.rust_function(item) {
                            out.push(CodeBlock::Method(MethodBlock {
                                parent: parent.clone(),
                                function,
                            }));
                        }
                    }
                }
                "mod_item" => {
                    if let Some(body) = child.child_by_field_name("body") {
                        self.rust_items(body, out);
                    }
                }
                "struct_item" => self.push_generic(child, child, "struct", out),
                "enum_item" => self.push_generic(child, child, "enum", out),
                "union_item" => self.push_generic(child, child, "union", out),
                "trait_item" => self.push_generic(child, child, "trait", out),
                "type_item" => self.push_generic(child, child, "type", out),
                _ => {}
            }
        }
    }

    fn rust_function(&self, node: Node<'_>) -> Option<FunctionBlock> {
        let name = self.field_text(node, "name")?;
        let is_async = named_children(node)
            .into_iter()
            .filter(|child| child.kind() == "function_modifiers")
            .any(|modifiers| has_token(modifiers, "async"));
        let takes_self = node
            .child_by_field_name("parameters")
            .is_some_and(|params| has_token(params, "self_parameter"));
        Some(FunctionBlock {
            span: self.span(node, name),
            parameters: self.parameters(node),
            decorators: Vec::new(),
            is_async,
            is_static: !takes_self,
        })
    }

    // Go

    fn go_items(&self, node: Node<'_>, out: &mut Vec<CodeBlock>) {
        for child in named_children(node) {
            match child.kind() {
                "function_declaration" => {
                    if let Some(name) = self.field_text(child, "name") {
                        out.push(CodeBlock::Function(self.go_function(child, name)));
                    }
                }
                "method_declaration" => {
                    let Some(name) = self.field_text(child, "name") else {
                        continue;
                    };
                    let parent = child
                        .child_by_field_name("receiver")
                        .and_then(|receiver| named_children(receiver).into_iter().next())
                        .and_then(|param| self.field_text(param, "type"))
                        .map(|ty| {
                            let ty = ty.trim_start_matches('*');
                            ty.split('[').next().unwrap_or(ty).to_string()
                        })
                        .unwrap_or_default();
                    out.push(CodeBlock::Method(MethodBlock {
                        parent,
                        function: self.go_function(child, name),
                    }));
                }
                "type_declaration" => {
                    let specs: Vec<Node<'_>> = named_children(child)
                        .into_iter()
                        .filter(|spec| spec.kind() == "type_spec")
                        .collect();
                    let single = specs.len() == 1;
                    for spec in specs {
                        let Some(name) = self.field_text(spec, "name") else {
                            continue;
                        };
                        let kind = match spec.child_by_field_name("type").map(|t| t.kind()) {
                            Some("struct_type") => "struct",
                            Some("interface_type") => "interface",
                            _ => "type",
                        };
                        let span_node = if single { child } else { spec };
                        out.push(CodeBlock::Generic(GenericBlock {
                            span: self.span(span_node, name),
                            kind,
                        }));
                    }
                }
                _ => {}
            }
        }
    }

    fn go_function(&self, node: Node<'_>, name: String) -> FunctionBlock {
        FunctionBlock {
            span: self.span(node, name),
            parameters: self.parameters(node),
            decorators: Vec::new(),
            is_async: false,
            is_static: false,
        }
    }
}
