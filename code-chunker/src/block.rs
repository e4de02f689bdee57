//! Named code spans produced by a structural parser.

/// Location of a named element. Lines are 1-based and inclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockSpan {
    pub name: String,
    pub start_line: usize,
    pub end_line: usize,
    pub start_byte: usize,
    pub end_byte: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionBlock {
    pub span: BlockSpan,
    pub parameters: Vec<String>,
    pub decorators: Vec<String>,
    pub is_async: bool,
    pub is_static: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassBlock {
    pub span: BlockSpan,
    /// Last line of the signature, extended over a leading docstring
    pub header_end_line: usize,
    pub base_classes: Vec<String>,
    pub decorators: Vec<String>,
    pub methods: Vec<FunctionBlock>,
}

/// A function attached to a type outside any class body
/// (Rust `impl` items, Go receivers).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodBlock {
    pub parent: String,
    pub function: FunctionBlock,
}

/// Structs, enums, interfaces, traits and type declarations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenericBlock {
    pub span: BlockSpan,
    /// Grammar-specific kind, e.g. `struct` or `interface`
    pub kind: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodeBlock {
    Class(ClassBlock),
    Function(FunctionBlock),
    Method(MethodBlock),
    Generic(GenericBlock),
}

impl CodeBlock {
    pub fn span(&self) -> &BlockSpan {
        match self {
            CodeBlock::Class(class) => &class.span,
            CodeBlock::Function(function) => &function.span,
            CodeBlock::Method(method) => &method.function.span,
            CodeBlock::Generic(generic) => &generic.span,
        }
    }

    pub fn name(&self) -> &str {
        &self.span().name
    }
}
