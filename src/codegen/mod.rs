//! Compile-mode code assembler.
//!
//! Compile-mode block handlers do not execute anything; they emit sketch
//! source text. Command-shaped blocks produce statements, value-shaped
//! blocks produce precedence-tagged expressions, and any handler may deposit
//! include directives, one-time setup statements, or named helper functions
//! into the shared [`CodeAssembly`]. At finalization the accumulated
//! fragments are merged, deduplicated by key, into one emitted program.
//!
//! Handlers resolve their sub-expressions recursively through the host's
//! [`Emitter`] interface; nothing is evaluated at generation time.

// MIT License

use std::collections::HashMap;

use crate::blocks::Block;

/// Text fragment produced by a compile-mode handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Snippet {
    /// A complete statement, placed at the block's position in the body.
    Statement(String),
    /// An expression with its numeric precedence, consumed by the parent
    /// block's handler.
    Expression(String, u8),
}

/// Host-side expression emission. Implementations walk the block program
/// and render nested inputs to source text.
pub trait Emitter {
    /// Render the expression plugged into `arg` of `block`.
    fn value_to_code(&mut self, block: &Block, arg: &str) -> String;

    /// Render the statement stack nested under `branch` of `block`.
    fn statement_to_code(&mut self, block: &Block, branch: &str) -> String;
}

/// Upsert map preserving first-insertion order.
///
/// Later writes to an existing key replace the text but keep the original
/// position, so repeated contributions from many blocks collapse to one
/// reproducible entry.
#[derive(Debug, Default)]
struct Section {
    order: Vec<String>,
    entries: HashMap<String, String>,
}

impl Section {
    fn upsert(&mut self, key: &str, text: &str) {
        if !self.entries.contains_key(key) {
            self.order.push(key.to_string());
        }
        self.entries.insert(key.to_string(), text.to_string());
    }

    fn texts(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(|key| self.entries[key].as_str())
    }

    fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Accumulator for one compilation session.
///
/// Created once per session, mutated by every compile-mode handler, consumed
/// exactly once by [`CodeAssembly::finalize`].
#[derive(Debug, Default)]
pub struct CodeAssembly {
    includes: Section,
    setup: Section,
    functions: Section,
    body: Vec<String>,
}

impl CodeAssembly {
    pub fn new() -> Self {
        Self::default()
    }

    /// Contribute an include directive under a logical capability key.
    pub fn add_include(&mut self, key: &str, text: &str) {
        self.includes.upsert(key, text);
    }

    /// Contribute a one-time statement for the initialization section.
    pub fn add_setup(&mut self, key: &str, text: &str) {
        self.setup.upsert(key, text);
    }

    /// Contribute a named helper function body.
    pub fn add_function(&mut self, key: &str, text: &str) {
        self.functions.upsert(key, text);
    }

    /// Append a statement at the next position in the program body.
    pub fn push_statement(&mut self, text: &str) {
        self.body.push(text.to_string());
    }

    /// Merge everything into the final sketch: includes, helper functions,
    /// then the fixed skeleton with setup statements injected into `setup()`
    /// and the body statements in `loop()`.
    pub fn finalize(self) -> String {
        let mut out = String::new();
        for text in self.includes.texts() {
            out.push_str(text);
        }
        if !self.includes.is_empty() {
            out.push('\n');
        }
        for text in self.functions.texts() {
            out.push_str(text);
            out.push('\n');
        }
        out.push_str("void setup() {\n");
        for text in self.setup.texts() {
            out.push_str("  ");
            out.push_str(text);
            out.push_str(";\n");
        }
        out.push_str("}\n\nvoid loop() {\n");
        for text in &self.body {
            out.push_str("  ");
            out.push_str(text);
            out.push('\n');
        }
        out.push_str("}\n");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_include_emitted_once() {
        let mut assembly = CodeAssembly::new();
        assembly.add_include("wire", "#include <Wire.h>\n");
        assembly.add_include("wire", "#include <Wire.h>\n");
        let sketch = assembly.finalize();
        assert_eq!(sketch.matches("#include <Wire.h>").count(), 1);
    }

    #[test]
    fn function_upsert_keeps_position_takes_last_text() {
        let mut assembly = CodeAssembly::new();
        assembly.add_function("wireread", "int wireRead() { return 0; }\n");
        assembly.add_function("after", "void after() {}\n");
        assembly.add_function("wireread", "int wireRead() { return Wire.read(); }\n");
        let sketch = assembly.finalize();
        assert!(!sketch.contains("return 0;"));
        let wireread = sketch.find("int wireRead()").unwrap();
        let after = sketch.find("void after()").unwrap();
        assert!(wireread < after, "upsert must not move the entry");
    }

    #[test]
    fn setup_statements_inside_setup_section() {
        let mut assembly = CodeAssembly::new();
        assembly.add_setup("wire", "Wire.begin()");
        assembly.push_statement("digitalWrite(13, 1);");
        let sketch = assembly.finalize();
        let setup = sketch.find("void setup()").unwrap();
        let begin = sketch.find("Wire.begin();").unwrap();
        let looppos = sketch.find("void loop()").unwrap();
        let write = sketch.find("digitalWrite(13, 1);").unwrap();
        assert!(setup < begin && begin < looppos && looppos < write);
    }

    #[test]
    fn empty_assembly_is_a_bare_skeleton() {
        let sketch = CodeAssembly::new().finalize();
        assert_eq!(sketch, "void setup() {\n}\n\nvoid loop() {\n}\n");
    }
}
