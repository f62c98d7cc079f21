//! Loads JSON program images into [`Program`] metadata.

use super::instr::Instr;
use super::program::{
    DeclKind, ElementKind, MethodId, Program, StackClass, StackDclr, StackMethod, STRING_CLASS,
};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum LoadError {
    /// Program file could not be read
    #[error("unable to read '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Image is not valid JSON or does not match the image schema
    #[error("malformed program image: {0}")]
    Format(#[from] serde_json::Error),

    #[error("unknown declaration kind '{kind}' for '{name}'")]
    UnknownKind { name: String, kind: String },

    #[error("class '{0}' is defined more than once")]
    DuplicateClass(String),

    #[error("entry method '{0}' not found")]
    MissingEntry(String),
}

/// Produces program metadata from a program file.
pub trait Loader {
    fn load(&self, program_file: &Path) -> Result<Program, LoadError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ImageLoader;

impl ImageLoader {
    pub fn parse(&self, text: &str) -> Result<Program, LoadError> {
        let image: ProgramImage = serde_json::from_str(text)?;
        image.build()
    }
}

impl Loader for ImageLoader {
    fn load(&self, program_file: &Path) -> Result<Program, LoadError> {
        let text = fs::read_to_string(program_file).map_err(|source| LoadError::Io {
            path: program_file.to_path_buf(),
            source,
        })?;
        let program = self.parse(&text)?;
        info!(
            file = %program_file.display(),
            classes = program.classes().len(),
            "loaded program image"
        );
        Ok(program)
    }
}

#[derive(Debug, Deserialize)]
struct ProgramImage {
    entry: String,
    classes: Vec<ClassImage>,
}

#[derive(Debug, Deserialize)]
struct ClassImage {
    name: String,
    #[serde(default)]
    file: String,
    #[serde(default = "with_debug_info")]
    debug: bool,
    #[serde(default)]
    instance: Vec<DeclImage>,
    #[serde(default, rename = "class")]
    statics: Vec<DeclImage>,
    #[serde(default)]
    methods: Vec<MethodImage>,
}

fn with_debug_info() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct DeclImage {
    name: String,
    kind: String,
    slot: usize,
}

#[derive(Debug, Deserialize)]
struct MethodImage {
    name: String,
    #[serde(default)]
    params: String,
    #[serde(default)]
    has_and_or: bool,
    #[serde(default)]
    locals: Vec<DeclImage>,
    #[serde(default)]
    code: Vec<Instr>,
}

fn declarations(prefix: &str, images: Vec<DeclImage>) -> Result<Vec<StackDclr>, LoadError> {
    images
        .into_iter()
        .map(|image| {
            let kind = image
                .kind
                .parse::<DeclKind>()
                .map_err(|kind| LoadError::UnknownKind {
                    name: image.name.clone(),
                    kind,
                })?;
            Ok(StackDclr::new(
                format!("{prefix}:{}", image.name),
                kind,
                image.slot,
            ))
        })
        .collect()
}

fn string_class(id: usize) -> StackClass {
    StackClass {
        id,
        name: STRING_CLASS.to_string(),
        file_name: String::new(),
        is_debug: false,
        instance_declarations: vec![StackDclr::new(
            format!("{STRING_CLASS}:string"),
            DeclKind::Array(ElementKind::Char),
            0,
        )],
        class_declarations: Vec::new(),
        methods: Vec::new(),
    }
}

impl ProgramImage {
    fn build(self) -> Result<Program, LoadError> {
        let mut classes: Vec<StackClass> = Vec::with_capacity(self.classes.len() + 1);
        for (id, image) in self.classes.into_iter().enumerate() {
            if classes.iter().any(|klass| klass.name == image.name) {
                return Err(LoadError::DuplicateClass(image.name));
            }
            let mut methods = Vec::with_capacity(image.methods.len());
            for (index, method) in image.methods.into_iter().enumerate() {
                let prefix = format!("{}:{}", image.name, method.name);
                methods.push(StackMethod {
                    id: MethodId { class: id, index },
                    declarations: declarations(&prefix, method.locals)?,
                    name: method.name,
                    params: method.params,
                    has_and_or: method.has_and_or,
                    code: method.code,
                });
            }
            classes.push(StackClass {
                id,
                instance_declarations: declarations(&image.name, image.instance)?,
                class_declarations: declarations(&image.name, image.statics)?,
                name: image.name,
                file_name: image.file,
                is_debug: image.debug,
                methods,
            });
        }
        if !classes.iter().any(|klass| klass.name == STRING_CLASS) {
            classes.push(string_class(classes.len()));
        }

        let entry = self
            .entry
            .split_once(':')
            .and_then(|(class_name, method_name)| {
                let klass = classes.iter().find(|klass| klass.name == class_name)?;
                klass.methods_named(method_name).next().map(|method| method.id)
            })
            .ok_or_else(|| LoadError::MissingEntry(self.entry.clone()))?;

        Ok(Program::new(classes, entry))
    }
}
