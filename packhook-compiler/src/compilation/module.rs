use packhook_core::{NativeChunk, NativeEntrypoint, NativeModule};

/// A module of the current compilation.
#[derive(Debug, Clone, PartialEq)]
pub struct Module(NativeModule);

impl Module {
    pub fn identifier(&self) -> &str {
        &self.0.identifier
    }

    pub fn readable_identifier(&self) -> &str {
        &self.0.readable_identifier
    }

    pub fn resource(&self) -> Option<&str> {
        self.0.resource.as_deref()
    }

    pub fn module_type(&self) -> &str {
        &self.0.module_type
    }

    pub fn size(&self) -> f64 {
        self.0.size
    }
}

impl From<NativeModule> for Module {
    fn from(module: NativeModule) -> Self {
        Self(module)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Chunk(NativeChunk);

impl Chunk {
    pub fn id(&self) -> Option<&str> {
        self.0.id.as_deref()
    }

    pub fn name(&self) -> Option<&str> {
        self.0.name.as_deref()
    }

    pub fn files(&self) -> &[String] {
        &self.0.files
    }

    pub fn runtime(&self) -> &[String] {
        &self.0.runtime
    }

    pub fn hash(&self) -> Option<&str> {
        self.0.hash.as_deref()
    }
}

impl From<NativeChunk> for Chunk {
    fn from(chunk: NativeChunk) -> Self {
        Self(chunk)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Entrypoint(NativeEntrypoint);

impl Entrypoint {
    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// Chunk ids in load order.
    pub fn chunks(&self) -> &[String] {
        &self.0.chunks
    }

    pub fn files(&self) -> &[String] {
        &self.0.files
    }
}

impl From<NativeEntrypoint> for Entrypoint {
    fn from(entrypoint: NativeEntrypoint) -> Self {
        Self(entrypoint)
    }
}
