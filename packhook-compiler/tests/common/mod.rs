#![allow(dead_code)]

use std::{
    path::Path,
    sync::Arc,
};

use packhook_compiler::{Compiler, CompilerBuilder, reference::ReferenceCoreFactory};
use packhook_config::{CompilerOptions, parse_str};
use packhook_core::MemoryFileSystem;
use parking_lot::Mutex;

pub const MAIN: &str = r#"
[entry]
main = "./src/index.js"
"#;

pub struct Fixture {
    pub compiler: Arc<Compiler>,
    pub factory: Arc<ReferenceCoreFactory>,
    pub input: Arc<MemoryFileSystem>,
    pub output: Arc<MemoryFileSystem>,
}

impl Fixture {
    pub fn output_file(&self, path: &str) -> Option<String> {
        self.output.read_to_string(Path::new(path))
    }
}

/// Options parsed from `config` with `/app` as the project root.
pub fn options(config: &str) -> CompilerOptions {
    parse_str(config)
        .expect("test config should be valid")
        .normalize(Path::new("/app"))
}

pub fn sources() -> Arc<MemoryFileSystem> {
    let fs = MemoryFileSystem::new();
    fs.insert("/app/src/index.js", "console.log('main');");
    fs.insert("/app/src/util.js", "export const util = 1;");
    fs.insert("/app/src/worker.js", "self.onmessage = () => {};");
    Arc::new(fs)
}

pub fn fixture(config: &str) -> Fixture {
    fixture_with(config, |builder| builder)
}

pub fn fixture_with(
    config: &str,
    configure: impl FnOnce(CompilerBuilder) -> CompilerBuilder,
) -> Fixture {
    let factory = Arc::new(ReferenceCoreFactory::new());
    let input = sources();
    let output = Arc::new(MemoryFileSystem::new());
    let builder = Compiler::builder(options(config), factory.clone())
        .input_fs(input.clone())
        .output_fs(output.clone());
    let compiler = configure(builder).build().expect("compiler should build");
    Fixture {
        compiler,
        factory,
        input,
        output,
    }
}

pub type Log = Arc<Mutex<Vec<String>>>;

pub fn log() -> Log {
    Arc::new(Mutex::new(Vec::new()))
}

/// A listener that records `name` and passes.
pub fn record<A: 'static>(
    log: &Log,
    name: &str,
) -> impl Fn(A) -> eyre::Result<()> + Send + Sync + 'static {
    let log = log.clone();
    let name = name.to_string();
    move |_| {
        log.lock().push(name.clone());
        Ok(())
    }
}
