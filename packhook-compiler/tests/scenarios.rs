//! End-to-end builds against the in-process reference core.
//!
//! Each test builds a compiler over an in-memory project rooted at `/app`
//! and checks the hooks it fires, the files it writes and the stats it
//! reports.

mod common;

use std::sync::Arc;

use common::{MAIN, fixture, fixture_with, log, record};
use eyre::eyre;
use packhook_compiler::{
    BridgeHook, ChildCompilerOptions, Compilation, CompilerError, PipelineState, Plugin,
    ProcessAssetsStage, StatsOptions, reference::ReferenceCoreFactory,
};
use packhook_config::OutputOverrides;
use packhook_core::{Asset, AssetInfo, Version};
use packhook_hooks::TapOptions;
use parking_lot::Mutex;

#[tokio::test]
async fn test_run_fires_lifecycle_in_order_and_writes_output() {
    let fixture = fixture(MAIN);
    let order = log();
    let hooks = &fixture.compiler.hooks;
    hooks.before_run.tap("Order", record(&order, "beforeRun")).unwrap();
    hooks.run.tap("Order", record(&order, "run")).unwrap();
    hooks.before_compile.tap("Order", record(&order, "beforeCompile")).unwrap();
    hooks.compile.tap("Order", record(&order, "compile")).unwrap();
    hooks.this_compilation.tap("Order", record(&order, "thisCompilation")).unwrap();
    hooks.compilation.tap("Order", record(&order, "compilation")).unwrap();
    hooks.make.tap("Order", record(&order, "make")).unwrap();
    hooks.finish_make.tap("Order", record(&order, "finishMake")).unwrap();
    hooks.emit.tap("Order", record(&order, "emit")).unwrap();
    hooks.after_emit.tap("Order", record(&order, "afterEmit")).unwrap();
    hooks.after_compile.tap("Order", record(&order, "afterCompile")).unwrap();
    hooks.done.tap("Order", record(&order, "done")).unwrap();
    hooks.after_done.tap("Order", record(&order, "afterDone")).unwrap();

    let stats = fixture.compiler.run().await.unwrap();

    assert!(!stats.has_errors());
    assert_eq!(
        *order.lock(),
        vec![
            "beforeRun",
            "run",
            "beforeCompile",
            "compile",
            "thisCompilation",
            "compilation",
            "make",
            "finishMake",
            "emit",
            "afterEmit",
            "afterCompile",
            "done",
            "afterDone",
        ]
    );
    assert_eq!(
        fixture.output_file("/app/dist/main.js").as_deref(),
        Some("console.log('main');\n")
    );
    assert!(!fixture.compiler.running());
    assert_eq!(
        fixture.compiler.bridge().pipeline().state(),
        PipelineState::Done
    );
}

#[tokio::test]
async fn test_sequential_runs_create_fresh_compilations() {
    let fixture = fixture(MAIN);
    let still_valid = log();
    let sink = still_valid.clone();
    fixture
        .compiler
        .hooks
        .this_compilation
        .tap("StillValid", move |(compilation, _params)| {
            compilation
                .hooks
                .still_valid_module
                .tap("StillValid", record(&sink, "stillValid"))?;
            Ok(())
        })
        .unwrap();

    let first = fixture.compiler.run().await.unwrap();
    let second = fixture.compiler.run().await.unwrap();

    assert_ne!(first.compilation().id(), second.compilation().id());
    assert!(second.start_time() >= first.start_time());
    // The second build reuses the unchanged entry module.
    assert_eq!(*still_valid.lock(), vec!["stillValid"]);
    assert_eq!(
        fixture.compiler.current_compilation().map(|c| c.id()),
        Some(second.compilation().id())
    );
}

#[tokio::test]
async fn test_run_while_running_is_rejected() {
    let fixture = fixture(MAIN);
    let (release, gate) = tokio::sync::oneshot::channel::<()>();
    let gate = Arc::new(Mutex::new(Some(gate)));
    fixture
        .compiler
        .hooks
        .before_run
        .tap_async("Gate", move |_| {
            let gate = gate.lock().take();
            async move {
                if let Some(gate) = gate {
                    let _ = gate.await;
                }
                Ok(())
            }
        })
        .unwrap();

    let compiler = fixture.compiler.clone();
    let first = tokio::spawn(async move { compiler.run().await });
    while !fixture.compiler.running() {
        tokio::task::yield_now().await;
    }

    let err = fixture.compiler.run().await.unwrap_err();
    assert!(matches!(err, CompilerError::ConcurrentCompilation));
    assert!(err.to_string().contains("already running"));
    assert!(matches!(
        fixture.compiler.watch(Default::default()).unwrap_err(),
        CompilerError::ConcurrentCompilation
    ));

    release.send(()).unwrap();
    first.await.unwrap().unwrap();
    assert!(!fixture.compiler.running());
    fixture.compiler.run().await.unwrap();
}

#[tokio::test]
async fn test_failing_build_module_listener_becomes_a_stats_error() {
    let fixture = fixture(MAIN);
    let failed = log();
    fixture
        .compiler
        .hooks
        .failed
        .tap("Failed", record(&failed, "failed"))
        .unwrap();
    fixture
        .compiler
        .hooks
        .this_compilation
        .tap("Thrower", |(compilation, _params)| {
            compilation
                .hooks
                .build_module
                .tap("Thrower", |_| Err(eyre!("boom")))?;
            Ok(())
        })
        .unwrap();

    let stats = fixture.compiler.run().await.unwrap();

    assert!(stats.has_errors());
    let errors = stats.compilation().get_errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].title, "BuildError");
    assert_eq!(errors[0].message, "buildModule: tap 'Thrower' failed: boom");
    assert_eq!(
        fixture.compiler.bridge().pipeline().state(),
        PipelineState::Failed
    );
    // The core stopped before emitting.
    assert_eq!(fixture.output_file("/app/dist/main.js"), None);
    // A build error is still a completed run.
    assert!(failed.lock().is_empty());
}

#[tokio::test]
async fn test_failing_before_run_listener_fails_the_run() {
    let fixture = fixture(MAIN);
    let failed = Arc::new(Mutex::new(Vec::new()));
    let sink = failed.clone();
    let hooks = &fixture.compiler.hooks;
    hooks
        .before_run
        .tap("Thrower", |_| Err(eyre!("not today")))
        .unwrap();
    hooks
        .failed
        .tap("Failed", move |message: String| {
            sink.lock().push(message);
            Ok(())
        })
        .unwrap();

    let err = fixture.compiler.run().await.unwrap_err();

    assert!(matches!(err, CompilerError::Hook(_)));
    assert_eq!(
        *failed.lock(),
        vec!["beforeRun: tap 'Thrower' failed: not today".to_string()]
    );
    assert!(!fixture.compiler.running());
}

#[tokio::test]
async fn test_process_assets_stages_run_in_order() {
    let fixture = fixture(MAIN);
    fixture
        .compiler
        .hooks
        .this_compilation
        .tap("Assets", |(compilation, _params)| {
            let hooks = &compilation.hooks;
            hooks.process_assets.tap(
                TapOptions::new("Banner").stage(ProcessAssetsStage::OPTIMIZE.value()),
                |assets| {
                    let main = assets.get("main.js").ok_or_else(|| eyre!("main.js missing"))?;
                    assets.set("main.js", format!("/* banner */\n{}", main.source.text()))?;
                    Ok(())
                },
            )?;
            hooks.process_assets.tap(
                TapOptions::new("Extra").stage(ProcessAssetsStage::ADDITIONAL.value()),
                |assets| {
                    assets.emit(Asset::new("extra.txt", "extra", AssetInfo::default()))?;
                    Ok(())
                },
            )?;
            hooks.process_assets.tap(
                TapOptions::new("Report").stage(ProcessAssetsStage::REPORT.value()),
                |assets| {
                    if assets.len() != 2 {
                        return Err(eyre!("expected two assets, found {}", assets.len()));
                    }
                    Ok(())
                },
            )?;
            Ok(())
        })
        .unwrap();

    let stats = fixture.compiler.run().await.unwrap();

    assert!(!stats.has_errors(), "{:?}", stats.compilation().get_errors());
    assert_eq!(
        fixture.compiler.bridge().pipeline().stages(),
        vec![
            ProcessAssetsStage::ADDITIONAL,
            ProcessAssetsStage::OPTIMIZE,
            ProcessAssetsStage::REPORT,
        ]
    );
    let calls = fixture.factory.core().unwrap().calls();
    assert!(calls.contains(&"processAssetsStageOptimize".to_string()));
    assert!(!calls.contains(&"processAssetsStageDerived".to_string()));
    assert_eq!(
        fixture.output_file("/app/dist/main.js").as_deref(),
        Some("/* banner */\nconsole.log('main');\n")
    );
    assert_eq!(fixture.output_file("/app/dist/extra.txt").as_deref(), Some("extra"));
}

#[tokio::test]
async fn test_optimize_stage_can_delete_an_asset() {
    let fixture = fixture(MAIN);
    fixture
        .compiler
        .hooks
        .this_compilation
        .tap("Extra", |(compilation, _params)| {
            let hooks = &compilation.hooks;
            hooks.process_assets.tap(
                TapOptions::new("AddExtra").stage(ProcessAssetsStage::ADDITIONAL.value()),
                |assets| {
                    assets.emit(Asset::new("extra.js", "extra();", AssetInfo::default()))?;
                    Ok(())
                },
            )?;
            hooks.process_assets.tap(
                TapOptions::new("DropExtra").stage(ProcessAssetsStage::OPTIMIZE.value()),
                |assets| {
                    if !assets.remove("extra.js") {
                        return Err(eyre!("extra.js was not emitted"));
                    }
                    Ok(())
                },
            )?;
            Ok(())
        })
        .unwrap();

    let stats = fixture.compiler.run().await.unwrap();

    assert!(!stats.has_errors(), "{:?}", stats.compilation().get_errors());
    assert_eq!(stats.compilation().assets().names(), vec!["main.js"]);
    assert_eq!(fixture.output_file("/app/dist/extra.js"), None);
    assert!(fixture.output_file("/app/dist/main.js").is_some());
}

#[tokio::test]
async fn test_disabled_hooks_follow_taps_between_runs() {
    let fixture = fixture(MAIN);
    fixture.compiler.run().await.unwrap();

    let core = fixture.factory.core().unwrap();
    let optimize = BridgeHook::ProcessAssets(ProcessAssetsStage::OPTIMIZE);
    let count = BridgeHook::ProcessAssets(ProcessAssetsStage::OPTIMIZE_COUNT);
    assert!(core.disabled_hooks().contains(&optimize));
    assert!(core.disabled_hooks().contains(&BridgeHook::BuildModule));
    assert!(!core.disabled_hooks().contains(&BridgeHook::ThisCompilation));
    let updates = core.disabled_updates();

    // A tap between two stages enables the stage that follows it.
    fixture
        .compiler
        .hooks
        .this_compilation
        .tap("Count", |(compilation, _params)| {
            compilation
                .hooks
                .process_assets
                .tap(TapOptions::new("Count").stage(150), |_| Ok(()))?;
            Ok(())
        })
        .unwrap();
    fixture.compiler.run().await.unwrap();

    assert!(core.disabled_updates() > updates);
    assert!(!core.disabled_hooks().contains(&count));
    assert!(core.disabled_hooks().contains(&optimize));
    assert!(core.calls().contains(&"processAssetsStageOptimizeCount".to_string()));
    assert_eq!(
        fixture.compiler.bridge().tracker().pushed(),
        core.disabled_hooks()
    );
}

#[tokio::test]
async fn test_before_resolve_can_rewrite_and_drop_requests() {
    let config = r#"
[entry]
main = ["./src/index.js", "./src/missing.js"]
"#;
    let fixture = fixture(config);
    fixture
        .compiler
        .hooks
        .normal_module_factory
        .tap("Rewrite", |factory| {
            factory.hooks.before_resolve.tap("Rewrite", |data| {
                let mut data = data.lock();
                if data.request == "./src/missing.js" {
                    return Ok(Some(false));
                }
                data.request = "./src/util.js".to_string();
                Ok(None)
            })?;
            factory.hooks.after_resolve.tap("Check", |data| {
                let data = data.lock();
                let resource = data.create_data.as_ref().map(|d| d.resource.as_str());
                if resource != Some("/app/src/util.js") {
                    return Err(eyre!("unexpected resource {resource:?}"));
                }
                Ok(None)
            })?;
            Ok(())
        })
        .unwrap();

    let stats = fixture.compiler.run().await.unwrap();

    assert!(!stats.has_errors(), "{:?}", stats.compilation().get_errors());
    assert_eq!(
        fixture.output_file("/app/dist/main.js").as_deref(),
        Some("export const util = 1;\n")
    );
    let modules = stats.compilation().modules();
    assert_eq!(modules.len(), 1);
    assert_eq!(modules[0].readable_identifier(), "./src/util.js");
}

#[tokio::test]
async fn test_passive_before_resolve_keeps_the_request() {
    let fixture = fixture(MAIN);
    let seen = log();
    let (before, after) = (seen.clone(), seen.clone());
    fixture
        .compiler
        .hooks
        .normal_module_factory
        .tap("Observe", move |factory| {
            let before = before.clone();
            factory.hooks.before_resolve.tap("Observe", move |data| {
                before.lock().push(format!("before {}", data.lock().request));
                Ok(None)
            })?;
            let after = after.clone();
            factory.hooks.after_resolve.tap("Observe", move |data| {
                let data = data.lock();
                let resource = data
                    .create_data
                    .as_ref()
                    .map(|d| d.resource.clone())
                    .unwrap_or_default();
                after.lock().push(format!("after {} {resource}", data.request));
                Ok(None)
            })?;
            Ok(())
        })
        .unwrap();

    let stats = fixture.compiler.run().await.unwrap();

    assert!(!stats.has_errors(), "{:?}", stats.compilation().get_errors());
    assert_eq!(
        *seen.lock(),
        vec![
            "before ./src/index.js",
            "after ./src/index.js /app/src/index.js",
        ]
    );
    assert_eq!(
        fixture.output_file("/app/dist/main.js").as_deref(),
        Some("console.log('main');\n")
    );
}

#[tokio::test]
async fn test_unresolvable_request_is_reported() {
    let config = r#"
[entry]
main = "./src/nope.js"
"#;
    let fixture = fixture(config);

    let stats = fixture.compiler.run().await.unwrap();

    let errors = stats.compilation().get_errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].title, "ModuleNotFoundError");
    assert_eq!(errors[0].message, "Can't resolve './src/nope.js' in '/app'");
}

struct WorkerPlugin {
    entries: Arc<Mutex<Vec<String>>>,
}

impl Plugin for WorkerPlugin {
    fn name(&self) -> &'static str {
        "WorkerPlugin"
    }

    fn apply(&self, compiler: &Arc<packhook_compiler::Compiler>) -> eyre::Result<()> {
        let entries = self.entries.clone();
        compiler.hooks.make.tap_async(self.name(), move |compilation: Arc<Compilation>| {
            let entries = entries.clone();
            async move {
                let child = compilation.create_child_compiler(
                    ChildCompilerOptions::new("worker-child")
                        .container_name("worker")
                        .output(OutputOverrides {
                            filename: Some("child/[name].js".to_string()),
                            ..Default::default()
                        }),
                )?;
                let output = child.run_as_child().await?;
                entries.lock().extend(output.entries);
                Ok::<_, eyre::Report>(())
            }
        })?;
        Ok(())
    }
}

#[tokio::test]
async fn test_child_compiler_builds_into_the_parent() {
    let config = r#"
[entry]
main = "./src/index.js"
worker = "./src/worker.js"
"#;
    let entries = Arc::new(Mutex::new(Vec::new()));
    let plugin = WorkerPlugin {
        entries: entries.clone(),
    };
    let fixture = fixture_with(config, |builder| builder.plugin(plugin));
    let this_compilations = log();
    let compilations = log();
    let paths = compilations.clone();
    let hooks = &fixture.compiler.hooks;
    hooks
        .this_compilation
        .tap("Count", record(&this_compilations, "thisCompilation"))
        .unwrap();
    hooks
        .compilation
        .tap("Count", move |(compilation, _params): (Arc<Compilation>, _)| {
            paths.lock().push(compilation.compiler_path().to_string());
            Ok(())
        })
        .unwrap();

    let stats = fixture.compiler.run().await.unwrap();

    assert!(!stats.has_errors(), "{:?}", stats.compilation().get_errors());
    // The hoisted worker entry is built into the child but is not an entrypoint.
    assert_eq!(*entries.lock(), vec!["child/main.js"]);
    let children = stats.compilation().children();
    assert_eq!(children.len(), 1);
    assert_eq!(children[0].compiler_path(), "worker-child|0|");
    assert_eq!(children[0].entrypoints().len(), 1);

    let parent_assets = stats.compilation().assets();
    assert!(parent_assets.contains("child/main.js"));
    assert!(parent_assets.contains("child/worker.js"));
    assert_eq!(
        fixture.output_file("/app/dist/child/worker.js").as_deref(),
        Some("self.onmessage = () => {};\n")
    );
    assert_eq!(fixture.factory.cores().len(), 2);
    assert_eq!(this_compilations.lock().len(), 1);
    // `compilation` taps are inherited by the child, `thisCompilation` taps are not.
    assert_eq!(*compilations.lock(), vec!["", "worker-child|0|"]);
    assert_eq!(stats.to_json(&StatsOptions::default()).children.map(|c| c.len()), Some(1));
}

#[tokio::test]
async fn test_child_build_does_not_repeat_the_parent_run() {
    let config = r#"
[entry]
main = "./src/index.js"
worker = "./src/worker.js"
"#;
    let plugin = WorkerPlugin {
        entries: Arc::new(Mutex::new(Vec::new())),
    };
    let fixture = fixture_with(config, |builder| builder.plugin(plugin));
    let lifecycle = log();
    let hooks = &fixture.compiler.hooks;
    hooks.before_run.tap("Count", record(&lifecycle, "beforeRun")).unwrap();
    hooks.run.tap("Count", record(&lifecycle, "run")).unwrap();
    hooks.after_done.tap("Count", record(&lifecycle, "afterDone")).unwrap();
    let idle = log();
    let cache_hooks = &fixture.compiler.cache().hooks;
    cache_hooks.begin_idle.tap("Count", record(&idle, "beginIdle")).unwrap();
    cache_hooks.end_idle.tap("Count", record(&idle, "endIdle")).unwrap();

    let stats = fixture.compiler.run().await.unwrap();

    assert!(!stats.has_errors(), "{:?}", stats.compilation().get_errors());
    assert_eq!(stats.compilation().children().len(), 1);
    assert_eq!(*lifecycle.lock(), vec!["beforeRun", "run", "afterDone"]);
    assert_eq!(*idle.lock(), vec!["beginIdle"]);
    assert!(fixture.compiler.scheduler().is_idle());
}

#[tokio::test]
async fn test_cache_facades_are_namespaced_by_compiler_path() {
    let fixture = fixture(MAIN);
    let first = fixture.compiler.get_cache("Plugin");
    let second = fixture.compiler.get_cache("Plugin");
    assert_eq!(first.name(), second.name());

    first.store("answer", None, 42u32);
    assert_eq!(second.get::<u32>("answer", None), Some(42));
    assert_eq!(first.child("nested").name(), "Plugin/nested");

    fixture.compiler.run().await.unwrap();
    assert_eq!(second.get::<u32>("answer", None), Some(42));
}

#[tokio::test]
async fn test_incompatible_core_is_rejected() {
    let factory = Arc::new(ReferenceCoreFactory::with_version(Version::new(1, 0, 0)));
    let compiler = packhook_compiler::Compiler::builder(common::options(MAIN), factory.clone())
        .input_fs(common::sources())
        .build()
        .unwrap();

    let err = compiler.run().await.unwrap_err();

    assert!(matches!(err, CompilerError::IncompatibleCore { .. }));
    assert!(factory.cores().is_empty());
    assert!(!compiler.running());
}

#[tokio::test]
async fn test_closed_compiler_rejects_runs() {
    let fixture = fixture(MAIN);
    let shutdown = log();
    fixture
        .compiler
        .hooks
        .shutdown
        .tap("Shutdown", record(&shutdown, "shutdown"))
        .unwrap();
    fixture.compiler.get_cache("Plugin").store("key", None, 1u8);

    fixture.compiler.close().await.unwrap();
    fixture.compiler.close().await.unwrap();

    assert_eq!(*shutdown.lock(), vec!["shutdown"]);
    assert!(fixture.compiler.cache().is_empty());
    assert!(matches!(
        fixture.compiler.run().await.unwrap_err(),
        CompilerError::Closed
    ));
}

#[tokio::test]
async fn test_compilation_logger_records_entries() {
    let fixture = fixture(MAIN);
    fixture
        .compiler
        .hooks
        .make
        .tap("Logs", |compilation: Arc<Compilation>| {
            let logger = compilation.get_logger("Logs");
            logger.info("making");
            logger.child("inner").warn("careful");
            Ok(())
        })
        .unwrap();

    let stats = fixture.compiler.run().await.unwrap();

    let logging = stats.compilation().logging();
    assert_eq!(logging["Logs"][0].message(), "making");
    assert_eq!(logging["Logs/inner"][0].message(), "careful");
    let json = stats.to_json(&StatsOptions {
        logging: true,
        ..Default::default()
    });
    assert_eq!(json.logging.map(|l| l.len()), Some(2));
}

#[tokio::test]
async fn test_infrastructure_logger_prefers_listeners() {
    let fixture = fixture(MAIN);
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    fixture
        .compiler
        .hooks
        .infrastructure_log
        .tap("Capture", move |(name, _kind, args)| {
            sink.lock().push(format!("{name}: {}", args.join(" ")));
            Ok(Some(true))
        })
        .unwrap();

    fixture.compiler.get_infrastructure_logger("Watcher").info("ready");

    assert_eq!(*seen.lock(), vec!["Watcher: ready".to_string()]);
}

#[tokio::test]
async fn test_stats_json() {
    let fixture = fixture(MAIN);
    let stats = fixture.compiler.run().await.unwrap();

    let json = stats.to_json(&StatsOptions {
        hash: false,
        timings: false,
        modules: false,
        ..Default::default()
    });

    insta::assert_json_snapshot!(json, @r###"
    {
      "assets": [
        {
          "name": "main.js",
          "size": 21,
          "chunkNames": [
            "main"
          ]
        }
      ],
      "chunks": [
        {
          "id": "0",
          "names": [
            "main"
          ],
          "files": [
            "main.js"
          ],
          "entry": true
        }
      ],
      "entrypoints": {
        "main": {
          "name": "main",
          "chunks": [
            "0"
          ],
          "assets": [
            "main.js"
          ]
        }
      },
      "errors": [],
      "errorsCount": 0,
      "warnings": [],
      "warningsCount": 0,
      "children": []
    }
    "###);
}

#[tokio::test]
async fn test_writes_to_disk_by_default() {
    let dir = tempfile::tempdir().unwrap();
    let mut options = common::options(MAIN);
    options.output.path = dir.path().join("dist");
    let factory = Arc::new(ReferenceCoreFactory::new());
    let compiler = packhook_compiler::Compiler::builder(options, factory)
        .input_fs(common::sources())
        .build()
        .unwrap();

    compiler.run().await.unwrap();

    let written = std::fs::read_to_string(dir.path().join("dist/main.js")).unwrap();
    assert_eq!(written, "console.log('main');\n");
}
