use flex_ast::{CppAstProvider, DEFAULT_MARKER_PREFIX};
use flex_config::OutputLayout;
use flex_engine::{Outcome, Pipeline, PipelineOptions, RunError, RunManifest, RunReport};
use flex_plugin_api::{
    CapabilityEntry, DeclKind, GeneratedCode, GenerationError, KindScope, PluginDescriptor,
};
use flex_plugin_system::PluginRegistry;
use pretty_assertions::assert_eq;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

const COLORS: &str = r#"namespace colors {

// {gen};{funccall};enum_to_string()
// {gen};{funccall};enum_to_json()
enum class Color { Red, Green };

} // namespace colors
"#;

const SHAPES: &str = r#"
// {gen};{funccall};enum_to_string()
enum class Shape { Circle };

// {gen};{funccall};enum_to_string()
enum class Bad { Square };

// {gen};{funccall};enum_to_string()
enum class Line { Dashed };
"#;

struct Workspace {
    _root: TempDir,
    in_dir: PathBuf,
    out_dir: PathBuf,
}

impl Workspace {
    fn new() -> Self {
        let root = TempDir::new().unwrap();
        let in_dir = root.path().join("src");
        let out_dir = root.path().join("gen");
        fs::create_dir_all(&in_dir).unwrap();
        Self {
            _root: root,
            in_dir,
            out_dir,
        }
    }

    fn source(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.in_dir.join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    fn options(&self) -> PipelineOptions {
        self.options_in(&self.out_dir)
    }

    fn options_in(&self, out_dir: &Path) -> PipelineOptions {
        PipelineOptions {
            out_dir: out_dir.to_path_buf(),
            in_dir: Some(self.in_dir.clone()),
            include_paths: Vec::new(),
            layout: OutputLayout::PerFile,
            default_extension: "hpp".to_string(),
            manifest_name: ".flextool-manifest.json".to_string(),
            remove_stale: true,
            jobs: 2,
            file_timeout: Duration::from_secs(30),
            marker_prefix: DEFAULT_MARKER_PREFIX.to_string(),
            strict_capabilities: false,
        }
    }

    fn read(&self, output: &str) -> String {
        fs::read_to_string(self.out_dir.join(output)).unwrap()
    }
}

fn enum_plugin() -> PluginDescriptor {
    let strategy = |request: &flex_plugin_api::GenerationRequest<'_>| {
        let declaration = request.declaration;
        if declaration.name() == "Bad" {
            return Err(GenerationError::invalid_input("Bad is not generatable"));
        }
        Ok(vec![GeneratedCode::new(format!(
            "// {} {}",
            request.capability(),
            declaration.qualified_name()
        ))])
    };
    PluginDescriptor::new("enums", "1.0.0")
        .with_capability(CapabilityEntry::new(
            "enum-to-string",
            KindScope::only([DeclKind::Enum]),
            strategy,
        ))
        .with_capability(CapabilityEntry::new(
            "enum-to-json",
            KindScope::only([DeclKind::Enum]),
            strategy,
        ))
}

fn registry(descriptors: Vec<PluginDescriptor>) -> Arc<PluginRegistry> {
    let mut registry = PluginRegistry::new();
    for descriptor in descriptors {
        registry.register(descriptor).unwrap();
    }
    Arc::new(registry)
}

async fn run(
    registry: Arc<PluginRegistry>,
    options: PipelineOptions,
    inputs: &[PathBuf],
) -> Result<RunReport, RunError> {
    Pipeline::new(registry, Arc::new(CppAstProvider::default()), options)
        .run(inputs)
        .await
}

#[tokio::test]
async fn test_second_run_changes_nothing() {
    let ws = Workspace::new();
    let inputs = vec![ws.source("colors.hpp", COLORS)];
    let registry = registry(vec![enum_plugin()]);

    let first = run(registry.clone(), ws.options(), &inputs).await.unwrap();
    assert_eq!(first.outcome(), Outcome::Success);
    assert_eq!(first.fragments_written, 2);
    assert_eq!(
        ws.read("colors.hpp.enum-to-string.hpp"),
        "// Generated by flextool: enums 1.0.0 [enum-to-string] colors::Color. Do not edit.\n\
         // enum-to-string colors::Color\n"
    );

    let outputs = [
        ws.out_dir.join("colors.hpp.enum-to-string.hpp"),
        ws.out_dir.join("colors.hpp.enum-to-json.hpp"),
    ];
    let mtimes: Vec<_> = outputs
        .iter()
        .map(|p| fs::metadata(p).unwrap().modified().unwrap())
        .collect();

    let second = run(registry, ws.options(), &inputs).await.unwrap();
    assert_eq!(second.fragments_written, 0);
    assert_eq!(second.fragments_unchanged, 2);
    assert_eq!(second.changed(), 0);

    let manifest = RunManifest::load(&ws.options().manifest_path());
    assert_eq!(manifest.entries.len(), 2);
    assert_eq!(manifest.changed(), 0);

    let after: Vec<_> = outputs
        .iter()
        .map(|p| fs::metadata(p).unwrap().modified().unwrap())
        .collect();
    assert_eq!(mtimes, after);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_output_does_not_depend_on_jobs() {
    let ws = Workspace::new();
    let mut inputs = Vec::new();
    for i in 0..8 {
        let source = COLORS.replace("Color", &format!("Color{}", i));
        inputs.push(ws.source(&format!("colors{}.hpp", i), &source));
    }
    let registry = registry(vec![enum_plugin()]);

    let serial_dir = ws.out_dir.join("serial");
    let parallel_dir = ws.out_dir.join("parallel");
    let mut serial = ws.options_in(&serial_dir);
    serial.jobs = 1;
    let mut parallel = ws.options_in(&parallel_dir);
    parallel.jobs = 4;

    run(registry.clone(), serial.clone(), &inputs).await.unwrap();
    run(registry, parallel.clone(), &inputs).await.unwrap();

    let serial_manifest = RunManifest::load(&serial.manifest_path());
    let parallel_manifest = RunManifest::load(&parallel.manifest_path());
    assert_eq!(serial_manifest, parallel_manifest);
    assert_eq!(serial_manifest.entries.len(), 16);

    for entry in &serial_manifest.entries {
        assert_eq!(
            fs::read(serial_dir.join(&entry.output)).unwrap(),
            fs::read(parallel_dir.join(&entry.output)).unwrap(),
            "{} differs",
            entry.output.display()
        );
    }
}

#[tokio::test]
async fn test_failed_declaration_does_not_stop_the_others() {
    let ws = Workspace::new();
    let inputs = vec![ws.source("shapes.hpp", SHAPES)];
    let mut options = ws.options();
    options.layout = OutputLayout::PerDeclaration;

    let report = run(registry(vec![enum_plugin()]), options, &inputs)
        .await
        .unwrap();

    assert_eq!(report.outcome(), Outcome::CompletedWithWarnings);
    assert_eq!(report.fragments_written, 2);
    assert_eq!(report.warnings.len(), 1);
    assert_eq!(report.warnings[0].kind, "GenerationError");
    assert_eq!(report.warnings[0].line, Some(6));

    assert!(ws.out_dir.join("shapes.hpp.d/Shape.enum-to-string.hpp").exists());
    assert!(ws.out_dir.join("shapes.hpp.d/Line.enum-to-string.hpp").exists());
    assert!(!ws.out_dir.join("shapes.hpp.d/Bad.enum-to-string.hpp").exists());
}

#[tokio::test]
async fn test_output_collision_is_fatal() {
    let ws = Workspace::new();
    let inputs = vec![ws.source(
        "point.hpp",
        "// {gen};{funccall};left()\n// {gen};{funccall};right()\nstruct Point { int x; };\n",
    )];

    let shared = |tag: &'static str, id: &'static str| {
        PluginDescriptor::new(id, "1.0.0").with_capability(CapabilityEntry::new(
            tag,
            KindScope::Any,
            move |_| Ok(vec![GeneratedCode::new(tag).with_file_name("shared.hpp")]),
        ))
    };

    let error = run(
        registry(vec![shared("left", "lefty"), shared("right", "righty")]),
        ws.options(),
        &inputs,
    )
    .await
    .unwrap_err();

    match error {
        RunError::OutputCollision {
            path,
            first,
            second,
        } => {
            assert_eq!(path, PathBuf::from("shared.hpp"));
            assert_eq!(first, "lefty [left] Point");
            assert_eq!(second, "righty [right] Point");
        }
        other => panic!("expected OutputCollision, got {other:?}"),
    }
    assert!(!ws.out_dir.join("shared.hpp").exists());
    assert!(!ws.options().manifest_path().exists());
}

#[tokio::test]
async fn test_plugin_crash_aborts_the_run() {
    let ws = Workspace::new();
    let inputs = vec![ws.source("colors.hpp", COLORS)];
    let crashing = PluginDescriptor::new("crashy", "0.0.1").with_capability(CapabilityEntry::new(
        "enum-to-string",
        KindScope::Any,
        |_| panic!("boom"),
    ));

    let error = run(registry(vec![crashing]), ws.options(), &inputs)
        .await
        .unwrap_err();

    assert_eq!(error.kind(), "PluginCrash");
    assert!(error.is_fatal());
    assert!(!ws.options().manifest_path().exists());
}

#[tokio::test]
async fn test_unparseable_file_is_skipped() {
    let ws = Workspace::new();
    let inputs = vec![
        ws.source("broken.hpp", "class Broken { int x; "),
        ws.source("colors.hpp", COLORS),
    ];

    let report = run(registry(vec![enum_plugin()]), ws.options(), &inputs)
        .await
        .unwrap();

    assert_eq!(report.files_total, 2);
    assert_eq!(report.files_generated, 1);
    assert_eq!(report.parse_failures, 1);
    assert_eq!(report.warnings[0].kind, "ParseFailure");
    assert_eq!(report.outcome(), Outcome::CompletedWithWarnings);
    assert!(ws.out_dir.join("colors.hpp.enum-to-string.hpp").exists());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_slow_file_times_out() {
    let ws = Workspace::new();
    let inputs = vec![ws.source("colors.hpp", COLORS)];
    let slow = PluginDescriptor::new("slow", "1.0.0").with_capability(CapabilityEntry::new(
        "enum-to-string",
        KindScope::Any,
        |_| {
            std::thread::sleep(Duration::from_millis(500));
            Ok(vec![GeneratedCode::new("// late")])
        },
    ));
    let mut options = ws.options();
    options.file_timeout = Duration::from_millis(50);

    let report = run(registry(vec![slow]), options, &inputs).await.unwrap();

    assert_eq!(report.files_generated, 0);
    assert_eq!(report.warnings.len(), 1);
    assert_eq!(report.warnings[0].kind, "FileTimeout");
    assert!(!ws.out_dir.join("colors.hpp.enum-to-string.hpp").exists());
}

#[tokio::test]
async fn test_stale_outputs_are_removed() {
    let ws = Workspace::new();
    let input = ws.source("colors.hpp", COLORS);
    let registry = registry(vec![enum_plugin()]);

    run(registry.clone(), ws.options(), &[input.clone()])
        .await
        .unwrap();
    assert!(ws.out_dir.join("colors.hpp.enum-to-json.hpp").exists());

    ws.source(
        "colors.hpp",
        &COLORS.replace("// {gen};{funccall};enum_to_json()\n", ""),
    );
    let report = run(registry, ws.options(), &[input]).await.unwrap();

    assert_eq!(
        report.stale_outputs,
        vec![PathBuf::from("colors.hpp.enum-to-json.hpp")]
    );
    assert!(!ws.out_dir.join("colors.hpp.enum-to-json.hpp").exists());
    assert!(ws.out_dir.join("colors.hpp.enum-to-string.hpp").exists());

    let manifest = RunManifest::load(&ws.options().manifest_path());
    let outputs: Vec<&Path> = manifest.entries.iter().map(|e| e.output.as_path()).collect();
    assert_eq!(outputs, vec![Path::new("colors.hpp.enum-to-string.hpp")]);
}

#[tokio::test]
async fn test_strict_mode_rejects_unknown_capability() {
    let ws = Workspace::new();
    let inputs = vec![ws.source("colors.hpp", COLORS)];
    let mut options = ws.options();
    options.strict_capabilities = true;

    let error = run(registry(Vec::new()), options, &inputs)
        .await
        .unwrap_err();
    assert_eq!(error.kind(), "UnknownCapability");

    let report = run(registry(Vec::new()), ws.options(), &inputs)
        .await
        .unwrap();
    assert_eq!(report.outcome(), Outcome::Success);
    assert_eq!(report.fragments_written, 0);
}
