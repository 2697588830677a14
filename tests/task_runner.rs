// tests/task_runner.rs

use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use assetpipe::config::ConfigFile;
use assetpipe::errors::{PipelineError, TaskError, TransformError};
use assetpipe::fs::mock::MockFileSystem;
use assetpipe::pipeline::{Pipeline, resolve_paths};
use assetpipe::run_task;
use assetpipe::task::catalog::{CSS, FONTS, HTML, IMAGES, JS, LIBS_CSS, LINTING, SPRITE};
use assetpipe::task::{Task, TaskRunner};
use assetpipe::transform::{Asset, Transform, TransformContext, TransformRegistry, TransformSpec};
use assetpipe::types::{BoxFuture, EmptyMatchPolicy};
use assetpipe_test_utils::builders::ConfigFileBuilder;
use assetpipe_test_utils::fake_tools::{
    LINT_ME, SYNTAX_ERROR, fake_tool_registry, register_test_transforms,
};
use assetpipe_test_utils::{init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

fn pipeline(fs: &MockFileSystem, cfg: ConfigFile) -> Pipeline {
    let paths = resolve_paths(Some("site"), &cfg, None);
    Pipeline::new(
        "",
        paths,
        cfg,
        Arc::new(fake_tool_registry()),
        Arc::new(fs.clone()),
    )
    .unwrap()
}

fn text(fs: &MockFileSystem, path: &str) -> String {
    let bytes = fs
        .contents(path)
        .unwrap_or_else(|| panic!("missing {path}; have {:?}", fs.files()));
    String::from_utf8(bytes).unwrap()
}

fn files_under(fs: &MockFileSystem, dir: &str) -> Vec<PathBuf> {
    fs.files()
        .into_iter()
        .filter(|p| p.starts_with(dir))
        .collect()
}

fn paths(list: &[&str]) -> Vec<PathBuf> {
    list.iter().map(PathBuf::from).collect()
}

#[tokio::test]
async fn stages_run_in_declaration_order() -> TestResult {
    init_tracing();

    let fs = MockFileSystem::new();
    fs.add_file("app/a.txt", "x");

    let mut registry = TransformRegistry::empty();
    let log = register_test_transforms(&mut registry);
    let runner = TaskRunner::new(Arc::new(registry), Arc::new(fs.clone()), "");

    let task = Task::new("chain")
        .include("app/*.txt")
        .dest("out")
        .stage(TransformSpec::new("record").option("label", "a"))
        .stage(TransformSpec::new("record").option("label", "b"))
        .stage(TransformSpec::new("record").option("label", "c"));

    let report = runner.run(&task).await?;

    assert_eq!(*log.lock().unwrap(), vec!["a", "b", "c"]);
    assert_eq!(report.inputs, 1);
    assert_eq!(report.outputs, paths(&["out/a.txt"]));
    assert_eq!(text(&fs, "out/a.txt"), "x|a|b|c");
    Ok(())
}

#[tokio::test]
async fn failing_stage_writes_nothing() -> TestResult {
    init_tracing();

    let fs = MockFileSystem::new();
    fs.add_file("app/a.txt", "a");
    fs.add_file("app/b.txt", "b");

    let mut registry = TransformRegistry::empty();
    let log = register_test_transforms(&mut registry);
    let runner = TaskRunner::new(Arc::new(registry), Arc::new(fs.clone()), "");

    let task = Task::new("chain")
        .include("app/*.txt")
        .dest("out")
        .stage(TransformSpec::new("record").option("label", "first"))
        .stage(TransformSpec::new("fail"))
        .stage(TransformSpec::new("record").option("label", "never"));

    let err = runner.run(&task).await.unwrap_err();

    assert_eq!(
        err,
        TaskError::Transform {
            task: "chain".to_string(),
            tool: "fail".to_string(),
            path: PathBuf::from("app/a.txt"),
            message: "scripted failure".to_string(),
        }
    );
    assert_eq!(*log.lock().unwrap(), vec!["first"]);
    assert!(files_under(&fs, "out").is_empty());
    Ok(())
}

#[tokio::test]
async fn style_error_names_tool_and_file() -> TestResult {
    init_tracing();

    let fs = MockFileSystem::new();
    fs.add_file("app/scss/style.scss", format!("a {{ {SYNTAX_ERROR}"));
    let pipeline = pipeline(&fs, ConfigFileBuilder::new().build());

    let err = pipeline.execute(CSS).await.unwrap_err();

    match &err {
        TaskError::Transform { task, tool, path, .. } => {
            assert_eq!(task, CSS);
            assert_eq!(tool, "sass");
            assert_eq!(path, Path::new("app/scss/style.scss"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(files_under(&fs, "site").is_empty());
    Ok(())
}

#[tokio::test]
async fn css_is_compiled_prefixed_and_minified() -> TestResult {
    init_tracing();

    let fs = MockFileSystem::new();
    fs.add_file("app/scss/style.scss", "a{}");
    let pipeline = pipeline(&fs, ConfigFileBuilder::new().build());

    let report = pipeline.execute(CSS).await?;

    assert_eq!(report.outputs, paths(&["site/css/style.min.css"]));
    assert_eq!(
        text(&fs, "site/css/style.min.css"),
        "/*clean-css*//*autoprefixer*//*sass*/a{}"
    );
    Ok(())
}

#[tokio::test]
async fn emit_unminified_keeps_both_variants() -> TestResult {
    init_tracing();

    let fs = MockFileSystem::new();
    fs.add_file("app/scss/style.scss", "a{}");
    fs.add_file("app/js/main.js", "let a;");
    let cfg = ConfigFileBuilder::new().with_emit_unminified(true).build();
    let pipeline = pipeline(&fs, cfg);

    let css = pipeline.execute(CSS).await?;
    assert_eq!(
        css.outputs,
        paths(&["site/css/style.css", "site/css/style.min.css"])
    );

    let js = pipeline.execute(JS).await?;
    assert_eq!(js.outputs, paths(&["site/js/main.js", "site/js/main.min.js"]));
    assert_eq!(text(&fs, "site/js/main.js"), "/*babel*/let a;");
    assert_eq!(text(&fs, "site/js/main.min.js"), "/*uglify*//*babel*/let a;");
    Ok(())
}

#[tokio::test]
async fn every_raster_image_gets_a_webp_twin() -> TestResult {
    init_tracing();

    let fs = MockFileSystem::new();
    fs.add_file("app/images/a.png", "PNG");
    fs.add_file("app/images/photos/b.jpg", "JPG");
    fs.add_file("app/images/c.gif", "GIF");
    fs.add_file("app/images/d.svg", "<svg/>");
    fs.add_file("app/images/notes.txt", "ignored");
    let pipeline = pipeline(&fs, ConfigFileBuilder::new().build());

    let report = pipeline.execute(IMAGES).await?;

    assert_eq!(report.inputs, 4);
    assert_eq!(
        report.outputs,
        paths(&[
            "site/img/a.webp",
            "site/img/photos/b.webp",
            "site/img/a.png",
            "site/img/c.gif",
            "site/img/d.svg",
            "site/img/photos/b.jpg",
        ])
    );
    assert_eq!(text(&fs, "site/img/a.webp"), "/*webp*/PNG");
    assert_eq!(text(&fs, "site/img/a.png"), "/*imagemin*/PNG");
    Ok(())
}

#[tokio::test]
async fn fonts_become_woff_and_woff2() -> TestResult {
    init_tracing();

    let fs = MockFileSystem::new();
    fs.add_file("app/fonts/Roboto.ttf", "TTF");
    fs.add_file("app/fonts/readme.md", "no");
    let pipeline = pipeline(&fs, ConfigFileBuilder::new().build());

    let report = pipeline.execute(FONTS).await?;
    assert_eq!(
        report.outputs,
        paths(&["site/fonts/Roboto.woff", "site/fonts/Roboto.woff2"])
    );

    let copy = pipeline_without_conversion(&fs);
    let report = copy.execute(FONTS).await?;
    assert_eq!(report.outputs, paths(&["site/fonts/Roboto.ttf"]));
    assert_eq!(text(&fs, "site/fonts/Roboto.ttf"), "TTF");
    Ok(())
}

fn pipeline_without_conversion(fs: &MockFileSystem) -> Pipeline {
    pipeline(fs, ConfigFileBuilder::new().with_font_conversion(false).build())
}

#[tokio::test]
async fn markup_expands_includes_and_offers_webp() -> TestResult {
    init_tracing();

    let fs = MockFileSystem::new();
    fs.add_file(
        "app/index.html",
        "@@include('html/_head.html')<img src=\"img/a.png\" alt=\"\">",
    );
    fs.add_file("app/html/_head.html", "<title>t</title>");
    fs.add_file("app/_partial.html", "not a page");
    let pipeline = pipeline(&fs, ConfigFileBuilder::new().build());

    let report = pipeline.execute(HTML).await?;

    assert_eq!(report.outputs, paths(&["site/index.html"]));
    assert_eq!(
        text(&fs, "site/index.html"),
        "<title>t</title><picture><source srcset=\"img/a.webp\" type=\"image/webp\">\
         <img src=\"img/a.png\" alt=\"\"></picture>"
    );
    Ok(())
}

#[tokio::test]
async fn sprite_stacks_every_svg_into_one_file() -> TestResult {
    init_tracing();

    let fs = MockFileSystem::new();
    fs.add_file("app/images/icons/mail.svg", "<svg viewBox=\"0 0 1 1\"><path/></svg>");
    fs.add_file("app/images/logo.svg", "<svg><circle/></svg>");
    let pipeline = pipeline(&fs, ConfigFileBuilder::new().build());

    let report = pipeline.execute(SPRITE).await?;

    assert_eq!(report.inputs, 2);
    assert_eq!(report.outputs, paths(&["site/img/sprite.svg"]));
    let sprite = text(&fs, "site/img/sprite.svg");
    assert!(sprite.contains("id=\"icons-mail\""), "{sprite}");
    assert!(sprite.contains("id=\"logo\""), "{sprite}");
    Ok(())
}

#[tokio::test]
async fn empty_match_follows_the_task_policy() -> TestResult {
    init_tracing();

    let fs = MockFileSystem::new();
    let cfg = ConfigFileBuilder::new()
        .with_libs(&["node_modules/missing.css"], &[])
        .with_empty_match(FONTS, EmptyMatchPolicy::Error)
        .build();
    let pipeline = pipeline(&fs, cfg);

    let err = pipeline.execute(HTML).await.unwrap_err();
    assert!(matches!(err, TaskError::NoMatch { ref task, .. } if task == HTML), "{err}");

    let libs = pipeline.execute(LIBS_CSS).await?;
    assert_eq!(libs.inputs, 0);
    assert!(libs.outputs.is_empty());

    let images = pipeline.execute(IMAGES).await?;
    assert!(images.outputs.is_empty());

    let err = pipeline.execute(FONTS).await.unwrap_err();
    assert!(matches!(err, TaskError::NoMatch { .. }), "{err}");
    assert!(fs.files().is_empty());
    Ok(())
}

#[tokio::test]
async fn libs_are_bundled_in_order() -> TestResult {
    init_tracing();

    let fs = MockFileSystem::new();
    fs.add_file("node_modules/b/b.css", "b{}");
    fs.add_file("node_modules/a/a.css", "a{}");
    let cfg = ConfigFileBuilder::new()
        .with_libs(&["node_modules/b/b.css", "node_modules/a/a.css"], &[])
        .build();
    let pipeline = pipeline(&fs, cfg);

    let report = pipeline.execute(LIBS_CSS).await?;

    assert_eq!(report.outputs, paths(&["site/css/libs.min.css"]));
    let bundle = text(&fs, "site/css/libs.min.css");
    assert!(bundle.starts_with("/*clean-css*/"), "{bundle}");
    let b = bundle.find("b{}").unwrap();
    let a = bundle.find("a{}").unwrap();
    assert!(b < a, "{bundle}");
    Ok(())
}

#[tokio::test]
async fn lint_findings_do_not_fail_the_task() -> TestResult {
    init_tracing();

    let fs = MockFileSystem::new();
    fs.add_file("app/js/main.js", format!("var x; // {LINT_ME}"));
    fs.add_file("app/scss/style.scss", format!("a{{}} /* {LINT_ME} */"));
    let pipeline = pipeline(&fs, ConfigFileBuilder::new().with_lint(true).build());

    let js = pipeline.execute(JS).await?;
    assert_eq!(js.findings.len(), 1);
    assert_eq!(js.findings[0].path, PathBuf::from("app/js/main.js"));
    assert!(js.findings[0].message.starts_with("eslint"));
    assert_eq!(js.outputs, paths(&["site/js/main.js"]));

    let linting = pipeline.execute(LINTING).await?;
    assert_eq!(linting.findings.len(), 1);
    assert!(linting.outputs.is_empty());
    assert!(files_under(&fs, "site/css").is_empty());
    Ok(())
}

#[tokio::test]
async fn clean_removes_only_the_destination_root() -> TestResult {
    init_tracing();

    let fs = MockFileSystem::new();
    fs.add_file("app/scss/style.scss", "a{}");
    fs.add_file("site/old.html", "stale");
    fs.add_file("sitemap.xml", "keep");
    let pipeline = pipeline(&fs, ConfigFileBuilder::new().build());

    pipeline.execute("clean").await?;
    assert_eq!(fs.files(), paths(&["app/scss/style.scss", "sitemap.xml"]));

    // Cleaning twice is fine.
    pipeline.execute("clean").await?;
    Ok(())
}

#[tokio::test]
async fn run_task_reports_one_result() -> TestResult {
    init_tracing();

    let fs = MockFileSystem::new();
    fs.add_file("app/scss/style.scss", "a{}");
    fs.add_file("site/keep.txt", "not cleaned");
    let pipeline = pipeline(&fs, ConfigFileBuilder::new().build());

    let report = run_task(&pipeline, CSS).await?;
    assert!(report.is_success());
    assert_eq!(report.len(), 1);
    assert!(fs.contents("site/keep.txt").is_some());

    let err = run_task(&pipeline, "favicons").await.unwrap_err();
    assert!(matches!(err, PipelineError::TaskNotFound(ref name) if name == "favicons"));
    Ok(())
}

#[derive(Debug)]
struct Stall;

impl Transform for Stall {
    fn kind(&self) -> &str {
        "stall"
    }

    fn apply<'a>(
        &'a self,
        assets: Vec<Asset>,
        _ctx: &'a TransformContext,
    ) -> BoxFuture<'a, Result<Vec<Asset>, TransformError>> {
        Box::pin(async move {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(assets)
        })
    }
}

#[tokio::test]
async fn timeout_turns_a_hung_tool_into_a_failure() -> TestResult {
    init_tracing();

    let fs = MockFileSystem::new();
    fs.add_file("app/a.txt", "a");
    let mut registry = TransformRegistry::empty();
    registry.register("stall", |_, _| Ok(Box::new(Stall)));
    let runner = TaskRunner::new(Arc::new(registry), Arc::new(fs.clone()), "")
        .with_timeout(Some(Duration::from_millis(50)));

    let task = Task::new("slow")
        .include("app/*.txt")
        .dest("out")
        .stage(TransformSpec::new("stall"));

    let err = with_timeout(runner.run(&task)).await.unwrap_err();
    assert_eq!(
        err,
        TaskError::Timeout {
            task: "slow".to_string(),
            limit: Duration::from_millis(50),
        }
    );
    assert!(files_under(&fs, "out").is_empty());
    Ok(())
}
