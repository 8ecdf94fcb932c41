use std::io::{Cursor, Read};
use std::path::Path;

use bale_build::{
    BundleError, BundleOutcome, FunctionRequest, RevisionRequest, bundle_function,
    bundle_revision, collect_files,
};
use bale_core::{CachePolicy, IgnoreRules, PathMapping};
use bale_deps::executor::{ToolCommand, ToolExecutor};
use bale_deps::tool::ToolError;
use bale_deps::{DependencyResolver, StaticWheelIndex};
use flate2::read::GzDecoder;
use mockall::mock;
use tempfile::TempDir;

mock! {
    Executor {}

    impl ToolExecutor for Executor {
        async fn exec(&self, command: &ToolCommand) -> Result<String, ToolError>;
    }
}

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

fn zip_members(bytes: &[u8]) -> Vec<(String, String)> {
    let mut zip = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    (0..zip.len())
        .map(|i| {
            let mut file = zip.by_index(i).unwrap();
            let mut content = String::new();
            file.read_to_string(&mut content).unwrap();
            (file.name().to_owned(), content)
        })
        .collect()
}

fn tar_members(path: &Path) -> Vec<(String, String)> {
    let file = std::fs::File::open(path).unwrap();
    let mut archive = tar::Archive::new(GzDecoder::new(file));
    archive
        .entries()
        .unwrap()
        .map(|entry| {
            let mut entry = entry.unwrap();
            let name = entry.path().unwrap().display().to_string();
            let mut content = String::new();
            entry.read_to_string(&mut content).unwrap();
            (name, content)
        })
        .collect()
}

fn names(members: &[(String, String)]) -> Vec<&str> {
    members.iter().map(|(name, _)| name.as_str()).collect()
}

fn function_request(project: &Path) -> FunctionRequest {
    FunctionRequest {
        project_dir: project.to_path_buf(),
        runtime: "python3.12".to_owned(),
        handler_file: "handler.py".to_owned(),
        mappings: Vec::new(),
        ignore: IgnoreRules::default(),
        settings: None,
        cache_policy: CachePolicy::Fresh,
    }
}

fn expect_ready(outcome: BundleOutcome) -> Vec<u8> {
    match outcome {
        BundleOutcome::Ready(bytes) => bytes,
        BundleOutcome::TooLarge { size, .. } => panic!("unexpected rejection at {size} bytes"),
    }
}

// ── Revision bundles ──

#[test]
fn codedeploy_revision_bundle() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "codedeploy/sample_code.txt", "sample code\n");
    write(tmp.path(), "codedeploy/sample_code2.txt", "sample code 2\n");
    write(tmp.path(), "codedeploy/folder/sample_code3.txt", "sample code 3\n");
    write(tmp.path(), "unrelated.txt", "not bundled");
    let out = TempDir::new().unwrap();

    let path = bundle_revision(&RevisionRequest {
        project_dir: tmp.path().to_path_buf(),
        mappings: Vec::new(),
        ignore: IgnoreRules::default(),
        output_dir: out.path().to_path_buf(),
        build_tag: None,
    })
    .unwrap();

    assert_eq!(path, out.path().join("revision-bundle.tar.gz"));
    let members = tar_members(&path);
    assert_eq!(
        members,
        [
            (
                "folder/sample_code3.txt".to_owned(),
                "sample code 3\n".to_owned()
            ),
            ("sample_code.txt".to_owned(), "sample code\n".to_owned()),
            ("sample_code2.txt".to_owned(), "sample code 2\n".to_owned()),
        ]
    );
}

#[test]
fn revision_bundle_name_carries_build_tag() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "codedeploy/appspec.yml", "version: 0.0\n");
    let out = TempDir::new().unwrap();

    let path = bundle_revision(&RevisionRequest {
        project_dir: tmp.path().to_path_buf(),
        mappings: Vec::new(),
        ignore: IgnoreRules::default(),
        output_dir: out.path().join("dist"),
        build_tag: Some("117".to_owned()),
    })
    .unwrap();

    assert_eq!(path, out.path().join("dist/revision-bundle_117.tar.gz"));
    assert!(path.is_file());
}

#[test]
fn revision_bundle_with_custom_mappings_and_ignore() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "scripts/start.sh", "start");
    write(tmp.path(), "scripts/start.sh.bak", "old");
    write(tmp.path(), "app/main.py", "main");
    let out = TempDir::new().unwrap();

    let path = bundle_revision(&RevisionRequest {
        project_dir: tmp.path().to_path_buf(),
        mappings: vec![
            PathMapping::new("scripts", "hooks"),
            PathMapping::new("app", "app"),
        ],
        ignore: IgnoreRules::new(["*.bak"]).unwrap(),
        output_dir: out.path().to_path_buf(),
        build_tag: None,
    })
    .unwrap();

    assert_eq!(names(&tar_members(&path)), ["hooks/start.sh", "app/main.py"]);
}

// ── Selection properties ──

#[test]
fn ignore_beats_any_include() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "src/keep.py", "");
    write(tmp.path(), "src/cache.pyc", "");
    write(tmp.path(), "src/boto3/__init__.py", "");
    let ignore = IgnoreRules::new(["*.pyc", "boto3*"]).unwrap();

    let files = collect_files(
        &[
            PathMapping::at_root("src"),
            PathMapping::at_root("src/cache.pyc"),
            PathMapping::at_root("src/**"),
        ],
        tmp.path(),
        &ignore,
    )
    .unwrap();

    let targets: Vec<_> = files.iter().map(|f| f.archive_target.as_str()).collect();
    assert_eq!(targets, ["keep.py", "src/keep.py"]);
}

#[test]
fn collecting_twice_yields_the_same_files() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "impl/a.txt", "a");
    write(tmp.path(), "impl/nested/b.txt", "b");
    let mappings = [PathMapping::new("./impl", "impl"), PathMapping::at_root("impl/*.txt")];
    let ignore = IgnoreRules::default();

    let first = collect_files(&mappings, tmp.path(), &ignore).unwrap();
    let second = collect_files(&mappings, tmp.path(), &ignore).unwrap();
    assert_eq!(first, second);
}

#[test]
fn absolute_mapping_is_supported() {
    let tmp = TempDir::new().unwrap();
    let elsewhere = TempDir::new().unwrap();
    write(elsewhere.path(), "shared/util.py", "util");
    let source = elsewhere.path().join("shared").display().to_string();

    let files = collect_files(
        &[PathMapping::new(source, "lib")],
        tmp.path(),
        &IgnoreRules::default(),
    )
    .unwrap();

    assert_eq!(files.len(), 1);
    assert_eq!(files[0].archive_target, "lib/util.py");
}

// ── Function bundles ──

#[tokio::test]
async fn function_bundle_round_trips_files_and_settings() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "handler.py", "def handler(event, ctx): pass\n");
    write(tmp.path(), "impl/bigfile", "payload");
    let request = FunctionRequest {
        mappings: vec![PathMapping::new("./impl", "impl")],
        settings: Some("aws.region = us-east-1\n".to_owned()),
        ..function_request(tmp.path())
    };

    let outcome = bundle_function(&request, &DependencyResolver::new()).await.unwrap();
    let members = zip_members(&expect_ready(outcome));

    assert_eq!(
        members,
        [
            ("impl/bigfile".to_owned(), "payload".to_owned()),
            (
                "handler.py".to_owned(),
                "def handler(event, ctx): pass\n".to_owned()
            ),
            (
                "settings.conf".to_owned(),
                "aws.region = us-east-1\n".to_owned()
            ),
        ]
    );
}

#[tokio::test]
async fn settings_alone_yields_single_member() {
    let tmp = TempDir::new().unwrap();
    let request = FunctionRequest {
        settings: Some("key = value\n".to_owned()),
        ..function_request(tmp.path())
    };

    let outcome = bundle_function(&request, &DependencyResolver::new()).await.unwrap();
    assert_eq!(names(&zip_members(&expect_ready(outcome))), ["settings.conf"]);
}

#[tokio::test]
async fn settings_replace_mapped_file_with_same_name() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "handler.py", "");
    write(tmp.path(), "conf/settings.conf", "old = true\n");
    write(tmp.path(), "conf/logging.conf", "level = info\n");
    let request = FunctionRequest {
        mappings: vec![PathMapping::at_root("conf")],
        settings: Some("new = true\n".to_owned()),
        ..function_request(tmp.path())
    };

    let outcome = bundle_function(&request, &DependencyResolver::new()).await.unwrap();
    let members = zip_members(&expect_ready(outcome));

    assert_eq!(
        members,
        [
            ("logging.conf".to_owned(), "level = info\n".to_owned()),
            ("handler.py".to_owned(), String::new()),
            ("settings.conf".to_owned(), "new = true\n".to_owned()),
        ]
    );
}

#[tokio::test]
async fn comment_only_requirements_are_not_bundled() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "handler.py", "");
    write(tmp.path(), "requirements.txt", "# nothing yet\n\n");

    let outcome = bundle_function(&function_request(tmp.path()), &DependencyResolver::new())
        .await
        .unwrap();

    let members = zip_members(&expect_ready(outcome));
    assert_eq!(names(&members), ["handler.py"]);
}

#[tokio::test]
async fn vendored_packages_land_at_archive_root() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "handler.py", "import boto3\n");
    write(tmp.path(), "requirements.txt", "boto3==1.4.4\n");
    let project = tmp.path().to_path_buf();
    let site_packages = project.join(".bale/venv/python3.12/lib/python3.12/site-packages");

    let mut mock = MockExecutor::new();
    let venv_site = site_packages.clone();
    mock.expect_exec()
        .withf(|cmd| cmd.has_arg("venv"))
        .times(1)
        .returning(move |_| {
            std::fs::create_dir_all(&venv_site).unwrap();
            Ok(String::new())
        });
    mock.expect_exec()
        .withf(|cmd| cmd.has_arg("/wheels/boto3-1.4.4-py2.py3-none-any.whl"))
        .times(1)
        .returning(move |_| {
            write(&site_packages, "boto3/__init__.py", "# boto3\n");
            write(&site_packages, "boto3/__pycache__/x.pyc", "");
            Ok(String::new())
        });

    let resolver = DependencyResolver::with_executor(
        mock,
        StaticWheelIndex::new().with_entry(
            "python3.12",
            "boto3",
            "1.4.4",
            "/wheels/boto3-1.4.4-py2.py3-none-any.whl",
        ),
    );
    let request = FunctionRequest {
        ignore: IgnoreRules::new(["*.pyc"]).unwrap(),
        ..function_request(&project)
    };

    let outcome = bundle_function(&request, &resolver).await.unwrap();
    let members = zip_members(&expect_ready(outcome));
    assert_eq!(names(&members), ["boto3/__init__.py", "handler.py"]);
}

#[tokio::test]
async fn unsupported_runtime_fails_before_bundling() {
    let tmp = TempDir::new().unwrap();
    let request = FunctionRequest {
        runtime: "java8".to_owned(),
        ..function_request(tmp.path())
    };

    let err = bundle_function(&request, &DependencyResolver::new())
        .await
        .unwrap_err();
    assert!(matches!(err, BundleError::Dependencies(_)));
}

/// Deterministic incompressible bytes (xorshift64).
fn noise(len: usize) -> Vec<u8> {
    let mut state: u64 = 0x9E37_79B9_7F4A_7C15;
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            (state >> 24) as u8
        })
        .collect()
}

#[tokio::test]
async fn oversized_function_bundle_is_rejected() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(tmp.path().join("handler.py"), "").unwrap();
    std::fs::create_dir_all(tmp.path().join("blob")).unwrap();
    std::fs::write(tmp.path().join("blob/random.bin"), noise(51_000_000)).unwrap();
    let request = FunctionRequest {
        mappings: vec![PathMapping::at_root("blob")],
        ..function_request(tmp.path())
    };

    let outcome = bundle_function(&request, &DependencyResolver::new()).await.unwrap();
    match outcome {
        BundleOutcome::TooLarge { size, limit } => {
            assert_eq!(limit, 50_000_000);
            assert!(size >= limit);
        }
        BundleOutcome::Ready(bytes) => panic!("accepted {} bytes", bytes.len()),
    }
}
