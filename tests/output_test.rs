//! Generated projects on disk: directory writes, archives and metadata

use antigravity::output::{
    ComposeFile, MetadataError, RunMetadata, StackDiff, COMPONENT_LABEL, COMPOSE_FILE,
    METADATA_FILE, SWITCH_ENV_PATH,
};
use antigravity::pipeline::{GenerationOrchestrator, GenerationOutcome, GenerationRequest};
use antigravity::secrets::RngSecretSource;
use antigravity::stack::{Category, ProviderRegistry, Stack};
use flate2::read::GzDecoder;
use std::fs;
use std::io::Read;
use tempfile::TempDir;

fn starter() -> Stack {
    Stack::new()
        .with(Category::Storage, "PostgreSQL")
        .with(Category::Transformation, "dbt")
}

fn generate(stack: Stack) -> GenerationOutcome {
    let registry = ProviderRegistry::with_defaults();
    GenerationOrchestrator::new(&registry)
        .generate(
            GenerationRequest::new("acme", stack)
                .with_secret_source(Box::new(RngSecretSource::seeded(11))),
        )
        .expect("generation should succeed")
}

#[test]
fn test_written_project_matches_container() {
    let outcome = generate(starter());
    let temp = TempDir::new().unwrap();
    let target = temp.path().join("acme");

    outcome.output.write_to_dir(&target).unwrap();

    for (path, content) in outcome.output.iter() {
        let on_disk = fs::read_to_string(target.join(path)).unwrap();
        assert_eq!(on_disk, content, "{} differs", path);
    }
    for env in [".env.dev", ".env.staging", ".env.prod", ".env.example", ".gitignore"] {
        assert!(target.join(env).exists(), "{} missing", env);
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = fs::metadata(target.join(SWITCH_ENV_PATH)).unwrap().permissions().mode();
        assert_eq!(mode & 0o111, 0o111);
    }
}

#[test]
fn test_compose_file_on_disk_is_labelled() {
    let outcome = generate(starter());
    let temp = TempDir::new().unwrap();
    let target = temp.path().join("acme");
    outcome.output.write_to_dir(&target).unwrap();

    let compose = ComposeFile::from_yaml(&fs::read_to_string(target.join(COMPOSE_FILE)).unwrap())
        .unwrap();
    assert_eq!(compose.network(), "antigravity_net");
    assert!(!compose.services.is_empty());
    for (name, service) in &compose.services {
        assert!(service.labels.contains_key(COMPONENT_LABEL), "{} has no owner", name);
        assert_eq!(service.networks, vec!["antigravity_net".to_string()]);
    }
}

#[test]
fn test_rewrite_drops_files_of_removed_components() {
    let temp = TempDir::new().unwrap();
    let target = temp.path().join("acme");

    let first = generate(starter());
    first.output.write_to_dir(&target).unwrap();
    let dbt_files: Vec<String> = first
        .output
        .paths()
        .filter(|p| p.starts_with("dbt_project/"))
        .map(str::to_string)
        .collect();
    assert!(!dbt_files.is_empty());

    let second = generate(Stack::new().with(Category::Storage, "PostgreSQL"));
    second.output.write_to_dir(&target).unwrap();

    for path in &dbt_files {
        assert!(!target.join(path).exists(), "{} survived the rewrite", path);
    }
    assert!(target.join(METADATA_FILE).exists());
}

#[test]
fn test_metadata_round_trips_through_disk() {
    let temp = TempDir::new().unwrap();
    let target = temp.path().join("acme");

    match RunMetadata::read_from(&target) {
        Err(MetadataError::NotFound(path)) => assert!(path.ends_with(METADATA_FILE)),
        other => panic!("expected NotFound, got {:?}", other),
    }

    generate(starter()).output.write_to_dir(&target).unwrap();
    let metadata = RunMetadata::read_from(&target).unwrap();
    assert_eq!(metadata.project.name, "acme");
    assert_eq!(metadata.project.stack, starter());
    assert_eq!(metadata.antigravity.version, env!("CARGO_PKG_VERSION"));

    fs::write(target.join(METADATA_FILE), "antigravity: [").unwrap();
    assert!(matches!(
        RunMetadata::read_from(&target),
        Err(MetadataError::Parse { .. })
    ));
}

#[test]
fn test_archive_holds_the_whole_project() {
    let outcome = generate(starter());
    let temp = TempDir::new().unwrap();
    let dest = temp.path().join("out").join("acme.tar.gz");

    outcome.output.write_archive("acme", &dest).unwrap();

    let mut tar_data = Vec::new();
    GzDecoder::new(fs::File::open(&dest).unwrap())
        .read_to_end(&mut tar_data)
        .unwrap();
    let mut archive = tar::Archive::new(&tar_data[..]);
    let names: Vec<String> = archive
        .entries()
        .unwrap()
        .map(|e| e.unwrap().path().unwrap().display().to_string())
        .collect();

    assert_eq!(names.len(), outcome.output.len());
    assert!(names.contains(&format!("acme/{}", METADATA_FILE)));
    assert!(names.contains(&format!("acme/{}", COMPOSE_FILE)));
    assert!(names.iter().all(|n| n.starts_with("acme/")));
}

#[test]
fn test_diff_against_written_project() {
    let temp = TempDir::new().unwrap();
    let target = temp.path().join("acme");
    generate(starter()).output.write_to_dir(&target).unwrap();
    let current = RunMetadata::read_from(&target).unwrap().project.stack;

    let proposed = Stack::new()
        .with(Category::Storage, "DuckDB")
        .with(Category::Orchestration, "Airflow")
        .with(Category::Transformation, "");
    let diff = StackDiff::between(&current, &proposed);

    assert_eq!(diff.added, vec![(Category::Orchestration, "Airflow".to_string())]);
    assert_eq!(diff.removed, vec![(Category::Transformation, "dbt".to_string())]);
    assert_eq!(diff.changed.len(), 1);
    assert_eq!(diff.changed[0].from, "PostgreSQL");
    assert_eq!(diff.changed[0].to, "DuckDB");
    assert!(StackDiff::between(&current, &current).is_empty());
}
