//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use pipematrix::axes::AxisSet;
use pipematrix::platform::{LocalPlatform, MemoryPlatform, Platform, PlatformFactory};
use pipematrix::{
    AssemblyFactory, CaseMap, CombinationGenerator, EachInsertFactory, ExpectationStore, Fields,
    Oracle, Pipe, PlatformCase, PlatformIncludes, SuiteAssembler, TestSuite,
};
use tracing_subscriber::EnvFilter;

pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("pipematrix=debug"))
        .with_test_writer()
        .try_init();
}

pub fn manifest_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
}

pub fn resources_dir() -> PathBuf {
    manifest_dir().join("resources")
}

pub fn data_dir() -> PathBuf {
    manifest_dir().join("data")
}

pub fn store(table: &str) -> ExpectationStore {
    ExpectationStore::from_text("test.properties", table).unwrap()
}

pub fn memory_factory() -> PlatformFactory {
    Arc::new(|| Ok(Box::new(MemoryPlatform::new()) as Box<dyn Platform>))
}

pub fn local_factory(output_dir: PathBuf) -> PlatformFactory {
    Arc::new(move || {
        Ok(Box::new(LocalPlatform::new(data_dir(), output_dir.clone())) as Box<dyn Platform>)
    })
}

/// The pipe built for one op-style triple over a `test` head.
pub fn assembly(arguments: Fields, declared: Fields, selected: Fields) -> Pipe {
    EachInsertFactory
        .create_assembly(&Pipe::head("test"), &arguments, &declared, "value", &selected)
        .unwrap()
}

/// A single case bound to a fresh in-memory platform.
pub fn memory_case(
    table: &str,
    key: &str,
    arguments: Fields,
    declared: Fields,
    selected: Fields,
) -> PlatformCase {
    let oracle = Oracle::resolve(&store(table), key).unwrap();
    PlatformCase::new(
        key,
        assembly(arguments, declared, selected),
        oracle,
        Box::new(MemoryPlatform::new()),
    )
}

pub fn generate(axes: &AxisSet, store: &ExpectationStore) -> CaseMap {
    CombinationGenerator::new(axes)
        .generate(store, &Pipe::head("test"), &EachInsertFactory)
        .unwrap()
}

/// Generate and assemble a suite for `axes` over the given platforms.
pub fn assemble(
    axes: &AxisSet,
    store: &ExpectationStore,
    platforms: &[PlatformFactory],
    includes: &PlatformIncludes,
) -> TestSuite {
    let cases = generate(axes, store);
    let mut suite = TestSuite::new(store.resource());
    SuiteAssembler::new(platforms, includes)
        .assemble(store, &cases, &mut suite)
        .unwrap();
    suite
}
