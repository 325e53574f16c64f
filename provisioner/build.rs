extern crate build_deps;

fn main() {
    // Golden files in "tests/testdata" generate one test each, rebuild when they change.
    build_deps::rerun_if_changed_paths("tests/testdata/*.yaml").unwrap();

    // Watching the directory itself picks up newly added cases.
    build_deps::rerun_if_changed_paths("tests/testdata").unwrap();
}
