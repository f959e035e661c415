use expmat_core::from_yaml_str;
use expmat_engine::{Config, Run};

fn load(yaml: &str) -> Config {
    Config::new("/base", from_yaml_str(yaml).unwrap()).unwrap()
}

fn run_ids(runs: &[Run]) -> Vec<(String, String, usize)> {
    runs.iter()
        .map(|run| {
            (
                run.experiment().display_name(),
                run.instance().shortname().to_string(),
                run.repetition(),
            )
        })
        .collect()
}

#[test]
fn repeat_count_expands_per_instance() {
    let cfg = load(
        r#"
instances:
  - items: [a.graph, b.graph]
experiments:
  - name: e1
    repeat: 2
"#,
    );
    let runs = cfg.discover_all_runs().unwrap();
    assert_eq!(
        run_ids(&runs),
        vec![
            ("e1".to_string(), "a".to_string(), 0),
            ("e1".to_string(), "a".to_string(), 1),
            ("e1".to_string(), "b".to_string(), 0),
            ("e1".to_string(), "b".to_string(), 1),
        ]
    );
}

#[test]
fn discovery_is_deterministic() {
    let cfg = load(
        r#"
instances:
  - items: [a.graph, b.graph, c.graph]
variants:
  - axis: size
    items: [{ name: s1 }, { name: s2 }]
experiments:
  - name: e1
    repeat: 3
  - name: e2
"#,
    );
    let first = run_ids(&cfg.discover_all_runs().unwrap());
    let second = run_ids(&cfg.discover_all_runs().unwrap());
    assert_eq!(first, second);
}

#[test]
fn overlapping_includes_deduplicate() {
    let cfg = load(
        r#"
instances:
  - items: [a.graph]
experiments:
  - name: e1
  - name: e2
matrix:
  include:
    - experiments: [e1, e2]
    - experiments: [e1]
"#,
    );
    let runs = cfg.discover_all_runs().unwrap();
    assert_eq!(
        run_ids(&runs),
        vec![
            ("e1".to_string(), "a".to_string(), 0),
            ("e2".to_string(), "a".to_string(), 0),
        ]
    );
}

#[test]
fn repetition_precedence() {
    // Selection-explicit beats experiment-declared beats default-one.
    let cfg = load(
        r#"
instances:
  - items: [a.graph]
experiments:
  - name: declared
    repeat: 5
  - name: plain
matrix:
  include:
    - experiments: [declared]
      repetitions: 2
    - experiments: [plain]
"#,
    );
    let runs = cfg.discover_all_runs().unwrap();
    assert_eq!(
        run_ids(&runs),
        vec![
            ("declared".to_string(), "a".to_string(), 0),
            ("declared".to_string(), "a".to_string(), 1),
            ("plain".to_string(), "a".to_string(), 0),
        ]
    );
}

#[test]
fn nested_includes_narrow_repetitions_by_minimum() {
    let cfg = load(
        r#"
instances:
  - items: [a.graph]
experiments:
  - name: e1
matrix:
  repetitions: 3
  include:
    - repetitions: 7
"#,
    );
    let runs = cfg.discover_all_runs().unwrap();
    assert_eq!(runs.len(), 3);
}

#[test]
fn build_using_experiments_bind_every_revision() {
    let cfg = load(
        r#"
instances:
  - items: [a.graph]
builds:
  - name: solver
revisions:
  - name: r1
    build_version: { solver: v1 }
  - name: r2
    build_version: { solver: v2 }
experiments:
  - name: bound
    use_builds: [solver]
  - name: free
"#,
    );
    let runs = cfg.discover_all_runs().unwrap();
    assert_eq!(
        run_ids(&runs),
        vec![
            ("bound @ r1".to_string(), "a".to_string(), 0),
            ("bound @ r2".to_string(), "a".to_string(), 0),
            ("free".to_string(), "a".to_string(), 0),
        ]
    );
    let bound = &runs[0];
    assert_eq!(bound.experiment().revision().unwrap().name(), "r1");
    assert!(runs[2].experiment().revision().is_none());
}

#[test]
fn scope_revision_restriction_applies_to_bound_experiments() {
    let cfg = load(
        r#"
instances:
  - items: [a.graph]
builds:
  - name: solver
revisions:
  - name: r1
    build_version: { solver: v1 }
  - name: r2
    build_version: { solver: v2 }
experiments:
  - name: bound
    use_builds: [solver]
matrix:
  include:
    - revisions: [r2]
"#,
    );
    let runs = cfg.discover_all_runs().unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].experiment().revision().unwrap().name(), "r2");
}

#[test]
fn instset_restriction_filters_instances() {
    let cfg = load(
        r#"
instances:
  - set: social
    items: [fb.edges, tw.edges]
  - set: [road, large]
    items: [usa.graph]
  - items: [lone.graph]
experiments:
  - name: e1
matrix:
  include:
    - instsets: [road]
"#,
    );
    let runs = cfg.discover_all_runs().unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].instance().shortname(), "usa");
}

#[test]
fn unknown_scope_names_fail_discovery() {
    let cfg = load(
        r#"
instances:
  - items: [a.graph]
experiments:
  - name: e1
matrix:
  include:
    - experiments: [ghost]
"#,
    );
    let err = cfg.discover_all_runs().unwrap_err();
    assert_eq!(err.info().code, "not-found");
    assert_eq!(err.info().context["kind"], "experiment");
}

#[test]
fn include_with_empty_list_selects_nothing() {
    let cfg = load(
        r#"
instances:
  - items: [a.graph]
experiments:
  - name: e1
matrix:
  include: []
"#,
    );
    assert!(cfg.discover_all_runs().unwrap().is_empty());
    assert!(cfg.all_experiments().unwrap().is_empty());
}

#[test]
fn all_experiments_deduplicates_like_runs() {
    let cfg = load(
        r#"
builds:
  - name: solver
revisions:
  - name: r1
    build_version: { solver: v1 }
experiments:
  - name: e1
    use_builds: [solver]
matrix:
  include:
    - experiments: [e1]
    - revisions: [r1]
"#,
    );
    let experiments = cfg.all_experiments().unwrap();
    assert_eq!(experiments.len(), 1);
    assert_eq!(experiments[0].display_name(), "e1 @ r1");
}
