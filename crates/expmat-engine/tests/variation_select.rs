use expmat_core::from_yaml_str;
use expmat_engine::Config;

fn load(yaml: &str) -> Config {
    Config::new("/base", from_yaml_str(yaml).unwrap()).unwrap()
}

fn experiment_names(cfg: &Config) -> Vec<String> {
    cfg.all_experiments()
        .unwrap()
        .iter()
        .map(|exp| exp.display_name())
        .collect()
}

const TWO_AXES: &str = r#"
variants:
  - axis: size
    items: [{ name: s1 }, { name: s2 }]
  - axis: mode
    items: [{ name: fast }, { name: exact }]
experiments:
  - name: e1
"#;

#[test]
fn full_product_without_restrictions() {
    let cfg = load(TWO_AXES);
    assert_eq!(
        experiment_names(&cfg),
        vec![
            "e1 ~ exact, s1",
            "e1 ~ exact, s2",
            "e1 ~ fast, s1",
            "e1 ~ fast, s2",
        ]
    );
}

#[test]
fn variant_restriction_collapses_one_axis() {
    let cfg = load(
        r#"
variants:
  - axis: size
    items: [{ name: s1 }, { name: s2 }]
experiments:
  - name: e1
matrix:
  include:
    - variants: [s1]
"#,
    );
    // One variation (s1), not the full two-way product.
    assert_eq!(experiment_names(&cfg), vec!["e1 ~ s1"]);
}

#[test]
fn untouched_axes_stay_complete() {
    let mut doc = TWO_AXES.to_string();
    doc.push_str(
        r#"matrix:
  include:
    - variants: [s1]
"#,
    );
    let cfg = load(&doc);
    // The restriction names no variant of the mode axis, so the whole
    // mode axis remains eligible.
    assert_eq!(
        experiment_names(&cfg),
        vec!["e1 ~ exact, s1", "e1 ~ fast, s1"]
    );
}

#[test]
fn axis_restriction_drops_other_axes() {
    let mut doc = TWO_AXES.to_string();
    doc.push_str(
        r#"matrix:
  include:
    - axes: [mode]
"#,
    );
    let cfg = load(&doc);
    assert_eq!(experiment_names(&cfg), vec!["e1 ~ exact", "e1 ~ fast"]);
}

#[test]
fn variation_identity_is_independent_of_axis_order() {
    let forward = load(TWO_AXES);
    let swapped = load(
        r#"
variants:
  - axis: mode
    items: [{ name: fast }, { name: exact }]
  - axis: size
    items: [{ name: s1 }, { name: s2 }]
experiments:
  - name: e1
"#,
    );
    assert_eq!(experiment_names(&forward), experiment_names(&swapped));
}

#[test]
fn unknown_variant_in_scope_fails() {
    let mut doc = TWO_AXES.to_string();
    doc.push_str(
        r#"matrix:
  include:
    - variants: [nonexistent]
"#,
    );
    let cfg = load(&doc);
    let err = cfg.all_experiments().unwrap_err();
    assert_eq!(err.info().code, "not-found");
    assert_eq!(err.info().context["kind"], "variant");
}

#[test]
fn variant_override_beats_experiment_default() {
    let cfg = load(
        r#"
variants:
  - axis: threads
    items:
      - name: t8
        num_threads: 8
experiments:
  - name: e1
    num_threads: 2
"#,
    );
    let experiments = cfg.all_experiments().unwrap();
    assert_eq!(experiments.len(), 1);
    let settings = experiments[0].effective_thread_settings().unwrap().unwrap();
    assert_eq!(settings.num_threads, 8);
}

#[test]
fn experiment_default_applies_without_override() {
    let cfg = load(
        r#"
experiments:
  - name: e1
    num_nodes: 4
    procs_per_node: 2
"#,
    );
    let experiments = cfg.all_experiments().unwrap();
    let settings = experiments[0]
        .effective_process_settings()
        .unwrap()
        .unwrap();
    assert_eq!(settings.num_nodes, 4);
    assert_eq!(settings.procs_per_node, Some(2));
}

#[test]
fn conflicting_variant_overrides_fail() {
    let cfg = load(
        r#"
variants:
  - axis: a
    items:
      - name: a1
        num_threads: 4
  - axis: b
    items:
      - name: b1
        num_threads: 8
experiments:
  - name: e1
"#,
    );
    let experiments = cfg.all_experiments().unwrap();
    assert_eq!(experiments.len(), 1);
    let err = experiments[0].effective_thread_settings().unwrap_err();
    assert_eq!(err.info().code, "thread-settings-conflict");
}

#[test]
fn conflicting_process_overrides_fail() {
    let cfg = load(
        r#"
variants:
  - axis: a
    items:
      - name: a1
        num_nodes: 2
  - axis: b
    items:
      - name: b1
        num_nodes: 4
        procs_per_node: 8
experiments:
  - name: e1
"#,
    );
    let experiments = cfg.all_experiments().unwrap();
    assert_eq!(experiments.len(), 1);
    let err = experiments[0].effective_process_settings().unwrap_err();
    assert_eq!(err.info().code, "process-settings-conflict");
}

#[test]
fn variation_suffix_uses_canonical_order() {
    let cfg = load(TWO_AXES);
    let experiments = cfg.all_experiments().unwrap();
    let subdir = experiments[0].output_subdir();
    assert_eq!(
        subdir,
        std::path::Path::new("/base/output/e1~exact,s1")
    );
}
